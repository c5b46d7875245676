use alloc::collections::{BTreeMap, BTreeSet};
use core::fmt;

use wire::{EthernetAddress, Ipv4Address};

/// Virtual time in milliseconds, advanced only by `tick` calls.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn millis(&self) -> u64 {
        self.0
    }

    pub fn advance(&mut self, ms: u64) {
        self.0 = self.0.saturating_add(ms);
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[derive(Debug)]
struct Entry {
    eth_addr: EthernetAddress,
    refreshed_at: Timestamp,
}

// expiring set of IPv4 -> ethernet address mappings
//
// `expiry` holds exactly one (refreshed_at, ip) pair per entry, so the oldest mappings are
// always at its front
#[derive(Debug)]
pub struct ArpCache {
    entries: BTreeMap<Ipv4Address, Entry>,
    expiry: BTreeSet<(Timestamp, Ipv4Address)>,
    ttl_ms: u64,
}

impl ArpCache {
    pub fn new(ttl_ms: u64) -> Self {
        ArpCache {
            entries: BTreeMap::new(),
            expiry: BTreeSet::new(),
            ttl_ms,
        }
    }

    pub fn eth_addr_for_ip(&self, ipv4_addr: Ipv4Address) -> Option<EthernetAddress> {
        self.entries.get(&ipv4_addr).map(|entry| entry.eth_addr)
    }

    /// Learns or refreshes a mapping, restarting its lifetime at `now`.
    pub fn set_eth_addr_for_ip(&mut self, ipv4_addr: Ipv4Address, eth_addr: EthernetAddress, now: Timestamp) {
        let stale = self.entries.insert(
            ipv4_addr,
            Entry {
                eth_addr,
                refreshed_at: now,
            },
        );

        if let Some(stale) = stale {
            self.expiry.remove(&(stale.refreshed_at, ipv4_addr));
        }
        self.expiry.insert((now, ipv4_addr));
    }

    /// Drops every mapping last refreshed more than `ttl_ms` before `now`.
    pub fn expire(&mut self, now: Timestamp) -> usize {
        let mut expired = 0;

        while let Some(&(refreshed_at, ipv4_addr)) = self.expiry.first() {
            if refreshed_at.0.saturating_add(self.ttl_ms) >= now.0 {
                break;
            }

            self.expiry.pop_first();
            self.entries.remove(&ipv4_addr);
            expired += 1;
        }

        expired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn assert_in_sync(&self) {
        assert_eq!(self.entries.len(), self.expiry.len());
        for (ip, entry) in &self.entries {
            assert!(self.expiry.contains(&(entry.refreshed_at, *ip)), "{} missing from expiry index", ip);
        }
    }
}
