use alloc::boxed::Box;
use alloc::collections::{BTreeMap, VecDeque};
use alloc::string::{String, ToString};

use log::{debug, trace};
use wire::{EthernetAddress, EthernetFrame, Ipv4Address, Ipv4Packet};

use crate::utils::{ArpCache, Timestamp};

mod arp;
mod ethernet;
mod ipv4;

/// The link an interface sends on. Delivery is the device's business: nothing is reported
/// back, lost frames are handled by the layers above.
pub trait Device {
    fn transmit(&mut self, frame: &EthernetFrame);
}

/// ARP timing, in milliseconds of virtual time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArpConfig {
    // how long a learned mapping stays usable without being refreshed
    pub entry_ttl_ms: u64,
    // minimum gap between two requests for the same address, also how long datagrams wait
    // for a reply before they are dropped
    pub request_retry_ms: u64,
}

impl ArpConfig {
    pub const ENTRY_TTL_MS: u64 = 30_000;
    pub const REQUEST_RETRY_MS: u64 = 5_000;
}

impl Default for ArpConfig {
    fn default() -> Self {
        ArpConfig {
            entry_ttl_ms: Self::ENTRY_TTL_MS,
            request_retry_ms: Self::REQUEST_RETRY_MS,
        }
    }
}

// a datagram parked until its next hop answers an ARP request
struct PendingDatagram {
    datagram: Ipv4Packet,
    enqueued_at: Timestamp,
}

/// Connects the IP layer to one Ethernet link: resolves next hops through ARP, parks
/// datagrams while resolution is outstanding, and collects the IPv4 datagrams that
/// arrive for it.
pub struct NetworkInterface {
    name: String,
    dev: Box<dyn Device>, // device for sending raw ethernet frames
    ethernet_addr: EthernetAddress,
    ipv4_addr: Ipv4Address,
    config: ArpConfig,

    now: Timestamp,
    arp_cache: ArpCache,
    // when we last asked for each address still unresolved
    arp_requests: BTreeMap<Ipv4Address, Timestamp>,
    pending: BTreeMap<Ipv4Address, VecDeque<PendingDatagram>>,
    datagrams_received: VecDeque<Ipv4Packet>,
}

impl NetworkInterface {
    pub fn new(
        name: &str,
        dev: Box<dyn Device>,
        ethernet_addr: EthernetAddress,
        ipv4_addr: Ipv4Address,
        config: ArpConfig,
    ) -> Self {
        debug!(
            "[{}] interface up, ethernet address {} and IPv4 address {}",
            name, ethernet_addr, ipv4_addr
        );

        NetworkInterface {
            name: name.to_string(),
            dev,
            ethernet_addr,
            ipv4_addr,
            config,
            now: Timestamp::default(),
            arp_cache: ArpCache::new(config.entry_ttl_ms),
            arp_requests: BTreeMap::new(),
            pending: BTreeMap::new(),
            datagrams_received: VecDeque::new(),
        }
    }

    /// Sends `datagram` towards `next_hop`, which must be on this interface's link.
    pub fn send_datagram(&mut self, datagram: Ipv4Packet, next_hop: Ipv4Address) {
        ipv4::send_datagram(self, datagram, next_hop);
    }

    /// Handles a frame that arrived on the link. Anything not for us, or that can't be
    /// parsed, is dropped.
    pub fn recv_frame(&mut self, frame: EthernetFrame) {
        if let Err(err) = ethernet::recv_frame(self, frame) {
            debug!("[{}] dropping frame: {}", self.name, err);
        }
    }

    /// Same as `recv_frame`, for a frame still in its raw form.
    pub fn recv_frame_bytes(&mut self, buffer: &[u8]) {
        match EthernetFrame::deserialize(buffer) {
            Ok(frame) => self.recv_frame(frame),
            Err(err) => debug!("[{}] dropping frame: {}", self.name, err),
        }
    }

    pub fn tick(&mut self, ms_since_last_tick: u64) {
        self.now.advance(ms_since_last_tick);
        let now = self.now;

        let expired = self.arp_cache.expire(now);
        if expired > 0 {
            trace!("[{}] {} arp entries expired at {}", self.name, expired, now);
        }

        let retry_ms = self.config.request_retry_ms;
        let waited_too_long = |since: Timestamp| since.millis().saturating_add(retry_ms) < now.millis();

        let name = &self.name;
        self.pending.retain(|next_hop, queue| {
            let before = queue.len();
            queue.retain(|pending| !waited_too_long(pending.enqueued_at));
            if queue.len() < before {
                debug!(
                    "[{}] {} datagrams for {} dropped, no arp reply",
                    name,
                    before - queue.len(),
                    next_hop
                );
            }
            !queue.is_empty()
        });

        self.arp_requests.retain(|_, requested_at| !waited_too_long(*requested_at));
    }

    /// Datagrams received so far, oldest first. Callers pop what they consume.
    pub fn datagrams_received(&mut self) -> &mut VecDeque<Ipv4Packet> {
        &mut self.datagrams_received
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ethernet_address(&self) -> EthernetAddress {
        self.ethernet_addr
    }

    pub fn ip_address(&self) -> Ipv4Address {
        self.ipv4_addr
    }
}
