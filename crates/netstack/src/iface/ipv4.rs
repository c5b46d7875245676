use log::{debug, trace};
use wire::{EtherType, EthernetAddress, Ipv4Address, Ipv4Packet};

use super::{arp, ethernet, NetworkInterface, PendingDatagram};
use crate::Result;

pub fn send_datagram(interface: &mut NetworkInterface, datagram: Ipv4Packet, next_hop: Ipv4Address) {
    if !datagram.fits_total_len() {
        debug!(
            "[{}] datagram for {} is {} bytes, over the IPv4 limit, dropped",
            interface.name,
            datagram.dst_addr,
            datagram.total_len()
        );
        return;
    }

    if let Some(eth_addr) = interface.arp_cache.eth_addr_for_ip(next_hop) {
        ethernet::send_frame(interface, datagram.serialize(), eth_addr, EtherType::IPV4);
        return;
    }

    arp::request(interface, next_hop);

    trace!(
        "[{}] datagram for {} waits on ARP for {}",
        interface.name,
        datagram.dst_addr,
        next_hop
    );
    let enqueued_at = interface.now;
    interface
        .pending
        .entry(next_hop)
        .or_default()
        .push_back(PendingDatagram {
            datagram,
            enqueued_at,
        });
}

pub fn recv_datagram(interface: &mut NetworkInterface, payload: &[u8]) -> Result<()> {
    let datagram = Ipv4Packet::deserialize(payload)?;
    if !datagram.is_valid_checksum() {
        return Err(wire::Error::Checksum.into());
    }

    trace!(
        "[{}] received datagram {} -> {}, {} bytes",
        interface.name,
        datagram.src_addr,
        datagram.dst_addr,
        datagram.total_len()
    );
    interface.datagrams_received.push_back(datagram);
    Ok(())
}

// sends everything that was waiting for `ipv4_addr` to resolve, in arrival order
pub fn flush_pending(interface: &mut NetworkInterface, ipv4_addr: Ipv4Address, eth_addr: EthernetAddress) {
    let Some(queue) = interface.pending.remove(&ipv4_addr) else {
        return;
    };

    for pending in queue {
        ethernet::send_frame(interface, pending.datagram.serialize(), eth_addr, EtherType::IPV4);
    }
}
