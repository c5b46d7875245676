use log::debug;
use wire::{ArpOperation, ArpPacket, EtherType, EthernetAddress, Ipv4Address};

use super::{ethernet, ipv4, NetworkInterface};
use crate::{Error, Result};

pub fn send_packet(interface: &mut NetworkInterface, arp_repr: &ArpPacket, dst_addr: EthernetAddress) {
    ethernet::send_frame(interface, arp_repr.serialize(), dst_addr, EtherType::ARP);
}

pub fn recv_packet(interface: &mut NetworkInterface, payload: &[u8]) -> Result<()> {
    let arp_repr = ArpPacket::deserialize(payload)?;

    if arp_repr.target_proto_addr != interface.ipv4_addr {
        debug!(
            "[{}] ignoring ARP with target IPv4 address {}",
            interface.name, arp_repr.target_proto_addr
        );
        return Err(Error::Ignored);
    }

    if arp_repr.op == ArpOperation::Reply && arp_repr.target_hw_addr != interface.ethernet_addr {
        debug!(
            "[{}] ignoring ARP reply for ethernet address {}",
            interface.name, arp_repr.target_hw_addr
        );
        return Err(Error::Ignored);
    }

    debug!(
        "[{}] adding mapping from {} to {}",
        interface.name, arp_repr.source_proto_addr, arp_repr.source_hw_addr
    );
    let now = interface.now;
    interface
        .arp_cache
        .set_eth_addr_for_ip(arp_repr.source_proto_addr, arp_repr.source_hw_addr, now);
    interface.arp_requests.remove(&arp_repr.source_proto_addr);

    if arp_repr.op == ArpOperation::Request {
        let arp_reply = ArpPacket::reply_to(&arp_repr, interface.ethernet_addr, interface.ipv4_addr);

        debug!(
            "[{}] sending ARP reply to {}/{}",
            interface.name, arp_reply.target_proto_addr, arp_reply.target_hw_addr
        );
        send_packet(interface, &arp_reply, arp_reply.target_hw_addr);
    }

    ipv4::flush_pending(interface, arp_repr.source_proto_addr, arp_repr.source_hw_addr);
    Ok(())
}

// broadcasts a who-has for `ipv4_addr`, unless one went out within the retry window
pub fn request(interface: &mut NetworkInterface, ipv4_addr: Ipv4Address) {
    let now = interface.now;
    let retry_ms = interface.config.request_retry_ms;

    if let Some(requested_at) = interface.arp_requests.get(&ipv4_addr) {
        if requested_at.millis().saturating_add(retry_ms) > now.millis() {
            debug!(
                "[{}] ARP request for {} already sent at {}",
                interface.name, ipv4_addr, requested_at
            );
            return;
        }
    }

    let arp_repr = ArpPacket::request(interface.ethernet_addr, interface.ipv4_addr, ipv4_addr);

    debug!("[{}] sending ARP request for {}", interface.name, ipv4_addr);
    send_packet(interface, &arp_repr, EthernetAddress::BROADCAST);
    interface.arp_requests.insert(ipv4_addr, now);
}
