use alloc::vec::Vec;

use log::trace;
use wire::{EtherType, EthernetAddress, EthernetFrame};

use super::{arp, ipv4, NetworkInterface};
use crate::{Error, Result};

// wraps `payload` in a frame from this interface and hands it to the device
pub fn send_frame(interface: &mut NetworkInterface, payload: Vec<u8>, dst: EthernetAddress, ethertype: u16) {
    let frame = EthernetFrame::new(interface.ethernet_addr, dst, ethertype, payload);

    trace!(
        "[{}] sending frame to {}, type {:#06x}, {} bytes",
        interface.name,
        dst,
        ethertype,
        frame.size()
    );
    interface.dev.transmit(&frame);
}

// frame from the link: filtered on destination, then passed up by ethertype
pub fn recv_frame(interface: &mut NetworkInterface, frame: EthernetFrame) -> Result<()> {
    // not for us
    if frame.dst != interface.ethernet_addr && !frame.dst.is_broadcast() {
        return Err(Error::Ignored);
    }

    match frame.ethertype {
        EtherType::ARP => arp::recv_packet(interface, &frame.payload),
        EtherType::IPV4 => ipv4::recv_datagram(interface, &frame.payload),
        _ => Err(Error::Wire(wire::Error::Unsupported)),
    }
}
