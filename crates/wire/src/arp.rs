use alloc::vec;
use alloc::vec::Vec;
use byteorder::{ByteOrder, NetworkEndian};

use super::{EthernetAddress, Ipv4Address};
use crate::{Error, Result};

#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Request = 0x0001,
    Reply = 0x0002,
}

impl Operation {
    fn from_u16(op: u16) -> Result<Operation> {
        match op {
            0x0001 => Ok(Operation::Request),
            0x0002 => Ok(Operation::Reply),
            _ => Err(Error::Unsupported),
        }
    }
}

#[allow(non_snake_case)]
pub mod Hardware {
    pub const ETHERNET: u16 = 0x0001;
}

#[allow(non_snake_case)]
pub mod Protocols {
    pub const IPV4: u16 = 0x0800;
}

// only ethernet/ipv4 arp is supported, so hw/proto types and lengths are implied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packet {
    pub op: Operation,
    pub source_hw_addr: EthernetAddress,
    pub source_proto_addr: Ipv4Address,
    pub target_hw_addr: EthernetAddress,
    pub target_proto_addr: Ipv4Address,
}

impl Packet {
    pub const PACKET_LEN: usize = 28;

    // who-has `target`? the target hardware address is unknown and left zeroed
    pub fn request(
        source_hw_addr: EthernetAddress,
        source_proto_addr: Ipv4Address,
        target_proto_addr: Ipv4Address,
    ) -> Self {
        Packet {
            op: Operation::Request,
            source_hw_addr,
            source_proto_addr,
            target_hw_addr: EthernetAddress::new([0; 6]),
            target_proto_addr,
        }
    }

    // answer `request` on behalf of (hw_addr, proto_addr)
    pub fn reply_to(request: &Packet, hw_addr: EthernetAddress, proto_addr: Ipv4Address) -> Self {
        Packet {
            op: Operation::Reply,
            source_hw_addr: hw_addr,
            source_proto_addr: proto_addr,
            target_hw_addr: request.source_hw_addr,
            target_proto_addr: request.source_proto_addr,
        }
    }

    pub fn deserialize(buffer: &[u8]) -> Result<Self> {
        if buffer.len() < Self::PACKET_LEN {
            return Err(Error::Malformed);
        }

        let hw_type = NetworkEndian::read_u16(&buffer[0..2]);
        let proto_type = NetworkEndian::read_u16(&buffer[2..4]);
        let hw_len = buffer[4];
        let proto_len = buffer[5];

        if hw_type != Hardware::ETHERNET || proto_type != Protocols::IPV4 {
            return Err(Error::Unsupported);
        }

        if hw_len != 6 || proto_len != 4 {
            return Err(Error::Unsupported);
        }

        Ok(Packet {
            op: Operation::from_u16(NetworkEndian::read_u16(&buffer[6..8]))?,
            source_hw_addr: EthernetAddress::from_bytes(&buffer[8..14])?,
            source_proto_addr: Ipv4Address::from_bytes(&buffer[14..18])?,
            target_hw_addr: EthernetAddress::from_bytes(&buffer[18..24])?,
            target_proto_addr: Ipv4Address::from_bytes(&buffer[24..28])?,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buffer = vec![0u8; Self::PACKET_LEN];

        NetworkEndian::write_u16(&mut buffer[0..2], Hardware::ETHERNET);
        NetworkEndian::write_u16(&mut buffer[2..4], Protocols::IPV4);
        buffer[4] = 6;
        buffer[5] = 4;
        NetworkEndian::write_u16(&mut buffer[6..8], self.op as u16);

        buffer[8..14].copy_from_slice(self.source_hw_addr.as_bytes());
        buffer[14..18].copy_from_slice(self.source_proto_addr.as_bytes());
        buffer[18..24].copy_from_slice(self.target_hw_addr.as_bytes());
        buffer[24..28].copy_from_slice(self.target_proto_addr.as_bytes());

        buffer
    }
}
