/*
+-------------------+-------------------+------------------------+
| Dest MAC (6B)     | Source MAC (6B)   | EtherType (2B)         |
+-------------------+-------------------+------------------------+
|                  Payload                                       |
+----------------------------------------------------------------+
the frame check sequence is left to the device.
*/

use alloc::vec::Vec;
use byteorder::{ByteOrder, NetworkEndian};
use core::fmt;

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 6]);

impl Address {
    pub const BROADCAST: Address = Address([0xFF; 6]);

    pub const fn new(bytes: [u8; 6]) -> Address {
        Address(bytes)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Address> {
        let bytes: [u8; 6] = data.try_into().map_err(|_| Error::Malformed)?;
        Ok(Address(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_unicast(&self) -> bool {
        !self.is_multicast() && !self.is_broadcast()
    }
    pub fn is_multicast(&self) -> bool {
        (self.0[0] & 0b00000001) != 0
    }
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

#[allow(non_snake_case)]
pub mod EtherType {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub dst: Address,
    pub src: Address,
    pub ethertype: u16,
    pub payload: Vec<u8>,
}

impl Frame {
    pub const HEADER_LEN: usize = 14;

    pub fn new(src: Address, dst: Address, ethertype: u16, payload: Vec<u8>) -> Self {
        Frame {
            dst,
            src,
            ethertype,
            payload,
        }
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::HEADER_LEN {
            return Err(Error::Malformed);
        }

        Ok(Frame {
            dst: Address::from_bytes(&buf[0..6])?,
            src: Address::from_bytes(&buf[6..12])?,
            ethertype: NetworkEndian::read_u16(&buf[12..14]),
            payload: buf[Self::HEADER_LEN..].to_vec(),
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size());
        buf.extend_from_slice(self.dst.as_bytes());
        buf.extend_from_slice(self.src.as_bytes());
        buf.extend_from_slice(&self.ethertype.to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    pub fn size(&self) -> usize {
        Self::HEADER_LEN + self.payload.len()
    }
}
