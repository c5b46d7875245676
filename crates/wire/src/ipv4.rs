use alloc::vec::Vec;
use byteorder::{ByteOrder, NetworkEndian};

use core::fmt::{Display, Formatter, Result as FmtResult};
use core::result::Result as StdResult;
use core::str::FromStr;

use crate::checksum::internet_checksum;
use crate::{Error, Result};

// https://en.wikipedia.org/wiki/IPv4
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 4]);

impl Address {
    pub const UNSPECIFIED: Address = Address([0; 4]);

    pub const fn new(addr: [u8; 4]) -> Address {
        Address(addr)
    }

    pub fn from_bytes(addr: &[u8]) -> Result<Address> {
        let bytes: [u8; 4] = addr.try_into().map_err(|_| Error::Malformed)?;
        Ok(Address(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_u32(addr: u32) -> Address {
        Address(addr.to_be_bytes())
    }

    pub fn as_u32(&self) -> u32 {
        NetworkEndian::read_u32(&self.0[..])
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

// NOTE: str must be in format "A.B.C.D"
impl FromStr for Address {
    type Err = ();

    fn from_str(addr: &str) -> StdResult<Address, Self::Err> {
        let mut bytes = [0u8; 4];
        let mut tokens = addr.split('.');

        for byte in bytes.iter_mut() {
            *byte = tokens.next().ok_or(())?.parse::<u8>().map_err(|_| ())?;
        }

        if tokens.next().is_some() {
            return Err(());
        }

        Ok(Address(bytes))
    }
}

#[allow(non_snake_case)]
pub mod Protocols {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Icmp,
    Tcp,
    Udp,
    // carried through untouched, a router does not care what it forwards
    Unknown(u8),
}

impl From<u8> for Protocol {
    fn from(proto: u8) -> Protocol {
        match proto {
            Protocols::ICMP => Protocol::Icmp,
            Protocols::TCP => Protocol::Tcp,
            Protocols::UDP => Protocol::Udp,
            other => Protocol::Unknown(other),
        }
    }
}

impl From<Protocol> for u8 {
    fn from(proto: Protocol) -> u8 {
        match proto {
            Protocol::Icmp => Protocols::ICMP,
            Protocol::Tcp => Protocols::TCP,
            Protocol::Udp => Protocols::UDP,
            Protocol::Unknown(other) => other,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub ihl: u8,          // header length in 32-bit words, min value = 5
    pub dscp: u8,         // type of service, full 8 bits
    pub id: u16,          // identification for frag
    pub flags: u8,        // 3 bits
    pub frag_offset: u16, // lower 13 bits used
    pub ttl: u8,
    pub protocol: Protocol,
    pub checksum: u16,
    pub src_addr: Address,
    pub dst_addr: Address,
    pub options: Vec<u8>, // (ihl - 5) * 4 bytes
    pub payload: Vec<u8>,
}

impl Packet {
    pub const VERSION: u8 = 4;
    pub const MIN_HEADER_LEN: usize = 20;
    pub const DEFAULT_TTL: u8 = 64;
    // the total length field is 16 bits wide
    pub const MAX_TOTAL_LEN: usize = u16::MAX as usize;

    pub fn new(src_addr: Address, dst_addr: Address, protocol: Protocol, payload: Vec<u8>) -> Self {
        let mut packet = Self {
            ihl: (Self::MIN_HEADER_LEN / 4) as u8,
            dscp: 0,
            id: 0,
            flags: 0,
            frag_offset: 0,
            ttl: Self::DEFAULT_TTL,
            protocol,
            checksum: 0,
            src_addr,
            dst_addr,
            options: Vec::new(),
            payload,
        };
        packet.compute_checksum();
        packet
    }

    pub fn header_len(&self) -> usize {
        (self.ihl as usize) * 4
    }

    // header + payload; only packets up to MAX_TOTAL_LEN can be serialized faithfully
    pub fn total_len(&self) -> usize {
        self.header_len() + self.payload.len()
    }

    pub fn fits_total_len(&self) -> bool {
        self.total_len() <= Self::MAX_TOTAL_LEN
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::MIN_HEADER_LEN {
            return Err(Error::Malformed);
        }

        let version = buf[0] >> 4;
        let ihl = buf[0] & 0x0F;

        if version != Self::VERSION {
            return Err(Error::Unsupported);
        }
        if ihl < 5 {
            return Err(Error::Malformed);
        }

        let header_len = (ihl as usize) * 4;
        let total_len = NetworkEndian::read_u16(&buf[2..4]) as usize;

        // anything past total_len is link-layer padding
        if total_len < header_len || total_len > buf.len() {
            return Err(Error::Malformed);
        }

        let flags_fragment = NetworkEndian::read_u16(&buf[6..8]);

        Ok(Packet {
            ihl,
            dscp: buf[1],
            id: NetworkEndian::read_u16(&buf[4..6]),
            flags: (flags_fragment >> 13) as u8,
            frag_offset: flags_fragment & 0x1FFF,
            ttl: buf[8],
            protocol: Protocol::from(buf[9]),
            checksum: NetworkEndian::read_u16(&buf[10..12]),
            src_addr: Address::from_bytes(&buf[12..16])?,
            dst_addr: Address::from_bytes(&buf[16..20])?,
            options: buf[Self::MIN_HEADER_LEN..header_len].to_vec(),
            payload: buf[header_len..total_len].to_vec(),
        })
    }

    // header bytes exactly as they go on the wire, using the stored checksum
    fn header(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.header_len());

        buf.push((Self::VERSION << 4) | (self.ihl & 0x0F));
        buf.push(self.dscp);
        buf.extend_from_slice(&(self.total_len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.id.to_be_bytes());
        let flags_frag = ((self.flags as u16) << 13) | (self.frag_offset & 0x1FFF);
        buf.extend_from_slice(&flags_frag.to_be_bytes());
        buf.push(self.ttl);
        buf.push(u8::from(self.protocol));
        buf.extend_from_slice(&self.checksum.to_be_bytes());
        buf.extend_from_slice(self.src_addr.as_bytes());
        buf.extend_from_slice(self.dst_addr.as_bytes());
        buf.extend_from_slice(&self.options);

        buf
    }

    // must be called again after touching any header field (ttl, addresses, ...)
    pub fn compute_checksum(&mut self) {
        self.checksum = 0;
        self.checksum = internet_checksum(&self.header());
    }

    pub fn is_valid_checksum(&self) -> bool {
        internet_checksum(&self.header()) == 0
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = self.header();
        buf.extend_from_slice(&self.payload);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn address_parsing() {
        assert_eq!("10.0.0.5".parse(), Ok(Address::new([10, 0, 0, 5])));
        assert_eq!("10.0.0".parse::<Address>(), Err(()));
        assert_eq!("10.0.0.5.1".parse::<Address>(), Err(()));
        assert_eq!("10.0.0.256".parse::<Address>(), Err(()));
        assert_eq!(Address::from_u32(0x0a000005), Address::new([10, 0, 0, 5]));
        assert_eq!(Address::new([192, 168, 1, 1]).as_u32(), 0xc0a80101);
    }

    #[test]
    fn total_len_limit() {
        let src = Address::new([10, 0, 0, 1]);
        let dst = Address::new([10, 0, 0, 2]);

        let largest = Packet::new(src, dst, Protocol::Udp, vec![0; Packet::MAX_TOTAL_LEN - 20]);
        assert!(largest.fits_total_len());
        let raw = largest.serialize();
        assert_eq!(NetworkEndian::read_u16(&raw[2..4]) as usize, raw.len());

        let oversize = Packet::new(src, dst, Protocol::Udp, vec![0; Packet::MAX_TOTAL_LEN - 19]);
        assert!(!oversize.fits_total_len());
    }

    #[test]
    fn serialized_packet_parses_with_valid_checksum() {
        let packet = Packet::new(
            Address::new([10, 0, 0, 1]),
            Address::new([10, 0, 0, 2]),
            Protocol::Unknown(144),
            vec![1, 2, 3, 4, 5],
        );
        assert!(packet.is_valid_checksum());

        let raw = packet.serialize();
        assert_eq!(raw.len(), 25);
        assert_eq!(raw[0], 0x45);
        assert_eq!(internet_checksum(&raw[..20]), 0);

        let parsed = Packet::deserialize(&raw).unwrap();
        assert!(parsed.is_valid_checksum());
        assert_eq!(parsed, packet);
    }

    #[test]
    fn ttl_change_requires_new_checksum() {
        let mut packet = Packet::new(
            Address::new([1, 1, 1, 1]),
            Address::new([2, 2, 2, 2]),
            Protocol::Udp,
            vec![],
        );
        packet.ttl -= 1;
        assert!(!packet.is_valid_checksum());
        packet.compute_checksum();
        assert!(packet.is_valid_checksum());
    }

    #[test]
    fn trailing_padding_is_ignored() {
        let packet = Packet::new(
            Address::new([1, 1, 1, 1]),
            Address::new([2, 2, 2, 2]),
            Protocol::Tcp,
            vec![9],
        );
        let mut raw = packet.serialize();
        raw.resize(46, 0);
        assert_eq!(Packet::deserialize(&raw).unwrap().payload, vec![9]);
    }

    #[test]
    fn rejects_bad_headers() {
        let packet = Packet::new(Address::UNSPECIFIED, Address::UNSPECIFIED, Protocol::Icmp, vec![]);
        let raw = packet.serialize();

        assert_eq!(Packet::deserialize(&raw[..19]), Err(Error::Malformed));

        let mut v6 = raw.clone();
        v6[0] = 0x65;
        assert_eq!(Packet::deserialize(&v6), Err(Error::Unsupported));

        let mut long = raw.clone();
        long[3] = 40;
        assert_eq!(Packet::deserialize(&long), Err(Error::Malformed));
    }
}
