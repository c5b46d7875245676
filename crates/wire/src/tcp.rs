use alloc::vec::Vec;
use bitflags::bitflags;
use byteorder::{ByteOrder, NetworkEndian};

use super::Ipv4Address;
use crate::checksum::{fold, sum_words};
use crate::ipv4::Protocols;
use crate::{Error, Result};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Flags: u8 {
        const FIN = 0x01;
        const SYN = 0x02;
        const RST = 0x04;
        const PSH = 0x08;
        const ACK = 0x10;
        const URG = 0x20;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_number: u32,
    pub ack_number: u32,
    pub flags: Flags,
    pub window_size: u16,
    pub urgent_ptr: u16,
    pub payload: Vec<u8>,
}

impl Packet {
    pub const HEADER_LEN: usize = 20;

    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::HEADER_LEN {
            return Err(Error::Malformed);
        }

        // options are skipped, not kept
        let data_offset = buf[12] >> 4;
        if data_offset < 5 {
            return Err(Error::Malformed);
        }

        let header_len = (data_offset as usize) * 4;
        if buf.len() < header_len {
            return Err(Error::Malformed);
        }

        Ok(Packet {
            src_port: NetworkEndian::read_u16(&buf[0..2]),
            dst_port: NetworkEndian::read_u16(&buf[2..4]),
            seq_number: NetworkEndian::read_u32(&buf[4..8]),
            ack_number: NetworkEndian::read_u32(&buf[8..12]),
            flags: Flags::from_bits_truncate(buf[13]),
            window_size: NetworkEndian::read_u16(&buf[14..16]),
            urgent_ptr: NetworkEndian::read_u16(&buf[18..20]),
            payload: buf[header_len..].to_vec(),
        })
    }

    // the checksum covers a pseudo header, so the enclosing addresses are needed here
    pub fn serialize(&self, src_ip: Ipv4Address, dst_ip: Ipv4Address) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::HEADER_LEN + self.payload.len());

        buf.extend_from_slice(&self.src_port.to_be_bytes());
        buf.extend_from_slice(&self.dst_port.to_be_bytes());
        buf.extend_from_slice(&self.seq_number.to_be_bytes());
        buf.extend_from_slice(&self.ack_number.to_be_bytes());
        buf.push(((Self::HEADER_LEN / 4) as u8) << 4);
        buf.push(self.flags.bits());
        buf.extend_from_slice(&self.window_size.to_be_bytes());
        buf.extend_from_slice(&[0, 0]); // checksum placeholder
        buf.extend_from_slice(&self.urgent_ptr.to_be_bytes());
        buf.extend_from_slice(&self.payload);

        let checksum = Self::checksum(src_ip, dst_ip, &buf);
        NetworkEndian::write_u16(&mut buf[16..18], checksum);

        buf
    }

    // true if `segment` (as received, checksum included) is intact
    pub fn verify_checksum(src_ip: Ipv4Address, dst_ip: Ipv4Address, segment: &[u8]) -> bool {
        Self::checksum(src_ip, dst_ip, segment) == 0
    }

    fn checksum(src_ip: Ipv4Address, dst_ip: Ipv4Address, segment: &[u8]) -> u16 {
        let mut pseudo_header = [0u8; 12];
        pseudo_header[0..4].copy_from_slice(src_ip.as_bytes());
        pseudo_header[4..8].copy_from_slice(dst_ip.as_bytes());
        pseudo_header[9] = Protocols::TCP;
        NetworkEndian::write_u16(&mut pseudo_header[10..12], segment.len() as u16);

        let sum = sum_words(segment, sum_words(&pseudo_header, 0));
        !fold(sum)
    }
}
