use wire::{TcpFlags, TcpPacket};

use super::message::{TcpReceiverMessage, TcpSenderMessage};
use crate::utils::Wrap32;

/// Both halves of what one endpoint puts in a single TCP header: its sender's view
/// (seqno, SYN/FIN/RST, payload) and its receiver's view (ackno, window).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TcpSegment {
    pub sender: TcpSenderMessage,
    pub receiver: TcpReceiverMessage,
}

impl TcpSegment {
    pub fn from_packet(packet: &TcpPacket) -> Self {
        let flags = packet.flags;

        let sender = TcpSenderMessage {
            seqno: Wrap32::new(packet.seq_number),
            syn: flags.contains(TcpFlags::SYN),
            payload: packet.payload.clone(),
            fin: flags.contains(TcpFlags::FIN),
            rst: flags.contains(TcpFlags::RST),
        };

        let receiver = TcpReceiverMessage {
            ackno: flags
                .contains(TcpFlags::ACK)
                .then(|| Wrap32::new(packet.ack_number)),
            window_size: packet.window_size,
            rst: flags.contains(TcpFlags::RST),
        };

        TcpSegment { sender, receiver }
    }

    pub fn into_packet(self, src_port: u16, dst_port: u16) -> TcpPacket {
        let mut flags = TcpFlags::empty();
        flags.set(TcpFlags::SYN, self.sender.syn);
        flags.set(TcpFlags::FIN, self.sender.fin);
        flags.set(TcpFlags::RST, self.sender.rst || self.receiver.rst);
        flags.set(TcpFlags::ACK, self.receiver.ackno.is_some());

        TcpPacket {
            src_port,
            dst_port,
            seq_number: self.sender.seqno.raw_value(),
            ack_number: self.receiver.ackno.map_or(0, |ackno| ackno.raw_value()),
            flags,
            window_size: self.receiver.window_size,
            urgent_ptr: 0,
            payload: self.sender.payload,
        }
    }

    pub fn sequence_length(&self) -> u64 {
        self.sender.sequence_length()
    }
}
