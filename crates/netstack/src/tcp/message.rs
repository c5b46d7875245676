use alloc::vec::Vec;

use crate::utils::Wrap32;

/// What the sending half of a connection puts on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TcpSenderMessage {
    pub seqno: Wrap32,
    pub syn: bool,
    pub payload: Vec<u8>,
    pub fin: bool,
    pub rst: bool,
}

impl TcpSenderMessage {
    /// Sequence numbers occupied: SYN and FIN count one each, RST counts none.
    pub fn sequence_length(&self) -> u64 {
        self.syn as u64 + self.payload.len() as u64 + self.fin as u64
    }
}

/// What the receiving half sends back: acknowledgment and flow-control window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TcpReceiverMessage {
    pub ackno: Option<Wrap32>,
    pub window_size: u16,
    pub rst: bool,
}
