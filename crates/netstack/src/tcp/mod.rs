pub mod message;
pub mod peer;
pub mod receiver;
pub mod segment;
pub mod sender;

pub use self::message::{TcpReceiverMessage, TcpSenderMessage};
pub use self::peer::TcpPeer;
pub use self::receiver::TcpReceiver;
pub use self::segment::TcpSegment;
pub use self::sender::TcpSender;

use crate::utils::Wrap32;

/// Per-connection knobs, fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TcpConfig {
    // our initial sequence number
    pub isn: Wrap32,
    // initial retransmission timeout
    pub rt_timeout_ms: u64,
    pub send_capacity: u64,
    pub recv_capacity: u64,
    pub max_payload_size: usize,
    // consecutive retransmissions a peer tolerates before resetting the connection
    pub max_retx_attempts: u64,
}

impl TcpConfig {
    pub const DEFAULT_CAPACITY: u64 = 64000;
    pub const MAX_PAYLOAD_SIZE: usize = 1000;
    pub const TIMEOUT_DEFAULT_MS: u64 = 1000;
    pub const MAX_RETX_ATTEMPTS: u64 = 8;
}

impl Default for TcpConfig {
    fn default() -> Self {
        TcpConfig {
            isn: Wrap32::new(0),
            rt_timeout_ms: Self::TIMEOUT_DEFAULT_MS,
            send_capacity: Self::DEFAULT_CAPACITY,
            recv_capacity: Self::DEFAULT_CAPACITY,
            max_payload_size: Self::MAX_PAYLOAD_SIZE,
            max_retx_attempts: Self::MAX_RETX_ATTEMPTS,
        }
    }
}
