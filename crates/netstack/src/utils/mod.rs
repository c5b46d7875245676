pub mod arp_cache;
pub mod wrapping;

pub use self::arp_cache::{ArpCache, Timestamp};
pub use self::wrapping::Wrap32;
