#![no_std]
extern crate alloc;
extern crate byteorder;

#[cfg(test)]
extern crate std;

/* representation of the link and network layer headers the stack speaks
*
* every packet type owns its payload as a `Vec<u8>` and offers `deserialize` (parse from a raw
* buffer) and `serialize` (back to bytes). headers that carry a checksum compute it on
* serialization and can verify it after parsing.
*/

pub mod arp;
pub mod checksum;
pub mod ethernet;
pub mod ipv4;
pub mod tcp;

use core::fmt;
use core::result::Result as CoreResult;

pub use self::arp::{Operation as ArpOperation, Packet as ArpPacket};
pub use self::ethernet::{Address as EthernetAddress, EtherType, Frame as EthernetFrame};
pub use self::ipv4::{Address as Ipv4Address, Packet as Ipv4Packet, Protocol as Ipv4Protocol};
pub use self::tcp::{Flags as TcpFlags, Packet as TcpPacket};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    // buffer too short or internally inconsistent
    Malformed,
    // well formed, but not something we speak (non-ethernet arp, ip version != 4, ...)
    Unsupported,
    // header checksum mismatch
    Checksum,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Malformed => write!(f, "malformed packet"),
            Error::Unsupported => write!(f, "unsupported packet"),
            Error::Checksum => write!(f, "bad checksum"),
        }
    }
}

pub type Result<T> = CoreResult<T, Error>;
