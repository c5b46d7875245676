#![no_std]
extern crate alloc;
extern crate log;

#[cfg(test)]
extern crate std;

/* transport and network layers of a small tcp/ip stack
*
* nothing in here owns a thread or a clock. every component is driven by explicit calls
* (push, receive, send_datagram, recv_frame, route) and time only moves through `tick`.
* errors on the data path are sticky flags on the byte streams, malformed input is dropped.
*/

pub mod iface;
pub mod reassembler;
pub mod router;
pub mod stream;
pub mod tcp;
pub mod utils;


pub use wire;

use core::fmt;
use core::result::Result as CoreResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    // bad or unsupported bytes on the wire
    Wire(wire::Error),
    // well formed, but not addressed to us
    Ignored,
    // route prefixes are at most 32 bits long
    InvalidPrefixLength(u8),
    // route points at an interface the router does not have
    NoSuchInterface(usize),
}

impl From<wire::Error> for Error {
    fn from(err: wire::Error) -> Self {
        Error::Wire(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Wire(err) => write!(f, "{}", err),
            Error::Ignored => write!(f, "not addressed to this interface"),
            Error::InvalidPrefixLength(len) => write!(f, "invalid prefix length /{}", len),
            Error::NoSuchInterface(index) => write!(f, "no interface with index {}", index),
        }
    }
}

pub type Result<T> = CoreResult<T, Error>;
