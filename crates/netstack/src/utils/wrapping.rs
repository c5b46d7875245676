use core::fmt;
use core::ops::Add;

const BASE: u64 = 1 << 32;
const HALF: u64 = 1 << 31;

/// A 32-bit sequence number: an absolute 64-bit stream index taken modulo 2^32,
/// offset by a per-connection zero point (the ISN).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Wrap32(u32);

impl Wrap32 {
    pub const fn new(raw: u32) -> Self {
        Wrap32(raw)
    }

    pub fn raw_value(&self) -> u32 {
        self.0
    }

    pub fn wrap(n: u64, zero_point: Wrap32) -> Wrap32 {
        Wrap32((n as u32).wrapping_add(zero_point.0))
    }

    /// The absolute value closest to `checkpoint` that wraps to `self`.
    ///
    /// Exactly half-way candidates resolve to the upper one; results never go below zero
    /// or above `u64::MAX`.
    pub fn unwrap(&self, zero_point: Wrap32, checkpoint: u64) -> u64 {
        let offset = self.0.wrapping_sub(zero_point.0) as u64;
        let candidate = (checkpoint & !(BASE - 1)) | offset;

        if candidate > checkpoint && candidate - checkpoint > HALF && candidate >= BASE {
            candidate - BASE
        } else if candidate < checkpoint
            && checkpoint - candidate > HALF
            && candidate <= u64::MAX - BASE
        {
            candidate + BASE
        } else {
            candidate
        }
    }
}

impl Add<u32> for Wrap32 {
    type Output = Wrap32;

    fn add(self, rhs: u32) -> Wrap32 {
        Wrap32(self.0.wrapping_add(rhs))
    }
}

impl fmt::Display for Wrap32 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
