use core::fmt;

use super::registers::{EVENT_BASES, EVENT_LEN};

pub const EVENT_BYTES: usize = EVENT_LEN * EVENT_BASES.len();

/// set of event bits from both shadow registers, the second register's bits
/// start at `8 * EVENT_LEN`
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct EventSet {
    bits: [u8; EVENT_BYTES],
}

impl EventSet {
    pub fn from_bytes(bits: [u8; EVENT_BYTES]) -> Self {
        Self { bits }
    }

    pub fn as_bytes(&self) -> &[u8; EVENT_BYTES] {
        &self.bits
    }

    pub fn contains(&self, bit: usize) -> bool {
        bit < EVENT_BYTES * 8 && self.bits[bit / 8] & (1 << (bit % 8)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..EVENT_BYTES * 8).filter(|&bit| self.contains(bit))
    }
}

impl fmt::Debug for EventSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
