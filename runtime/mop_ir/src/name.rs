//! Member names.
//!
//! Method, property and field names are interned once when a member is
//! declared. Dispatch tables key their overload lists by [`Name`], so a call
//! site resolves its name text once and every later lookup is an integer
//! compare.

use std::fmt;

/// Handle to a string in a [`StringInterner`](crate::StringInterner).
///
/// The high 4 bits select the interner shard, the low 28 bits the slot in
/// that shard. `Name::EMPTY` is the empty string, pre-interned in shard 0.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    pub const EMPTY: Name = Name(0);

    /// Slots per shard.
    pub const MAX_LOCAL: u32 = 0x0FFF_FFFF;

    pub const NUM_SHARDS: usize = 16;

    const SHARD_SHIFT: u32 = 28;

    #[inline]
    pub(crate) const fn new(shard: u32, local: u32) -> Self {
        debug_assert!((shard as usize) < Self::NUM_SHARDS);
        debug_assert!(local <= Self::MAX_LOCAL);
        Name((shard << Self::SHARD_SHIFT) | local)
    }

    #[inline]
    pub const fn shard(self) -> usize {
        (self.0 >> Self::SHARD_SHIFT) as usize
    }

    #[inline]
    pub const fn local(self) -> usize {
        (self.0 & Self::MAX_LOCAL) as usize
    }
}

/// `#shard.slot`, as it shows up in table dumps.
impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.shard(), self.local())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_and_slot_are_packed() {
        let name = Name::new(5, 1234);
        assert_eq!((name.shard(), name.local()), (5, 1234));
        assert_eq!(format!("{name:?}"), "#5.1234");

        let last = Name::new(15, Name::MAX_LOCAL);
        assert_eq!(last.shard(), 15);
        assert_eq!(last.local(), Name::MAX_LOCAL as usize);
    }

    #[test]
    fn test_empty_is_default() {
        assert_eq!(Name::default(), Name::EMPTY);
        assert_eq!((Name::EMPTY.shard(), Name::EMPTY.local()), (0, 0));
    }
}
