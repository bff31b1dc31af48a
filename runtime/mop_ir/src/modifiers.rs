//! Member modifier flags.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Flags attached to every method and constructor descriptor.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct Modifiers: u8 {
        /// Public member.
        const PUBLIC = 1 << 0;
        /// Protected member.
        const PROTECTED = 1 << 1;
        /// Private member.
        const PRIVATE = 1 << 2;
        /// Static member: invoked without a receiver.
        const STATIC = 1 << 3;
        /// Registered after the type was defined.
        const EXTENSION = 1 << 4;
    }
}

impl Modifiers {
    /// Visibility tier. Members with no visibility flag are public.
    pub fn visibility(self) -> Visibility {
        if self.contains(Self::PRIVATE) {
            Visibility::Private
        } else if self.contains(Self::PROTECTED) {
            Visibility::Protected
        } else {
            Visibility::Public
        }
    }

    #[inline]
    pub fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }

    #[inline]
    pub fn is_extension(self) -> bool {
        self.contains(Self::EXTENSION)
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::PUBLIC
    }
}

/// Visibility tier of a member.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_public_instance() {
        let m = Modifiers::default();
        assert_eq!(m.visibility(), Visibility::Public);
        assert!(!m.is_static());
        assert!(!m.is_extension());
    }

    #[test]
    fn test_private_wins_over_public() {
        let m = Modifiers::PUBLIC | Modifiers::PRIVATE;
        assert_eq!(m.visibility(), Visibility::Private);
    }

    #[test]
    fn test_flags_without_visibility_are_public() {
        assert_eq!(Modifiers::STATIC.visibility(), Visibility::Public);
        assert_eq!(
            (Modifiers::PROTECTED | Modifiers::STATIC).visibility(),
            Visibility::Protected
        );
    }
}
