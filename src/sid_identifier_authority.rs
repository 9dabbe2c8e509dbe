use core::fmt::{self, Display};

/// The 48-bit identifier authority of a SID, stored big-endian as on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SidIdentifierAuthority {
    /// Big-endian authority bytes.
    pub value: [u8; 6],
}

impl SidIdentifierAuthority {
    /// `S-1-0`
    pub const NULL_AUTHORITY: Self = Self::new([0, 0, 0, 0, 0, 0]);
    /// `S-1-1`
    pub const WORLD_AUTHORITY: Self = Self::new([0, 0, 0, 0, 0, 1]);
    /// `S-1-2`
    pub const LOCAL_AUTHORITY: Self = Self::new([0, 0, 0, 0, 0, 2]);
    /// `S-1-3`
    pub const CREATOR_AUTHORITY: Self = Self::new([0, 0, 0, 0, 0, 3]);
    /// `S-1-4`
    pub const NON_UNIQUE_AUTHORITY: Self = Self::new([0, 0, 0, 0, 0, 4]);
    /// `S-1-5`
    pub const NT_AUTHORITY: Self = Self::new([0, 0, 0, 0, 0, 5]);
    /// `S-1-9`
    pub const RESOURCE_MANAGER_AUTHORITY: Self = Self::new([0, 0, 0, 0, 0, 9]);
    /// `S-1-15`
    pub const APP_PACKAGE_AUTHORITY: Self = Self::new([0, 0, 0, 0, 0, 15]);
    /// `S-1-16`
    pub const MANDATORY_LABEL_AUTHORITY: Self = Self::new([0, 0, 0, 0, 0, 16]);
    /// `S-1-18`
    pub const AUTHENTICATION_AUTHORITY: Self = Self::new([0, 0, 0, 0, 0, 18]);
    /// `S-1-19`
    pub const PROCESS_TRUST_AUTHORITY: Self = Self::new([0, 0, 0, 0, 0, 19]);

    /// Wraps big-endian authority bytes.
    #[inline]
    #[must_use]
    pub const fn new(value: [u8; 6]) -> Self {
        Self { value }
    }

    /// Builds an authority from the low 48 bits of `value`.
    #[inline]
    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        let bytes = value.to_be_bytes();
        Self::new([bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]])
    }

    /// The authority as an integer.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        let v = self.value;
        u64::from_be_bytes([0, 0, v[0], v[1], v[2], v[3], v[4], v[5]])
    }
}

impl From<[u8; 6]> for SidIdentifierAuthority {
    #[inline]
    fn from(value: [u8; 6]) -> Self {
        Self { value }
    }
}

impl From<SidIdentifierAuthority> for [u8; 6] {
    #[inline]
    fn from(value: SidIdentifierAuthority) -> Self {
        value.value
    }
}

impl Display for SidIdentifierAuthority {
    /// Decimal when the value fits in 32 bits, `0x`-prefixed hex otherwise.
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.as_u64();
        if value <= 0xFFFF_FFFF {
            write!(f, "{value}")
        } else {
            write!(f, "0x{value:X}")
        }
    }
}
