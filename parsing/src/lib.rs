//! SID string tokenizer shared by `win-security-descriptor` and its `sid!` macro.
use core::str::FromStr;

use arrayvec::ArrayVec;
use thiserror::Error;

/// The only SID revision in use.
pub const SID_REVISION: u8 = 1;
/// Smallest number of sub-authorities a SID may carry.
pub const MIN_SUBAUTHORITY_COUNT: u8 = 0;
/// Largest number of sub-authorities a SID may carry.
pub const MAX_SUBAUTHORITY_COUNT: u8 = 15;
/// Largest identifier authority (48 bits).
pub const MAX_IDENTIFIER_AUTHORITY: u64 = 0xFFFF_FFFF_FFFF;

/// Components of a SID string `S-R-A-S1-...-Sn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidComponents {
    /// The SID revision value, always 1.
    pub revision: u8,
    /// The SID identifier authority value (big-endian).
    pub identifier_authority: [u8; 6],
    /// The SID sub-authority values.
    pub sub_authority: ArrayVec<u32, { MAX_SUBAUTHORITY_COUNT as usize }>,
}

/// Error returned when a SID string is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidSidFormat {
    /// The string does not start with `S-`.
    #[error("SID string must start with \"S-\"")]
    MissingPrefix,
    /// The revision is missing or is not `1`.
    #[error("SID revision is missing or unsupported")]
    InvalidRevision,
    /// The identifier authority is missing, non-numeric or wider than 48 bits.
    #[error("SID identifier authority is missing or invalid")]
    InvalidAuthority,
    /// The sub-authority at `index` is empty or non-numeric.
    #[error("SID sub-authority #{index} is invalid")]
    InvalidSubAuthority {
        /// Zero-based position of the offending sub-authority.
        index: usize,
    },
    /// More than 15 sub-authorities.
    #[error("SID has more than {MAX_SUBAUTHORITY_COUNT} sub-authorities")]
    TooManySubAuthorities,
}

fn parse_authority(text: &str) -> Option<u64> {
    let value = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            u64::from_str_radix(hex, 16).ok()?
        }
        Some(_) => return None,
        None if is_decimal(text) => text.parse::<u64>().ok()?,
        None => return None,
    };
    (value <= MAX_IDENTIFIER_AUTHORITY).then_some(value)
}

fn is_decimal(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

impl FromStr for SidComponents {
    type Err = InvalidSidFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut s_cmp = s.split('-');
        if !s_cmp
            .next()
            .is_some_and(|head| head.eq_ignore_ascii_case("s"))
        {
            return Err(InvalidSidFormat::MissingPrefix);
        }
        let revision = s_cmp
            .next()
            .filter(|r| is_decimal(r))
            .and_then(|r| r.parse::<u8>().ok())
            .filter(|r| *r == SID_REVISION)
            .ok_or(InvalidSidFormat::InvalidRevision)?;

        let authority = s_cmp
            .next()
            .and_then(parse_authority)
            .ok_or(InvalidSidFormat::InvalidAuthority)?;
        let mut identifier_authority = [0u8; 6];
        identifier_authority.copy_from_slice(&authority.to_be_bytes()[2..]);

        let mut sub_authority = ArrayVec::new();
        for (index, item) in s_cmp.enumerate() {
            if !is_decimal(item) {
                return Err(InvalidSidFormat::InvalidSubAuthority { index });
            }
            let item = item
                .parse::<u32>()
                .map_err(|_| InvalidSidFormat::InvalidSubAuthority { index })?;
            sub_authority
                .try_push(item)
                .map_err(|_| InvalidSidFormat::TooManySubAuthorities)?;
        }

        Ok(Self {
            revision,
            identifier_authority,
            sub_authority,
        })
    }
}
