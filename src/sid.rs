//! Owned, fixed-capacity Windows Security Identifier (SID).
//!
//! A [`Sid`] is a small `Copy` value: the 48-bit identifier authority plus up to
//! fifteen 32-bit sub-authorities kept inline. It converts losslessly to and from the
//! `S-R-A-S1-...-Sn` string form and the binary layout
//! `revision:1 | count:1 | authority:6 (BE) | sub-authorities: count x 4 (LE)`.

use core::cmp::Ordering;
use core::fmt::{self, Debug, Display};
use core::hash::{Hash, Hasher};
use core::str::FromStr;

pub use parsing::InvalidSidFormat;
pub use parsing::MAX_SUBAUTHORITY_COUNT;
pub use parsing::MIN_SUBAUTHORITY_COUNT;
use parsing::SidComponents;

use crate::SidIdentifierAuthority;
use crate::error::{Error, Result};
use crate::utils::{Reader, sub_authority_size_guard};

/// Size of the fixed SID header (revision, count, authority).
pub const SID_HEAD_SIZE: usize = 8;

/// Windows Security Identifier.
///
/// # Invariants
/// - `sub_authority_count` is in `0..=15`.
/// - Unused trailing sub-authority slots are zero.
///
/// # Examples
/// ```rust
/// # use win_security_descriptor::{Sid, SidIdentifierAuthority};
/// let sid = Sid::try_new(SidIdentifierAuthority::NT_AUTHORITY, [32, 544]).unwrap();
/// assert_eq!(sid.to_string(), "S-1-5-32-544");
/// assert_eq!(sid.to_bytes(), [1, 2, 0, 0, 0, 0, 0, 5, 32, 0, 0, 0, 32, 2, 0, 0]);
/// ```
#[derive(Clone, Copy)]
pub struct Sid {
    identifier_authority: SidIdentifierAuthority,
    sub_authority_count: u8,
    sub_authority: [u32; MAX_SUBAUTHORITY_COUNT as usize],
}

impl Sid {
    /// The only SID revision.
    pub const REVISION: u8 = parsing::SID_REVISION;

    /// Builds a SID in a `const` context.
    ///
    /// Sub-authorities beyond the fifteenth are ignored; the `sid!` macro validates
    /// the count before expanding to this call.
    #[must_use]
    #[inline]
    pub const fn from_const_parts(
        identifier_authority: SidIdentifierAuthority,
        sub_authority: &[u32],
    ) -> Self {
        let mut buf = [0u32; MAX_SUBAUTHORITY_COUNT as usize];
        let mut i = 0;
        while i < sub_authority.len() && i < buf.len() {
            buf[i] = sub_authority[i];
            i += 1;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "i is bounded by MAX_SUBAUTHORITY_COUNT"
        )]
        let sub_authority_count = i as u8;
        Self {
            identifier_authority,
            sub_authority_count,
            sub_authority: buf,
        }
    }

    /// Creates a SID from parts, returning `None` when more than 15 sub-authorities are given.
    #[must_use]
    #[inline]
    pub fn try_new<I: Into<SidIdentifierAuthority>, S: AsRef<[u32]>>(
        identifier_authority: I,
        sub_authority: S,
    ) -> Option<Self> {
        let sub_authority = sub_authority.as_ref();
        sub_authority_size_guard(sub_authority.len())
            .then(|| Self::from_const_parts(identifier_authority.into(), sub_authority))
    }

    /// SID revision, always 1.
    #[inline]
    #[must_use]
    pub const fn revision(&self) -> u8 {
        Self::REVISION
    }

    /// The identifier authority.
    #[inline]
    #[must_use]
    pub const fn identifier_authority(&self) -> SidIdentifierAuthority {
        self.identifier_authority
    }

    /// Number of sub-authorities.
    #[inline]
    #[must_use]
    pub const fn sub_authority_count(&self) -> u8 {
        self.sub_authority_count
    }

    /// The sub-authorities in order.
    #[inline]
    #[must_use]
    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authority[..usize::from(self.sub_authority_count)]
    }

    /// The last sub-authority (relative identifier), if any.
    #[inline]
    #[must_use]
    pub fn rid(&self) -> Option<u32> {
        self.sub_authorities().last().copied()
    }

    /// This SID with `rid` appended, or `None` if it already has 15 sub-authorities.
    #[inline]
    #[must_use]
    pub fn with_rid(&self, rid: u32) -> Option<Self> {
        let count = usize::from(self.sub_authority_count);
        let mut out = *self;
        *out.sub_authority.get_mut(count)? = rid;
        out.sub_authority_count += 1;
        Some(out)
    }

    /// True when `self` has the same authority as `other` and its sub-authorities are
    /// a strict prefix of `other`'s (e.g. a domain SID and an account of that domain).
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.identifier_authority == other.identifier_authority
            && self.sub_authority_count < other.sub_authority_count
            && other.sub_authorities().starts_with(self.sub_authorities())
    }

    /// Length of the binary form: `8 + 4 * count`.
    #[inline]
    #[must_use]
    pub const fn binary_len(&self) -> usize {
        SID_HEAD_SIZE + 4 * self.sub_authority_count as usize
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let offset = reader.offset();
        let available = reader.remaining();
        if available < SID_HEAD_SIZE {
            return Err(Error::TruncatedBuffer {
                offset,
                needed: SID_HEAD_SIZE,
                available,
            });
        }
        let revision = reader.u8()?;
        if revision != Self::REVISION {
            return Err(Error::InvalidRevision { offset, revision });
        }
        let count = reader.u8()?;
        if !sub_authority_size_guard(usize::from(count)) {
            return Err(Error::TooManySubAuthorities { offset, count });
        }
        let needed = SID_HEAD_SIZE + 4 * usize::from(count);
        if available < needed {
            return Err(Error::TruncatedBuffer {
                offset,
                needed,
                available,
            });
        }
        let identifier_authority = SidIdentifierAuthority::new(reader.array()?);
        let mut sub_authority = [0u32; MAX_SUBAUTHORITY_COUNT as usize];
        for slot in sub_authority.iter_mut().take(usize::from(count)) {
            *slot = reader.u32()?;
        }
        Ok(Self {
            identifier_authority,
            sub_authority_count: count,
            sub_authority,
        })
    }

    /// Parses a binary SID at the start of `buf`, returning it with the bytes consumed.
    ///
    /// # Errors
    /// [`Error::TruncatedBuffer`] when `buf` is shorter than 8 bytes or than the
    /// length implied by the sub-authority count, [`Error::InvalidRevision`] when the
    /// revision byte is not 1, [`Error::TooManySubAuthorities`] when the count exceeds 15.
    #[inline]
    pub fn read_from(buf: &[u8]) -> Result<(Self, usize)> {
        let mut reader = Reader::new(buf);
        let sid = Self::read(&mut reader)?;
        Ok((sid, reader.position()))
    }

    /// Parses a binary SID; bytes after the SID are ignored.
    ///
    /// # Errors
    /// See [`Sid::read_from`].
    ///
    /// # Examples
    /// ```rust
    /// # use win_security_descriptor::{Error, Sid};
    /// let sid = Sid::from_bytes(&[1, 1, 0, 0, 0, 0, 0, 5, 18, 0, 0, 0]).unwrap();
    /// assert_eq!(sid.to_string(), "S-1-5-18");
    /// assert!(matches!(Sid::from_bytes(&[1, 1, 0, 0]), Err(Error::TruncatedBuffer { .. })));
    /// ```
    #[inline]
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        Self::read_from(buf).map(|(sid, _)| sid)
    }

    /// Appends the binary form to `out`.
    #[inline]
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(Self::REVISION);
        out.push(self.sub_authority_count);
        out.extend_from_slice(&self.identifier_authority.value);
        for sub in self.sub_authorities() {
            out.extend_from_slice(&sub.to_le_bytes());
        }
    }

    /// The binary form.
    #[inline]
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.binary_len());
        self.write_to(&mut out);
        out
    }
}

impl Display for Sid {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}-{}", Self::REVISION, self.identifier_authority)?;
        for &sub_auth in self.sub_authorities() {
            write!(f, "-{sub_auth}")?;
        }
        Ok(())
    }
}

impl Debug for Sid {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sid({self})")
    }
}

impl FromStr for Sid {
    type Err = InvalidSidFormat;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components = SidComponents::from_str(s)?;
        Ok(Self::from_const_parts(
            SidIdentifierAuthority::new(components.identifier_authority),
            components.sub_authority.as_slice(),
        ))
    }
}

impl TryFrom<&[u8]> for Sid {
    type Error = Error;

    #[inline]
    fn try_from(value: &[u8]) -> Result<Self> {
        Self::from_bytes(value)
    }
}

impl PartialEq for Sid {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.identifier_authority == other.identifier_authority
            && self.sub_authorities() == other.sub_authorities()
    }
}

impl Eq for Sid {}

impl Hash for Sid {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier_authority.hash(state);
        Hash::hash_slice(self.sub_authorities(), state);
        self.sub_authority_count.hash(state);
    }
}

impl Ord for Sid {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.identifier_authority
            .cmp(&other.identifier_authority)
            .then_with(|| self.sub_authorities().cmp(other.sub_authorities()))
    }
}

impl PartialOrd for Sid {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
pub(crate) mod test {
    use super::*;
    use crate::sid_identifier_authority::test::arb_identifier_authority;
    use proptest::prelude::*;

    pub fn arb_sid() -> impl Strategy<Value = Sid> {
        (
            arb_identifier_authority(),
            proptest::collection::vec(any::<u32>(), 0..=15),
        )
            .prop_map(|(authority, subs)| Sid::try_new(authority, subs).unwrap())
    }

    proptest! {
        #[test]
        fn binary_round_trip(sid in arb_sid()) {
            let bytes = sid.to_bytes();
            prop_assert_eq!(bytes.len(), sid.binary_len());
            prop_assert_eq!(Sid::from_bytes(&bytes).unwrap(), sid);
        }

        #[test]
        fn string_round_trip(sid in arb_sid()) {
            let text = sid.to_string();
            prop_assert!(text.starts_with("S-1-"), "Display doesn't start with S-1- : {}", text);
            prop_assert_eq!(text.parse::<Sid>().unwrap(), sid);
        }

        #[test]
        fn truncated_buffers_never_panic(sid in arb_sid(), cut in 0usize..68) {
            let bytes = sid.to_bytes();
            let cut = cut.min(bytes.len());
            let result = Sid::from_bytes(&bytes[..cut]);
            if cut == bytes.len() {
                prop_assert!(result.is_ok());
            } else {
                let is_truncated = matches!(result, Err(Error::TruncatedBuffer { .. }));
                prop_assert!(is_truncated, "unexpected result {:?}", result);
            }
        }
    }

    #[test]
    fn four_byte_buffer_is_truncated() {
        assert_eq!(
            Sid::from_bytes(&[1, 1, 0, 0]),
            Err(Error::TruncatedBuffer {
                offset: 0,
                needed: 8,
                available: 4
            })
        );
    }

    #[test]
    fn count_larger_than_buffer_is_truncated() {
        let err = Sid::from_bytes(&[1, 2, 0, 0, 0, 0, 0, 5, 32, 0, 0, 0]).unwrap_err();
        assert_eq!(
            err,
            Error::TruncatedBuffer {
                offset: 0,
                needed: 16,
                available: 12
            }
        );
    }

    #[test]
    fn wrong_revision_is_rejected() {
        assert_eq!(
            Sid::from_bytes(&[2, 0, 0, 0, 0, 0, 0, 5]),
            Err(Error::InvalidRevision {
                offset: 0,
                revision: 2
            })
        );
        assert_eq!(
            Sid::from_bytes(&[1, 16, 0, 0, 0, 0, 0, 5]),
            Err(Error::TooManySubAuthorities {
                offset: 0,
                count: 16
            })
        );
    }

    #[test]
    fn ordering_is_authority_then_lexicographic() {
        let a: Sid = "S-1-5-21-1".parse().unwrap();
        let b: Sid = "S-1-5-21-1-0".parse().unwrap();
        let c: Sid = "S-1-5-21-2".parse().unwrap();
        let d: Sid = "S-1-16-0".parse().unwrap();
        let mut sids = vec![d, c, b, a];
        sids.sort();
        assert_eq!(sids, vec![a, b, c, d]);
    }

    #[test]
    fn rid_helpers() {
        let domain: Sid = "S-1-5-21-1-2-3".parse().unwrap();
        let admin = domain.with_rid(500).unwrap();
        assert_eq!(admin.to_string(), "S-1-5-21-1-2-3-500");
        assert_eq!(admin.rid(), Some(500));
        assert!(domain.is_prefix_of(&admin));
        assert!(!admin.is_prefix_of(&domain));
        let full = Sid::try_new(SidIdentifierAuthority::NT_AUTHORITY, [1; 15]).unwrap();
        assert_eq!(full.with_rid(1), None);
    }

    #[test]
    fn test_debug() {
        assert_eq!(format!("{:?}", crate::well_known::NULL), "Sid(S-1-0-0)");
    }
}
