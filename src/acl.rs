//! Access-control lists.
//!
//! An [`Acl`] is an ordered list of [`Ace`]s. Order matters: access checks stop at the first
//! matching deny, so lists are kept in canonical order (explicit deny, explicit allow,
//! inherited deny, inherited allow) by [`Acl::canonicalize_dacl`].
//!
//! Three states are kept apart: no ACL at all (`Option::None` on the descriptor), a *null*
//! ACL ([`Acl::null`], grants everyone everything when used as a DACL) and an empty ACL
//! ([`Acl::new`], grants nothing).

use bitflags::bitflags;
use delegate::delegate;
use log::{debug, trace};

use crate::ace::Ace;
use crate::error::{Error, Result};
use crate::utils::{Reader, patch_u16, put_u16, wire_u16};

/// Revision of ACLs holding only non-object ACEs.
pub const ACL_REVISION: u8 = 2;
/// Revision required as soon as an object ACE is present.
pub const ACL_REVISION_DS: u8 = 4;
/// Size of the ACL header.
pub const ACL_HEADER_SIZE: usize = 8;

bitflags! {
    /// Per-list flags stored in the security descriptor control word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AclFlags: u8 {
        /// Produced by a default mechanism rather than set explicitly.
        const DEFAULTED = 0x01;
        /// Inheritable ACEs from the parent are blocked.
        const PROTECTED = 0x02;
        /// The list was built with automatic inheritance.
        const AUTO_INHERITED = 0x04;
        /// Automatic inheritance is requested for children.
        const AUTO_INHERIT_REQ = 0x08;
    }
}

/// An ordered list of ACEs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Acl {
    revision: u8,
    flags: AclFlags,
    entries: Vec<Ace>,
    null: bool,
}

impl Default for Acl {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Named-field description of an [`Acl`], checked by [`AclConfig::build`].
///
/// ```rust
/// # use win_security_descriptor::{Ace, AceFlags, AclConfig, AclFlags, well_known};
/// let acl = AclConfig {
///     flags: AclFlags::PROTECTED,
///     entries: vec![Ace::allowed(well_known::WORLD, 0x1f01ff, AceFlags::empty())],
///     ..AclConfig::default()
/// }
/// .build()
/// .unwrap();
/// assert_eq!(acl.len(), 1);
///
/// let null_with_entries = AclConfig {
///     null: true,
///     entries: acl.entries().to_vec(),
///     ..AclConfig::default()
/// };
/// assert!(null_with_entries.build().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclConfig {
    /// Explicit revision; derived from the entries when `None`.
    pub revision: Option<u8>,
    /// List flags.
    pub flags: AclFlags,
    /// ACEs in order.
    pub entries: Vec<Ace>,
    /// Build a null ACL.
    pub null: bool,
}

impl AclConfig {
    /// Validates the configuration and builds the list.
    ///
    /// # Errors
    /// [`Error::InvalidAcl`] when a null ACL is given entries, the revision is not 2, 3 or 4,
    /// or object ACEs are combined with a revision below 4.
    #[inline]
    pub fn build(self) -> Result<Acl> {
        if self.null && !self.entries.is_empty() {
            return Err(Error::InvalidAcl("a null ACL cannot hold entries"));
        }
        let needs_ds = self.entries.iter().any(Ace::is_object);
        let revision = match self.revision {
            Some(revision) if !(ACL_REVISION..=ACL_REVISION_DS).contains(&revision) => {
                return Err(Error::InvalidAcl("ACL revision must be 2, 3 or 4"));
            }
            Some(revision) if needs_ds && revision < ACL_REVISION_DS => {
                return Err(Error::InvalidAcl("object ACEs need ACL revision 4"));
            }
            Some(revision) => revision,
            None if needs_ds => ACL_REVISION_DS,
            None => ACL_REVISION,
        };
        Ok(Acl {
            revision,
            flags: self.flags,
            entries: self.entries,
            null: self.null,
        })
    }
}

impl TryFrom<AclConfig> for Acl {
    type Error = Error;

    #[inline]
    fn try_from(config: AclConfig) -> Result<Self> {
        config.build()
    }
}

impl FromIterator<Ace> for Acl {
    #[inline]
    fn from_iter<T: IntoIterator<Item = Ace>>(iter: T) -> Self {
        let mut acl = Self::new();
        acl.entries.extend(iter);
        acl
    }
}

impl<'a> IntoIterator for &'a Acl {
    type Item = &'a Ace;
    type IntoIter = core::slice::Iter<'a, Ace>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Position of an ACE in canonical DACL order.
const fn dacl_group(ace: &Ace) -> u8 {
    match (ace.is_inherited(), ace.is_denied()) {
        (false, true) => 0,
        (false, false) => 1,
        (true, true) => 2,
        (true, false) => 3,
    }
}

const fn sacl_group(ace: &Ace) -> u8 {
    if ace.is_inherited() { 1 } else { 0 }
}

impl Acl {
    /// An empty, non-null list.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            revision: ACL_REVISION,
            flags: AclFlags::empty(),
            entries: Vec::new(),
            null: false,
        }
    }

    /// A null list: present but without any ACE storage.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self {
            revision: ACL_REVISION,
            flags: AclFlags::empty(),
            entries: Vec::new(),
            null: true,
        }
    }

    /// Whether this is a null list.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.null
    }

    /// Revision the list will be written with.
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u8 {
        if self.entries.iter().any(Ace::is_object) {
            self.revision.max(ACL_REVISION_DS)
        } else {
            self.revision
        }
    }

    /// List flags.
    #[inline]
    #[must_use]
    pub const fn flags(&self) -> AclFlags {
        self.flags
    }

    /// Replaces the list flags.
    #[inline]
    pub const fn set_flags(&mut self, flags: AclFlags) {
        self.flags = flags;
    }

    /// ACEs in order.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[Ace] {
        &self.entries
    }

    /// Mutable access to the ACEs, for in-place edits of individual entries.
    #[inline]
    pub fn entries_mut(&mut self) -> &mut [Ace] {
        &mut self.entries
    }

    delegate! {
        to self.entries {
            /// Number of ACEs.
            #[inline]
            #[must_use]
            pub fn len(&self) -> usize;
            /// No ACEs (true for null lists too).
            #[inline]
            #[must_use]
            pub fn is_empty(&self) -> bool;
            /// Iterates over the ACEs in order.
            #[inline]
            pub fn iter(&self) -> core::slice::Iter<'_, Ace>;
            /// The ACE at `index`.
            #[inline]
            #[must_use]
            pub fn get(&self, index: usize) -> Option<&Ace>;
        }
    }

    fn ensure_not_null(&self) -> Result<()> {
        if self.null {
            Err(Error::InvalidAcl("a null ACL cannot hold entries"))
        } else {
            Ok(())
        }
    }

    /// Appends `ace`.
    ///
    /// # Errors
    /// [`Error::InvalidAcl`] on a null list.
    #[inline]
    pub fn add(&mut self, ace: Ace) -> Result<()> {
        self.ensure_not_null()?;
        self.entries.push(ace);
        Ok(())
    }

    /// Inserts `ace` at `index`, clamped to the list length.
    ///
    /// # Errors
    /// [`Error::InvalidAcl`] on a null list.
    #[inline]
    pub fn insert(&mut self, index: usize, ace: Ace) -> Result<()> {
        self.ensure_not_null()?;
        self.entries.insert(index.min(self.entries.len()), ace);
        Ok(())
    }

    /// Appends `aces` to a list already known not to be null.
    pub(crate) fn extend_entries(&mut self, aces: impl IntoIterator<Item = Ace>) {
        debug_assert!(!self.null, "null ACLs hold no entries");
        self.entries.extend(aces);
    }

    /// Removes every ACE matching `pred`, returning how many were removed.
    #[inline]
    pub fn remove_where(&mut self, mut pred: impl FnMut(&Ace) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|ace| !pred(ace));
        before - self.entries.len()
    }

    /// Removes every ACE. A null list stays null.
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn canonicalize_by(&mut self, group: fn(&Ace) -> u8) {
        if self.entries.is_sorted_by_key(group) {
            return;
        }
        // `sort_by_key` is stable, which makes this a stable partition.
        self.entries.sort_by_key(group);
        debug!("reordered {} ACEs into canonical order", self.entries.len());
    }

    /// Reorders the ACEs into explicit deny, explicit allow, inherited deny, inherited
    /// allow. Relative order within each group is kept; non-deny ACEs count as allow.
    ///
    /// ```rust
    /// # use win_security_descriptor::{Ace, AceFlags, Acl, well_known};
    /// let (x, y, z) = (well_known::WORLD, well_known::LOCAL_SYSTEM, well_known::BUILTIN_USERS);
    /// let mut acl: Acl = [
    ///     Ace::allowed(x, 1, AceFlags::empty()),
    ///     Ace::denied(y, 1, AceFlags::INHERITED),
    ///     Ace::denied(z, 1, AceFlags::empty()),
    /// ]
    /// .into_iter()
    /// .collect();
    /// acl.canonicalize_dacl();
    /// let sids: Vec<_> = acl.iter().map(|ace| *ace.sid()).collect();
    /// assert_eq!(sids, [z, x, y]);
    /// ```
    #[inline]
    pub fn canonicalize_dacl(&mut self) {
        self.canonicalize_by(dacl_group);
    }

    /// Moves explicit ACEs before inherited ones, keeping relative order.
    #[inline]
    pub fn canonicalize_sacl(&mut self) {
        self.canonicalize_by(sacl_group);
    }

    /// Whether [`Acl::canonicalize_dacl`] would leave the list unchanged.
    #[inline]
    #[must_use]
    pub fn is_canonical_dacl(&self) -> bool {
        self.entries.is_sorted_by_key(dacl_group)
    }

    /// Whether [`Acl::canonicalize_sacl`] would leave the list unchanged.
    #[inline]
    #[must_use]
    pub fn is_canonical_sacl(&self) -> bool {
        self.entries.is_sorted_by_key(sacl_group)
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let offset = reader.offset();
        let available = reader.remaining();
        if available < ACL_HEADER_SIZE {
            return Err(Error::TruncatedBuffer {
                offset,
                needed: ACL_HEADER_SIZE,
                available,
            });
        }
        let revision = reader.u8()?;
        if !(ACL_REVISION..=ACL_REVISION_DS).contains(&revision) {
            return Err(Error::InvalidRevision { offset, revision });
        }
        let _sbz1 = reader.u8()?;
        let size = usize::from(reader.u16()?);
        let count = reader.u16()?;
        let _sbz2 = reader.u16()?;
        if size < ACL_HEADER_SIZE {
            return Err(Error::InconsistentSize {
                offset,
                declared: size,
                consumed: ACL_HEADER_SIZE,
            });
        }
        if size > available {
            return Err(Error::TruncatedBuffer {
                offset,
                needed: size,
                available,
            });
        }
        let mut body = reader.sub_reader(size - ACL_HEADER_SIZE)?;
        let entries = (0..count)
            .map(|_| Ace::read(&mut body))
            .collect::<Result<Vec<_>>>()?;
        trace!("read ACL with {count} ACEs ({size} bytes) at offset {offset}");
        Ok(Self {
            revision,
            flags: AclFlags::empty(),
            entries,
            null: false,
        })
    }

    /// Parses an ACL at the start of `buf`, returning it with the declared size.
    ///
    /// The result is never null and has empty [`AclFlags`]; both live in the security
    /// descriptor.
    ///
    /// # Errors
    /// [`Error::TruncatedBuffer`], [`Error::InvalidRevision`], [`Error::InconsistentSize`] or
    /// any ACE error.
    #[inline]
    pub fn read_from(buf: &[u8]) -> Result<(Self, usize)> {
        let mut reader = Reader::new(buf);
        let acl = Self::read(&mut reader)?;
        Ok((acl, reader.position()))
    }

    /// Appends the binary form to `out`. A null list is written as an empty one.
    ///
    /// # Errors
    /// [`Error::TooLarge`] when the list does not fit its 16-bit size field. `out` is
    /// left unchanged in that case.
    #[inline]
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        let start = out.len();
        self.write_body(out).inspect_err(|_| out.truncate(start))
    }

    fn write_body(&self, out: &mut Vec<u8>) -> Result<()> {
        let start = out.len();
        out.push(self.revision());
        out.push(0);
        put_u16(out, 0);
        put_u16(out, wire_u16("ACE count", self.entries.len())?);
        put_u16(out, 0);
        for ace in &self.entries {
            ace.write_to(out)?;
        }
        let len = wire_u16("ACL", out.len() - start)?;
        patch_u16(out, start + 2, len);
        Ok(())
    }

    /// The binary form.
    ///
    /// # Errors
    /// [`Error::TooLarge`] when the list does not fit its 16-bit size field.
    #[inline]
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
pub(crate) mod test {
    use super::*;
    use crate::ace::test::arb_ace;
    use crate::ace::{AceFlags, AceKind, ObjectAce};
    use crate::well_known::{BUILTIN_USERS, LOCAL_SYSTEM, WORLD};
    use proptest::prelude::*;

    prop_compose! {
        pub fn arb_acl()(entries in proptest::collection::vec(arb_ace(), 0..6)) -> Acl {
            entries.into_iter().collect()
        }
    }

    fn sids(acl: &Acl) -> Vec<crate::Sid> {
        acl.iter().map(|ace| *ace.sid()).collect()
    }

    proptest! {
        #[test]
        fn dacl_canonicalization_is_idempotent(mut acl in arb_acl()) {
            acl.canonicalize_dacl();
            prop_assert!(acl.is_canonical_dacl());
            let once = acl.clone();
            acl.canonicalize_dacl();
            prop_assert_eq!(acl, once);
        }

        #[test]
        fn canonicalization_only_reorders(acl in arb_acl()) {
            let mut sorted = acl.clone();
            sorted.canonicalize_sacl();
            prop_assert!(sorted.is_canonical_sacl());
            prop_assert_eq!(sorted.len(), acl.len());
            prop_assert!(acl.iter().all(|ace| sorted.iter().any(|other| other == ace)));
        }

        #[test]
        fn binary_round_trip(acl in arb_acl()) {
            let bytes = acl.to_bytes().unwrap();
            let (read, consumed) = Acl::read_from(&bytes).unwrap();
            prop_assert_eq!(consumed, bytes.len());
            prop_assert_eq!(read.entries(), acl.entries());
        }
    }

    #[test]
    fn canonical_dacl_order() {
        let mut acl: Acl = [
            Ace::allowed(WORLD, 1, AceFlags::empty()),
            Ace::denied(LOCAL_SYSTEM, 1, AceFlags::INHERITED),
            Ace::denied(BUILTIN_USERS, 1, AceFlags::empty()),
        ]
        .into_iter()
        .collect();
        assert!(!acl.is_canonical_dacl());
        acl.canonicalize_dacl();
        assert_eq!(sids(&acl), [BUILTIN_USERS, WORLD, LOCAL_SYSTEM]);
        assert!(acl.entries()[2].is_inherited());
    }

    #[test]
    fn sacl_groups_only_by_inheritance() {
        let mut acl: Acl = [
            Ace::audit(WORLD, 1, AceFlags::INHERITED),
            Ace::audit(LOCAL_SYSTEM, 1, AceFlags::FAILED_ACCESS),
            Ace::new(AceFlags::empty(), 1, AceKind::SystemAlarm(BUILTIN_USERS)),
        ]
        .into_iter()
        .collect();
        acl.canonicalize_sacl();
        assert_eq!(sids(&acl), [LOCAL_SYSTEM, BUILTIN_USERS, WORLD]);
    }

    #[test]
    fn null_acl_rejects_entries() {
        let mut acl = Acl::null();
        assert!(acl.add(Ace::allowed(WORLD, 1, AceFlags::empty())).is_err());
        acl.clear();
        assert!(acl.is_null());
        assert_eq!(
            AclConfig {
                null: true,
                entries: vec![Ace::allowed(WORLD, 1, AceFlags::empty())],
                ..AclConfig::default()
            }
            .build(),
            Err(Error::InvalidAcl("a null ACL cannot hold entries"))
        );
    }

    #[test]
    fn revision_follows_object_aces() {
        let mut acl = Acl::new();
        acl.add(Ace::allowed(WORLD, 1, AceFlags::empty())).unwrap();
        assert_eq!(acl.to_bytes().unwrap()[0], ACL_REVISION);
        acl.insert(
            0,
            Ace::new(AceFlags::empty(), 1, AceKind::AccessAllowedObject(ObjectAce::new(WORLD))),
        )
        .unwrap();
        assert_eq!(acl.to_bytes().unwrap()[0], ACL_REVISION_DS);
        assert!(
            AclConfig {
                revision: Some(ACL_REVISION),
                entries: acl.entries().to_vec(),
                ..AclConfig::default()
            }
            .build()
            .is_err()
        );
    }

    #[test]
    fn edits() {
        let mut acl = Acl::new();
        acl.add(Ace::allowed(WORLD, 1, AceFlags::empty())).unwrap();
        acl.add(Ace::denied(WORLD, 2, AceFlags::empty())).unwrap();
        acl.insert(99, Ace::allowed(LOCAL_SYSTEM, 3, AceFlags::empty())).unwrap();
        assert_eq!(acl.remove_where(|ace| *ace.sid() == WORLD), 2);
        assert_eq!(acl.len(), 1);
        acl.clear();
        assert!(acl.is_empty() && !acl.is_null());
    }

    #[test]
    fn malformed_headers() {
        assert!(matches!(
            Acl::read_from(&[2, 0, 8, 0]),
            Err(Error::TruncatedBuffer { needed: 8, .. })
        ));
        assert!(matches!(
            Acl::read_from(&[1, 0, 8, 0, 0, 0, 0, 0]),
            Err(Error::InvalidRevision { revision: 1, .. })
        ));
        assert!(matches!(
            Acl::read_from(&[2, 0, 16, 0, 0, 0, 0, 0]),
            Err(Error::TruncatedBuffer { needed: 16, .. })
        ));
        // Declares one ACE but has no room for it.
        assert!(matches!(
            Acl::read_from(&[2, 0, 8, 0, 1, 0, 0, 0]),
            Err(Error::TruncatedBuffer { offset: 8, .. })
        ));
    }
}
