//! Self-relative layout.
//!
//! ```text
//! revision:1 | sbz1:1 | control:2 | owner:4 | group:4 | sacl:4 | dacl:4 | components...
//! ```
//!
//! Offsets are relative to the start of the buffer; 0 means absent.

use log::trace;

use super::{SECURITY_DESCRIPTOR_REVISION, SecurityDescriptor, SecurityDescriptorControl, SidEntry};
use crate::acl::Acl;
use crate::error::{Error, Result};
use crate::utils::{Reader, patch_u32, put_u16, put_u32, wire_u32};
use crate::Sid;

/// Size of the self-relative header.
pub const SECURITY_DESCRIPTOR_HEADER_SIZE: usize = 20;

const OWNER_OFFSET_AT: usize = 4;
const GROUP_OFFSET_AT: usize = 8;
const SACL_OFFSET_AT: usize = 12;
const DACL_OFFSET_AT: usize = 16;

fn read_component<T>(
    buf: &[u8],
    component: &'static str,
    offset: u32,
    read: impl FnOnce(&mut Reader<'_>) -> Result<T>,
) -> Result<Option<T>> {
    if offset == 0 {
        return Ok(None);
    }
    let offset = offset as usize;
    let tail = buf
        .get(offset..)
        .filter(|tail| offset >= SECURITY_DESCRIPTOR_HEADER_SIZE && !tail.is_empty())
        .ok_or(Error::InvalidOffset {
            component,
            offset,
            len: buf.len(),
        })?;
    trace!("reading {component} at offset {offset}");
    read(&mut Reader::with_base(tail, offset)).map(Some)
}

impl SecurityDescriptor {
    /// Parses a self-relative security descriptor.
    ///
    /// A DACL or SACL flagged present with offset 0 becomes a null ACL; a list whose
    /// present bit is clear is absent whatever its offset.
    ///
    /// ```rust
    /// # use win_security_descriptor::{SecurityDescriptor, well_known};
    /// let bytes = [
    ///     1, 0, 0x04, 0x80, 20, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // header
    ///     1, 1, 0, 0, 0, 0, 0, 5, 18, 0, 0, 0, // S-1-5-18
    /// ];
    /// let sd = SecurityDescriptor::from_self_relative(&bytes).unwrap();
    /// assert_eq!(sd.owner.unwrap().sid, well_known::LOCAL_SYSTEM);
    /// assert!(sd.dacl.unwrap().is_null());
    /// ```
    ///
    /// # Errors
    /// [`Error::TruncatedBuffer`] for a short header, [`Error::InvalidRevision`],
    /// [`Error::UnsupportedConstruct`] for absolute-format input, [`Error::InvalidOffset`] when
    /// an offset points outside `buf` or into the header, and any SID, ACL or ACE error.
    #[inline]
    pub fn from_self_relative(buf: &[u8]) -> Result<Self> {
        if buf.len() < SECURITY_DESCRIPTOR_HEADER_SIZE {
            return Err(Error::TruncatedBuffer {
                offset: 0,
                needed: SECURITY_DESCRIPTOR_HEADER_SIZE,
                available: buf.len(),
            });
        }
        let mut header = Reader::new(buf);
        let revision = header.u8()?;
        if revision != SECURITY_DESCRIPTOR_REVISION {
            return Err(Error::InvalidRevision {
                offset: 0,
                revision,
            });
        }
        let sbz1 = header.u8()?;
        let control = SecurityDescriptorControl::from_bits_retain(header.u16()?);
        if !control.contains(SecurityDescriptorControl::SELF_RELATIVE) {
            return Err(Error::UnsupportedConstruct("absolute-format security descriptor"));
        }
        let owner_offset = header.u32()?;
        let group_offset = header.u32()?;
        let sacl_offset = header.u32()?;
        let dacl_offset = header.u32()?;

        let owner = read_component(buf, "owner", owner_offset, Sid::read)?;
        let group = read_component(buf, "group", group_offset, Sid::read)?;
        let dacl = if control.contains(SecurityDescriptorControl::DACL_PRESENT) {
            Some(read_component(buf, "DACL", dacl_offset, Acl::read)?.unwrap_or_else(Acl::null))
        } else {
            None
        };
        let sacl = if control.contains(SecurityDescriptorControl::SACL_PRESENT) {
            Some(read_component(buf, "SACL", sacl_offset, Acl::read)?.unwrap_or_else(Acl::null))
        } else {
            None
        };

        let mut sd = Self {
            owner: owner.map(SidEntry::new),
            group: group.map(SidEntry::new),
            dacl,
            sacl,
            rm_control: control
                .contains(SecurityDescriptorControl::RM_CONTROL_VALID)
                .then_some(sbz1),
            ..Self::new()
        };
        sd.set_control(control);
        Ok(sd)
    }

    /// The self-relative form: header, then owner, group, DACL and SACL back to back.
    ///
    /// Absent components and null lists take no space and get offset 0.
    ///
    /// # Errors
    /// [`Error::TooLarge`] when an ACE or ACL does not fit its 16-bit size field.
    #[inline]
    pub fn to_self_relative(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(SECURITY_DESCRIPTOR_HEADER_SIZE + 64);
        out.push(SECURITY_DESCRIPTOR_REVISION);
        out.push(self.rm_control.unwrap_or(0));
        put_u16(&mut out, (self.control() | SecurityDescriptorControl::SELF_RELATIVE).bits());
        for _ in 0..4 {
            put_u32(&mut out, 0);
        }
        if let Some(owner) = &self.owner {
            let len = wire_u32("security descriptor", out.len())?;
            patch_u32(&mut out, OWNER_OFFSET_AT, len);
            owner.sid.write_to(&mut out);
        }
        if let Some(group) = &self.group {
            let len = wire_u32("security descriptor", out.len())?;
            patch_u32(&mut out, GROUP_OFFSET_AT, len);
            group.sid.write_to(&mut out);
        }
        if let Some(dacl) = self.dacl.as_ref().filter(|acl| !acl.is_null()) {
            let len = wire_u32("security descriptor", out.len())?;
            patch_u32(&mut out, DACL_OFFSET_AT, len);
            dacl.write_to(&mut out)?;
        }
        if let Some(sacl) = self.sacl.as_ref().filter(|acl| !acl.is_null()) {
            let len = wire_u32("security descriptor", out.len())?;
            patch_u32(&mut out, SACL_OFFSET_AT, len);
            sacl.write_to(&mut out)?;
        }
        Ok(out)
    }
}

impl TryFrom<&[u8]> for SecurityDescriptor {
    type Error = Error;

    #[inline]
    fn try_from(value: &[u8]) -> Result<Self> {
        Self::from_self_relative(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
mod test {
    use super::*;
    use crate::acl::AclFlags;
    use crate::acl::test::arb_acl;
    use crate::ace::{Ace, AceFlags};
    use crate::sid::test::arb_sid;
    use crate::well_known::{BUILTIN_ADMINISTRATORS, LOCAL_SYSTEM, WORLD};
    use proptest::prelude::*;

    fn arb_list() -> impl Strategy<Value = Option<Acl>> {
        prop_oneof![
            Just(None),
            Just(Some(Acl::null())),
            (arb_acl(), any::<u8>()).prop_map(|(mut acl, flags)| {
                acl.set_flags(AclFlags::from_bits_truncate(flags));
                Some(acl)
            }),
        ]
    }

    prop_compose! {
        fn arb_descriptor()(
            owner in proptest::option::of((arb_sid(), any::<bool>())),
            group in proptest::option::of((arb_sid(), any::<bool>())),
            dacl in arb_list(),
            sacl in arb_list(),
            rm_control in proptest::option::of(any::<u8>()),
        ) -> SecurityDescriptor {
            let mut sd = SecurityDescriptor::new();
            sd.owner = owner.map(|(sid, defaulted)| SidEntry { sid, defaulted });
            sd.group = group.map(|(sid, defaulted)| SidEntry { sid, defaulted });
            sd.dacl = dacl;
            sd.sacl = sacl;
            sd.rm_control = rm_control;
            sd
        }
    }

    proptest! {
        #[test]
        fn binary_round_trip(sd in arb_descriptor()) {
            let bytes = sd.to_self_relative().unwrap();
            let read = SecurityDescriptor::from_self_relative(&bytes).unwrap();
            prop_assert_eq!(read.control(), sd.control());
            prop_assert_eq!(read.owner, sd.owner);
            prop_assert_eq!(read.group, sd.group);
            prop_assert_eq!(read.rm_control, sd.rm_control);
            prop_assert_eq!(
                read.dacl.as_ref().map(|acl| (acl.is_null(), acl.entries().to_vec())),
                sd.dacl.as_ref().map(|acl| (acl.is_null(), acl.entries().to_vec()))
            );
            prop_assert_eq!(
                read.sacl.as_ref().map(|acl| (acl.is_null(), acl.entries().to_vec())),
                sd.sacl.as_ref().map(|acl| (acl.is_null(), acl.entries().to_vec()))
            );
        }

        #[test]
        fn truncated_buffers_never_panic(sd in arb_descriptor(), cut in 0usize..256) {
            let bytes = sd.to_self_relative().unwrap();
            let _ = SecurityDescriptor::from_self_relative(&bytes[..cut.min(bytes.len())]);
        }
    }

    #[test]
    fn layout() {
        let mut sd = SecurityDescriptor::new();
        sd.owner = Some(SidEntry::new(LOCAL_SYSTEM));
        sd.group = Some(SidEntry::new(BUILTIN_ADMINISTRATORS));
        let mut dacl = Acl::new();
        dacl.add(Ace::allowed(WORLD, 0x1F_01FF, AceFlags::empty())).unwrap();
        sd.dacl = Some(dacl);
        let bytes = sd.to_self_relative().unwrap();
        // header 20, owner 12, group 16, DACL 8 + 20
        assert_eq!(bytes.len(), 76);
        assert_eq!(&bytes[..4], &[1, 0, 0x04, 0x80]);
        assert_eq!(&bytes[4..8], &20u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &32u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &0u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &48u32.to_le_bytes());
    }

    #[test]
    fn oversized_dacl_is_rejected() {
        let mut sd = SecurityDescriptor::new();
        sd.dacl = Some(core::iter::repeat_n(Ace::allowed(WORLD, 1, AceFlags::empty()), 4_000).collect());
        assert_eq!(
            sd.to_self_relative(),
            Err(Error::TooLarge {
                component: "ACL",
                len: 80_008,
                max: 65_535
            })
        );
    }

    #[test]
    fn offsets_are_validated() {
        let mut bytes = vec![1, 0, 0x00, 0x80];
        bytes.extend_from_slice(&200u32.to_le_bytes());
        bytes.extend_from_slice(&[0; 12]);
        assert_eq!(
            SecurityDescriptor::from_self_relative(&bytes),
            Err(Error::InvalidOffset {
                component: "owner",
                offset: 200,
                len: 20
            })
        );
        bytes[4] = 2;
        assert!(matches!(
            SecurityDescriptor::from_self_relative(&bytes),
            Err(Error::InvalidOffset { offset: 2, .. })
        ));
    }

    #[test]
    fn malformed_headers() {
        assert!(matches!(
            SecurityDescriptor::from_self_relative(&[1, 0, 0, 0x80]),
            Err(Error::TruncatedBuffer { needed: 20, available: 4, .. })
        ));
        let mut bytes = [0u8; 20];
        bytes[0] = 2;
        bytes[3] = 0x80;
        assert!(matches!(
            SecurityDescriptor::from_self_relative(&bytes),
            Err(Error::InvalidRevision { revision: 2, .. })
        ));
        bytes[0] = 1;
        bytes[3] = 0;
        assert!(matches!(
            SecurityDescriptor::from_self_relative(&bytes),
            Err(Error::UnsupportedConstruct(_))
        ));
    }
}
