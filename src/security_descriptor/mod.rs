//! Security descriptors.
//!
//! A [`SecurityDescriptor`] owns its owner, group, DACL and SACL. The control word is not
//! stored as-is: presence, defaulted, protected and auto-inherit bits are derived from the
//! components (see [`SecurityDescriptor::control`]), so they cannot disagree with them.

mod binary;
mod inherit;
mod modify;

use bitflags::bitflags;

use crate::ace::{Ace, AceType};
use crate::acl::{Acl, AclFlags};
use crate::error::{Error, Result};
use crate::generic_mapping::GenericMapping;
use crate::Sid;

pub use binary::SECURITY_DESCRIPTOR_HEADER_SIZE;

/// The only security descriptor revision.
pub const SECURITY_DESCRIPTOR_REVISION: u8 = 1;

bitflags! {
    /// `SECURITY_DESCRIPTOR_CONTROL`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SecurityDescriptorControl: u16 {
        /// Owner set by a default mechanism.
        const OWNER_DEFAULTED = 0x0001;
        /// Group set by a default mechanism.
        const GROUP_DEFAULTED = 0x0002;
        /// A DACL is present (possibly null).
        const DACL_PRESENT = 0x0004;
        /// DACL set by a default mechanism.
        const DACL_DEFAULTED = 0x0008;
        /// A SACL is present (possibly null).
        const SACL_PRESENT = 0x0010;
        /// SACL set by a default mechanism.
        const SACL_DEFAULTED = 0x0020;
        /// The DACL comes from a trusted source.
        const DACL_TRUSTED = 0x0040;
        /// Server ACEs are replaced by client ones.
        const SERVER_SECURITY = 0x0080;
        /// Automatic DACL inheritance requested.
        const DACL_AUTO_INHERIT_REQ = 0x0100;
        /// Automatic SACL inheritance requested.
        const SACL_AUTO_INHERIT_REQ = 0x0200;
        /// The DACL supports automatic inheritance.
        const DACL_AUTO_INHERITED = 0x0400;
        /// The SACL supports automatic inheritance.
        const SACL_AUTO_INHERITED = 0x0800;
        /// The DACL does not inherit from the parent.
        const DACL_PROTECTED = 0x1000;
        /// The SACL does not inherit from the parent.
        const SACL_PROTECTED = 0x2000;
        /// The resource-manager control byte is valid.
        const RM_CONTROL_VALID = 0x4000;
        /// Self-relative layout.
        const SELF_RELATIVE = 0x8000;
    }
}

bitflags! {
    /// Selects security descriptor components.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SecurityInformation: u32 {
        /// Owner.
        const OWNER = 0x0000_0001;
        /// Group.
        const GROUP = 0x0000_0002;
        /// DACL.
        const DACL = 0x0000_0004;
        /// Whole SACL.
        const SACL = 0x0000_0008;
        /// Mandatory-label ACEs of the SACL.
        const LABEL = 0x0000_0010;
        /// Resource-attribute ACEs of the SACL.
        const ATTRIBUTE = 0x0000_0020;
        /// Scoped-policy-id ACEs of the SACL.
        const SCOPE = 0x0000_0040;
        /// Process-trust-label ACEs of the SACL.
        const PROCESS_TRUST_LABEL = 0x0000_0080;
        /// Access-filter ACEs of the SACL.
        const ACCESS_FILTER = 0x0000_0100;
        /// All components, as used by backup tools.
        const BACKUP = 0x0001_0000;
        /// Clear the SACL protected bit.
        const UNPROTECTED_SACL = 0x1000_0000;
        /// Clear the DACL protected bit.
        const UNPROTECTED_DACL = 0x2000_0000;
        /// Set the SACL protected bit.
        const PROTECTED_SACL = 0x4000_0000;
        /// Set the DACL protected bit.
        const PROTECTED_DACL = 0x8000_0000;
    }
}

impl SecurityInformation {
    /// Selectors for a subset of the SACL.
    pub const PARTIAL_SACL: Self = Self::LABEL
        .union(Self::ATTRIBUTE)
        .union(Self::SCOPE)
        .union(Self::PROCESS_TRUST_LABEL)
        .union(Self::ACCESS_FILTER);

    /// Owner, group, DACL and SACL.
    pub const ALL: Self = Self::OWNER.union(Self::GROUP).union(Self::DACL).union(Self::SACL);

    /// Whether ACEs of type `ace_type` belong to the selected SACL subset.
    #[inline]
    #[must_use]
    pub const fn selects(self, ace_type: AceType) -> bool {
        let selector = match ace_type {
            AceType::SystemMandatoryLabel => Self::LABEL,
            AceType::SystemResourceAttribute => Self::ATTRIBUTE,
            AceType::SystemScopedPolicyId => Self::SCOPE,
            AceType::SystemProcessTrustLabel => Self::PROCESS_TRUST_LABEL,
            AceType::SystemAccessFilter => Self::ACCESS_FILTER,
            _ => return false,
        };
        self.contains(selector)
    }
}

bitflags! {
    /// Options of [`SecurityDescriptor::modify`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AutoInheritFlags: u32 {
        /// Keep the object's inherited DACL ACEs when replacing the DACL.
        const DACL_AUTO_INHERIT = 0x0001;
        /// Keep the object's inherited SACL ACEs when replacing the SACL.
        const SACL_AUTO_INHERIT = 0x0002;

        const _ = !0;
    }
}

/// Owner or group SID with its defaulted bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SidEntry {
    /// The SID.
    pub sid: Sid,
    /// Set by a default mechanism.
    pub defaulted: bool,
}

impl SidEntry {
    /// An explicitly set entry.
    #[inline]
    #[must_use]
    pub const fn new(sid: Sid) -> Self {
        Self {
            sid,
            defaulted: false,
        }
    }
}

impl From<Sid> for SidEntry {
    #[inline]
    fn from(sid: Sid) -> Self {
        Self::new(sid)
    }
}

/// Owner, group, DACL and SACL of a securable object.
///
/// `None` lists are absent; a present but null list is `Some(Acl::null())`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecurityDescriptor {
    /// Owner.
    pub owner: Option<SidEntry>,
    /// Primary group.
    pub group: Option<SidEntry>,
    /// Discretionary ACL.
    pub dacl: Option<Acl>,
    /// System ACL.
    pub sacl: Option<Acl>,
    /// Resource-manager control byte.
    pub rm_control: Option<u8>,
    /// Mapping used when no explicit one is passed to the generic-access operations.
    pub generic_mapping: Option<GenericMapping>,
    extra_control: SecurityDescriptorControl,
}

const DERIVED_CONTROL: SecurityDescriptorControl = SecurityDescriptorControl::OWNER_DEFAULTED
    .union(SecurityDescriptorControl::GROUP_DEFAULTED)
    .union(SecurityDescriptorControl::DACL_PRESENT)
    .union(SecurityDescriptorControl::DACL_DEFAULTED)
    .union(SecurityDescriptorControl::SACL_PRESENT)
    .union(SecurityDescriptorControl::SACL_DEFAULTED)
    .union(SecurityDescriptorControl::DACL_AUTO_INHERIT_REQ)
    .union(SecurityDescriptorControl::SACL_AUTO_INHERIT_REQ)
    .union(SecurityDescriptorControl::DACL_AUTO_INHERITED)
    .union(SecurityDescriptorControl::SACL_AUTO_INHERITED)
    .union(SecurityDescriptorControl::DACL_PROTECTED)
    .union(SecurityDescriptorControl::SACL_PROTECTED)
    .union(SecurityDescriptorControl::RM_CONTROL_VALID)
    .union(SecurityDescriptorControl::SELF_RELATIVE);

/// Control bit and matching [`AclFlags`] bit of one list.
type ListBits = [(SecurityDescriptorControl, AclFlags); 4];

const DACL_BITS: ListBits = [
    (SecurityDescriptorControl::DACL_DEFAULTED, AclFlags::DEFAULTED),
    (SecurityDescriptorControl::DACL_PROTECTED, AclFlags::PROTECTED),
    (SecurityDescriptorControl::DACL_AUTO_INHERITED, AclFlags::AUTO_INHERITED),
    (SecurityDescriptorControl::DACL_AUTO_INHERIT_REQ, AclFlags::AUTO_INHERIT_REQ),
];

const SACL_BITS: ListBits = [
    (SecurityDescriptorControl::SACL_DEFAULTED, AclFlags::DEFAULTED),
    (SecurityDescriptorControl::SACL_PROTECTED, AclFlags::PROTECTED),
    (SecurityDescriptorControl::SACL_AUTO_INHERITED, AclFlags::AUTO_INHERITED),
    (SecurityDescriptorControl::SACL_AUTO_INHERIT_REQ, AclFlags::AUTO_INHERIT_REQ),
];

fn list_control(acl: &Acl, bits: &ListBits) -> SecurityDescriptorControl {
    bits.iter()
        .filter(|(_, flag)| acl.flags().contains(*flag))
        .fold(SecurityDescriptorControl::empty(), |acc, (bit, _)| acc | *bit)
}

fn list_flags(control: SecurityDescriptorControl, bits: &ListBits) -> AclFlags {
    bits.iter()
        .filter(|(bit, _)| control.contains(*bit))
        .fold(AclFlags::empty(), |acc, (_, flag)| acc | *flag)
}

/// Applies `f` to the mask of every ACE whose mask holds access rights.
fn remap(acl: &mut Acl, f: impl Fn(u32) -> u32) {
    for ace in acl.entries_mut() {
        if ace.ace_type() != AceType::SystemMandatoryLabel {
            ace.mask = f(ace.mask);
        }
    }
}

impl SecurityDescriptor {
    /// A descriptor with no component.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            owner: None,
            group: None,
            dacl: None,
            sacl: None,
            rm_control: None,
            generic_mapping: None,
            extra_control: SecurityDescriptorControl::empty(),
        }
    }

    /// The control word, derived from the components plus the bits set with
    /// [`SecurityDescriptor::set_control`]. `SELF_RELATIVE` is only set in the binary form.
    ///
    /// ```rust
    /// # use win_security_descriptor::{Acl, SecurityDescriptor, SecurityDescriptorControl};
    /// let mut sd = SecurityDescriptor::new();
    /// sd.dacl = Some(Acl::null());
    /// assert_eq!(sd.control(), SecurityDescriptorControl::DACL_PRESENT);
    /// ```
    #[inline]
    #[must_use]
    pub fn control(&self) -> SecurityDescriptorControl {
        let mut control = self.extra_control;
        if self.owner.is_some_and(|owner| owner.defaulted) {
            control |= SecurityDescriptorControl::OWNER_DEFAULTED;
        }
        if self.group.is_some_and(|group| group.defaulted) {
            control |= SecurityDescriptorControl::GROUP_DEFAULTED;
        }
        if let Some(dacl) = &self.dacl {
            control |= SecurityDescriptorControl::DACL_PRESENT | list_control(dacl, &DACL_BITS);
        }
        if let Some(sacl) = &self.sacl {
            control |= SecurityDescriptorControl::SACL_PRESENT | list_control(sacl, &SACL_BITS);
        }
        if self.rm_control.is_some() {
            control |= SecurityDescriptorControl::RM_CONTROL_VALID;
        }
        control
    }

    /// Distributes `control` onto the existing components.
    ///
    /// Presence and `RM_CONTROL_VALID` are structural and ignored here; set the
    /// components themselves instead.
    #[inline]
    pub fn set_control(&mut self, control: SecurityDescriptorControl) {
        self.extra_control = control - DERIVED_CONTROL;
        if let Some(owner) = &mut self.owner {
            owner.defaulted = control.contains(SecurityDescriptorControl::OWNER_DEFAULTED);
        }
        if let Some(group) = &mut self.group {
            group.defaulted = control.contains(SecurityDescriptorControl::GROUP_DEFAULTED);
        }
        if let Some(dacl) = &mut self.dacl {
            dacl.set_flags(list_flags(control, &DACL_BITS));
        }
        if let Some(sacl) = &mut self.sacl {
            sacl.set_flags(list_flags(control, &SACL_BITS));
        }
    }

    fn resolve_mapping(&self, mapping: Option<&GenericMapping>) -> Result<GenericMapping> {
        mapping
            .copied()
            .or(self.generic_mapping)
            .ok_or(Error::NullMapping)
    }

    fn lists_mut(&mut self) -> impl Iterator<Item = &mut Acl> {
        self.dacl.iter_mut().chain(self.sacl.iter_mut())
    }

    /// Replaces generic rights by specific ones in every ACE of both lists.
    ///
    /// Uses `mapping`, or [`SecurityDescriptor::generic_mapping`] when `None`.
    ///
    /// # Errors
    /// [`Error::NullMapping`] when neither is available; the descriptor is left untouched.
    #[inline]
    pub fn map_generic_access(&mut self, mapping: Option<&GenericMapping>) -> Result<()> {
        let mapping = self.resolve_mapping(mapping)?;
        self.lists_mut().for_each(|acl| remap(acl, |mask| mapping.map(mask)));
        Ok(())
    }

    /// Folds fully present specific rights back into generic rights in every ACE.
    ///
    /// See [`GenericMapping::unmap`] for the exact rule.
    ///
    /// # Errors
    /// [`Error::NullMapping`] when no mapping is available.
    #[inline]
    pub fn unmap_generic_access(&mut self, mapping: Option<&GenericMapping>) -> Result<()> {
        let mapping = self.resolve_mapping(mapping)?;
        self.lists_mut().for_each(|acl| remap(acl, |mask| mapping.unmap(mask)));
        Ok(())
    }

    /// Iterates over the ACEs of the DACL then the SACL.
    #[inline]
    pub fn aces(&self) -> impl Iterator<Item = &Ace> {
        self.dacl.iter().chain(self.sacl.iter()).flat_map(Acl::iter)
    }
}
