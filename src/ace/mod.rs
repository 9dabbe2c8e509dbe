//! Access control entries.
//!
//! Every ACE shares a header (type, flags, size) and an access mask. The per-type
//! payload lives in [`AceKind`], one variant per wire type, so code that handles ACEs
//! matches exhaustively instead of dispatching on the type byte.

mod codec;
mod flags;

pub use flags::{AceFlags, AceType, ObjectAceFlags};

use crate::claim::ClaimAttribute;
use crate::condition::{self, Expression};
use crate::error::Result;
use crate::{Guid, Sid};

/// Payload of the object ACE family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectAce {
    /// Object, property set or property the ACE applies to.
    pub object_type: Option<Guid>,
    /// Object type allowed to inherit the ACE.
    pub inherited_object_type: Option<Guid>,
    /// Trustee.
    pub sid: Sid,
}

impl ObjectAce {
    /// An object payload without GUIDs.
    #[inline]
    #[must_use]
    pub const fn new(sid: Sid) -> Self {
        Self {
            object_type: None,
            inherited_object_type: None,
            sid,
        }
    }

    /// Presence flags as written on the wire.
    #[inline]
    #[must_use]
    pub fn presence(&self) -> ObjectAceFlags {
        let mut flags = ObjectAceFlags::empty();
        flags.set(ObjectAceFlags::OBJECT_TYPE_PRESENT, self.object_type.is_some());
        flags.set(
            ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT,
            self.inherited_object_type.is_some(),
        );
        flags
    }
}

/// Payload of callback ACEs and of the access-filter ACE: a trustee plus the encoded
/// conditional expression (`artx...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackAce {
    /// Trustee.
    pub sid: Sid,
    /// Raw conditional expression. ACE padding after a well-formed `artx` stream is
    /// not part of it.
    pub condition: Vec<u8>,
}

/// Payload of callback object ACEs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackObjectAce {
    /// Object part.
    pub object: ObjectAce,
    /// Raw conditional expression.
    pub condition: Vec<u8>,
}

/// Payload of the resource-attribute ACE.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceAttributeAce {
    /// Trustee, normally Everyone.
    pub sid: Sid,
    /// The attribute.
    pub attribute: ClaimAttribute,
}

/// Payload of the compound (impersonation) ACE.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompoundAce {
    /// Compound type; 1 is `COMPOUND_ACE_IMPERSONATION`.
    pub compound_type: u16,
    /// Server SID.
    pub server: Sid,
    /// Client SID.
    pub client: Sid,
}

/// Type-specific ACE payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AceKind {
    /// `A`
    AccessAllowed(Sid),
    /// `D`
    AccessDenied(Sid),
    /// `AU`
    SystemAudit(Sid),
    /// `AL`
    SystemAlarm(Sid),
    /// No SDDL code.
    AccessAllowedCompound(CompoundAce),
    /// `OA`
    AccessAllowedObject(ObjectAce),
    /// `OD`
    AccessDeniedObject(ObjectAce),
    /// `OU`
    SystemAuditObject(ObjectAce),
    /// `OL`
    SystemAlarmObject(ObjectAce),
    /// `XA`
    AccessAllowedCallback(CallbackAce),
    /// `XD`
    AccessDeniedCallback(CallbackAce),
    /// `XU`
    SystemAuditCallback(CallbackAce),
    /// No SDDL code.
    SystemAlarmCallback(CallbackAce),
    /// `ZA`
    AccessAllowedCallbackObject(CallbackObjectAce),
    /// No SDDL code.
    AccessDeniedCallbackObject(CallbackObjectAce),
    /// No SDDL code.
    SystemAuditCallbackObject(CallbackObjectAce),
    /// No SDDL code.
    SystemAlarmCallbackObject(CallbackObjectAce),
    /// `ML`
    SystemMandatoryLabel(Sid),
    /// `RA`
    SystemResourceAttribute(ResourceAttributeAce),
    /// `SP`
    SystemScopedPolicyId(Sid),
    /// `TL`
    SystemProcessTrustLabel(Sid),
    /// `FL`
    SystemAccessFilter(CallbackAce),
}

/// An access control entry.
///
/// # Examples
/// ```rust
/// # use win_security_descriptor::{Ace, AceFlags, well_known};
/// let ace = Ace::allowed(well_known::WORLD, 0x1200a9, AceFlags::CONTAINER_INHERIT);
/// let bytes = ace.to_bytes().unwrap();
/// assert_eq!(bytes.len(), 20);
/// assert_eq!(Ace::read_from(&bytes).unwrap(), (ace, 20));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ace {
    /// Header flags.
    pub flags: AceFlags,
    /// Access mask.
    pub mask: u32,
    /// Type-specific payload.
    pub kind: AceKind,
}

impl Ace {
    /// Creates an ACE from its parts.
    #[inline]
    #[must_use]
    pub const fn new(flags: AceFlags, mask: u32, kind: AceKind) -> Self {
        Self { flags, mask, kind }
    }

    /// An access-allowed ACE.
    #[inline]
    #[must_use]
    pub const fn allowed(sid: Sid, mask: u32, flags: AceFlags) -> Self {
        Self::new(flags, mask, AceKind::AccessAllowed(sid))
    }

    /// An access-denied ACE.
    #[inline]
    #[must_use]
    pub const fn denied(sid: Sid, mask: u32, flags: AceFlags) -> Self {
        Self::new(flags, mask, AceKind::AccessDenied(sid))
    }

    /// A system-audit ACE.
    #[inline]
    #[must_use]
    pub const fn audit(sid: Sid, mask: u32, flags: AceFlags) -> Self {
        Self::new(flags, mask, AceKind::SystemAudit(sid))
    }

    /// A mandatory-label ACE; `mask` holds the `NO_*_UP` policy bits.
    #[inline]
    #[must_use]
    pub const fn mandatory_label(label: Sid, mask: u32, flags: AceFlags) -> Self {
        Self::new(flags, mask, AceKind::SystemMandatoryLabel(label))
    }

    /// The wire type tag.
    #[must_use]
    #[inline]
    pub const fn ace_type(&self) -> AceType {
        match &self.kind {
            AceKind::AccessAllowed(_) => AceType::AccessAllowed,
            AceKind::AccessDenied(_) => AceType::AccessDenied,
            AceKind::SystemAudit(_) => AceType::SystemAudit,
            AceKind::SystemAlarm(_) => AceType::SystemAlarm,
            AceKind::AccessAllowedCompound(_) => AceType::AccessAllowedCompound,
            AceKind::AccessAllowedObject(_) => AceType::AccessAllowedObject,
            AceKind::AccessDeniedObject(_) => AceType::AccessDeniedObject,
            AceKind::SystemAuditObject(_) => AceType::SystemAuditObject,
            AceKind::SystemAlarmObject(_) => AceType::SystemAlarmObject,
            AceKind::AccessAllowedCallback(_) => AceType::AccessAllowedCallback,
            AceKind::AccessDeniedCallback(_) => AceType::AccessDeniedCallback,
            AceKind::SystemAuditCallback(_) => AceType::SystemAuditCallback,
            AceKind::SystemAlarmCallback(_) => AceType::SystemAlarmCallback,
            AceKind::AccessAllowedCallbackObject(_) => AceType::AccessAllowedCallbackObject,
            AceKind::AccessDeniedCallbackObject(_) => AceType::AccessDeniedCallbackObject,
            AceKind::SystemAuditCallbackObject(_) => AceType::SystemAuditCallbackObject,
            AceKind::SystemAlarmCallbackObject(_) => AceType::SystemAlarmCallbackObject,
            AceKind::SystemMandatoryLabel(_) => AceType::SystemMandatoryLabel,
            AceKind::SystemResourceAttribute(_) => AceType::SystemResourceAttribute,
            AceKind::SystemScopedPolicyId(_) => AceType::SystemScopedPolicyId,
            AceKind::SystemProcessTrustLabel(_) => AceType::SystemProcessTrustLabel,
            AceKind::SystemAccessFilter(_) => AceType::SystemAccessFilter,
        }
    }

    /// The trustee. For compound ACEs this is the client SID.
    #[must_use]
    #[inline]
    pub const fn sid(&self) -> &Sid {
        match &self.kind {
            AceKind::AccessAllowed(sid)
            | AceKind::AccessDenied(sid)
            | AceKind::SystemAudit(sid)
            | AceKind::SystemAlarm(sid)
            | AceKind::SystemMandatoryLabel(sid)
            | AceKind::SystemScopedPolicyId(sid)
            | AceKind::SystemProcessTrustLabel(sid) => sid,
            AceKind::AccessAllowedCompound(compound) => &compound.client,
            AceKind::AccessAllowedObject(object)
            | AceKind::AccessDeniedObject(object)
            | AceKind::SystemAuditObject(object)
            | AceKind::SystemAlarmObject(object) => &object.sid,
            AceKind::AccessAllowedCallback(callback)
            | AceKind::AccessDeniedCallback(callback)
            | AceKind::SystemAuditCallback(callback)
            | AceKind::SystemAlarmCallback(callback)
            | AceKind::SystemAccessFilter(callback) => &callback.sid,
            AceKind::AccessAllowedCallbackObject(callback)
            | AceKind::AccessDeniedCallbackObject(callback)
            | AceKind::SystemAuditCallbackObject(callback)
            | AceKind::SystemAlarmCallbackObject(callback) => &callback.object.sid,
            AceKind::SystemResourceAttribute(resource) => &resource.sid,
        }
    }

    /// Mutable access to the trustee.
    #[inline]
    pub const fn sid_mut(&mut self) -> &mut Sid {
        match &mut self.kind {
            AceKind::AccessAllowed(sid)
            | AceKind::AccessDenied(sid)
            | AceKind::SystemAudit(sid)
            | AceKind::SystemAlarm(sid)
            | AceKind::SystemMandatoryLabel(sid)
            | AceKind::SystemScopedPolicyId(sid)
            | AceKind::SystemProcessTrustLabel(sid) => sid,
            AceKind::AccessAllowedCompound(compound) => &mut compound.client,
            AceKind::AccessAllowedObject(object)
            | AceKind::AccessDeniedObject(object)
            | AceKind::SystemAuditObject(object)
            | AceKind::SystemAlarmObject(object) => &mut object.sid,
            AceKind::AccessAllowedCallback(callback)
            | AceKind::AccessDeniedCallback(callback)
            | AceKind::SystemAuditCallback(callback)
            | AceKind::SystemAlarmCallback(callback)
            | AceKind::SystemAccessFilter(callback) => &mut callback.sid,
            AceKind::AccessAllowedCallbackObject(callback)
            | AceKind::AccessDeniedCallbackObject(callback)
            | AceKind::SystemAuditCallbackObject(callback)
            | AceKind::SystemAlarmCallbackObject(callback) => &mut callback.object.sid,
            AceKind::SystemResourceAttribute(resource) => &mut resource.sid,
        }
    }

    /// The object part of object and callback-object ACEs.
    #[must_use]
    #[inline]
    pub const fn object(&self) -> Option<&ObjectAce> {
        match &self.kind {
            AceKind::AccessAllowedObject(object)
            | AceKind::AccessDeniedObject(object)
            | AceKind::SystemAuditObject(object)
            | AceKind::SystemAlarmObject(object) => Some(object),
            AceKind::AccessAllowedCallbackObject(callback)
            | AceKind::AccessDeniedCallbackObject(callback)
            | AceKind::SystemAuditCallbackObject(callback)
            | AceKind::SystemAlarmCallbackObject(callback) => Some(&callback.object),
            _ => None,
        }
    }

    /// Object type GUID, if the ACE carries one.
    #[must_use]
    #[inline]
    pub fn object_type(&self) -> Option<Guid> {
        self.object().and_then(|object| object.object_type)
    }

    /// Inherited object type GUID, if the ACE carries one.
    #[must_use]
    #[inline]
    pub fn inherited_object_type(&self) -> Option<Guid> {
        self.object().and_then(|object| object.inherited_object_type)
    }

    /// The raw conditional expression of callback and access-filter ACEs.
    #[must_use]
    #[inline]
    pub fn condition_bytes(&self) -> Option<&[u8]> {
        match &self.kind {
            AceKind::AccessAllowedCallback(callback)
            | AceKind::AccessDeniedCallback(callback)
            | AceKind::SystemAuditCallback(callback)
            | AceKind::SystemAlarmCallback(callback)
            | AceKind::SystemAccessFilter(callback) => Some(&callback.condition),
            AceKind::AccessAllowedCallbackObject(callback)
            | AceKind::AccessDeniedCallbackObject(callback)
            | AceKind::SystemAuditCallbackObject(callback)
            | AceKind::SystemAlarmCallbackObject(callback) => Some(&callback.condition),
            _ => None,
        }
    }

    /// Decodes the conditional expression; `None` when the ACE has no condition or
    /// its condition blob is empty.
    ///
    /// # Errors
    /// Propagates [`condition::decode`] errors.
    #[inline]
    pub fn condition(&self) -> Option<Result<Expression>> {
        self.condition_bytes()
            .filter(|bytes| !bytes.is_empty())
            .map(condition::decode)
    }

    /// Grants access: allowed, allowed-object, allowed-callback(-object) and compound ACEs.
    #[must_use]
    #[inline]
    pub const fn is_allowed(&self) -> bool {
        matches!(
            self.kind,
            AceKind::AccessAllowed(_)
                | AceKind::AccessAllowedCompound(_)
                | AceKind::AccessAllowedObject(_)
                | AceKind::AccessAllowedCallback(_)
                | AceKind::AccessAllowedCallbackObject(_)
        )
    }

    /// Denies access.
    #[must_use]
    #[inline]
    pub const fn is_denied(&self) -> bool {
        matches!(
            self.kind,
            AceKind::AccessDenied(_)
                | AceKind::AccessDeniedObject(_)
                | AceKind::AccessDeniedCallback(_)
                | AceKind::AccessDeniedCallbackObject(_)
        )
    }

    /// Audit or alarm ACE.
    #[must_use]
    #[inline]
    pub const fn is_audit(&self) -> bool {
        matches!(
            self.kind,
            AceKind::SystemAudit(_)
                | AceKind::SystemAlarm(_)
                | AceKind::SystemAuditObject(_)
                | AceKind::SystemAlarmObject(_)
                | AceKind::SystemAuditCallback(_)
                | AceKind::SystemAlarmCallback(_)
                | AceKind::SystemAuditCallbackObject(_)
                | AceKind::SystemAlarmCallbackObject(_)
        )
    }

    /// Carries a conditional expression.
    #[must_use]
    #[inline]
    pub fn is_callback(&self) -> bool {
        self.condition_bytes().is_some()
    }

    /// Object or callback-object ACE; such ACEs require ACL revision 4.
    #[must_use]
    #[inline]
    pub const fn is_object(&self) -> bool {
        self.object().is_some()
    }

    /// Has the `INHERITED` flag.
    #[must_use]
    #[inline]
    pub const fn is_inherited(&self) -> bool {
        self.flags.contains(AceFlags::INHERITED)
    }

    /// Has the `INHERIT_ONLY` flag.
    #[must_use]
    #[inline]
    pub const fn is_inherit_only(&self) -> bool {
        self.flags.contains(AceFlags::INHERIT_ONLY)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
pub(crate) mod test {
    use super::*;
    use crate::claim::test::arb_claim;
    use crate::guid::test::arb_guid;
    use crate::sid::test::arb_sid;
    use proptest::prelude::*;

    fn arb_object() -> impl Strategy<Value = ObjectAce> {
        (
            proptest::option::of(arb_guid()),
            proptest::option::of(arb_guid()),
            arb_sid(),
        )
            .prop_map(|(object_type, inherited_object_type, sid)| ObjectAce {
                object_type,
                inherited_object_type,
                sid,
            })
    }

    // Conditions are kept 4-byte aligned so the padded wire form reads back unchanged.
    fn arb_condition() -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(any::<[u8; 4]>(), 0..4)
            .prop_map(|words| words.into_iter().flatten().collect())
    }

    fn arb_callback() -> impl Strategy<Value = CallbackAce> {
        (arb_sid(), arb_condition()).prop_map(|(sid, condition)| CallbackAce { sid, condition })
    }

    fn arb_callback_object() -> impl Strategy<Value = CallbackObjectAce> {
        (arb_object(), arb_condition())
            .prop_map(|(object, condition)| CallbackObjectAce { object, condition })
    }

    pub fn arb_kind() -> impl Strategy<Value = AceKind> {
        prop_oneof![
            arb_sid().prop_map(AceKind::AccessAllowed),
            arb_sid().prop_map(AceKind::AccessDenied),
            arb_sid().prop_map(AceKind::SystemAudit),
            arb_sid().prop_map(AceKind::SystemAlarm),
            (any::<u16>(), arb_sid(), arb_sid()).prop_map(|(compound_type, server, client)| {
                AceKind::AccessAllowedCompound(CompoundAce {
                    compound_type,
                    server,
                    client,
                })
            }),
            arb_object().prop_map(AceKind::AccessAllowedObject),
            arb_object().prop_map(AceKind::AccessDeniedObject),
            arb_object().prop_map(AceKind::SystemAuditObject),
            arb_object().prop_map(AceKind::SystemAlarmObject),
            arb_callback().prop_map(AceKind::AccessAllowedCallback),
            arb_callback().prop_map(AceKind::AccessDeniedCallback),
            arb_callback().prop_map(AceKind::SystemAuditCallback),
            arb_callback().prop_map(AceKind::SystemAlarmCallback),
            arb_callback_object().prop_map(AceKind::AccessAllowedCallbackObject),
            arb_callback_object().prop_map(AceKind::AccessDeniedCallbackObject),
            arb_callback_object().prop_map(AceKind::SystemAuditCallbackObject),
            arb_callback_object().prop_map(AceKind::SystemAlarmCallbackObject),
            arb_sid().prop_map(AceKind::SystemMandatoryLabel),
            (arb_sid(), arb_claim()).prop_map(|(sid, attribute)| {
                AceKind::SystemResourceAttribute(ResourceAttributeAce { sid, attribute })
            }),
            arb_sid().prop_map(AceKind::SystemScopedPolicyId),
            arb_sid().prop_map(AceKind::SystemProcessTrustLabel),
            arb_callback().prop_map(AceKind::SystemAccessFilter),
        ]
    }

    prop_compose! {
        pub fn arb_ace()(flags in any::<u8>(), mask in any::<u32>(), kind in arb_kind()) -> Ace {
            Ace::new(AceFlags::from_bits_retain(flags), mask, kind)
        }
    }

    #[test]
    fn classification() {
        let sid = crate::well_known::WORLD;
        let allow = Ace::allowed(sid, 1, AceFlags::INHERITED);
        assert!(allow.is_allowed() && allow.is_inherited() && !allow.is_denied());
        let deny = Ace::new(
            AceFlags::empty(),
            1,
            AceKind::AccessDeniedObject(ObjectAce::new(sid)),
        );
        assert!(deny.is_denied() && deny.is_object() && !deny.is_callback());
        let alarm = Ace::new(
            AceFlags::empty(),
            1,
            AceKind::SystemAlarmCallback(CallbackAce {
                sid,
                condition: Vec::new(),
            }),
        );
        assert!(alarm.is_audit() && alarm.is_callback());
        assert!(alarm.condition().is_none());
        assert_eq!(alarm.ace_type(), AceType::SystemAlarmCallback);
    }

    #[test]
    fn presence_flags_follow_the_guids() {
        let mut object = ObjectAce::new(crate::well_known::WORLD);
        assert_eq!(object.presence(), ObjectAceFlags::empty());
        object.inherited_object_type = Some(Guid::NIL);
        assert_eq!(
            object.presence(),
            ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT
        );
    }
}
