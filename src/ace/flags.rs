use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// ACE type tag, the first byte of every ACE header.
///
/// See Microsoft docs for [ACE_HEADER](https://learn.microsoft.com/windows/win32/api/winnt/ns-winnt-ace_header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum AceType {
    /// `ACCESS_ALLOWED_ACE_TYPE`
    AccessAllowed = 0x00,
    /// `ACCESS_DENIED_ACE_TYPE`
    AccessDenied = 0x01,
    /// `SYSTEM_AUDIT_ACE_TYPE`
    SystemAudit = 0x02,
    /// `SYSTEM_ALARM_ACE_TYPE`
    SystemAlarm = 0x03,
    /// `ACCESS_ALLOWED_COMPOUND_ACE_TYPE`
    AccessAllowedCompound = 0x04,
    /// `ACCESS_ALLOWED_OBJECT_ACE_TYPE`
    AccessAllowedObject = 0x05,
    /// `ACCESS_DENIED_OBJECT_ACE_TYPE`
    AccessDeniedObject = 0x06,
    /// `SYSTEM_AUDIT_OBJECT_ACE_TYPE`
    SystemAuditObject = 0x07,
    /// `SYSTEM_ALARM_OBJECT_ACE_TYPE`
    SystemAlarmObject = 0x08,
    /// `ACCESS_ALLOWED_CALLBACK_ACE_TYPE`
    AccessAllowedCallback = 0x09,
    /// `ACCESS_DENIED_CALLBACK_ACE_TYPE`
    AccessDeniedCallback = 0x0A,
    /// `ACCESS_ALLOWED_CALLBACK_OBJECT_ACE_TYPE`
    AccessAllowedCallbackObject = 0x0B,
    /// `ACCESS_DENIED_CALLBACK_OBJECT_ACE_TYPE`
    AccessDeniedCallbackObject = 0x0C,
    /// `SYSTEM_AUDIT_CALLBACK_ACE_TYPE`
    SystemAuditCallback = 0x0D,
    /// `SYSTEM_ALARM_CALLBACK_ACE_TYPE`
    SystemAlarmCallback = 0x0E,
    /// `SYSTEM_AUDIT_CALLBACK_OBJECT_ACE_TYPE`
    SystemAuditCallbackObject = 0x0F,
    /// `SYSTEM_ALARM_CALLBACK_OBJECT_ACE_TYPE`
    SystemAlarmCallbackObject = 0x10,
    /// `SYSTEM_MANDATORY_LABEL_ACE_TYPE`
    SystemMandatoryLabel = 0x11,
    /// `SYSTEM_RESOURCE_ATTRIBUTE_ACE_TYPE`
    SystemResourceAttribute = 0x12,
    /// `SYSTEM_SCOPED_POLICY_ID_ACE_TYPE`
    SystemScopedPolicyId = 0x13,
    /// `SYSTEM_PROCESS_TRUST_LABEL_ACE_TYPE`
    SystemProcessTrustLabel = 0x14,
    /// `SYSTEM_ACCESS_FILTER_ACE_TYPE`
    SystemAccessFilter = 0x15,
}

bitflags! {
    /// Inheritance and audit flags from the ACE header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AceFlags: u8 {
        /// Non-container children inherit the ACE (`OI`).
        const OBJECT_INHERIT = 0x01;
        /// Container children inherit the ACE (`CI`).
        const CONTAINER_INHERIT = 0x02;
        /// Inheritance stops after one level (`NP`).
        const NO_PROPAGATE_INHERIT = 0x04;
        /// The ACE only exists to be inherited (`IO`).
        const INHERIT_ONLY = 0x08;
        /// The ACE was inherited from a parent (`ID`).
        const INHERITED = 0x10;
        /// Callback ACE that cannot be removed (`CR`).
        const CRITICAL = 0x20;
        /// Audit successful accesses (`SA`).
        const SUCCESSFUL_ACCESS = 0x40;
        /// Trust-protected filter ACE (`TP`); shares its bit with `SA`.
        const TRUST_PROTECTED = 0x40;
        /// Audit failed accesses (`FA`).
        const FAILED_ACCESS = 0x80;

        /// All flags that steer inheritance.
        const INHERITANCE = Self::OBJECT_INHERIT.bits()
            | Self::CONTAINER_INHERIT.bits()
            | Self::NO_PROPAGATE_INHERIT.bits()
            | Self::INHERIT_ONLY.bits();
    }
}

bitflags! {
    /// Presence flags of the optional GUIDs in object ACEs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ObjectAceFlags: u32 {
        /// `ACE_OBJECT_TYPE_PRESENT`
        const OBJECT_TYPE_PRESENT = 0x1;
        /// `ACE_INHERITED_OBJECT_TYPE_PRESENT`
        const INHERITED_OBJECT_TYPE_PRESENT = 0x2;
    }
}
