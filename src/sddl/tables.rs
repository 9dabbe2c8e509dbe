//! Fixed SDDL abbreviation tables.

use crate::ace::{AceFlags, AceType};
use crate::acl::AclFlags;
use crate::claim::ClaimValueType;

pub(super) static ACE_TYPES: &[(&str, AceType)] = &[
    ("A", AceType::AccessAllowed),
    ("D", AceType::AccessDenied),
    ("AU", AceType::SystemAudit),
    ("AL", AceType::SystemAlarm),
    ("OA", AceType::AccessAllowedObject),
    ("OD", AceType::AccessDeniedObject),
    ("OU", AceType::SystemAuditObject),
    ("OL", AceType::SystemAlarmObject),
    ("XA", AceType::AccessAllowedCallback),
    ("XD", AceType::AccessDeniedCallback),
    ("XU", AceType::SystemAuditCallback),
    ("ZA", AceType::AccessAllowedCallbackObject),
    ("ML", AceType::SystemMandatoryLabel),
    ("RA", AceType::SystemResourceAttribute),
    ("SP", AceType::SystemScopedPolicyId),
    ("TL", AceType::SystemProcessTrustLabel),
    ("FL", AceType::SystemAccessFilter),
];

/// `SA` and `TP` share a bit; `TP` is only written for trust-label ACEs.
pub(super) static ACE_FLAGS: &[(&str, AceFlags)] = &[
    ("OI", AceFlags::OBJECT_INHERIT),
    ("CI", AceFlags::CONTAINER_INHERIT),
    ("NP", AceFlags::NO_PROPAGATE_INHERIT),
    ("IO", AceFlags::INHERIT_ONLY),
    ("ID", AceFlags::INHERITED),
    ("CR", AceFlags::CRITICAL),
    ("SA", AceFlags::SUCCESSFUL_ACCESS),
    ("TP", AceFlags::TRUST_PROTECTED),
    ("FA", AceFlags::FAILED_ACCESS),
];

pub(super) const NO_ACCESS_CONTROL: &str = "NO_ACCESS_CONTROL";

pub(super) static ACL_FLAGS: &[(&str, AclFlags)] = &[
    ("P", AclFlags::PROTECTED),
    ("AR", AclFlags::AUTO_INHERIT_REQ),
    ("AI", AclFlags::AUTO_INHERITED),
];

pub(super) static CLAIM_TYPES: &[(&str, ClaimValueType)] = &[
    ("TI", ClaimValueType::Int64),
    ("TU", ClaimValueType::Uint64),
    ("TS", ClaimValueType::String),
    ("TD", ClaimValueType::Sid),
    ("TX", ClaimValueType::OctetString),
    ("TB", ClaimValueType::Boolean),
];

pub(super) fn ace_type(abbreviation: &str) -> Option<AceType> {
    ACE_TYPES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(abbreviation))
        .map(|(_, ace_type)| *ace_type)
}

pub(super) fn ace_type_name(ace_type: AceType) -> Option<&'static str> {
    ACE_TYPES
        .iter()
        .find(|(_, candidate)| *candidate == ace_type)
        .map(|(name, _)| *name)
}

pub(super) fn ace_flag(abbreviation: &str) -> Option<AceFlags> {
    ACE_FLAGS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(abbreviation))
        .map(|(_, flag)| *flag)
}

pub(super) fn claim_type(abbreviation: &str) -> Option<ClaimValueType> {
    CLAIM_TYPES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(abbreviation))
        .map(|(_, value_type)| *value_type)
}

pub(super) fn claim_type_name(value_type: ClaimValueType) -> Option<&'static str> {
    CLAIM_TYPES
        .iter()
        .find(|(_, candidate)| *candidate == value_type)
        .map(|(name, _)| *name)
}
