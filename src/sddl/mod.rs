//! Security Descriptor Definition Language.
//!
//! ```text
//! O:owner G:group D:flags(ace)(ace)... S:flags(ace)...
//! ace = (type;flags;rights;object_guid;inherited_object_guid;sid[;condition or claim])
//! ```
//!
//! Sections may appear in any order, each at most once. A missing `D:` or `S:` section
//! means the list is absent; `NO_ACCESS_CONTROL` marks a null list.
//!
//! ```rust
//! use win_security_descriptor::sddl::{self, SddlOptions};
//! use win_security_descriptor::{SecurityInformation, generic_mapping::DIRECTORY};
//!
//! let sd = sddl::parse_sddl("O:SYG:SYD:(A;;GA;;;WD)").unwrap();
//! assert_eq!(sddl::to_sddl(&sd, SecurityInformation::ALL).unwrap(), "O:SYG:SYD:(A;;GA;;;WD)");
//!
//! let options = SddlOptions::new().with_type_info(DIRECTORY);
//! let sd = sddl::parse_sddl_with("D:PAI(A;OICI;FA;;;BA)", &options).unwrap();
//! assert_eq!(
//!     sddl::to_sddl_with(&sd, SecurityInformation::DACL, &options).unwrap(),
//!     "D:PAI(A;OICI;FA;;;BA)"
//! );
//! ```

mod format;
mod parse;
mod tables;

use core::str::FromStr;

use crate::Sid;
use crate::error::{Error, Result};
use crate::generic_mapping::SecurityObjectType;
use crate::security_descriptor::{SecurityDescriptor, SecurityInformation};

/// Context for SDDL conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SddlOptions {
    /// Object type whose right abbreviations are used; its mapping is cached on parsed
    /// descriptors. Without it, parsing accepts the abbreviations of every known type and
    /// formatting only uses the generic and standard ones.
    pub type_info: Option<SecurityObjectType>,
    /// Domain against which domain-relative aliases (`DA`, `DU`, ...) are resolved.
    pub domain_sid: Option<Sid>,
}

impl SddlOptions {
    /// No type information and no domain.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            type_info: None,
            domain_sid: None,
        }
    }

    /// Sets [`SddlOptions::type_info`].
    #[inline]
    #[must_use]
    pub const fn with_type_info(mut self, type_info: SecurityObjectType) -> Self {
        self.type_info = Some(type_info);
        self
    }

    /// Sets [`SddlOptions::domain_sid`].
    #[inline]
    #[must_use]
    pub const fn with_domain_sid(mut self, domain_sid: Sid) -> Self {
        self.domain_sid = Some(domain_sid);
        self
    }
}

/// Parses SDDL without type information or domain.
///
/// # Errors
/// See [`parse_sddl_with`].
#[inline]
pub fn parse_sddl(text: &str) -> Result<SecurityDescriptor> {
    parse_sddl_with(text, &SddlOptions::new())
}

/// Parses SDDL.
///
/// # Errors
/// [`Error::Syntax`] with the character position of the fault for malformed sections,
/// unknown abbreviations and invalid numbers, SIDs or GUIDs; errors of
/// [`condition::encode`](crate::condition::encode) for conditions that have no binary form.
#[inline]
pub fn parse_sddl_with(text: &str, options: &SddlOptions) -> Result<SecurityDescriptor> {
    parse::Parser::new(text, options).descriptor()
}

/// Formats the components of `sd` selected by `information` without type information.
///
/// # Errors
/// See [`to_sddl_with`].
#[inline]
pub fn to_sddl(sd: &SecurityDescriptor, information: SecurityInformation) -> Result<String> {
    to_sddl_with(sd, information, &SddlOptions::new())
}

/// Formats the components of `sd` selected by `information`.
///
/// Absent components are skipped. The partial SACL selectors (`LABEL`, `ATTRIBUTE`, ...)
/// without `SACL` produce an `S:` section holding only the ACEs of their types. Rights are
/// written as abbreviations when they cover the mask exactly, as hexadecimal otherwise.
///
/// # Errors
/// [`Error::UnsupportedConstruct`] for ACE types without an abbreviation (compound, alarm
/// callback, ...), FQBN claims and claim strings holding quotes; condition decoding errors.
#[inline]
pub fn to_sddl_with(
    sd: &SecurityDescriptor,
    information: SecurityInformation,
    options: &SddlOptions,
) -> Result<String> {
    let mut writer = format::Writer::new(options);
    if information.contains(SecurityInformation::OWNER)
        && let Some(owner) = &sd.owner
    {
        writer.section_sid("O:", &owner.sid);
    }
    if information.contains(SecurityInformation::GROUP)
        && let Some(group) = &sd.group
    {
        writer.section_sid("G:", &group.sid);
    }
    if information.contains(SecurityInformation::DACL)
        && let Some(dacl) = &sd.dacl
    {
        writer.acl("D:", dacl, |_| true)?;
    }
    if let Some(sacl) = &sd.sacl {
        if information.contains(SecurityInformation::SACL) {
            writer.acl("S:", sacl, |_| true)?;
        } else if information.intersects(SecurityInformation::PARTIAL_SACL) {
            writer.acl("S:", sacl, |ace| information.selects(ace.ace_type()))?;
        }
    }
    Ok(writer.finish())
}

impl FromStr for SecurityDescriptor {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        parse_sddl(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
#[allow(clippy::panic, reason = "Panic is how a test fails")]
mod test {
    use super::*;
    use crate::ace::{Ace, AceFlags, AceKind, AceType};
    use crate::acl::AclFlags;
    use crate::acl::test::arb_acl;
    use crate::claim::{ClaimAttribute, ClaimAttributeFlags, ClaimValues};
    use crate::condition::{self, Expression};
    use crate::generic_mapping::{DIRECTORY_SERVICE, FILE, GENERIC_ALL, NO_WRITE_UP, ds, file};
    use crate::security_descriptor::SidEntry;
    use crate::well_known::{
        BUILTIN_ADMINISTRATORS, LOCAL_SYSTEM, LOW_MANDATORY_LEVEL, WORLD,
    };
    use crate::{Guid, sid};
    use proptest::prelude::*;

    fn dacl_entries(sd: &SecurityDescriptor) -> Vec<Ace> {
        sd.dacl.as_ref().unwrap().entries().to_vec()
    }

    fn syntax_position(text: &str) -> usize {
        match parse_sddl(text) {
            Err(Error::Syntax { position, .. }) => position,
            other => panic!("expected a syntax error for {text}, got {other:?}"),
        }
    }

    #[test]
    fn owner_group_and_generic_all() {
        let sd = parse_sddl("O:SYG:SYD:(A;;GA;;;WD)").unwrap();
        assert_eq!(sd.owner, Some(SidEntry::new(LOCAL_SYSTEM)));
        assert_eq!(sd.group, Some(SidEntry::new(LOCAL_SYSTEM)));
        assert_eq!(dacl_entries(&sd), [Ace::allowed(WORLD, GENERIC_ALL, AceFlags::empty())]);
        assert!(sd.sacl.is_none());
        let text = to_sddl(&sd, SecurityInformation::ALL).unwrap();
        assert_eq!(text, "O:SYG:SYD:(A;;GA;;;WD)");
        assert_eq!(text.parse::<SecurityDescriptor>().unwrap(), sd);
    }

    #[test]
    fn list_states() {
        let sd = parse_sddl("D:NO_ACCESS_CONTROLS:").unwrap();
        assert!(sd.dacl.as_ref().unwrap().is_null());
        assert!(sd.sacl.as_ref().unwrap().is_empty());
        assert!(!sd.sacl.as_ref().unwrap().is_null());
        assert_eq!(to_sddl(&sd, SecurityInformation::ALL).unwrap(), "D:NO_ACCESS_CONTROLS:");

        let sd = parse_sddl("D:PAIAR").unwrap();
        assert_eq!(
            sd.dacl.unwrap().flags(),
            AclFlags::PROTECTED | AclFlags::AUTO_INHERITED | AclFlags::AUTO_INHERIT_REQ
        );
    }

    #[test]
    fn rights_forms() {
        let sd = parse_sddl("D:(A;;0x1F01FF;;;BA)(A;;FRFW;;;SY)(A;;1179817;;;WD)(D;;CCDC;;;WD)").unwrap();
        let masks: Vec<u32> = dacl_entries(&sd).iter().map(|ace| ace.mask).collect();
        assert_eq!(
            masks,
            [
                file::ALL_ACCESS,
                file::GENERIC_READ | file::GENERIC_WRITE,
                0x0012_00A9,
                ds::CREATE_CHILD | ds::DELETE_CHILD
            ]
        );
        assert_eq!(
            to_sddl(&sd, SecurityInformation::DACL).unwrap(),
            "D:(A;;0x1f01ff;;;BA)(A;;0x12019f;;;SY)(A;;0x1200a9;;;WD)(D;;0x3;;;WD)"
        );
        let files = SddlOptions::new().with_type_info(FILE);
        let text = to_sddl_with(&sd, SecurityInformation::DACL, &files).unwrap();
        assert_eq!(text, "D:(A;;FA;;;BA)(A;;FRFW;;;SY)(A;;FRFX;;;WD)(D;;0x3;;;WD)");
        let reparsed = parse_sddl_with(&text, &files).unwrap();
        assert_eq!(reparsed.dacl, sd.dacl);
        assert_eq!(reparsed.generic_mapping, Some(FILE.mapping));

        let directory_service = SddlOptions::new().with_type_info(DIRECTORY_SERVICE);
        assert_eq!(
            to_sddl_with(&sd, SecurityInformation::DACL, &directory_service).unwrap(),
            "D:(A;;0x1f01ff;;;BA)(A;;0x12019f;;;SY)(A;;0x1200a9;;;WD)(D;;CCDC;;;WD)"
        );
    }

    #[test]
    fn object_ace_and_domain_aliases() {
        let domain: Sid = "S-1-5-21-1-2-3".parse().unwrap();
        let options = SddlOptions::new()
            .with_domain_sid(domain)
            .with_type_info(DIRECTORY_SERVICE);
        let text = "O:DAD:(OA;CIIO;RPWP;bf967aba-0de6-11d0-a285-00aa003049e2;;DU)";
        let sd = parse_sddl_with(text, &options).unwrap();
        assert_eq!(sd.owner.unwrap().sid, sid!("S-1-5-21-1-2-3-512"));
        let ace = &dacl_entries(&sd)[0];
        assert_eq!(ace.ace_type(), AceType::AccessAllowedObject);
        assert_eq!(
            ace.object_type(),
            Some("bf967aba-0de6-11d0-a285-00aa003049e2".parse::<Guid>().unwrap())
        );
        assert_eq!(ace.mask, ds::READ_PROPERTY | ds::WRITE_PROPERTY);
        assert_eq!(to_sddl_with(&sd, SecurityInformation::ALL, &options).unwrap(), text);
        assert_eq!(
            to_sddl(&sd, SecurityInformation::OWNER).unwrap(),
            "O:S-1-5-21-1-2-3-512"
        );
        assert!(matches!(parse_sddl("O:DA"), Err(Error::Syntax { position: 2, .. })));
    }

    #[test]
    fn conditional_ace() {
        let text = r#"D:(XA;;FX;;;WD;(@User.Title == "PM" && Member_of {SID(BA)}))"#;
        let sd = parse_sddl(text).unwrap();
        let ace = &dacl_entries(&sd)[0];
        assert_eq!(ace.mask, file::GENERIC_EXECUTE);
        let expected: Expression = condition::parse_expression(r#"@User.Title == "PM" && Member_of {SID(BA)}"#).unwrap();
        assert_eq!(ace.condition().unwrap().unwrap(), expected);
        let files = SddlOptions::new().with_type_info(FILE);
        assert_eq!(to_sddl_with(&sd, SecurityInformation::DACL, &files).unwrap(), text);
    }

    #[test]
    fn condition_errors_point_into_the_text() {
        let position = syntax_position("D:(XA;;FA;;;WD;(@User.Title ==))");
        assert!(position > 15, "position {position}");
    }

    #[test]
    fn label_and_resource_attribute() {
        let text = r#"S:(ML;;NW;;;LW)(RA;CI;;;;WD;("Project",TS,0x0,"Windows","SQL"))"#;
        let sd = parse_sddl(text).unwrap();
        let sacl = sd.sacl.as_ref().unwrap();
        assert_eq!(sacl.entries()[0], Ace::mandatory_label(LOW_MANDATORY_LEVEL, NO_WRITE_UP, AceFlags::empty()));
        let AceKind::SystemResourceAttribute(resource) = &sacl.entries()[1].kind else {
            panic!("expected a resource attribute ACE");
        };
        assert_eq!(
            resource.attribute,
            ClaimAttribute::new(
                "Project",
                ClaimAttributeFlags::empty(),
                ClaimValues::String(vec!["Windows".into(), "SQL".into()])
            )
        );
        assert_eq!(to_sddl(&sd, SecurityInformation::SACL).unwrap(), text);
        assert_eq!(to_sddl(&sd, SecurityInformation::LABEL).unwrap(), "S:(ML;;NW;;;LW)");

        let sd = parse_sddl(r#"S:(RA;;;;;WD;("n",TI,0,-3,0x10))(RA;;;;;WD;("b",TB,0,1,0))(RA;;;;;WD;("x",TX,0,#00ff,#))"#).unwrap();
        assert_eq!(
            to_sddl(&sd, SecurityInformation::SACL).unwrap(),
            r#"S:(RA;;;;;WD;("n",TI,0x0,-3,16))(RA;;;;;WD;("b",TB,0x0,1,0))(RA;;;;;WD;("x",TX,0x0,#00ff,#))"#
        );
    }

    #[test]
    fn unsupported_constructs() {
        let mut sd = SecurityDescriptor::new();
        sd.dacl = Some(
            [Ace::new(
                AceFlags::empty(),
                1,
                AceKind::SystemAlarmCallback(crate::ace::CallbackAce {
                    sid: WORLD,
                    condition: Vec::new(),
                }),
            )]
            .into_iter()
            .collect(),
        );
        assert!(matches!(
            to_sddl(&sd, SecurityInformation::DACL),
            Err(Error::UnsupportedConstruct(_))
        ));
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(syntax_position("X:SY"), 0);
        assert_eq!(syntax_position("O:SYO:BA"), 4);
        assert_eq!(syntax_position("D:(Q;;GA;;;WD)"), 3);
        assert_eq!(syntax_position("D:(A;;GA;;;WD"), 2);
        assert_eq!(syntax_position("D:(A;;GA;;WD)"), 2);
        assert_eq!(syntax_position("D:(A;XX;GA;;;WD)"), 5);
        assert_eq!(syntax_position("D:(A;;GAQQ;;;WD)"), 8);
        assert_eq!(syntax_position("D:(A;;GA;not-a-guid;;WD)"), 9);
        assert_eq!(syntax_position("D:(A;;GA;;;ZZ)"), 11);
        assert_eq!(syntax_position("D:(A;;GA;;;S-1-x)"), 11);
        assert_eq!(syntax_position("D:NO_ACCESS_CONTROL(A;;GA;;;WD)"), 31);
        assert_eq!(syntax_position("D:(A;;GA;;;WD)junk"), 14);
    }

    proptest! {
        #[test]
        fn dacl_round_trip(mut acl in arb_acl(), owner in any::<bool>()) {
            // Keep the ACE types SDDL can express.
            acl.remove_where(|ace| {
                ace.ace_type() != AceType::AccessAllowed && ace.ace_type() != AceType::AccessDenied
                    && ace.ace_type() != AceType::AccessAllowedObject
            });
            let mut sd = SecurityDescriptor::new();
            if owner {
                sd.owner = Some(SidEntry::new(BUILTIN_ADMINISTRATORS));
            }
            sd.dacl = Some(acl);
            let text = to_sddl(&sd, SecurityInformation::ALL).unwrap();
            let parsed = parse_sddl(&text).unwrap();
            prop_assert_eq!(parsed.owner, sd.owner);
            prop_assert_eq!(parsed.dacl, sd.dacl);
        }
    }
}
