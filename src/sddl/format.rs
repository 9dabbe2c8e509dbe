use core::fmt::Write as _;

use super::SddlOptions;
use super::tables::{self, ACE_FLAGS, ACL_FLAGS, NO_ACCESS_CONTROL};
use crate::ace::{Ace, AceFlags, AceKind, AceType};
use crate::acl::Acl;
use crate::claim::{ClaimAttribute, ClaimValues};
use crate::error::{Error, Result};
use crate::generic_mapping::{MANDATORY_LABEL_RIGHTS, STANDARD_RIGHTS};
use crate::{Sid, well_known};

pub(super) struct Writer<'a> {
    options: &'a SddlOptions,
    out: String,
}

impl<'a> Writer<'a> {
    pub(super) const fn new(options: &'a SddlOptions) -> Self {
        Self {
            options,
            out: String::new(),
        }
    }

    pub(super) fn finish(self) -> String {
        self.out
    }

    pub(super) fn section_sid(&mut self, marker: &str, sid: &Sid) {
        self.out.push_str(marker);
        self.sid(sid);
    }

    fn sid(&mut self, sid: &Sid) {
        match well_known::sid_to_alias(sid, self.options.domain_sid.as_ref()) {
            Some(alias) => self.out.push_str(alias),
            None => {
                let _ = write!(self.out, "{sid}");
            }
        }
    }

    pub(super) fn acl(&mut self, marker: &str, acl: &Acl, include: impl Fn(&Ace) -> bool) -> Result<()> {
        self.out.push_str(marker);
        for (name, flag) in ACL_FLAGS {
            if acl.flags().contains(*flag) {
                self.out.push_str(name);
            }
        }
        if acl.is_null() {
            self.out.push_str(NO_ACCESS_CONTROL);
        }
        for ace in acl.iter().filter(|ace| include(ace)) {
            self.ace(ace)?;
        }
        Ok(())
    }

    fn ace(&mut self, ace: &Ace) -> Result<()> {
        let ace_type = ace.ace_type();
        let name = tables::ace_type_name(ace_type)
            .ok_or(Error::UnsupportedConstruct("ACE type without an SDDL abbreviation"))?;
        self.out.push('(');
        self.out.push_str(name);
        self.out.push(';');
        self.ace_flags(ace.flags, ace_type);
        self.out.push(';');
        self.rights(ace.mask, ace_type);
        self.out.push(';');
        if let Some(guid) = ace.object_type() {
            let _ = write!(self.out, "{guid}");
        }
        self.out.push(';');
        if let Some(guid) = ace.inherited_object_type() {
            let _ = write!(self.out, "{guid}");
        }
        self.out.push(';');
        self.sid(ace.sid());
        if let Some(condition) = ace.condition() {
            let _ = write!(self.out, ";({})", condition?);
        }
        if let AceKind::SystemResourceAttribute(resource) = &ace.kind {
            self.out.push(';');
            self.claim(&resource.attribute)?;
        }
        self.out.push(')');
        Ok(())
    }

    fn ace_flags(&mut self, flags: AceFlags, ace_type: AceType) {
        let trust_label = ace_type == AceType::SystemProcessTrustLabel;
        for (name, flag) in ACE_FLAGS {
            let skip = match *name {
                "SA" => trust_label,
                "TP" => !trust_label,
                _ => false,
            };
            if !skip && flags.contains(*flag) {
                self.out.push_str(name);
            }
        }
    }

    /// Letters when the whole mask is covered by abbreviations, hexadecimal otherwise.
    fn rights(&mut self, mask: u32, ace_type: AceType) {
        if mask == 0 {
            return;
        }
        let specific: &[(&str, u32)] = if ace_type == AceType::SystemMandatoryLabel {
            MANDATORY_LABEL_RIGHTS
        } else {
            self.options.type_info.as_ref().map_or(&[][..], |info| info.rights)
        };
        let mut remaining = mask;
        let mut letters = String::new();
        for (name, right) in specific.iter().chain(STANDARD_RIGHTS) {
            if *right != 0 && mask & right == *right && remaining & right != 0 {
                letters.push_str(name);
                remaining &= !right;
            }
        }
        if remaining == 0 {
            self.out.push_str(&letters);
        } else {
            let _ = write!(self.out, "0x{mask:x}");
        }
    }

    fn claim(&mut self, claim: &ClaimAttribute) -> Result<()> {
        let quoted = |text: &str| -> Result<String> {
            if text.contains(['"', '\\']) {
                return Err(Error::UnsupportedConstruct("quote or backslash in an SDDL claim string"));
            }
            Ok(format!("\"{text}\""))
        };
        let value_type = tables::claim_type_name(claim.values.value_type())
            .ok_or(Error::UnsupportedConstruct("FQBN claim values in SDDL"))?;
        let _ = write!(
            self.out,
            "({},{value_type},0x{:x}",
            quoted(&claim.name)?,
            claim.flags.bits()
        );
        match &claim.values {
            ClaimValues::Int64(values) => values.iter().for_each(|v| {
                let _ = write!(self.out, ",{v}");
            }),
            ClaimValues::Uint64(values) => values.iter().for_each(|v| {
                let _ = write!(self.out, ",{v}");
            }),
            ClaimValues::Boolean(values) => values.iter().for_each(|v| {
                let _ = write!(self.out, ",{}", u8::from(*v));
            }),
            ClaimValues::String(values) => {
                for value in values {
                    self.out.push(',');
                    self.out.push_str(&quoted(value)?);
                }
            }
            ClaimValues::Sid(values) => {
                for sid in values {
                    self.out.push(',');
                    self.sid(sid);
                }
            }
            ClaimValues::OctetString(values) => {
                for value in values {
                    self.out.push_str(",#");
                    for byte in value {
                        let _ = write!(self.out, "{byte:02x}");
                    }
                }
            }
            ClaimValues::Fqbn(_) => return Err(Error::UnsupportedConstruct("FQBN claim values in SDDL")),
        }
        self.out.push(')');
        Ok(())
    }
}
