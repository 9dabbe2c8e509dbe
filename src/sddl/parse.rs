use log::trace;

use super::SddlOptions;
use super::tables::{self, ACL_FLAGS, NO_ACCESS_CONTROL};
use crate::ace::{Ace, AceFlags, AceKind, AceType, CallbackAce, CallbackObjectAce, ObjectAce, ResourceAttributeAce};
use crate::acl::{Acl, AclFlags};
use crate::claim::{ClaimAttribute, ClaimAttributeFlags, ClaimValueType, ClaimValues};
use crate::condition;
use crate::error::{Error, Result};
use crate::generic_mapping::{DIRECTORY_SERVICE, FILE, MANDATORY_LABEL_RIGHTS, REGISTRY_KEY, STANDARD_RIGHTS};
use crate::security_descriptor::{SecurityDescriptor, SidEntry};
use crate::{Guid, Sid, well_known};

const fn is_marker(c: char) -> bool {
    matches!(c, 'O' | 'G' | 'D' | 'S')
}

/// Byte range of an ACE field within the text.
#[derive(Debug, Clone, Copy)]
struct Field {
    start: usize,
    end: usize,
}

pub(super) struct Parser<'a> {
    text: &'a str,
    pos: usize,
    options: &'a SddlOptions,
}

impl<'a> Parser<'a> {
    pub(super) const fn new(text: &'a str, options: &'a SddlOptions) -> Self {
        Self {
            text,
            pos: 0,
            options,
        }
    }

    fn position(&self, at: usize) -> usize {
        self.text.get(..at).map_or(at, |prefix| prefix.chars().count())
    }

    fn error(&self, at: usize, message: impl Into<String>) -> Error {
        Error::syntax(self.position(at), message)
    }

    fn rest(&self) -> &'a str {
        self.text.get(self.pos..).unwrap_or_default()
    }

    fn slice(&self, field: Field) -> &'a str {
        self.text.get(field.start..field.end).unwrap_or_default()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    pub(super) fn descriptor(mut self) -> Result<SecurityDescriptor> {
        let mut sd = SecurityDescriptor::new();
        let mut seen = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(marker) = self.bump() else {
                break;
            };
            if !is_marker(marker) || !self.eat(":") {
                return Err(self.error(start, "expected one of O:, G:, D: or S:"));
            }
            if seen.contains(&marker) {
                return Err(self.error(start, format!("duplicate {marker}: section")));
            }
            seen.push(marker);
            trace!("SDDL section {marker}: at {start}");
            match marker {
                'O' => sd.owner = Some(SidEntry::new(self.section_sid()?)),
                'G' => sd.group = Some(SidEntry::new(self.section_sid()?)),
                'D' => sd.dacl = Some(self.acl()?),
                _ => sd.sacl = Some(self.acl()?),
            }
        }
        sd.generic_mapping = self.options.type_info.map(|info| info.mapping);
        Ok(sd)
    }

    /// The owner or group SID, which runs up to the next section marker.
    fn section_sid(&mut self) -> Result<Sid> {
        let start = self.pos;
        let mut chars = self.rest().char_indices().peekable();
        let mut end = self.text.len();
        while let Some((i, c)) = chars.next() {
            if is_marker(c) && chars.peek().is_some_and(|(_, next)| *next == ':') {
                end = start + i;
                break;
            }
        }
        self.pos = end;
        let raw = self.text.get(start..end).unwrap_or_default();
        let text = raw.trim();
        if text.is_empty() {
            return Err(self.error(start, "missing SID"));
        }
        self.sid(text, start + (raw.len() - raw.trim_start().len()))
    }

    fn sid(&self, text: &str, at: usize) -> Result<Sid> {
        if text.len() == 2 && text.bytes().all(|b| b.is_ascii_alphabetic()) {
            return well_known::alias_to_sid(text, self.options.domain_sid.as_ref())
                .ok_or_else(|| self.error(at, format!("unknown or unresolvable SID alias \"{text}\"")));
        }
        text.parse::<Sid>()
            .map_err(|err| self.error(at, format!("invalid SID \"{text}\": {err}")))
    }

    fn acl(&mut self) -> Result<Acl> {
        let mut flags = AclFlags::empty();
        let mut null = false;
        'flags: loop {
            if self.eat(NO_ACCESS_CONTROL) {
                null = true;
                continue;
            }
            for (name, flag) in ACL_FLAGS {
                if self.eat(name) {
                    flags |= *flag;
                    continue 'flags;
                }
            }
            break;
        }
        let mut entries = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some('(') {
                break;
            }
            entries.push(self.ace()?);
        }
        let mut acl = if null {
            if !entries.is_empty() {
                return Err(self.error(self.pos, "a NO_ACCESS_CONTROL list cannot hold ACEs"));
            }
            Acl::null()
        } else {
            entries.into_iter().collect()
        };
        acl.set_flags(flags);
        Ok(acl)
    }

    /// Splits `(f1;f2;...)` on top-level semicolons, skipping string literals and nested
    /// parentheses of conditions and claims.
    fn ace_fields(&mut self) -> Result<Vec<Field>> {
        let open = self.pos;
        self.bump();
        let mut fields = Vec::new();
        let mut field_start = self.pos;
        let mut depth = 1usize;
        let mut in_string = false;
        while let Some(c) = self.bump() {
            match c {
                '\\' if in_string => {
                    self.bump();
                }
                '"' => in_string = !in_string,
                _ if in_string => {}
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        fields.push(Field {
                            start: field_start,
                            end: self.pos - 1,
                        });
                        return Ok(fields);
                    }
                }
                ';' if depth == 1 => {
                    fields.push(Field {
                        start: field_start,
                        end: self.pos - 1,
                    });
                    field_start = self.pos;
                }
                _ => {}
            }
        }
        Err(self.error(open, "unterminated ACE"))
    }

    fn ace(&mut self) -> Result<Ace> {
        let open = self.pos;
        let fields = self.ace_fields()?;
        let [kind, flags, rights, object, inherited, sid, extra @ ..] = fields.as_slice() else {
            return Err(self.error(open, "an ACE needs at least 6 fields"));
        };
        if extra.len() > 1 {
            return Err(self.error(open, "an ACE has at most 7 fields"));
        }
        let ace_type = tables::ace_type(self.slice(*kind).trim())
            .ok_or_else(|| self.error(kind.start, format!("unknown ACE type \"{}\"", self.slice(*kind))))?;
        let flags = self.ace_flags(*flags)?;
        let mask = self.rights(*rights, ace_type)?;
        let object_type = self.guid(*object)?;
        let inherited_object_type = self.guid(*inherited)?;
        let sid = self.sid(self.slice(*sid).trim(), sid.start)?;
        let extra = extra.first().copied();

        let object = ObjectAce {
            object_type,
            inherited_object_type,
            sid,
        };
        let takes_guids = matches!(
            ace_type,
            AceType::AccessAllowedObject
                | AceType::AccessDeniedObject
                | AceType::SystemAuditObject
                | AceType::SystemAlarmObject
                | AceType::AccessAllowedCallbackObject
        );
        if !takes_guids && (object_type.is_some() || inherited_object_type.is_some()) {
            return Err(self.error(open, "object GUIDs on an ACE type that has none"));
        }
        let takes_condition = matches!(
            ace_type,
            AceType::AccessAllowedCallback
                | AceType::AccessDeniedCallback
                | AceType::SystemAuditCallback
                | AceType::AccessAllowedCallbackObject
                | AceType::SystemAccessFilter
        );
        let condition = match extra {
            Some(field) if takes_condition => self.condition(field)?,
            None if takes_condition => Vec::new(),
            Some(field) if ace_type != AceType::SystemResourceAttribute => {
                return Err(self.error(field.start, "unexpected seventh ACE field"));
            }
            _ => Vec::new(),
        };
        let callback = CallbackAce {
            sid,
            condition: condition.clone(),
        };

        let kind = match ace_type {
            AceType::AccessAllowed => AceKind::AccessAllowed(sid),
            AceType::AccessDenied => AceKind::AccessDenied(sid),
            AceType::SystemAudit => AceKind::SystemAudit(sid),
            AceType::SystemAlarm => AceKind::SystemAlarm(sid),
            AceType::AccessAllowedObject => AceKind::AccessAllowedObject(object),
            AceType::AccessDeniedObject => AceKind::AccessDeniedObject(object),
            AceType::SystemAuditObject => AceKind::SystemAuditObject(object),
            AceType::SystemAlarmObject => AceKind::SystemAlarmObject(object),
            AceType::AccessAllowedCallback => AceKind::AccessAllowedCallback(callback),
            AceType::AccessDeniedCallback => AceKind::AccessDeniedCallback(callback),
            AceType::SystemAuditCallback => AceKind::SystemAuditCallback(callback),
            AceType::SystemAccessFilter => AceKind::SystemAccessFilter(callback),
            AceType::AccessAllowedCallbackObject => {
                AceKind::AccessAllowedCallbackObject(CallbackObjectAce { object, condition })
            }
            AceType::SystemMandatoryLabel => AceKind::SystemMandatoryLabel(sid),
            AceType::SystemScopedPolicyId => AceKind::SystemScopedPolicyId(sid),
            AceType::SystemProcessTrustLabel => AceKind::SystemProcessTrustLabel(sid),
            AceType::SystemResourceAttribute => {
                let field = extra.ok_or_else(|| self.error(open, "resource attribute ACE without a claim"))?;
                AceKind::SystemResourceAttribute(ResourceAttributeAce {
                    sid,
                    attribute: self.claim(field)?,
                })
            }
            _ => return Err(Error::UnsupportedConstruct("ACE type without an SDDL abbreviation")),
        };
        Ok(Ace::new(flags, mask, kind))
    }

    fn ace_flags(&self, field: Field) -> Result<AceFlags> {
        let text = self.slice(field).trim();
        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            return u8::from_str_radix(hex, 16)
                .map(AceFlags::from_bits_retain)
                .map_err(|_| self.error(field.start, format!("invalid ACE flags \"{text}\"")));
        }
        let mut flags = AceFlags::empty();
        for i in (0..text.len()).step_by(2) {
            let flag = text
                .get(i..i + 2)
                .and_then(tables::ace_flag)
                .ok_or_else(|| self.error(field.start + i, format!("unknown ACE flag in \"{text}\"")))?;
            flags |= flag;
        }
        Ok(flags)
    }

    fn right(&self, abbreviation: &str, ace_type: AceType) -> Option<u32> {
        let find = |table: &[(&str, u32)]| {
            table
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(abbreviation))
                .map(|(_, mask)| *mask)
        };
        if ace_type == AceType::SystemMandatoryLabel {
            return find(MANDATORY_LABEL_RIGHTS).or_else(|| find(STANDARD_RIGHTS));
        }
        match &self.options.type_info {
            Some(info) => info.right(abbreviation),
            None => find(STANDARD_RIGHTS)
                .or_else(|| find(FILE.rights))
                .or_else(|| find(REGISTRY_KEY.rights))
                .or_else(|| find(DIRECTORY_SERVICE.rights)),
        }
    }

    fn rights(&self, field: Field, ace_type: AceType) -> Result<u32> {
        let text = self.slice(field).trim();
        if text.is_empty() {
            return Ok(0);
        }
        if text.starts_with(|c: char| c.is_ascii_digit()) {
            return parse_number(text)
                .and_then(|value| u32::try_from(value).ok())
                .ok_or_else(|| self.error(field.start, format!("invalid access mask \"{text}\"")));
        }
        let mut mask = 0;
        for i in (0..text.len()).step_by(2) {
            let right = text
                .get(i..i + 2)
                .and_then(|abbreviation| self.right(abbreviation, ace_type))
                .ok_or_else(|| self.error(field.start + i, format!("unknown access right in \"{text}\"")))?;
            mask |= right;
        }
        Ok(mask)
    }

    fn guid(&self, field: Field) -> Result<Option<Guid>> {
        let text = self.slice(field).trim();
        if text.is_empty() {
            return Ok(None);
        }
        text.parse()
            .map(Some)
            .map_err(|_| self.error(field.start, format!("invalid GUID \"{text}\"")))
    }

    fn condition(&self, field: Field) -> Result<Vec<u8>> {
        let text = self.slice(field);
        let expression = condition::parse_expression_with(text, self.options.domain_sid.as_ref())
            .map_err(|err| match err {
                Error::Syntax { position, message } => Error::Syntax {
                    position: self.position(field.start) + position,
                    message,
                },
                other => other,
            })?;
        condition::encode(&expression)
    }

    fn claim(&self, field: Field) -> Result<ClaimAttribute> {
        let text = self.slice(field).trim();
        let inner = text
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| self.error(field.start, "a claim is written (\"name\",type,flags,values...)"))?;
        let parts = split_claim(inner);
        let [name, value_type, flags, values @ ..] = parts.as_slice() else {
            return Err(self.error(field.start, "a claim needs a name, a type and flags"));
        };
        let name = unquote(name).ok_or_else(|| self.error(field.start, "claim name must be quoted"))?;
        let value_type = tables::claim_type(value_type)
            .ok_or_else(|| self.error(field.start, format!("unknown claim type \"{value_type}\"")))?;
        let flags = parse_number(flags)
            .and_then(|value| u32::try_from(value).ok())
            .map(ClaimAttributeFlags::from_bits_retain)
            .ok_or_else(|| self.error(field.start, format!("invalid claim flags \"{flags}\"")))?;
        let invalid = |value: &str| self.error(field.start, format!("invalid claim value \"{value}\""));
        let values = match value_type {
            ClaimValueType::Int64 => ClaimValues::Int64(
                values
                    .iter()
                    .map(|v| parse_number(v).and_then(|n| i64::try_from(n).ok()).ok_or_else(|| invalid(v)))
                    .collect::<Result<_>>()?,
            ),
            ClaimValueType::Uint64 => ClaimValues::Uint64(
                values
                    .iter()
                    .map(|v| parse_number(v).and_then(|n| u64::try_from(n).ok()).ok_or_else(|| invalid(v)))
                    .collect::<Result<_>>()?,
            ),
            ClaimValueType::Boolean => ClaimValues::Boolean(
                values
                    .iter()
                    .map(|v| parse_number(v).map(|n| n != 0).ok_or_else(|| invalid(v)))
                    .collect::<Result<_>>()?,
            ),
            ClaimValueType::String => ClaimValues::String(
                values
                    .iter()
                    .map(|v| unquote(v).map(str::to_owned).ok_or_else(|| invalid(v)))
                    .collect::<Result<_>>()?,
            ),
            ClaimValueType::Sid => ClaimValues::Sid(
                values
                    .iter()
                    .map(|v| {
                        let sid = v
                            .strip_prefix("SID(")
                            .and_then(|rest| rest.strip_suffix(')'))
                            .unwrap_or(v);
                        self.sid(sid.trim(), field.start)
                    })
                    .collect::<Result<_>>()?,
            ),
            ClaimValueType::OctetString => ClaimValues::OctetString(
                values
                    .iter()
                    .map(|v| parse_hex(v.strip_prefix('#').unwrap_or(v)).ok_or_else(|| invalid(v)))
                    .collect::<Result<_>>()?,
            ),
            ClaimValueType::Fqbn => return Err(Error::UnsupportedConstruct("FQBN claim values in SDDL")),
        };
        Ok(ClaimAttribute::new(name, flags, values))
    }
}

/// Splits claim parts on commas outside of string literals, trimming each part.
fn split_claim(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            ',' if !in_string => {
                parts.push(text.get(start..i).unwrap_or_default().trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text.get(start..).unwrap_or_default().trim());
    parts
}

fn unquote(text: &str) -> Option<&str> {
    text.strip_prefix('"')?.strip_suffix('"')
}

/// Parses a number the way `wcstoul` with base 0 does: `0x` hexadecimal, leading `0` octal,
/// otherwise decimal, with an optional sign.
fn parse_number(text: &str) -> Option<i128> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let (radix, body) = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, digits.get(1..)?)
    } else {
        (10, digits)
    };
    if !body.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = i128::from_str_radix(body, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| text.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(parse_number("0x1F"), Some(31));
        assert_eq!(parse_number("017"), Some(15));
        assert_eq!(parse_number("-5"), Some(-5));
        assert_eq!(parse_number("0"), Some(0));
        assert_eq!(parse_number("--5"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn claim_parts() {
        assert_eq!(
            split_claim(r#""a,b", TS ,0,"x\"y""#),
            [r#""a,b""#, "TS", "0", r#""x\"y""#]
        );
    }
}
