use log::{debug, trace};

use super::{
    Ace, AceFlags, AceKind, AceType, CallbackAce, CallbackObjectAce, CompoundAce, ObjectAce,
    ObjectAceFlags, ResourceAttributeAce,
};
use crate::claim::ClaimAttribute;
use crate::condition;
use crate::error::{Error, Result};
use crate::utils::{Reader, patch_u16, put_u16, put_u32, wire_u16};
use crate::{Guid, Sid};

/// Size of `type | flags | size`.
pub const ACE_HEADER_SIZE: usize = 4;

fn read_object(body: &mut Reader<'_>) -> Result<ObjectAce> {
    let presence = ObjectAceFlags::from_bits_retain(body.u32()?);
    let object_type = presence
        .contains(ObjectAceFlags::OBJECT_TYPE_PRESENT)
        .then(|| Guid::read(body))
        .transpose()?;
    let inherited_object_type = presence
        .contains(ObjectAceFlags::INHERITED_OBJECT_TYPE_PRESENT)
        .then(|| Guid::read(body))
        .transpose()?;
    let sid = Sid::read(body)?;
    Ok(ObjectAce {
        object_type,
        inherited_object_type,
        sid,
    })
}

/// Application data after the SID. ACE padding that follows a well-formed `artx`
/// stream is dropped; anything else is kept verbatim.
fn read_condition(body: &mut Reader<'_>) -> Vec<u8> {
    let rest = body.rest();
    let len = condition::stream_len(rest).unwrap_or(rest.len());
    rest.get(..len).unwrap_or(rest).to_vec()
}

fn read_callback(body: &mut Reader<'_>) -> Result<CallbackAce> {
    let sid = Sid::read(body)?;
    let condition = read_condition(body);
    Ok(CallbackAce { sid, condition })
}

fn read_callback_object(body: &mut Reader<'_>) -> Result<CallbackObjectAce> {
    let object = read_object(body)?;
    let condition = read_condition(body);
    Ok(CallbackObjectAce { object, condition })
}

fn read_kind(ace_type: AceType, body: &mut Reader<'_>) -> Result<AceKind> {
    Ok(match ace_type {
        AceType::AccessAllowed => AceKind::AccessAllowed(Sid::read(body)?),
        AceType::AccessDenied => AceKind::AccessDenied(Sid::read(body)?),
        AceType::SystemAudit => AceKind::SystemAudit(Sid::read(body)?),
        AceType::SystemAlarm => AceKind::SystemAlarm(Sid::read(body)?),
        AceType::AccessAllowedCompound => {
            let compound_type = body.u16()?;
            let _reserved = body.u16()?;
            let server = Sid::read(body)?;
            let client = Sid::read(body)?;
            AceKind::AccessAllowedCompound(CompoundAce {
                compound_type,
                server,
                client,
            })
        }
        AceType::AccessAllowedObject => AceKind::AccessAllowedObject(read_object(body)?),
        AceType::AccessDeniedObject => AceKind::AccessDeniedObject(read_object(body)?),
        AceType::SystemAuditObject => AceKind::SystemAuditObject(read_object(body)?),
        AceType::SystemAlarmObject => AceKind::SystemAlarmObject(read_object(body)?),
        AceType::AccessAllowedCallback => AceKind::AccessAllowedCallback(read_callback(body)?),
        AceType::AccessDeniedCallback => AceKind::AccessDeniedCallback(read_callback(body)?),
        AceType::SystemAuditCallback => AceKind::SystemAuditCallback(read_callback(body)?),
        AceType::SystemAlarmCallback => AceKind::SystemAlarmCallback(read_callback(body)?),
        AceType::AccessAllowedCallbackObject => {
            AceKind::AccessAllowedCallbackObject(read_callback_object(body)?)
        }
        AceType::AccessDeniedCallbackObject => {
            AceKind::AccessDeniedCallbackObject(read_callback_object(body)?)
        }
        AceType::SystemAuditCallbackObject => {
            AceKind::SystemAuditCallbackObject(read_callback_object(body)?)
        }
        AceType::SystemAlarmCallbackObject => {
            AceKind::SystemAlarmCallbackObject(read_callback_object(body)?)
        }
        AceType::SystemMandatoryLabel => AceKind::SystemMandatoryLabel(Sid::read(body)?),
        AceType::SystemResourceAttribute => {
            let sid = Sid::read(body)?;
            let base = body.offset();
            let attribute = ClaimAttribute::from_bytes(body.rest(), base)?;
            AceKind::SystemResourceAttribute(ResourceAttributeAce { sid, attribute })
        }
        AceType::SystemScopedPolicyId => AceKind::SystemScopedPolicyId(Sid::read(body)?),
        AceType::SystemProcessTrustLabel => AceKind::SystemProcessTrustLabel(Sid::read(body)?),
        AceType::SystemAccessFilter => AceKind::SystemAccessFilter(read_callback(body)?),
    })
}

fn read_body(ace_type: AceType, body: &mut Reader<'_>) -> Result<(u32, AceKind)> {
    let mask = body.u32()?;
    Ok((mask, read_kind(ace_type, body)?))
}

fn write_object(object: &ObjectAce, out: &mut Vec<u8>) {
    put_u32(out, object.presence().bits());
    if let Some(guid) = object.object_type {
        out.extend_from_slice(&guid.to_bytes_le());
    }
    if let Some(guid) = object.inherited_object_type {
        out.extend_from_slice(&guid.to_bytes_le());
    }
    object.sid.write_to(out);
}

impl Ace {
    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let offset = reader.offset();
        let available = reader.remaining();
        if available < ACE_HEADER_SIZE {
            return Err(Error::TruncatedBuffer {
                offset,
                needed: ACE_HEADER_SIZE,
                available,
            });
        }
        let raw_type = reader.u8()?;
        let flags = AceFlags::from_bits_retain(reader.u8()?);
        let size = usize::from(reader.u16()?);
        if size < ACE_HEADER_SIZE {
            return Err(Error::InconsistentSize {
                offset,
                declared: size,
                consumed: ACE_HEADER_SIZE,
            });
        }
        if size > available {
            return Err(Error::TruncatedBuffer {
                offset,
                needed: size,
                available,
            });
        }
        let ace_type = AceType::try_from(raw_type).map_err(|_| Error::UnknownAceType {
            offset,
            ace_type: raw_type,
        })?;
        let mut body = reader.sub_reader(size - ACE_HEADER_SIZE)?;
        let (mask, kind) = read_body(ace_type, &mut body).map_err(|err| match err {
            // The body ran past the declared size, not past the caller's buffer.
            Error::TruncatedBuffer {
                offset: at, needed, ..
            } if at >= offset => Error::InconsistentSize {
                offset,
                declared: size,
                consumed: at - offset + needed,
            },
            other => other,
        })?;
        if !body.is_empty() {
            debug!(
                "skipping {} padding bytes after {ace_type:?} ACE at offset {offset}",
                body.remaining()
            );
        }
        trace!("read {ace_type:?} ACE ({size} bytes) at offset {offset}");
        Ok(Self { flags, mask, kind })
    }

    /// Parses one ACE at the start of `buf`, returning it with the number of bytes
    /// consumed (the declared size, padding included).
    ///
    /// # Errors
    /// [`Error::TruncatedBuffer`] when the header or the declared size exceeds `buf`,
    /// [`Error::UnknownAceType`] for unrecognized type bytes,
    /// [`Error::InconsistentSize`] when the body needs more bytes than declared.
    #[inline]
    pub fn read_from(buf: &[u8]) -> Result<(Self, usize)> {
        let mut reader = Reader::new(buf);
        let ace = Self::read(&mut reader)?;
        Ok((ace, reader.position()))
    }

    /// Appends the binary form, padded to a 4-byte boundary, to `out`.
    ///
    /// # Errors
    /// [`Error::TooLarge`] when the ACE does not fit its 16-bit size field. `out` is
    /// left unchanged in that case.
    #[inline]
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        let start = out.len();
        self.write_body(out).inspect_err(|_| out.truncate(start))
    }

    fn write_body(&self, out: &mut Vec<u8>) -> Result<()> {
        let start = out.len();
        out.push(self.ace_type().into());
        out.push(self.flags.bits());
        put_u16(out, 0);
        put_u32(out, self.mask);
        match &self.kind {
            AceKind::AccessAllowed(sid)
            | AceKind::AccessDenied(sid)
            | AceKind::SystemAudit(sid)
            | AceKind::SystemAlarm(sid)
            | AceKind::SystemMandatoryLabel(sid)
            | AceKind::SystemScopedPolicyId(sid)
            | AceKind::SystemProcessTrustLabel(sid) => sid.write_to(out),
            AceKind::AccessAllowedCompound(compound) => {
                put_u16(out, compound.compound_type);
                put_u16(out, 0);
                compound.server.write_to(out);
                compound.client.write_to(out);
            }
            AceKind::AccessAllowedObject(object)
            | AceKind::AccessDeniedObject(object)
            | AceKind::SystemAuditObject(object)
            | AceKind::SystemAlarmObject(object) => write_object(object, out),
            AceKind::AccessAllowedCallback(callback)
            | AceKind::AccessDeniedCallback(callback)
            | AceKind::SystemAuditCallback(callback)
            | AceKind::SystemAlarmCallback(callback)
            | AceKind::SystemAccessFilter(callback) => {
                callback.sid.write_to(out);
                out.extend_from_slice(&callback.condition);
            }
            AceKind::AccessAllowedCallbackObject(callback)
            | AceKind::AccessDeniedCallbackObject(callback)
            | AceKind::SystemAuditCallbackObject(callback)
            | AceKind::SystemAlarmCallbackObject(callback) => {
                write_object(&callback.object, out);
                out.extend_from_slice(&callback.condition);
            }
            AceKind::SystemResourceAttribute(resource) => {
                resource.sid.write_to(out);
                resource.attribute.write_to(out)?;
            }
        }
        while (out.len() - start) % 4 != 0 {
            out.push(0);
        }
        let len = wire_u16("ACE", out.len() - start)?;
        patch_u16(out, start + 2, len);
        Ok(())
    }

    /// The binary form.
    ///
    /// # Errors
    /// [`Error::TooLarge`] when the ACE does not fit its 16-bit size field.
    #[inline]
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(ACE_HEADER_SIZE + 4 + self.sid().binary_len());
        self.write_to(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Unwrap is not an issue in test")]
mod test {
    use super::*;
    use crate::ace::test::arb_ace;
    use crate::condition::{encode, parse_expression};
    use crate::well_known;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn binary_round_trip(ace in arb_ace()) {
            let bytes = ace.to_bytes().unwrap();
            prop_assert_eq!(bytes.len() % 4, 0);
            let (parsed, consumed) = Ace::read_from(&bytes).unwrap();
            prop_assert_eq!(consumed, bytes.len());
            prop_assert_eq!(parsed, ace);
        }

        #[test]
        fn truncation_is_reported(ace in arb_ace(), cut in 0usize..64) {
            let bytes = ace.to_bytes().unwrap();
            let cut = cut.min(bytes.len() - 1);
            let is_truncated = matches!(
                Ace::read_from(&bytes[..cut]),
                Err(Error::TruncatedBuffer { .. })
            );
            prop_assert!(is_truncated);
        }
    }

    #[test]
    fn allowed_ace_layout() {
        let ace = Ace::allowed(well_known::LOCAL_SYSTEM, 0x001F_01FF, AceFlags::OBJECT_INHERIT);
        assert_eq!(
            ace.to_bytes().unwrap(),
            [0, 1, 20, 0, 0xFF, 0x01, 0x1F, 0x00, 1, 1, 0, 0, 0, 0, 0, 5, 18, 0, 0, 0]
        );
    }

    #[test]
    fn object_guids_are_omitted_when_absent() {
        let mut object = ObjectAce::new(well_known::WORLD);
        let bare = Ace::new(AceFlags::empty(), 0x10, AceKind::AccessAllowedObject(object.clone()));
        assert_eq!(bare.to_bytes().unwrap().len(), 4 + 4 + 4 + 12);
        object.inherited_object_type = Some("bf967aba-0de6-11d0-a285-00aa003049e2".parse().unwrap());
        let with_inherited = Ace::new(AceFlags::empty(), 0x10, AceKind::AccessAllowedObject(object));
        let bytes = with_inherited.to_bytes().unwrap();
        assert_eq!(bytes.len(), 4 + 4 + 4 + 16 + 12);
        assert_eq!(bytes[8], 2);
        assert_eq!(Ace::read_from(&bytes).unwrap().0, with_inherited);
    }

    #[test]
    fn trailing_padding_is_skipped() {
        let mut bytes = Ace::denied(well_known::WORLD, 1, AceFlags::empty()).to_bytes().unwrap();
        bytes.extend_from_slice(&[0; 8]);
        bytes[2] = 24;
        let (ace, consumed) = Ace::read_from(&bytes).unwrap();
        assert_eq!(consumed, 24);
        assert_eq!(ace, Ace::denied(well_known::WORLD, 1, AceFlags::empty()));
    }

    #[test]
    fn malformed_headers() {
        assert_eq!(
            Ace::read_from(&[0x42, 0, 8, 0, 0, 0, 0, 0]),
            Err(Error::UnknownAceType {
                offset: 0,
                ace_type: 0x42
            })
        );
        assert_eq!(
            Ace::read_from(&[0, 0, 2, 0]),
            Err(Error::InconsistentSize {
                offset: 0,
                declared: 2,
                consumed: 4
            })
        );
        assert_eq!(
            Ace::read_from(&[0, 0, 40, 0, 0, 0, 0, 0]),
            Err(Error::TruncatedBuffer {
                offset: 0,
                needed: 40,
                available: 8
            })
        );
    }

    #[test]
    fn body_longer_than_declared_size_is_inconsistent() {
        let mut bytes = Ace::allowed(well_known::WORLD, 1, AceFlags::empty()).to_bytes().unwrap();
        bytes[2] = 12;
        assert_eq!(
            Ace::read_from(&bytes),
            Err(Error::InconsistentSize {
                offset: 0,
                declared: 12,
                consumed: 16
            })
        );
    }

    #[test]
    fn oversized_callback_is_rejected() {
        let ace = Ace::new(
            AceFlags::empty(),
            1,
            AceKind::AccessAllowedCallback(CallbackAce {
                sid: well_known::WORLD,
                condition: vec![0; 70_000],
            }),
        );
        assert_eq!(
            ace.to_bytes(),
            Err(Error::TooLarge {
                component: "ACE",
                len: 70_020,
                max: 65_535
            })
        );
        let mut out = vec![0xAA];
        assert!(ace.write_to(&mut out).is_err());
        assert_eq!(out, [0xAA]);
    }

    #[test]
    fn padding_after_condition_is_dropped() {
        let condition = encode(&parse_expression("@User.Title == \"PM\"").unwrap()).unwrap();
        let ace = Ace::new(
            AceFlags::empty(),
            0x10,
            AceKind::AccessAllowedCallback(CallbackAce {
                sid: well_known::WORLD,
                condition,
            }),
        );
        let bytes = ace.to_bytes().unwrap();
        let mut padded = bytes.clone();
        padded.extend_from_slice(&[0; 8]);
        padded[2] += 8;
        let (read, consumed) = Ace::read_from(&padded).unwrap();
        assert_eq!(consumed, padded.len());
        assert_eq!(read, ace);
        assert_eq!(read.to_bytes().unwrap(), bytes);
    }
}
