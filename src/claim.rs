//! Claim security attributes carried by resource-attribute ACEs.
//!
//! The binary form is `CLAIM_SECURITY_ATTRIBUTE_RELATIVE_V1`: a fixed header whose
//! name and values are referenced by offsets from the start of the structure.
//!
//! ```text
//! name_offset:4 | value_type:2 | reserved:2 | flags:4 | value_count:4 | value_offsets: count x 4
//! ```

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::Sid;
use crate::error::{Error, Result};
use crate::utils::{Reader, decode_utf16z, encode_utf16, patch_u32, put_u16, put_u32, put_u64, wire_u32};

const HEADER_SIZE: usize = 16;

/// Claim value type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum ClaimValueType {
    /// Signed 64-bit integers (`TI`).
    Int64 = 0x0001,
    /// Unsigned 64-bit integers (`TU`).
    Uint64 = 0x0002,
    /// Strings (`TS`).
    String = 0x0003,
    /// Fully qualified binary names.
    Fqbn = 0x0004,
    /// SIDs (`TD`).
    Sid = 0x0005,
    /// Booleans (`TB`).
    Boolean = 0x0006,
    /// Octet strings (`TX`).
    OctetString = 0x0010,
}

bitflags! {
    /// `CLAIM_SECURITY_ATTRIBUTE_*` flags. The high 16 bits are reserved for callers
    /// and preserved as-is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClaimAttributeFlags: u32 {
        /// The attribute is not inherited.
        const NON_INHERITABLE = 0x0001;
        /// String comparisons are case sensitive.
        const VALUE_CASE_SENSITIVE = 0x0002;
        /// Only used in deny ACEs.
        const USE_FOR_DENY_ONLY = 0x0004;
        /// Disabled unless explicitly enabled.
        const DISABLED_BY_DEFAULT = 0x0008;
        /// Disabled.
        const DISABLED = 0x0010;
        /// Mandatory.
        const MANDATORY = 0x0020;

        const _ = !0;
    }
}

/// Fully qualified binary name value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FqbnValue {
    /// Version number.
    pub version: u64,
    /// Binary name.
    pub name: String,
}

/// Typed value set of a claim attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClaimValues {
    /// `TI`
    Int64(Vec<i64>),
    /// `TU`
    Uint64(Vec<u64>),
    /// `TS`
    String(Vec<String>),
    /// No SDDL representation.
    Fqbn(Vec<FqbnValue>),
    /// `TD`
    Sid(Vec<Sid>),
    /// `TB`
    Boolean(Vec<bool>),
    /// `TX`
    OctetString(Vec<Vec<u8>>),
}

impl ClaimValues {
    /// The wire type code.
    #[inline]
    #[must_use]
    pub const fn value_type(&self) -> ClaimValueType {
        match self {
            Self::Int64(_) => ClaimValueType::Int64,
            Self::Uint64(_) => ClaimValueType::Uint64,
            Self::String(_) => ClaimValueType::String,
            Self::Fqbn(_) => ClaimValueType::Fqbn,
            Self::Sid(_) => ClaimValueType::Sid,
            Self::Boolean(_) => ClaimValueType::Boolean,
            Self::OctetString(_) => ClaimValueType::OctetString,
        }
    }

    /// Number of values.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int64(v) => v.len(),
            Self::Uint64(v) => v.len(),
            Self::String(v) => v.len(),
            Self::Fqbn(v) => v.len(),
            Self::Sid(v) => v.len(),
            Self::Boolean(v) => v.len(),
            Self::OctetString(v) => v.len(),
        }
    }

    /// True when the set holds no value.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named, typed claim attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClaimAttribute {
    /// Attribute name.
    pub name: String,
    /// Attribute flags.
    pub flags: ClaimAttributeFlags,
    /// Attribute values.
    pub values: ClaimValues,
}

fn offset_in(buf: &[u8], offset: u32, component: &'static str) -> Result<usize> {
    let at = offset as usize;
    if at >= buf.len() {
        return Err(Error::InvalidOffset {
            component,
            offset: at,
            len: buf.len(),
        });
    }
    Ok(at)
}

fn reader_at<'a>(buf: &'a [u8], offset: u32, base: usize, component: &'static str) -> Result<Reader<'a>> {
    let at = offset_in(buf, offset, component)?;
    let tail = buf.get(at..).unwrap_or_default();
    Ok(Reader::with_base(tail, base + at))
}

fn read_length_prefixed(buf: &[u8], offset: u32, base: usize) -> Result<Vec<u8>> {
    let mut reader = reader_at(buf, offset, base, "claim value")?;
    let len = reader.u32()? as usize;
    reader.take(len).map(<[u8]>::to_vec)
}

impl ClaimAttribute {
    /// Creates an attribute.
    #[inline]
    pub fn new(name: impl Into<String>, flags: ClaimAttributeFlags, values: ClaimValues) -> Self {
        Self {
            name: name.into(),
            flags,
            values,
        }
    }

    /// Decodes a relative claim attribute; `base` is the absolute offset of `buf[0]`.
    ///
    /// # Errors
    /// [`Error::TruncatedBuffer`] or [`Error::InvalidOffset`] when the header or an
    /// embedded offset does not fit `buf`, [`Error::UnsupportedConstruct`] for an
    /// unknown value type, [`Error::InvalidUtf16`] for malformed strings.
    pub fn from_bytes(buf: &[u8], base: usize) -> Result<Self> {
        let mut reader = Reader::with_base(buf, base);
        let name_offset = reader.u32()?;
        let raw_type = reader.u16()?;
        let _reserved = reader.u16()?;
        let flags = ClaimAttributeFlags::from_bits_retain(reader.u32()?);
        let count = reader.u32()? as usize;
        if count > reader.remaining() / 4 {
            return Err(Error::TruncatedBuffer {
                offset: reader.offset(),
                needed: count.saturating_mul(4),
                available: reader.remaining(),
            });
        }
        let offsets = (0..count)
            .map(|_| reader.u32())
            .collect::<Result<Vec<_>>>()?;
        let name = decode_utf16z(buf, offset_in(buf, name_offset, "claim name")?, base)?;
        let value_type = ClaimValueType::try_from(raw_type)
            .map_err(|_| Error::UnsupportedConstruct("unknown claim value type"))?;
        let read_u64 = |offset: u32| -> Result<u64> {
            reader_at(buf, offset, base, "claim value")?.u64()
        };
        let values = match value_type {
            ClaimValueType::Int64 => ClaimValues::Int64(
                offsets
                    .iter()
                    .map(|&o| read_u64(o).map(|v| i64::from_le_bytes(v.to_le_bytes())))
                    .collect::<Result<_>>()?,
            ),
            ClaimValueType::Uint64 => ClaimValues::Uint64(
                offsets.iter().map(|&o| read_u64(o)).collect::<Result<_>>()?,
            ),
            ClaimValueType::Boolean => ClaimValues::Boolean(
                offsets
                    .iter()
                    .map(|&o| read_u64(o).map(|v| v != 0))
                    .collect::<Result<_>>()?,
            ),
            ClaimValueType::String => ClaimValues::String(
                offsets
                    .iter()
                    .map(|&o| decode_utf16z(buf, offset_in(buf, o, "claim value")?, base))
                    .collect::<Result<_>>()?,
            ),
            ClaimValueType::Fqbn => ClaimValues::Fqbn(
                offsets
                    .iter()
                    .map(|&o| {
                        let mut reader = reader_at(buf, o, base, "claim value")?;
                        let version = reader.u64()?;
                        let name_at = offset_in(buf, reader.u32()?, "claim value")?;
                        let name = decode_utf16z(buf, name_at, base)?;
                        Ok(FqbnValue { version, name })
                    })
                    .collect::<Result<_>>()?,
            ),
            ClaimValueType::Sid => ClaimValues::Sid(
                offsets
                    .iter()
                    .map(|&o| read_length_prefixed(buf, o, base).and_then(|bytes| Sid::from_bytes(&bytes)))
                    .collect::<Result<_>>()?,
            ),
            ClaimValueType::OctetString => ClaimValues::OctetString(
                offsets
                    .iter()
                    .map(|&o| read_length_prefixed(buf, o, base))
                    .collect::<Result<_>>()?,
            ),
        };
        Ok(Self { name, flags, values })
    }

    /// Appends the relative binary form to `out`; offsets are relative to the first byte written.
    ///
    /// # Errors
    /// [`Error::TooLarge`] when an offset or length overflows its 32-bit field.
    #[inline]
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        let start = out.len();
        let count = self.values.len();
        put_u32(out, 0);
        put_u16(out, self.values.value_type().into());
        put_u16(out, 0);
        put_u32(out, self.flags.bits());
        put_u32(out, wire_u32("claim value count", count)?);
        let offsets_at = out.len();
        out.resize(offsets_at + 4 * count, 0);

        let name_at = out.len() - start;
        patch_u32(out, start, wire_u32("claim attribute", name_at)?);
        out.extend(encode_utf16(&self.name));
        put_u16(out, 0);

        let mut slot = offsets_at;
        let mut next_value = |out: &mut Vec<u8>| -> Result<()> {
            while (out.len() - start) % 4 != 0 {
                out.push(0);
            }
            let len = wire_u32("claim attribute", out.len() - start)?;
            patch_u32(out, slot, len);
            slot += 4;
            Ok(())
        };
        match &self.values {
            ClaimValues::Int64(values) => {
                for value in values {
                    next_value(out)?;
                    out.extend_from_slice(&value.to_le_bytes());
                }
            }
            ClaimValues::Uint64(values) => {
                for value in values {
                    next_value(out)?;
                    put_u64(out, *value);
                }
            }
            ClaimValues::Boolean(values) => {
                for value in values {
                    next_value(out)?;
                    put_u64(out, u64::from(*value));
                }
            }
            ClaimValues::String(values) => {
                for value in values {
                    next_value(out)?;
                    out.extend(encode_utf16(value));
                    put_u16(out, 0);
                }
            }
            ClaimValues::Fqbn(values) => {
                for value in values {
                    next_value(out)?;
                    let record = out.len();
                    put_u64(out, value.version);
                    put_u32(out, 0);
                    let len = wire_u32("claim attribute", out.len() - start)?;
                    patch_u32(out, record + 8, len);
                    out.extend(encode_utf16(&value.name));
                    put_u16(out, 0);
                }
            }
            ClaimValues::Sid(values) => {
                for value in values {
                    next_value(out)?;
                    put_u32(out, wire_u32("claim value", value.binary_len())?);
                    value.write_to(out);
                }
            }
            ClaimValues::OctetString(values) => {
                for value in values {
                    next_value(out)?;
                    put_u32(out, wire_u32("claim value", value.len())?);
                    out.extend_from_slice(value);
                }
            }
        }
        Ok(())
    }

    /// The relative binary form.
    ///
    /// # Errors
    /// [`Error::TooLarge`] when an offset or length overflows its 32-bit field.
    #[inline]
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(HEADER_SIZE + 4 * self.values.len() + 2 * self.name.len());
        self.write_to(&mut out)?;
        Ok(out)
    }
}
