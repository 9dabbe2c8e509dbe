use core::fmt::{self, Debug, Display};
use core::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::Reader;

/// A 128-bit GUID as used for object-type and inherited-object-type ACE fields.
///
/// On the wire the first three fields are little-endian and `data4` is raw bytes.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guid {
    data1: u32,
    data2: u16,
    data3: u16,
    data4: [u8; 8],
}

impl Guid {
    /// The all-zero GUID.
    pub const NIL: Self = Self::from_values(0, 0, 0, [0; 8]);

    /// Builds a GUID from its four fields.
    #[inline]
    #[must_use]
    pub const fn from_values(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Builds a GUID from its 16-byte wire form.
    #[inline]
    #[must_use]
    pub const fn from_bytes_le(b: [u8; 16]) -> Self {
        Self::from_values(
            u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            u16::from_le_bytes([b[4], b[5]]),
            u16::from_le_bytes([b[6], b[7]]),
            [b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]],
        )
    }

    /// The 16-byte wire form.
    #[inline]
    #[must_use]
    pub const fn to_bytes_le(&self) -> [u8; 16] {
        let d1 = self.data1.to_le_bytes();
        let d2 = self.data2.to_le_bytes();
        let d3 = self.data3.to_le_bytes();
        let d4 = self.data4;
        [
            d1[0], d1[1], d1[2], d1[3], d2[0], d2[1], d3[0], d3[1], d4[0], d4[1], d4[2], d4[3],
            d4[4], d4[5], d4[6], d4[7],
        ]
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self> {
        reader.array().map(Self::from_bytes_le)
    }

    /// True for the all-zero GUID.
    #[inline]
    #[must_use]
    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }
}

impl Display for Guid {
    /// Lowercase hyphenated form, without braces.
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.data4;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

impl Debug for Guid {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

impl FromStr for Guid {
    type Err = Error;

    /// Accepts `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`, optionally wrapped in braces,
    /// in any letter case.
    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        let inner = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(s);
        let groups: Vec<&str> = inner.split('-').collect();
        let [g1, g2, g3, g4, g5] = groups.as_slice() else {
            return Err(Error::syntax(0, format!("malformed GUID \"{s}\"")));
        };
        let hex = |group: &str, len: usize| -> Result<u64> {
            if group.len() != len || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(Error::syntax(0, format!("malformed GUID \"{s}\"")));
            }
            u64::from_str_radix(group, 16).map_err(|_| Error::syntax(0, "malformed GUID"))
        };
        #[expect(
            clippy::cast_possible_truncation,
            reason = "group lengths bound each value to its field width"
        )]
        {
            let data1 = hex(g1, 8)? as u32;
            let data2 = hex(g2, 4)? as u16;
            let data3 = hex(g3, 4)? as u16;
            let clock = (hex(g4, 4)? as u16).to_be_bytes();
            let node = hex(g5, 12)?.to_be_bytes();
            Ok(Self::from_values(
                data1,
                data2,
                data3,
                [
                    clock[0], clock[1], node[2], node[3], node[4], node[5], node[6], node[7],
                ],
            ))
        }
    }
}

impl TryFrom<&[u8]> for Guid {
    type Error = Error;

    /// Reads the first 16 bytes in wire form.
    #[inline]
    fn try_from(value: &[u8]) -> Result<Self> {
        Self::read(&mut Reader::new(value))
    }
}
