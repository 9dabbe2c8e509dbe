use crate::error::{Error, Result};
use crate::sid::{MAX_SUBAUTHORITY_COUNT, MIN_SUBAUTHORITY_COUNT};

pub const fn sub_authority_size_guard(size: usize) -> bool {
    MIN_SUBAUTHORITY_COUNT as usize <= size && size <= MAX_SUBAUTHORITY_COUNT as usize
}

/// Bounds-checked little-endian cursor over a borrowed buffer.
///
/// `base` is the absolute offset of `buf[0]` inside the outermost buffer so that
/// nested readers still report absolute offsets in their errors.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Reader<'a> {
    pub const fn new(buf: &'a [u8]) -> Self {
        Self::with_base(buf, 0)
    }

    pub const fn with_base(buf: &'a [u8], base: usize) -> Self {
        Self { buf, pos: 0, base }
    }

    /// Absolute offset of the next byte.
    pub const fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Bytes consumed so far.
    pub const fn position(&self) -> usize {
        self.pos
    }

    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        let slice = self
            .buf
            .get(self.pos..)
            .and_then(|rest| rest.get(..n))
            .ok_or(Error::TruncatedBuffer {
                offset: self.offset(),
                needed: n,
                available,
            })?;
        self.pos += n;
        Ok(slice)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn u64(&mut self) -> Result<u64> {
        self.array().map(u64::from_le_bytes)
    }

    /// Everything not consumed yet.
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = self.buf.get(self.pos..).unwrap_or_default();
        self.pos = self.buf.len();
        rest
    }

    /// A reader over the next `n` bytes, advancing this one past them.
    pub fn sub_reader(&mut self, n: usize) -> Result<Self> {
        let base = self.offset();
        self.take(n).map(|buf| Self::with_base(buf, base))
    }
}

pub fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Overwrites a little-endian `u32` previously reserved at `at`.
pub fn patch_u32(out: &mut [u8], at: usize, value: u32) {
    if let Some(slot) = out.get_mut(at..at + 4) {
        slot.copy_from_slice(&value.to_le_bytes());
    }
}

/// Overwrites a little-endian `u16` previously reserved at `at`.
pub fn patch_u16(out: &mut [u8], at: usize, value: u16) {
    if let Some(slot) = out.get_mut(at..at + 2) {
        slot.copy_from_slice(&value.to_le_bytes());
    }
}

/// Converts a length of `component` to the `u32` used by the wire formats.
pub fn wire_u32(component: &'static str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::TooLarge {
        component,
        len,
        max: u32::MAX as usize,
    })
}

/// Converts a length of `component` to the `u16` used by ACE and ACL headers.
pub fn wire_u16(component: &'static str, len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::TooLarge {
        component,
        len,
        max: usize::from(u16::MAX),
    })
}

pub fn encode_utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Decodes UTF-16LE bytes; `offset` is only used for error reporting.
pub fn decode_utf16(bytes: &[u8], offset: usize) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::InvalidUtf16 { offset });
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| Error::InvalidUtf16 { offset })
}

/// Decodes a NUL-terminated UTF-16LE string starting at `at` inside `buf`.
pub fn decode_utf16z(buf: &[u8], at: usize, base: usize) -> Result<String> {
    let tail = buf.get(at..).ok_or(Error::InvalidOffset {
        component: "string",
        offset: at,
        len: buf.len(),
    })?;
    let end = tail
        .chunks_exact(2)
        .position(|pair| pair == [0, 0])
        .ok_or(Error::TruncatedBuffer {
            offset: base + at,
            needed: tail.len() + 2,
            available: tail.len(),
        })?;
    decode_utf16(&tail[..end * 2], base + at)
}
