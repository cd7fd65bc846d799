//! Little-endian field helpers shared by the record and frame codecs.
//!
//! Writers index into a buffer the caller has already sized; readers are
//! bounds-checked and report `FormatError::Truncated`.

use plantdb_core::error::FormatError;

pub fn put_u8(buf: &mut [u8], off: usize, v: u8) {
    buf[off] = v;
}
pub fn put_u16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
}
pub fn put_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

/// Writes `s` NUL-padded into `len` bytes, keeping at most `len - 1` bytes of text.
///
/// Truncation never splits a UTF-8 sequence.
pub fn put_str(buf: &mut [u8], off: usize, len: usize, s: &str) {
    let text = truncate_str(s, len.saturating_sub(1));
    let field = &mut buf[off..off + len];
    field.fill(0);
    field[..text.len()].copy_from_slice(text.as_bytes());
}

/// Longest prefix of `s` that fits in `max` bytes on a char boundary.
pub fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.get(..end).unwrap_or_default()
}

fn read_exact<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N], FormatError> {
    let truncated = FormatError::Truncated {
        at: offset,
        needed: N,
    };
    let end = offset.checked_add(N).ok_or_else(|| truncated.clone())?;
    let slice = bytes.get(offset..end).ok_or_else(|| truncated.clone())?;
    <[u8; N]>::try_from(slice).map_err(|_| truncated)
}

pub fn read_u8(bytes: &[u8], offset: usize) -> Result<u8, FormatError> {
    Ok(read_exact::<1>(bytes, offset)?[0])
}

pub fn read_i8(bytes: &[u8], offset: usize) -> Result<i8, FormatError> {
    Ok(i8::from_le_bytes(read_exact::<1>(bytes, offset)?))
}

pub fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, FormatError> {
    Ok(u16::from_le_bytes(read_exact::<2>(bytes, offset)?))
}

pub fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, FormatError> {
    Ok(u32::from_le_bytes(read_exact::<4>(bytes, offset)?))
}

/// Reads a NUL-padded string field; text ends at the first NUL.
pub fn read_str(
    bytes: &[u8],
    offset: usize,
    len: usize,
    field: &'static str,
) -> Result<String, FormatError> {
    let end = offset.checked_add(len).ok_or(FormatError::Truncated {
        at: offset,
        needed: len,
    })?;
    let raw = bytes.get(offset..end).ok_or(FormatError::Truncated {
        at: offset,
        needed: len,
    })?;
    let text = raw.split(|b| *b == 0).next().unwrap_or_default();
    std::str::from_utf8(text)
        .map(str::to_owned)
        .map_err(|_| FormatError::InvalidUtf8 { field })
}
