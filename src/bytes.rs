//! Compare, copy and print helpers for raw byte keys and values.
//!
//! These are the building blocks of [`BytePolicy`](crate::BytePolicy). The
//! `*_c_str` variants read their input as a NUL-terminated string inside a
//! fixed-size buffer.

use crate::error::AllocError;
use core::cmp::Ordering;
use core::fmt;

fn until_nul(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

/// Whole-buffer comparison, `memcmp` style.
pub fn compare_bytes(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// String comparison up to the first NUL of each side, `strcmp` style.
pub fn compare_c_str(a: &[u8], b: &[u8]) -> Ordering {
    until_nul(a).cmp(until_nul(b))
}

/// Copies the whole buffer into a fresh allocation.
pub fn copy_bytes(bytes: &[u8]) -> Result<Box<[u8]>, AllocError> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(bytes.len()).map_err(|_| AllocError)?;
    copy.extend_from_slice(bytes);
    Ok(copy.into_boxed_slice())
}

/// Copies the string part of the buffer plus a terminating NUL, `strdup`
/// style. The copy may be shorter than the table's fixed key size.
pub fn copy_c_str(bytes: &[u8]) -> Result<Box<[u8]>, AllocError> {
    let s = until_nul(bytes);
    let mut copy = Vec::new();
    copy.try_reserve_exact(s.len() + 1).map_err(|_| AllocError)?;
    copy.extend_from_slice(s);
    copy.push(0);
    Ok(copy.into_boxed_slice())
}

/// Releases a buffer. This is the default destroy function.
pub fn release(bytes: Box<[u8]>) {
    drop(bytes);
}

/// Prints the string part of the buffer in double quotes.
pub fn print_c_str(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "\"{}\"", String::from_utf8_lossy(until_nul(bytes)))
}

/// Prints the first four bytes as a native-endian `i32`.
pub fn print_i32(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match bytes.get(..4) {
        Some(word) => {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(word);
            write!(f, "{}", i32::from_ne_bytes(raw))
        }
        None => print_hex(bytes, f),
    }
}

/// Prints the buffer as lowercase hex.
pub fn print_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for b in bytes {
        write!(f, "{:02x}", b)?;
    }
    Ok(())
}
