//! Byte-string hash functions usable as table hash policies.
//!
//! `djb2` and `sdbm` treat their input as a NUL-terminated string: hashing
//! stops at the first zero byte, or at the end of the slice if there is none.
//! This lets a fixed-size, zero-padded key buffer hash the same as the string
//! it holds.

#[inline]
fn c_str_bytes(bytes: &[u8]) -> impl Iterator<Item = u64> + '_ {
    bytes.iter().take_while(|&&b| b != 0).map(|&b| u64::from(b))
}

/// Bernstein's hash: `hash * 33 + byte`, seeded with 5381.
pub fn djb2(bytes: &[u8]) -> u64 {
    c_str_bytes(bytes).fold(5381u64, |h, b| {
        (h << 5).wrapping_add(h).wrapping_add(b)
    })
}

/// The sdbm database hash: `byte + (hash << 6) + (hash << 16) - hash`.
pub fn sdbm(bytes: &[u8]) -> u64 {
    c_str_bytes(bytes).fold(0u64, |h, b| {
        b.wrapping_add(h << 6)
            .wrapping_add(h << 16)
            .wrapping_sub(h)
    })
}

/// Reads the first eight bytes as a native-endian integer.
///
/// Shorter inputs are zero-extended; bytes past the eighth are ignored.
pub fn identity(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    let n = bytes.len().min(word.len());
    word[..n].copy_from_slice(&bytes[..n]);
    u64::from_ne_bytes(word)
}
