//! Content checksums and the storage keys derived from them.

use sha2::{Digest, Sha256};
use std::fmt;

const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// SHA-256 of the original image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum {
    hex: String,
    prefix: u64,
}

impl Checksum {
    /// Hash an in-memory buffer.
    pub fn of(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        Self {
            hex: format!("{:x}", digest),
            prefix: u64::from_be_bytes(head),
        }
    }

    /// Lower-case hex digest (64 characters).
    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    /// Base key for blobs derived from this content: the leading 16 hex
    /// digits read as an integer, written in base 62.
    pub fn storage_key(&self) -> String {
        encode_base62(self.prefix)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

/// Encode an integer with the `0-9a-zA-Z` alphabet.
pub fn encode_base62(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(11);
    while value > 0 {
        digits.push(BASE62_ALPHABET[(value % 62) as usize] as char);
        value /= 62;
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        let checksum = Checksum::of(b"abc");
        assert_eq!(
            checksum.as_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(checksum.prefix, 0xba7816bf8f01cfea);
    }

    #[test]
    fn test_storage_key_is_deterministic() {
        let a = Checksum::of(b"same bytes");
        let b = Checksum::of(b"same bytes");
        assert_eq!(a, b);
        assert_eq!(a.storage_key(), b.storage_key());
        assert_ne!(a.storage_key(), Checksum::of(b"other bytes").storage_key());
    }

    #[test]
    fn test_storage_key_matches_hex_prefix() {
        let checksum = Checksum::of(b"abc");
        let prefix = u64::from_str_radix(&checksum.as_hex()[..16], 16).unwrap();
        assert_eq!(checksum.storage_key(), encode_base62(prefix));
    }

    #[test]
    fn test_base62() {
        assert_eq!(encode_base62(0), "0");
        assert_eq!(encode_base62(61), "Z");
        assert_eq!(encode_base62(62), "10");
        assert_eq!(encode_base62(u64::MAX), "lYGhA16ahyf");
    }
}
