//! Content fingerprints built on xxHash3.
//!
//! Used to decide whether a recomputed projection differs from the one a
//! reader already holds, and to key compile results by source text.

use xxhash_rust::xxh3::{xxh3_64, Xxh3};

/// Hash of a string.
#[inline]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

/// Hash of a string rendered as 16 hex characters.
#[inline]
pub fn content_hash(content: &str) -> String {
    format!("{:016x}", hash_str(content))
}

/// Streaming fingerprint over heterogeneous parts.
///
/// Every part is length-prefixed so `("ab", "c")` and `("a", "bc")` hash
/// differently.
pub struct Fingerprint {
    hasher: Xxh3,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self {
            hasher: Xxh3::new(),
        }
    }

    pub fn str(mut self, part: &str) -> Self {
        self.hasher.update(&(part.len() as u64).to_le_bytes());
        self.hasher.update(part.as_bytes());
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.hasher.update(&value.to_le_bytes());
        self
    }

    pub fn finish(&self) -> u64 {
        self.hasher.digest()
    }
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash_str("<div/>"), hash_str("<div/>"));
        assert_ne!(hash_str("<div/>"), hash_str("<span/>"));
    }

    #[test]
    fn test_content_hash_is_hex() {
        let hex = content_hash("---\n---");
        assert_eq!(hex.len(), 16);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_part_boundaries() {
        let a = Fingerprint::new().str("ab").str("c").finish();
        let b = Fingerprint::new().str("a").str("bc").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_numbers() {
        let a = Fingerprint::new().u32(1).u32(2).finish();
        let b = Fingerprint::new().u32(1).u32(2).finish();
        let c = Fingerprint::new().u32(2).u32(1).finish();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
