//! # Keccak-256 Digests
//!
//! Defines `Hash256`, the 32-byte digest type used for every commitment in
//! the system — sparse-tree nodes, transaction leaves, block roots, and
//! signing digests.
//!
//! ## Security Invariant
//!
//! The root ledger recomputes all of these digests independently, so the
//! hash function is keccak-256 (the original, pre-FIPS padding) and nothing
//! else. All hashing flows through [`keccak256()`] / [`keccak256_concat()`];
//! no other code path constructs digests.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

/// A 32-byte keccak-256 digest.
///
/// Serializes as a lowercase hex string for JSON interoperability.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The all-zero digest. Used as the "absent" leaf value in commitment
    /// trees.
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    /// Create a digest from raw 32 bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the all-zero digest.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a digest from a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, crate::identity::IdentityError> {
        let bytes = crate::identity::hex_to_bytes(hex)?;
        if bytes.len() != 32 {
            return Err(crate::identity::IdentityError::BadLength {
                what: "hash",
                expected: 32,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.0.iter().take(4).map(|b| format!("{b:02x}")).collect();
        write!(f, "Hash256({prefix}...)")
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Compute the keccak-256 digest of a byte string.
pub fn keccak256(data: &[u8]) -> Hash256 {
    let hash = Keccak256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    Hash256(bytes)
}

/// Compute the keccak-256 digest of the concatenation of two digests.
///
/// This is the interior-node hash of the commitment tree:
/// `keccak256(left ‖ right)`.
pub fn keccak256_concat(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut input = [0u8; 64];
    input[..32].copy_from_slice(&left.0);
    input[32..].copy_from_slice(&right.0);
    keccak256(&input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty_known_vector() {
        // keccak256("") — the canonical empty-input vector.
        assert_eq!(
            keccak256(b"").to_hex(),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_keccak_zero_leaf_known_vector() {
        // keccak256 of 32 zero bytes — the empty-leaf hash the root ledger
        // uses for absent units.
        assert_eq!(
            keccak256(&[0u8; 32]).to_hex(),
            "290decd9548b62a8d60345a988386fc84ba6bc95484008f6362f93160ef3e563"
        );
    }

    #[test]
    fn test_concat_matches_manual() {
        let a = keccak256(b"left");
        let b = keccak256(b"right");
        let mut joined = Vec::new();
        joined.extend_from_slice(a.as_bytes());
        joined.extend_from_slice(b.as_bytes());
        assert_eq!(keccak256_concat(&a, &b), keccak256(&joined));
    }

    #[test]
    fn test_hex_roundtrip() {
        let h = keccak256(b"roundtrip");
        assert_eq!(Hash256::from_hex(&h.to_hex()).unwrap(), h);
    }

    #[test]
    fn test_serde_hex_string() {
        let h = keccak256(b"serde");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json.len(), 64 + 2); // 64 hex chars + 2 quotes
        let back: Hash256 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn test_zero_is_zero() {
        assert!(Hash256::ZERO.is_zero());
        assert!(!keccak256(b"x").is_zero());
    }

    #[test]
    fn test_debug_shows_prefix_only() {
        let h = keccak256(b"debug");
        let s = format!("{h:?}");
        assert!(s.starts_with("Hash256("));
        assert!(s.ends_with("...)"));
    }
}
