//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers that cross the root-ledger boundary.
//! You cannot pass an `Address` where a `UnitId` is expected, and a block
//! number is never a bare integer.
//!
//! ## Security Invariant
//!
//! Unit identifiers are fixed-width 256-bit integers. The commitment tree is
//! keyed by a shorter big-endian encoding (`tree_key`), and the conversion
//! fails loudly when an identifier does not fit the configured tree depth —
//! a truncated key would silently alias two distinct units.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors from identifier parsing and conversion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// A hex string could not be decoded.
    #[error("invalid hex for {what}: {reason}")]
    BadHex {
        /// What was being parsed.
        what: &'static str,
        /// Description of the decode failure.
        reason: String,
    },

    /// A byte string had the wrong length.
    #[error("{what} must be {expected} bytes, got {got}")]
    BadLength {
        /// What was being parsed.
        what: &'static str,
        /// Required length in bytes.
        expected: usize,
        /// Actual length in bytes.
        got: usize,
    },

    /// A unit identifier does not fit the configured tree depth.
    #[error("unit id does not fit in {bits} bits")]
    UnitIdOutOfRange {
        /// The tree depth in bits.
        bits: usize,
    },
}

pub(crate) fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, IdentityError> {
    let hex = hex.trim().strip_prefix("0x").unwrap_or(hex.trim());
    let hex = hex.to_lowercase();
    if hex.len() % 2 != 0 {
        return Err(IdentityError::BadHex {
            what: "bytes",
            reason: "odd-length hex string".to_string(),
        });
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| IdentityError::BadHex {
                what: "bytes",
                reason: format!("at position {i}: {e}"),
            })
        })
        .collect()
}

// ─── UnitId ──────────────────────────────────────────────────────────

/// Identifier of one non-fungible unit, a 256-bit big-endian integer.
///
/// Immutable once minted. The same value identifies the unit on the root
/// ledger, in side-ledger blocks, and in dispute claims.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId([u8; 32]);

impl UnitId {
    /// Create a unit id from a small integer (test fixtures, sequential
    /// minting).
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Create a unit id from its 32-byte big-endian encoding.
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The 32-byte big-endian encoding (the `uint256` ABI word).
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Derive the commitment-tree key for a tree of `depth_bits` levels:
    /// the low `depth_bits / 8` bytes of the big-endian encoding.
    ///
    /// Fails with [`IdentityError::UnitIdOutOfRange`] when the identifier
    /// has set bits above the key width.
    pub fn tree_key(&self, depth_bits: usize) -> Result<Vec<u8>, IdentityError> {
        let key_len = depth_bits / 8;
        let cut = 32 - key_len;
        if self.0[..cut].iter().any(|b| *b != 0) {
            return Err(IdentityError::UnitIdOutOfRange { bits: depth_bits });
        }
        Ok(self.0[cut..].to_vec())
    }

    /// Render as a minimal lowercase hex string (no leading zero bytes).
    pub fn to_hex(&self) -> String {
        let first = self.0.iter().position(|b| *b != 0).unwrap_or(31);
        self.0[first..].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Serialize for UnitId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let full: String = self.0.iter().map(|b| format!("{b:02x}")).collect();
        serializer.serialize_str(&full)
    }
}

impl<'de> Deserialize<'de> for UnitId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        let bytes = hex_to_bytes(&hex).map_err(serde::de::Error::custom)?;
        if bytes.len() != 32 {
            return Err(serde::de::Error::custom("unit id must be 32 bytes"));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl std::fmt::Debug for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UnitId(0x{})", self.to_hex())
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit:0x{}", self.to_hex())
    }
}

// ─── Address ─────────────────────────────────────────────────────────

/// A 20-byte account address, as recovered from a transaction signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create an address from raw 20 bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Return the raw 20-byte address.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Render the address as a `0x`-prefixed lowercase hex string.
    pub fn to_hex(&self) -> String {
        let hex: String = self.0.iter().map(|b| format!("{b:02x}")).collect();
        format!("0x{hex}")
    }

    /// Parse an address from a 40-character hex string, with or without a
    /// `0x` prefix.
    pub fn from_hex(hex: &str) -> Result<Self, IdentityError> {
        let bytes = hex_to_bytes(hex)?;
        if bytes.len() != 20 {
            return Err(IdentityError::BadLength {
                what: "address",
                expected: 20,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ─── BlockNumber ─────────────────────────────────────────────────────

/// A side-ledger block number assigned by the root ledger at publication.
///
/// Block 0 is reserved for deposit transactions, which precede any published
/// block.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct BlockNumber(pub u64);

impl BlockNumber {
    /// The pre-inclusion block number carried by deposit transactions.
    pub const DEPOSIT: BlockNumber = BlockNumber(0);

    /// The next block number.
    pub fn next(&self) -> BlockNumber {
        BlockNumber(self.0 + 1)
    }
}

impl std::fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "block:{}", self.0)
    }
}
