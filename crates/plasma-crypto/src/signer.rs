//! # Recoverable secp256k1 Signatures
//!
//! ECDSA over secp256k1 with public-key recovery: a signature is the
//! (v, r, s) triple, and the signer's address is recovered from the digest
//! plus the triple — no public key travels with a transaction.
//!
//! ## Security Invariant
//!
//! - Signing input is always a 32-byte [`Hash256`] digest produced by the
//!   transaction's canonical signing pipeline; raw messages cannot be
//!   signed here.
//! - Private keys are never serialized or logged. [`KeyPair`] does not
//!   implement `Serialize` or expose the secret scalar.
//! - The triple's shape is validated on construction: `v` must be a
//!   recovery value, and `r`/`s` must parse as a valid signature.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use plasma_core::{keccak256, Address, Hash256};

/// Errors from signing, recovery, and signature parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// The value is not a well-formed recoverable-signature triple.
    #[error("not a recoverable signature triple: {reason}")]
    InvalidShape {
        /// Description of the shape violation.
        reason: String,
    },

    /// Signer recovery failed for a well-shaped signature.
    #[error("signer recovery failed: {0}")]
    RecoveryFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),
}

// ─── RecoverableSignature ────────────────────────────────────────────

/// A recoverable ECDSA signature: the `(v, r, s)` triple.
///
/// `v` is stored in the ledger convention (27 or 28). Serializes as a
/// 130-character hex string (`r ‖ s ‖ v`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecoverableSignature {
    /// Recovery value, 27 or 28.
    pub v: u8,
    /// The `r` scalar, big-endian.
    pub r: [u8; 32],
    /// The `s` scalar, big-endian.
    pub s: [u8; 32],
}

impl RecoverableSignature {
    /// Build a signature from a raw `(v, r, s)` triple, validating its
    /// shape.
    ///
    /// Accepts `v` in either the recovery-id convention (0/1) or the
    /// ledger convention (27/28); stores the latter. Fails with
    /// [`SignatureError::InvalidShape`] when `v` is any other value or
    /// `r`/`s` do not form a valid signature.
    pub fn from_triple(v: u64, r: [u8; 32], s: [u8; 32]) -> Result<Self, SignatureError> {
        let v = match v {
            0 | 27 => 27,
            1 | 28 => 28,
            other => {
                return Err(SignatureError::InvalidShape {
                    reason: format!("recovery value must be 0, 1, 27, or 28, got {other}"),
                })
            }
        };
        // Parse once to reject zero or out-of-range scalars up front.
        Signature::from_scalars(r, s).map_err(|e| SignatureError::InvalidShape {
            reason: format!("invalid r/s scalars: {e}"),
        })?;
        Ok(Self { v, r, s })
    }

    /// The `(v, r, s)` triple in the ledger convention.
    pub fn to_triple(&self) -> (u64, [u8; 32], [u8; 32]) {
        (u64::from(self.v), self.r, self.s)
    }

    fn to_parts(&self) -> Result<(Signature, RecoveryId), SignatureError> {
        let sig = Signature::from_scalars(self.r, self.s).map_err(|e| {
            SignatureError::InvalidShape {
                reason: format!("invalid r/s scalars: {e}"),
            }
        })?;
        let recovery = RecoveryId::from_byte(self.v - 27).ok_or_else(|| {
            SignatureError::InvalidShape {
                reason: format!("recovery value {} out of range", self.v),
            }
        })?;
        Ok((sig, recovery))
    }

    /// Render as a 130-character lowercase hex string (`r ‖ s ‖ v`).
    pub fn to_hex(&self) -> String {
        let mut bytes = Vec::with_capacity(65);
        bytes.extend_from_slice(&self.r);
        bytes.extend_from_slice(&self.s);
        bytes.push(self.v);
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse from the 130-character hex form.
    pub fn from_hex(hex: &str) -> Result<Self, SignatureError> {
        let hex = hex.trim().to_lowercase();
        if hex.len() != 130 {
            return Err(SignatureError::InvalidShape {
                reason: format!("signature hex must be 130 chars, got {}", hex.len()),
            });
        }
        let mut bytes = [0u8; 65];
        for (i, chunk) in (0..hex.len()).step_by(2).enumerate() {
            bytes[i] = u8::from_str_radix(&hex[chunk..chunk + 2], 16).map_err(|e| {
                SignatureError::InvalidShape {
                    reason: format!("invalid hex at {chunk}: {e}"),
                }
            })?;
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Self::from_triple(u64::from(bytes[64]), r, s)
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.r.iter().take(4).map(|b| format!("{b:02x}")).collect();
        write!(f, "RecoverableSignature(v={}, {prefix}...)", self.v)
    }
}

// ─── KeyPair ─────────────────────────────────────────────────────────

/// A secp256k1 key pair for signing transaction digests.
///
/// Does not implement `Serialize` — private keys must not leak into logs,
/// messages, or artifacts.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
        Self { signing_key }
    }

    /// Create a key pair from a 32-byte secret scalar.
    ///
    /// Fails with [`SignatureError::KeyError`] when the scalar is zero or
    /// out of range.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, SignatureError> {
        let signing_key = SigningKey::from_slice(seed)
            .map_err(|e| SignatureError::KeyError(format!("invalid secret scalar: {e}")))?;
        Ok(Self { signing_key })
    }

    /// The address of this key pair: the low 20 bytes of the keccak-256
    /// digest of the uncompressed public key.
    pub fn address(&self) -> Address {
        address_of(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte digest, producing a recoverable `(v, r, s)` triple.
    pub fn sign_digest(&self, digest: &Hash256) -> Result<RecoverableSignature, SignatureError> {
        let (sig, recovery) = self
            .signing_key
            .sign_prehash_recoverable(digest.as_bytes())
            .map_err(|e| SignatureError::KeyError(format!("signing failed: {e}")))?;
        let (r, s) = sig.split_bytes();
        Ok(RecoverableSignature {
            v: 27 + recovery.to_byte(),
            r: r.into(),
            s: s.into(),
        })
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair({}, <private>)", self.address())
    }
}

// ─── Recovery ────────────────────────────────────────────────────────

/// Derive the 20-byte address of a public key.
pub fn address_of(verifying_key: &VerifyingKey) -> Address {
    let point = verifying_key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag; hash the 64 coordinate bytes.
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest.as_bytes()[12..]);
    Address::from_bytes(addr)
}

/// Recover the signer's address from a digest and a recoverable signature.
pub fn recover_address(
    digest: &Hash256,
    signature: &RecoverableSignature,
) -> Result<Address, SignatureError> {
    let (sig, recovery) = signature.to_parts()?;
    let verifying_key = VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recovery)
        .map_err(|e| SignatureError::RecoveryFailed(e.to_string()))?;
    Ok(address_of(&verifying_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pair(n: u8) -> KeyPair {
        let mut seed = [0u8; 32];
        seed[31] = n;
        KeyPair::from_seed(&seed).unwrap()
    }

    // ── Round trips ──────────────────────────────────────────────────

    #[test]
    fn test_sign_then_recover() {
        let pair = test_pair(1);
        let digest = keccak256(b"transfer unit 7 to bob");
        let sig = pair.sign_digest(&digest).unwrap();
        assert_eq!(recover_address(&digest, &sig).unwrap(), pair.address());
    }

    #[test]
    fn test_recovery_distinguishes_digests() {
        let pair = test_pair(1);
        let sig = pair.sign_digest(&keccak256(b"one")).unwrap();
        let recovered = recover_address(&keccak256(b"two"), &sig).unwrap();
        // Recovery over the wrong digest yields some other address, not the
        // signer's.
        assert_ne!(recovered, pair.address());
    }

    #[test]
    fn test_deterministic_from_seed() {
        let a = test_pair(9);
        let b = test_pair(9);
        assert_eq!(a.address(), b.address());
        let digest = keccak256(b"deterministic");
        assert_eq!(
            a.sign_digest(&digest).unwrap(),
            b.sign_digest(&digest).unwrap()
        );
    }

    #[test]
    fn test_distinct_seeds_distinct_addresses() {
        assert_ne!(test_pair(1).address(), test_pair(2).address());
    }

    // ── Shape validation ─────────────────────────────────────────────

    #[test]
    fn test_triple_shape_validation() {
        let pair = test_pair(3);
        let sig = pair.sign_digest(&keccak256(b"shape")).unwrap();
        let (_, r, s) = sig.to_triple();

        // Both v conventions are accepted and normalized.
        let from_recovery_id = RecoverableSignature::from_triple(u64::from(sig.v) - 27, r, s);
        assert_eq!(from_recovery_id.unwrap(), sig);

        // Anything else is a shape error.
        assert!(RecoverableSignature::from_triple(2, r, s).is_err());
        assert!(RecoverableSignature::from_triple(29, r, s).is_err());
        assert!(RecoverableSignature::from_triple(255, r, s).is_err());

        // Zero scalars are not a signature.
        assert!(RecoverableSignature::from_triple(27, [0u8; 32], s).is_err());
        assert!(RecoverableSignature::from_triple(27, r, [0u8; 32]).is_err());
    }

    #[test]
    fn test_hex_roundtrip() {
        let sig = test_pair(4).sign_digest(&keccak256(b"hex")).unwrap();
        let hex = sig.to_hex();
        assert_eq!(hex.len(), 130);
        assert_eq!(RecoverableSignature::from_hex(&hex).unwrap(), sig);
        assert!(RecoverableSignature::from_hex("abcd").is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let sig = test_pair(5).sign_digest(&keccak256(b"serde")).unwrap();
        let json = serde_json::to_string(&sig).unwrap();
        let back: RecoverableSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }

    // ── Key handling ─────────────────────────────────────────────────

    #[test]
    fn test_zero_seed_rejected() {
        assert!(KeyPair::from_seed(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_debug_does_not_leak_private_key() {
        let pair = test_pair(6);
        let debug = format!("{pair:?}");
        assert!(debug.contains("<private>"));
        assert!(!debug.contains("SigningKey"));
    }

    #[test]
    fn test_generated_pairs_are_distinct() {
        assert_ne!(KeyPair::generate().address(), KeyPair::generate().address());
    }
}
