//! # Transaction Record
//!
//! The canonical representation of one ownership transfer, its signable
//! digest, and its two wire encodings.
//!
//! ## Encodings
//!
//! - [`TransactionRecord::to_words`] — the six 32-byte words
//!   `(newOwner, tokenId, prevBlkNum, v, r, s)` passed to root-ledger
//!   entrypoints.
//! - [`TransactionRecord::encode`] / [`decode`](TransactionRecord::decode)
//!   — the 192-byte static-tuple form used on peer channels. The domain
//!   separator is never part of this encoding; the receiver recovers the
//!   signer under whatever domain it trusts.
//!
//! ## Security Invariant
//!
//! A record carries at most one signature, attached exactly once. The
//! signer is always recovered from the digest and signature — there is no
//! settable "from" field to forge.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use plasma_core::{keccak256, Address, BlockNumber, Hash256, UnitId};
use plasma_crypto::{recover_address, KeyPair, RecoverableSignature, SignatureError};

use crate::domain::{address_word, u256_word, DomainSeparator};

/// Errors from transaction construction, signing, and encoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// A signature is already attached; signing is final.
    #[error("transaction has already been signed")]
    AlreadySigned,

    /// The operation requires a signed transaction.
    #[error("transaction is not signed")]
    Unsigned,

    /// Signature shape or recovery failure.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// A byte string is not a valid transport encoding.
    #[error("malformed transaction encoding: {reason}")]
    MalformedEncoding {
        /// Description of the decode failure.
        reason: String,
    },
}

/// One ownership transfer: unit `unit`, previously included at block
/// `prev_block`, now owned by `new_owner`.
///
/// A deposit is the degenerate transfer with
/// `prev_block == BlockNumber::DEPOSIT`, self-signed by the depositor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Block in which the spent (previous) transfer was included.
    pub prev_block: BlockNumber,
    /// The unit being transferred.
    pub unit: UnitId,
    /// The receiving owner.
    pub new_owner: Address,
    signature: Option<RecoverableSignature>,
}

impl TransactionRecord {
    /// Create an unsigned transfer record.
    pub fn new(prev_block: BlockNumber, unit: UnitId, new_owner: Address) -> Self {
        Self {
            prev_block,
            unit,
            new_owner,
            signature: None,
        }
    }

    /// Whether a signature is attached.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// The attached signature, if any.
    pub fn signature(&self) -> Option<&RecoverableSignature> {
        self.signature.as_ref()
    }

    /// The typed hash of the record fields under the `Transaction` layout.
    fn struct_hash(&self) -> Hash256 {
        let type_hash =
            keccak256(b"Transaction(address newOwner,uint256 tokenId,uint256 prevBlkNum)");
        let mut preimage = Vec::with_capacity(4 * 32);
        preimage.extend_from_slice(type_hash.as_bytes());
        preimage.extend_from_slice(&address_word(&self.new_owner));
        preimage.extend_from_slice(&self.unit.to_be_bytes());
        preimage.extend_from_slice(&u256_word(self.prev_block.0));
        keccak256(&preimage)
    }

    /// The digest that is signed: `keccak256(0x19 ‖ 0x01 ‖ domain ‖ struct)`.
    ///
    /// Stable bit-for-bit across implementations — the root ledger
    /// recomputes this digest to verify signers on its side.
    pub fn signing_digest(&self, domain: &DomainSeparator) -> Hash256 {
        let mut preimage = Vec::with_capacity(2 + 2 * 32);
        preimage.extend_from_slice(&[0x19, 0x01]);
        preimage.extend_from_slice(domain.separator().as_bytes());
        preimage.extend_from_slice(self.struct_hash().as_bytes());
        keccak256(&preimage)
    }

    /// Attach a signature. Fails with [`TransactionError::AlreadySigned`]
    /// if one is present — signing is final.
    ///
    /// Shape validation happens when the [`RecoverableSignature`] is
    /// constructed from its raw triple.
    pub fn attach_signature(&mut self, signature: RecoverableSignature) -> Result<(), TransactionError> {
        if self.signature.is_some() {
            return Err(TransactionError::AlreadySigned);
        }
        self.signature = Some(signature);
        Ok(())
    }

    /// Sign the record under `domain` with `pair` and attach the result.
    pub fn sign(&mut self, pair: &KeyPair, domain: &DomainSeparator) -> Result<(), TransactionError> {
        if self.signature.is_some() {
            return Err(TransactionError::AlreadySigned);
        }
        let signature = pair.sign_digest(&self.signing_digest(domain))?;
        self.signature = Some(signature);
        Ok(())
    }

    /// Recover the signing address under `domain`.
    ///
    /// Fails with [`TransactionError::Unsigned`] when no signature is
    /// attached.
    pub fn signer(&self, domain: &DomainSeparator) -> Result<Address, TransactionError> {
        let signature = self.signature.ok_or(TransactionError::Unsigned)?;
        Ok(recover_address(&self.signing_digest(domain), &signature)?)
    }

    /// The hash committed into a block's tree for this transfer:
    /// keccak-256 of the transport encoding.
    pub fn leaf_hash(&self) -> Result<Hash256, TransactionError> {
        Ok(keccak256(&self.encode()?))
    }

    /// The six 32-byte words `(newOwner, tokenId, prevBlkNum, v, r, s)`
    /// passed to root-ledger entrypoints.
    pub fn to_words(&self) -> Result<[[u8; 32]; 6], TransactionError> {
        let signature = self.signature.ok_or(TransactionError::Unsigned)?;
        let (v, r, s) = signature.to_triple();
        Ok([
            address_word(&self.new_owner),
            self.unit.to_be_bytes(),
            u256_word(self.prev_block.0),
            u256_word(v),
            r,
            s,
        ])
    }

    /// The 192-byte transport encoding: the six words concatenated.
    pub fn encode(&self) -> Result<Vec<u8>, TransactionError> {
        let words = self.to_words()?;
        let mut bytes = Vec::with_capacity(6 * 32);
        for word in &words {
            bytes.extend_from_slice(word);
        }
        Ok(bytes)
    }

    /// Decode a transport encoding back into a signed record.
    ///
    /// Rejects byte strings of the wrong length, padding bytes that are
    /// not zero, and signature triples of the wrong shape.
    pub fn decode(bytes: &[u8]) -> Result<Self, TransactionError> {
        if bytes.len() != 6 * 32 {
            return Err(TransactionError::MalformedEncoding {
                reason: format!("expected 192 bytes, got {}", bytes.len()),
            });
        }
        let word = |i: usize| -> &[u8] { &bytes[i * 32..(i + 1) * 32] };

        if word(0)[..12].iter().any(|b| *b != 0) {
            return Err(TransactionError::MalformedEncoding {
                reason: "address word has non-zero padding".to_string(),
            });
        }
        let mut owner = [0u8; 20];
        owner.copy_from_slice(&word(0)[12..]);

        let mut unit = [0u8; 32];
        unit.copy_from_slice(word(1));

        if word(2)[..24].iter().any(|b| *b != 0) {
            return Err(TransactionError::MalformedEncoding {
                reason: "block number exceeds 64 bits".to_string(),
            });
        }
        let mut block = [0u8; 8];
        block.copy_from_slice(&word(2)[24..]);

        if word(3)[..24].iter().any(|b| *b != 0) {
            return Err(TransactionError::MalformedEncoding {
                reason: "recovery word has non-zero padding".to_string(),
            });
        }
        let mut v = [0u8; 8];
        v.copy_from_slice(&word(3)[24..]);

        let mut r = [0u8; 32];
        r.copy_from_slice(word(4));
        let mut s = [0u8; 32];
        s.copy_from_slice(word(5));
        let signature = RecoverableSignature::from_triple(u64::from_be_bytes(v), r, s)?;

        Ok(Self {
            prev_block: BlockNumber(u64::from_be_bytes(block)),
            unit: UnitId::from_be_bytes(unit),
            new_owner: Address::from_bytes(owner),
            signature: Some(signature),
        })
    }
}
