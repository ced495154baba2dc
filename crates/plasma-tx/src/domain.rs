//! # Signing Domain Separation
//!
//! Binds every signing digest to one deployment: protocol name, protocol
//! version, chain identifier, and the verifying contract's address. Two
//! records with identical fields signed under different domains hash — and
//! therefore recover — differently, so a transfer signed for a test
//! deployment can never be replayed against production.

use plasma_core::{keccak256, Address, ChainSpec, Hash256};

/// Protocol name bound into every signing digest.
pub const DOMAIN_NAME: &str = "Plasma Cash";

/// Protocol version bound into every signing digest.
pub const DOMAIN_VERSION: &str = "1";

/// Encode a `u64` as a 32-byte big-endian word.
pub(crate) fn u256_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Encode an address as a 32-byte left-padded word.
pub(crate) fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// The signing domain of one deployment, with its separator hash
/// precomputed.
///
/// The separator is the typed hash of
/// `{name, version, chainId, verifyingContract}` under the standard
/// `EIP712Domain` layout — the same value the root-ledger contract derives
/// for itself. Deliberately not deserializable: a separator is always
/// derived from configuration, never accepted from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSeparator {
    /// Root-ledger chain identifier.
    pub chain_id: u64,
    /// Verifying-contract address.
    pub verifying_contract: Address,
    separator: Hash256,
}

impl DomainSeparator {
    /// Build the domain for a chain id and verifying contract.
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        let type_hash = keccak256(
            b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );
        let mut preimage = Vec::with_capacity(5 * 32);
        preimage.extend_from_slice(type_hash.as_bytes());
        preimage.extend_from_slice(keccak256(DOMAIN_NAME.as_bytes()).as_bytes());
        preimage.extend_from_slice(keccak256(DOMAIN_VERSION.as_bytes()).as_bytes());
        preimage.extend_from_slice(&u256_word(chain_id));
        preimage.extend_from_slice(&address_word(&verifying_contract));
        Self {
            chain_id,
            verifying_contract,
            separator: keccak256(&preimage),
        }
    }

    /// Build the domain from deployment configuration.
    pub fn from_spec(spec: &ChainSpec) -> Self {
        Self::new(spec.chain_id, spec.verifying_contract)
    }

    /// The precomputed domain-separator hash.
    pub fn separator(&self) -> Hash256 {
        self.separator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_is_deterministic() {
        let a = DomainSeparator::new(1, Address::ZERO);
        let b = DomainSeparator::new(1, Address::ZERO);
        assert_eq!(a.separator(), b.separator());
    }

    #[test]
    fn test_chain_id_changes_separator() {
        let a = DomainSeparator::new(1, Address::ZERO);
        let b = DomainSeparator::new(2, Address::ZERO);
        assert_ne!(a.separator(), b.separator());
    }

    #[test]
    fn test_contract_changes_separator() {
        let a = DomainSeparator::new(1, Address::ZERO);
        let b = DomainSeparator::new(1, Address::from_bytes([1; 20]));
        assert_ne!(a.separator(), b.separator());
    }

    #[test]
    fn test_from_spec_matches_new() {
        let spec = ChainSpec::new(5, Address::from_bytes([7; 20]));
        assert_eq!(
            DomainSeparator::from_spec(&spec),
            DomainSeparator::new(5, Address::from_bytes([7; 20]))
        );
    }

    #[test]
    fn test_word_encodings() {
        let word = u256_word(0x0102);
        assert_eq!(word[30], 0x01);
        assert_eq!(word[31], 0x02);
        assert!(word[..30].iter().all(|b| *b == 0));

        let addr = Address::from_bytes([0xEE; 20]);
        let word = address_word(&addr);
        assert!(word[..12].iter().all(|b| *b == 0));
        assert_eq!(&word[12..], addr.as_bytes());
    }
}
