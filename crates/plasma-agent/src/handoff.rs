//! # Unit Handoff
//!
//! The peer-transport package for moving a unit between agents: the raw
//! unit identifier plus the transport encoding of every transfer in its
//! history, earliest first. No domain separator travels — the receiver
//! recovers signers under the domain it already trusts, and cross-checks
//! the depositor against the root ledger.

use serde::{Deserialize, Serialize};

use plasma_core::UnitId;
use plasma_tx::{TransactionError, TransactionRecord};

/// A unit in transit between agents.
///
/// Produced by the sender after the operator admits its transfer; the
/// sender's own record is invalidated at the same moment, so exactly one
/// live record exists per unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitHandoff {
    /// The unit being handed off.
    pub unit: UnitId,
    /// Transport encodings of the full history, earliest first.
    pub history: Vec<Vec<u8>>,
}

impl UnitHandoff {
    /// Package a history for transport.
    pub fn from_records(
        unit: UnitId,
        records: &[TransactionRecord],
    ) -> Result<Self, TransactionError> {
        let history = records
            .iter()
            .map(TransactionRecord::encode)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { unit, history })
    }

    /// Decode the transported history back into records.
    pub fn decode_history(&self) -> Result<Vec<TransactionRecord>, TransactionError> {
        self.history
            .iter()
            .map(|bytes| TransactionRecord::decode(bytes))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plasma_core::{Address, BlockNumber};
    use plasma_crypto::KeyPair;
    use plasma_tx::DomainSeparator;

    #[test]
    fn test_roundtrip() {
        let domain = DomainSeparator::new(1, Address::from_bytes([0xCC; 20]));
        let pair = KeyPair::from_seed(&[9u8; 32]).unwrap();
        let mut txn = TransactionRecord::new(
            BlockNumber::DEPOSIT,
            UnitId::from_u64(3),
            pair.address(),
        );
        txn.sign(&pair, &domain).unwrap();

        let handoff = UnitHandoff::from_records(UnitId::from_u64(3), &[txn.clone()]).unwrap();
        assert_eq!(handoff.history.len(), 1);
        assert_eq!(handoff.decode_history().unwrap(), vec![txn]);
    }

    #[test]
    fn test_serde_roundtrip() {
        let domain = DomainSeparator::new(1, Address::from_bytes([0xCC; 20]));
        let pair = KeyPair::from_seed(&[9u8; 32]).unwrap();
        let mut txn = TransactionRecord::new(
            BlockNumber::DEPOSIT,
            UnitId::from_u64(3),
            pair.address(),
        );
        txn.sign(&pair, &domain).unwrap();
        let handoff = UnitHandoff::from_records(UnitId::from_u64(3), &[txn]).unwrap();

        let json = serde_json::to_string(&handoff).unwrap();
        let back: UnitHandoff = serde_json::from_str(&json).unwrap();
        assert_eq!(back, handoff);
    }

    #[test]
    fn test_unsigned_entries_cannot_travel() {
        let unsigned = TransactionRecord::new(
            BlockNumber::DEPOSIT,
            UnitId::from_u64(3),
            Address::ZERO,
        );
        assert!(UnitHandoff::from_records(UnitId::from_u64(3), &[unsigned]).is_err());
    }
}
