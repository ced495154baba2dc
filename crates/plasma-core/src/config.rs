//! # Protocol Configuration
//!
//! The deployment constants every component depends on. Nothing in the
//! stack hard-codes a chain identifier, contract address, tree depth, or
//! protocol period — they all arrive through [`ChainSpec`], supplied by the
//! surrounding deployment.

use serde::{Deserialize, Serialize};

use crate::identity::Address;

/// Deployment constants for one Plasma Cash instance.
///
/// The chain identifier and verifying-contract address bind signing digests
/// to a single deployment: the same transfer signed under a different
/// `ChainSpec` hashes differently and recovers a different signer on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSpec {
    /// Root-ledger chain identifier.
    pub chain_id: u64,
    /// Address of the root-ledger contract that verifies digests and proofs.
    pub verifying_contract: Address,
    /// Commitment-tree depth in bits — the bit-width of unit identifiers.
    pub tree_depth: usize,
    /// How many root-ledger blocks to poll before a pending confirmation is
    /// reported as timed out.
    pub sync_grace_blocks: u64,
    /// The withdrawal/challenge period, in root-ledger blocks, between
    /// `start_exit` and the earliest admissible `finalize_exit`.
    pub withdrawal_period: u64,
}

impl ChainSpec {
    /// Create a spec with the protocol's default periods and a 160-bit tree.
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            chain_id,
            verifying_contract,
            tree_depth: 160,
            sync_grace_blocks: 7,
            withdrawal_period: 7,
        }
    }

    /// Set the commitment-tree depth in bits.
    pub fn with_tree_depth(mut self, bits: usize) -> Self {
        self.tree_depth = bits;
        self
    }

    /// Set the block-sync grace period.
    pub fn with_sync_grace(mut self, blocks: u64) -> Self {
        self.sync_grace_blocks = blocks;
        self
    }

    /// Set the withdrawal/challenge period.
    pub fn with_withdrawal_period(mut self, blocks: u64) -> Self {
        self.withdrawal_period = blocks;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let spec = ChainSpec::new(1, Address::ZERO);
        assert_eq!(spec.tree_depth, 160);
        assert_eq!(spec.sync_grace_blocks, 7);
        assert_eq!(spec.withdrawal_period, 7);
    }

    #[test]
    fn test_builders() {
        let spec = ChainSpec::new(5, Address::ZERO)
            .with_tree_depth(256)
            .with_sync_grace(3)
            .with_withdrawal_period(14);
        assert_eq!(spec.tree_depth, 256);
        assert_eq!(spec.sync_grace_blocks, 3);
        assert_eq!(spec.withdrawal_period, 14);
    }
}
