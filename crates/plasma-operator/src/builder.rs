//! # Block Builder
//!
//! One commitment tree per side-ledger block; the last is "open" and owned
//! exclusively by the builder until publication, after which it is archived
//! immutably under the block number the root ledger assigned and serves
//! concurrent proof reads.
//!
//! Within one open block a unit committed twice is last-write-wins — the
//! tree slot holds the most recent transfer's hash.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use plasma_core::{Address, BlockNumber, ChainSpec, Hash256, IdentityError, UnitId};
use plasma_crypto::{SparseMerkleTree, TreeError};
use plasma_ledger::{LedgerError, LedgerEvent, RootLedgerClient};
use plasma_tx::{DomainSeparator, TransactionError, TransactionRecord};

/// Errors from block-builder operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperatorError {
    /// The unit is not under side-ledger tracking.
    #[error("unit {unit} is not tracked by the operator")]
    NotTracked {
        /// The untracked unit.
        unit: UnitId,
    },

    /// The transfer is not signed by the unit's recorded owner.
    #[error("transfer of {unit} signed by {got}, recorded owner is {expected}")]
    WrongSigner {
        /// The transferred unit.
        unit: UnitId,
        /// The owner the operator has on record.
        expected: Address,
        /// The recovered signer.
        got: Address,
    },

    /// No archived tree exists for the requested block.
    #[error("no archived block {block}")]
    UnknownBlock {
        /// The block that was never published or has been pruned.
        block: BlockNumber,
    },

    /// Commitment-tree failure.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Malformed transaction.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Identifier conversion failure.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Root-ledger call failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// The operator's block builder and proof archive.
pub struct BlockBuilder {
    spec: ChainSpec,
    domain: DomainSeparator,
    open: SparseMerkleTree,
    archive: BTreeMap<BlockNumber, SparseMerkleTree>,
    /// Current recorded owner per tracked unit — the admission authority.
    tracked: HashMap<UnitId, Address>,
    event_cursor: usize,
}

impl BlockBuilder {
    /// Create a builder for one deployment with an empty open block.
    pub fn new(spec: ChainSpec) -> Result<Self, OperatorError> {
        let domain = DomainSeparator::from_spec(&spec);
        let open = SparseMerkleTree::new(spec.tree_depth)?;
        Ok(Self {
            spec,
            domain,
            open,
            archive: BTreeMap::new(),
            tracked: HashMap::new(),
            event_cursor: 0,
        })
    }

    /// Whether the operator tracks this unit.
    pub fn is_tracking(&self, unit: UnitId) -> bool {
        self.tracked.contains_key(&unit)
    }

    /// The owner the operator currently records for a unit.
    pub fn recorded_owner(&self, unit: UnitId) -> Option<Address> {
        self.tracked.get(&unit).copied()
    }

    /// The open tree's current root (what the next publication commits).
    pub fn open_root(&self) -> Hash256 {
        self.open.root_hash()
    }

    /// Admit a transfer into the open block.
    ///
    /// The unit must be tracked and the transfer signed by the recorded
    /// owner; otherwise the submission is rejected synchronously with
    /// [`OperatorError::NotTracked`] / [`OperatorError::WrongSigner`]. On
    /// admission the unit's leaf becomes the transfer's hash (last write
    /// in a block wins) and the recorded owner advances to the receiver.
    pub fn commit(&mut self, txn: &TransactionRecord) -> Result<Vec<Hash256>, OperatorError> {
        let unit = txn.unit;
        let expected = *self
            .tracked
            .get(&unit)
            .ok_or(OperatorError::NotTracked { unit })?;
        let signer = txn.signer(&self.domain)?;
        if signer != expected {
            return Err(OperatorError::WrongSigner {
                unit,
                expected,
                got: signer,
            });
        }

        let key = unit.tree_key(self.spec.tree_depth)?;
        let updates = self.open.set(&key, txn.leaf_hash()?)?;
        self.tracked.insert(unit, txn.new_owner);
        tracing::debug!(%unit, new_owner = %txn.new_owner, "transfer admitted into open block");
        Ok(updates)
    }

    /// Publish the open block: submit its root, archive the tree under the
    /// number the ledger assigned, and open a fresh tree.
    pub fn publish<L: RootLedgerClient>(
        &mut self,
        ledger: &mut L,
    ) -> Result<BlockNumber, OperatorError> {
        let root = self.open.root_hash();
        let number = ledger.submit_block(root)?;
        let fresh = SparseMerkleTree::new(self.spec.tree_depth)?;
        let published = std::mem::replace(&mut self.open, fresh);
        self.archive.insert(number, published);
        tracing::info!(%number, %root, "side-ledger block published");
        Ok(number)
    }

    /// The inclusion proof for a unit in an archived block.
    ///
    /// Fails with [`OperatorError::UnknownBlock`] when the block was never
    /// published or has been pruned.
    pub fn branch_for(
        &self,
        unit: UnitId,
        block: BlockNumber,
    ) -> Result<Vec<Hash256>, OperatorError> {
        let tree = self
            .archive
            .get(&block)
            .ok_or(OperatorError::UnknownBlock { block })?;
        let key = unit.tree_key(self.spec.tree_depth)?;
        Ok(tree.branch(&key)?)
    }

    /// The archived root of a published block.
    pub fn archived_root(&self, block: BlockNumber) -> Result<Hash256, OperatorError> {
        self.archive
            .get(&block)
            .map(SparseMerkleTree::root_hash)
            .ok_or(OperatorError::UnknownBlock { block })
    }

    /// Drain root-ledger events and react:
    ///
    /// - `DepositAdded` — start tracking the unit and commit its deposit
    ///   transaction into the open block.
    /// - `DepositCancelled` — stop tracking and clear the open-block leaf
    ///   (cancellation is only possible before publication, so the leaf
    ///   can only be in the open tree).
    /// - `ExitFinished` — the unit left side-ledger custody; stop
    ///   tracking.
    pub fn sync<L: RootLedgerClient>(&mut self, ledger: &mut L) -> Result<(), OperatorError> {
        let events = ledger.events_since(self.event_cursor);
        self.event_cursor += events.len();

        for event in events {
            match event {
                LedgerEvent::DepositAdded { unit, owner } => {
                    if self.tracked.contains_key(&unit) {
                        continue;
                    }
                    let Some(record) = ledger.deposit_record(unit) else {
                        continue;
                    };
                    self.tracked.insert(unit, owner);
                    self.commit(&record.txn)?;
                    tracing::info!(%unit, %owner, "deposit tracked");
                }
                LedgerEvent::DepositCancelled { unit } => {
                    if self.tracked.remove(&unit).is_some() {
                        let key = unit.tree_key(self.spec.tree_depth)?;
                        self.open.delete(&key)?;
                        tracing::info!(%unit, "deposit cancelled, tracking dropped");
                    }
                }
                LedgerEvent::ExitFinished { unit, .. } => {
                    self.tracked.remove(&unit);
                    tracing::info!(%unit, "unit exited to root ledger, tracking dropped");
                }
                LedgerEvent::BlockPublished { .. }
                | LedgerEvent::ExitStarted { .. }
                | LedgerEvent::ChallengeStarted { .. }
                | LedgerEvent::ChallengeCancelled { .. }
                | LedgerEvent::ExitCancelled { .. } => {}
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for BlockBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockBuilder")
            .field("tracked", &self.tracked.len())
            .field("archived", &self.archive.len())
            .field("open_root", &self.open.root_hash())
            .finish()
    }
}
