//! # Root-Ledger Client Interface
//!
//! The fixed entrypoint surface through which every off-chain component
//! reaches the root ledger. Production deployments bind these calls to the
//! live ledger; tests use [`crate::memory::InMemoryRootLedger`]. Both must
//! satisfy the same dispute contract, so the callers cannot tell them
//! apart.
//!
//! Calls reject synchronously with a [`LedgerError`]; none of them mutate
//! caller-side state. Confirmed outcomes arrive through the event log.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use plasma_core::{Address, BlockNumber, Hash256, UnitId};
use plasma_tx::{TransactionError, TransactionRecord};

use crate::events::LedgerEvent;

/// Errors from root-ledger entrypoints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The claimed exiter is not the exit transaction's receiver.
    #[error("{claimed} is not the owner named by the exit transaction for {unit}")]
    NotOwner {
        /// The unit being exited.
        unit: UnitId,
        /// The address that attempted the exit.
        claimed: Address,
    },

    /// The claimed history tail does not chain.
    #[error("exit history for {unit} does not chain: {reason}")]
    BrokenChain {
        /// The unit being exited.
        unit: UnitId,
        /// Which link failed.
        reason: String,
    },

    /// An exit claim for this unit is already outstanding.
    #[error("an exit for {unit} is already outstanding")]
    ExitPending {
        /// The unit with the outstanding claim.
        unit: UnitId,
    },

    /// No exit claim exists for this unit.
    #[error("no outstanding exit for {unit}")]
    NoSuchExit {
        /// The unit without a claim.
        unit: UnitId,
    },

    /// No interactive challenge is outstanding for this unit.
    #[error("no outstanding challenge for {unit}")]
    NotChallenged {
        /// The unit without a challenge.
        unit: UnitId,
    },

    /// Challenge evidence was rejected — it matches none of the fraud
    /// patterns admissibly.
    #[error("challenge against {unit} rejected: {reason}")]
    ChallengeRejected {
        /// The challenged unit.
        unit: UnitId,
        /// Why the evidence was not accepted.
        reason: String,
    },

    /// A challenge response was rejected.
    #[error("challenge response for {unit} rejected: {reason}")]
    InvalidResponse {
        /// The unit under challenge.
        unit: UnitId,
        /// Why the response was not accepted.
        reason: String,
    },

    /// The response window for the outstanding challenge has elapsed.
    #[error("response window for {unit} closed at {closed_at}")]
    ResponseWindowClosed {
        /// The unit under challenge.
        unit: UnitId,
        /// The ledger height at which the window closed.
        closed_at: BlockNumber,
    },

    /// The withdrawal period has not elapsed yet.
    #[error("exit for {unit} cannot finalize before {ready_at}")]
    ExitNotMature {
        /// The exiting unit.
        unit: UnitId,
        /// The earliest height at which finalization is admissible.
        ready_at: BlockNumber,
    },

    /// An inclusion proof did not verify against the published root.
    #[error("inclusion proof for {unit} does not match the root of {block}")]
    ProofInvalid {
        /// The unit the proof was for.
        unit: UnitId,
        /// The block the proof claimed inclusion in.
        block: BlockNumber,
    },

    /// A proof referenced a block the ledger never published.
    #[error("no published block {block}")]
    UnknownBlock {
        /// The unpublished block number.
        block: BlockNumber,
    },

    /// No deposit is recorded for this unit.
    #[error("no deposit recorded for {unit}")]
    DepositUnknown {
        /// The undeposited unit.
        unit: UnitId,
    },

    /// The deposit is no longer pending and cannot be withdrawn directly.
    #[error("deposit for {unit} is already included; exit instead")]
    DepositNotPending {
        /// The included unit.
        unit: UnitId,
    },

    /// A deposit for this unit already exists.
    #[error("unit {unit} is already deposited")]
    AlreadyDeposited {
        /// The deposited unit.
        unit: UnitId,
    },

    /// A submitted transaction was malformed (unsigned, bad signature
    /// shape, bad encoding).
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// A transaction together with its inclusion evidence: the sibling branch
/// and the published block it claims inclusion in.
///
/// This is the only shape of evidence the dispute engine accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenTransaction {
    /// The included transaction.
    pub txn: TransactionRecord,
    /// Sibling hashes, root→leaf order.
    pub proof: Vec<Hash256>,
    /// The published block the transaction was included in.
    pub block: BlockNumber,
}

/// The synchronous outcome of a challenge submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// The evidence proved fraud outright; the exit is cancelled.
    Cancelled,
    /// The claim is now contested; the exiter has a response window.
    Contested,
}

/// A deposit the root ledger has accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRecord {
    /// The depositing owner.
    pub depositor: Address,
    /// The self-signed deposit transaction.
    pub txn: TransactionRecord,
    /// Whether the deposit is still awaiting side-ledger inclusion (and so
    /// can still be withdrawn directly).
    pub pending: bool,
}

/// The root-ledger entrypoints the off-chain stack calls.
///
/// Implementations must be deterministic about ordering: events are
/// appended in the order the corresponding entrypoints took effect, and
/// `events_since` never reorders or drops.
pub trait RootLedgerClient {
    /// Deposit a unit: the self-signed deposit transaction moves it under
    /// side-ledger custody, pending inclusion.
    fn deposit(&mut self, txn: &TransactionRecord) -> Result<(), LedgerError>;

    /// Withdraw a still-pending deposit before any block includes it.
    fn withdraw(&mut self, unit: UnitId) -> Result<(), LedgerError>;

    /// Publish a side-ledger block root. Returns the block number the
    /// ledger assigned to it.
    fn submit_block(&mut self, root: Hash256) -> Result<BlockNumber, LedgerError>;

    /// Open an exit claim for `user` with the claimed history tail: the
    /// exit transaction and, unless the tail is the deposit itself, its
    /// parent — each with inclusion evidence.
    fn start_exit(
        &mut self,
        user: Address,
        parent: Option<ProvenTransaction>,
        exit: ProvenTransaction,
    ) -> Result<(), LedgerError>;

    /// Contest the outstanding exit for the evidence transaction's unit.
    fn challenge_exit(&mut self, evidence: ProvenTransaction)
        -> Result<ChallengeOutcome, LedgerError>;

    /// Answer the outstanding interactive challenge for `unit`.
    fn respond_challenge(
        &mut self,
        unit: UnitId,
        response: ProvenTransaction,
    ) -> Result<(), LedgerError>;

    /// Settle the exit after the withdrawal period. Returns `true` when
    /// the unit returned to root-ledger custody, `false` when an
    /// unanswered challenge denied the exit.
    fn finalize_exit(&mut self, unit: UnitId) -> Result<bool, LedgerError>;

    /// The deposit record for a unit, if one exists.
    fn deposit_record(&self, unit: UnitId) -> Option<DepositRecord>;

    /// The evidence of the open interactive challenge against `unit`'s
    /// exit, if one is outstanding. The exiter reads this to construct its
    /// response.
    fn outstanding_challenge(&self, unit: UnitId) -> Option<ProvenTransaction>;

    /// The current ledger height (the number of the most recent block,
    /// advanced by publication and by the passage of root-ledger time).
    fn head_block(&self) -> BlockNumber;

    /// The published commitment root for a block, if one was submitted.
    fn published_root(&self, block: BlockNumber) -> Option<Hash256>;

    /// All events from `cursor` onward, in emission order.
    fn events_since(&self, cursor: usize) -> Vec<LedgerEvent>;
}
