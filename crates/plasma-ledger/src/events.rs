//! # Root-Ledger Events
//!
//! Everything the off-chain stack learns from the root ledger arrives as
//! one of these events, in emission order. Components keep a cursor into
//! the log and dispatch on the variant with an exhaustive `match` — adding
//! an event forces every consumer to handle it.

use serde::{Deserialize, Serialize};

use plasma_core::{Address, BlockNumber, Hash256, UnitId};

/// One notification from the root ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A deposit was accepted and is pending side-ledger inclusion.
    DepositAdded {
        /// The deposited unit.
        unit: UnitId,
        /// The depositing owner.
        owner: Address,
    },
    /// A pending deposit was withdrawn before inclusion.
    DepositCancelled {
        /// The withdrawn unit.
        unit: UnitId,
    },
    /// The operator published a side-ledger block root.
    BlockPublished {
        /// The block number the ledger assigned.
        number: BlockNumber,
        /// The published commitment root.
        root: Hash256,
    },
    /// An exit claim was opened.
    ExitStarted {
        /// The exiting unit.
        unit: UnitId,
        /// The claimed exiting owner.
        owner: Address,
    },
    /// An exit claim was contested; the exiter may respond.
    ChallengeStarted {
        /// The contested unit.
        unit: UnitId,
    },
    /// An interactive challenge was answered and cleared.
    ChallengeCancelled {
        /// The unit whose challenge was cleared.
        unit: UnitId,
    },
    /// An exit claim was cancelled — by immediate fraud proof or by an
    /// unanswered challenge at finalization.
    ExitCancelled {
        /// The unit whose exit was cancelled.
        unit: UnitId,
    },
    /// An exit finalized successfully; the unit is back under root-ledger
    /// custody.
    ExitFinished {
        /// The exited unit.
        unit: UnitId,
        /// The owner the unit was released to.
        owner: Address,
    },
}

impl LedgerEvent {
    /// The unit this event concerns, if it concerns one.
    pub fn unit(&self) -> Option<UnitId> {
        match self {
            Self::DepositAdded { unit, .. }
            | Self::DepositCancelled { unit }
            | Self::ExitStarted { unit, .. }
            | Self::ChallengeStarted { unit }
            | Self::ChallengeCancelled { unit }
            | Self::ExitCancelled { unit }
            | Self::ExitFinished { unit, .. } => Some(*unit),
            Self::BlockPublished { .. } => None,
        }
    }
}
