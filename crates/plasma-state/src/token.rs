//! # Unit Record State Machine
//!
//! ## States and Transitions
//!
//! ```text
//! RootLedger ──deposit()──▶ Deposited ──mark_included()──▶ SideLedger
//!     ▲                        │                          │        │
//!     │                cancel_deposit()          add_transfer()  start_exit()
//!     │                        │                 (self-loop)       │
//!     └────────────────────────┘                                   ▼
//!     ▲                                                         Exiting
//!     │                                                         │     │
//!     └──────────── finalize(success), history cleared ─────────┘     │
//!                                                                     │
//!                    SideLedger ◀── finalize(cancelled), history kept ┘
//! ```
//!
//! Illegal calls fail with [`TokenError::InvalidState`] and leave the
//! record untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use plasma_core::{Address, BlockNumber, UnitId};
use plasma_tx::{DomainSeparator, OwnershipHistory, TransactionRecord};

/// The lifecycle state of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    /// Under root-ledger custody; not tradable on the side ledger.
    RootLedger,
    /// Deposit observed on the root ledger; awaiting inclusion in a
    /// published side-ledger block.
    Deposited,
    /// Live on the side ledger; transfers accumulate history.
    SideLedger,
    /// An exit claim is outstanding on the root ledger.
    Exiting,
}

impl TokenStatus {
    /// The canonical state name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RootLedger => "ROOT_LEDGER",
            Self::Deposited => "DEPOSITED",
            Self::SideLedger => "SIDE_LEDGER",
            Self::Exiting => "EXITING",
        }
    }
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from unit-record operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The operation is not legal in the record's current state.
    #[error("{operation} is illegal while unit is {status}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The record's current status.
        status: TokenStatus,
    },

    /// A transaction for a different unit was offered to this record.
    #[error("transaction is for {got}, record tracks {expected}")]
    UnitMismatch {
        /// The unit this record tracks.
        expected: UnitId,
        /// The unit the transaction names.
        got: UnitId,
    },
}

/// One unit and everything its owner knows about it: status, ordered
/// transfer history, and where the current tail transfer was included.
///
/// Owned exclusively by a single party agent. Handing a unit to another
/// agent is copy-then-invalidate — the record is rebuilt on the receiving
/// side from the transported history, never aliased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitRecord {
    /// The unit this record tracks.
    pub unit: UnitId,
    depositor: Address,
    status: TokenStatus,
    history: OwnershipHistory,
    tail_included_at: Option<BlockNumber>,
}

impl UnitRecord {
    /// A unit under root-ledger custody, owned by `owner`.
    ///
    /// Every record gets a freshly allocated history.
    pub fn new(unit: UnitId, owner: Address) -> Self {
        Self {
            unit,
            depositor: owner,
            status: TokenStatus::RootLedger,
            history: OwnershipHistory::new(),
            tail_included_at: None,
        }
    }

    /// Rebuild a record on the receiving side of a transfer: the unit is
    /// live on the side ledger with the transported history. The tail's
    /// inclusion block is `None` until a published block confirms it.
    pub fn from_history(
        unit: UnitId,
        depositor: Address,
        history: OwnershipHistory,
        tail_included_at: Option<BlockNumber>,
    ) -> Self {
        Self {
            unit,
            depositor,
            status: TokenStatus::SideLedger,
            history,
            tail_included_at,
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> TokenStatus {
        self.status
    }

    /// The original depositor — the signer the history must start from.
    pub fn depositor(&self) -> Address {
        self.depositor
    }

    /// The transfer history, earliest first.
    pub fn history(&self) -> &OwnershipHistory {
        &self.history
    }

    /// The block in which the current tail transfer was included, once a
    /// published block has confirmed it.
    pub fn tail_included_at(&self) -> Option<BlockNumber> {
        self.tail_included_at
    }

    /// The unit's current owner: the tail transfer's receiver, or the
    /// depositor while the history is empty.
    pub fn current_owner(&self) -> Address {
        self.history
            .last()
            .map(|txn| txn.new_owner)
            .unwrap_or(self.depositor)
    }

    fn check_unit(&self, txn: &TransactionRecord) -> Result<(), TokenError> {
        if txn.unit != self.unit {
            return Err(TokenError::UnitMismatch {
                expected: self.unit,
                got: txn.unit,
            });
        }
        Ok(())
    }

    /// RootLedger → Deposited: the root ledger confirmed our deposit.
    ///
    /// The deposit transaction becomes history entry 0 and its receiver
    /// becomes the recorded depositor.
    pub fn deposit(&mut self, txn: TransactionRecord) -> Result<(), TokenError> {
        if self.status != TokenStatus::RootLedger {
            return Err(TokenError::InvalidState {
                operation: "deposit",
                status: self.status,
            });
        }
        self.check_unit(&txn)?;
        self.depositor = txn.new_owner;
        self.history.push(txn);
        self.status = TokenStatus::Deposited;
        Ok(())
    }

    /// Deposited → SideLedger: a published block includes our deposit.
    pub fn mark_included(&mut self, block: BlockNumber) -> Result<(), TokenError> {
        if self.status != TokenStatus::Deposited {
            return Err(TokenError::InvalidState {
                operation: "mark_included",
                status: self.status,
            });
        }
        self.tail_included_at = Some(block);
        self.status = TokenStatus::SideLedger;
        Ok(())
    }

    /// Deposited → RootLedger: the deposit was withdrawn before inclusion.
    /// History is cleared; the unit never reached the side ledger.
    pub fn cancel_deposit(&mut self) -> Result<(), TokenError> {
        if self.status != TokenStatus::Deposited {
            return Err(TokenError::InvalidState {
                operation: "cancel_deposit",
                status: self.status,
            });
        }
        self.history.clear();
        self.tail_included_at = None;
        self.status = TokenStatus::RootLedger;
        Ok(())
    }

    /// Append a transfer while the unit is live on the side ledger.
    ///
    /// The tail inclusion block is cleared until a published block confirms
    /// the new tail via [`confirm_inclusion`](Self::confirm_inclusion).
    pub fn add_transfer(&mut self, txn: TransactionRecord) -> Result<(), TokenError> {
        if self.status != TokenStatus::SideLedger {
            return Err(TokenError::InvalidState {
                operation: "add_transfer",
                status: self.status,
            });
        }
        self.check_unit(&txn)?;
        self.history.push(txn);
        self.tail_included_at = None;
        Ok(())
    }

    /// Record the published block that includes the current tail transfer.
    pub fn confirm_inclusion(&mut self, block: BlockNumber) -> Result<(), TokenError> {
        if self.status != TokenStatus::SideLedger {
            return Err(TokenError::InvalidState {
                operation: "confirm_inclusion",
                status: self.status,
            });
        }
        self.tail_included_at = Some(block);
        Ok(())
    }

    /// SideLedger → Exiting: an exit claim for this unit is outstanding.
    pub fn start_exit(&mut self) -> Result<(), TokenError> {
        if self.status != TokenStatus::SideLedger {
            return Err(TokenError::InvalidState {
                operation: "start_exit",
                status: self.status,
            });
        }
        self.status = TokenStatus::Exiting;
        Ok(())
    }

    /// Exiting → RootLedger on success (history cleared), or back to
    /// SideLedger on a cancelled exit (history kept — the unit remains
    /// under side-ledger custody).
    pub fn finalize(&mut self, success: bool) -> Result<(), TokenError> {
        if self.status != TokenStatus::Exiting {
            return Err(TokenError::InvalidState {
                operation: "finalize",
                status: self.status,
            });
        }
        if success {
            self.history.clear();
            self.tail_included_at = None;
            self.status = TokenStatus::RootLedger;
        } else {
            self.status = TokenStatus::SideLedger;
        }
        Ok(())
    }

    /// Continuity check over the untested suffix of the history (see
    /// [`OwnershipHistory::is_valid`]).
    pub fn is_valid(&mut self, domain: &DomainSeparator) -> bool {
        let depositor = self.depositor;
        self.history.is_valid(&depositor, domain)
    }
}
