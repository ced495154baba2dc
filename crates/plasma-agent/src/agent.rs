//! # Party Agent
//!
//! Drives one participant's units through the protocol. Entrypoint calls
//! and purse mutations are strictly separated: calling the ledger never
//! changes a record, and [`PartyAgent::poll`] advances records only on the
//! events the ledger actually emitted, dispatching on the event variant
//! with one exhaustive `match`.
//!
//! Waiting is a bounded-retry polling loop
//! ([`PartyAgent::sync_until`]) — when the grace period elapses without
//! the expected confirmation the caller gets a retryable
//! [`AgentError::ConfirmationTimeout`], never a hang.

use std::collections::HashMap;

use thiserror::Error;

use plasma_core::{Address, BlockNumber, ChainSpec, Hash256, IdentityError, UnitId};
use plasma_crypto::{smt::verify_inclusion, KeyPair};
use plasma_ledger::{
    ChallengeOutcome, LedgerError, LedgerEvent, ProvenTransaction, RootLedgerClient,
};
use plasma_operator::{BlockBuilder, OperatorError};
use plasma_state::{TokenError, TokenStatus, UnitRecord};
use plasma_tx::{DomainSeparator, OwnershipHistory, TransactionError, TransactionRecord};

use crate::handoff::UnitHandoff;

/// Errors from party-agent operations.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The unit is not in this agent's purse.
    #[error("unit {unit} is not in this agent's purse")]
    NotInPurse {
        /// The missing unit.
        unit: UnitId,
    },

    /// The agent is not the unit's current owner.
    #[error("unit {unit} is currently owned by {owner}")]
    NotOwned {
        /// The unit in question.
        unit: UnitId,
        /// Its current owner.
        owner: Address,
    },

    /// The unit's tail transfer has no confirmed inclusion block yet.
    #[error("tail transfer of {unit} has no confirmed inclusion yet")]
    MissingInclusion {
        /// The unit awaiting inclusion.
        unit: UnitId,
    },

    /// A received handoff failed validation and was not admitted.
    #[error("handoff rejected: {reason}")]
    InvalidHandoff {
        /// Why the handoff was rejected.
        reason: String,
    },

    /// A confirmation did not arrive within the block-sync grace period.
    /// Retryable — the request may still confirm later.
    #[error("no confirmation of {waiting_for} within {polls} polls")]
    ConfirmationTimeout {
        /// What the agent was waiting for.
        waiting_for: String,
        /// How many polls were attempted.
        polls: u64,
    },

    /// Unit-record state machine rejection.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Malformed or unsigned transaction.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Root-ledger entrypoint rejection.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Operator rejection.
    #[error(transparent)]
    Operator(#[from] OperatorError),

    /// Identifier conversion failure.
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// One participant: a key pair and the purse of units it exclusively owns.
pub struct PartyAgent {
    keypair: KeyPair,
    address: Address,
    spec: ChainSpec,
    domain: DomainSeparator,
    purse: HashMap<UnitId, UnitRecord>,
    event_cursor: usize,
}

impl PartyAgent {
    /// Create an agent for one deployment.
    ///
    /// Every agent gets a freshly allocated purse; purses are never shared
    /// or cloned between agents.
    pub fn new(keypair: KeyPair, spec: ChainSpec) -> Self {
        let address = keypair.address();
        let domain = DomainSeparator::from_spec(&spec);
        Self {
            keypair,
            address,
            spec,
            domain,
            purse: HashMap::new(),
            event_cursor: 0,
        }
    }

    /// This agent's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The record for a unit in the purse.
    pub fn record(&self, unit: UnitId) -> Option<&UnitRecord> {
        self.purse.get(&unit)
    }

    /// Units currently in the purse.
    pub fn units(&self) -> Vec<UnitId> {
        self.purse.keys().copied().collect()
    }

    /// Admit a root-ledger unit this agent owns (minting / test setup).
    pub fn grant(&mut self, unit: UnitId) {
        self.purse.insert(unit, UnitRecord::new(unit, self.address));
    }

    fn owned_record(&self, unit: UnitId) -> Result<&UnitRecord, AgentError> {
        let record = self
            .purse
            .get(&unit)
            .ok_or(AgentError::NotInPurse { unit })?;
        if record.current_owner() != self.address {
            return Err(AgentError::NotOwned {
                unit,
                owner: record.current_owner(),
            });
        }
        Ok(record)
    }

    // ─── Lifecycle drivers ───────────────────────────────────────────

    /// Deposit a root-ledger unit: sign the deposit transaction and submit
    /// it. The record advances to Deposited only when `DepositAdded` is
    /// observed.
    pub fn deposit<L: RootLedgerClient>(
        &mut self,
        unit: UnitId,
        ledger: &mut L,
    ) -> Result<(), AgentError> {
        let record = self.owned_record(unit)?;
        if record.status() != TokenStatus::RootLedger {
            return Err(TokenError::InvalidState {
                operation: "deposit",
                status: record.status(),
            }
            .into());
        }
        let mut txn = TransactionRecord::new(BlockNumber::DEPOSIT, unit, self.address);
        txn.sign(&self.keypair, &self.domain)?;
        ledger.deposit(&txn)?;
        Ok(())
    }

    /// Withdraw a deposit before any block includes it. The record
    /// advances back to RootLedger on `DepositCancelled`.
    pub fn cancel_deposit<L: RootLedgerClient>(
        &mut self,
        unit: UnitId,
        ledger: &mut L,
    ) -> Result<(), AgentError> {
        let record = self.owned_record(unit)?;
        if record.status() != TokenStatus::Deposited {
            return Err(TokenError::InvalidState {
                operation: "cancel_deposit",
                status: record.status(),
            }
            .into());
        }
        ledger.withdraw(unit)?;
        Ok(())
    }

    /// Transfer a unit to `to`: sign the transfer, submit it to the
    /// operator, and package the unit for handoff.
    ///
    /// The operator admits or rejects synchronously. On admission the
    /// local record is invalidated (copy-then-invalidate) and the returned
    /// [`UnitHandoff`] is the receiver's copy.
    pub fn transfer(
        &mut self,
        unit: UnitId,
        to: Address,
        operator: &mut BlockBuilder,
    ) -> Result<UnitHandoff, AgentError> {
        let record = self.owned_record(unit)?;
        if record.status() != TokenStatus::SideLedger {
            return Err(TokenError::InvalidState {
                operation: "transfer",
                status: record.status(),
            }
            .into());
        }
        let tail_block = record
            .tail_included_at()
            .ok_or(AgentError::MissingInclusion { unit })?;

        let mut txn = TransactionRecord::new(tail_block, unit, to);
        txn.sign(&self.keypair, &self.domain)?;
        operator.commit(&txn)?;

        // Admitted: extend the history, package it, and invalidate our
        // copy.
        let record = self
            .purse
            .get_mut(&unit)
            .ok_or(AgentError::NotInPurse { unit })?;
        record.add_transfer(txn)?;
        let handoff = UnitHandoff::from_records(unit, record.history().entries())?;
        self.purse.remove(&unit);
        tracing::info!(%unit, %to, "unit transferred and invalidated locally");
        Ok(handoff)
    }

    /// Receive a unit from a peer: decode the history, validate
    /// continuity against the ledger's recorded depositor, and admit the
    /// unit to the purse.
    pub fn receive<L: RootLedgerClient>(
        &mut self,
        handoff: &UnitHandoff,
        ledger: &L,
        operator: &BlockBuilder,
    ) -> Result<(), AgentError> {
        let unit = handoff.unit;
        let entries = handoff
            .decode_history()
            .map_err(|e| AgentError::InvalidHandoff {
                reason: format!("undecodable history: {e}"),
            })?;

        let Some(tail) = entries.last() else {
            return Err(AgentError::InvalidHandoff {
                reason: "empty history".to_string(),
            });
        };
        if tail.new_owner != self.address {
            return Err(AgentError::InvalidHandoff {
                reason: "tail transfer does not name this agent".to_string(),
            });
        }
        if entries.iter().any(|txn| txn.unit != unit) {
            return Err(AgentError::InvalidHandoff {
                reason: "history mixes unit identifiers".to_string(),
            });
        }

        let deposit = ledger
            .deposit_record(unit)
            .ok_or_else(|| AgentError::InvalidHandoff {
                reason: "unit has no deposit on the root ledger".to_string(),
            })?;

        let tail_spends = tail.prev_block;
        let mut history = OwnershipHistory::from_entries(entries);
        if !history.is_valid(&deposit.depositor, &self.domain) {
            return Err(AgentError::InvalidHandoff {
                reason: "history does not chain from the depositor".to_string(),
            });
        }

        // If the tail already made it into a published block, confirm it
        // now; otherwise the next BlockPublished poll will.
        let tail_leaf = history
            .last()
            .ok_or(AgentError::InvalidHandoff {
                reason: "empty history".to_string(),
            })?
            .leaf_hash()?;
        let key = unit.tree_key(self.spec.tree_depth)?;
        let mut included_at = None;
        for block in tail_spends.0 + 1..=ledger.head_block().0 {
            let block = BlockNumber(block);
            let (Some(root), Ok(branch)) =
                (ledger.published_root(block), operator.branch_for(unit, block))
            else {
                continue;
            };
            if verify_inclusion(&key, &tail_leaf, &branch, &root) {
                included_at = Some(block);
                break;
            }
        }

        let record = UnitRecord::from_history(unit, deposit.depositor, history, included_at);
        self.purse.insert(unit, record);
        tracing::info!(%unit, "unit received into purse");
        Ok(())
    }

    /// Start an exit for a unit: gather the claimed tail, its parent, and
    /// their inclusion proofs from the operator's archive, and open the
    /// claim. The record advances to Exiting on `ExitStarted`.
    pub fn start_exit<L: RootLedgerClient>(
        &mut self,
        unit: UnitId,
        ledger: &mut L,
        operator: &BlockBuilder,
    ) -> Result<(), AgentError> {
        let record = self.owned_record(unit)?;
        if record.status() != TokenStatus::SideLedger {
            return Err(TokenError::InvalidState {
                operation: "start_exit",
                status: record.status(),
            }
            .into());
        }
        let tail = record
            .history()
            .last()
            .cloned()
            .ok_or(AgentError::MissingInclusion { unit })?;
        let tail_block = record
            .tail_included_at()
            .ok_or(AgentError::MissingInclusion { unit })?;

        let parent = match record.history().parent_of_last().cloned() {
            Some(parent_txn) => {
                // The tail spends the block its parent was included in.
                let parent_block = tail.prev_block;
                Some(ProvenTransaction {
                    proof: operator.branch_for(unit, parent_block)?,
                    txn: parent_txn,
                    block: parent_block,
                })
            }
            None => None,
        };
        let exit = ProvenTransaction {
            proof: operator.branch_for(unit, tail_block)?,
            txn: tail,
            block: tail_block,
        };

        ledger.start_exit(self.address, parent, exit)?;
        Ok(())
    }

    /// Contest an outstanding exit of a unit this agent holds, using its
    /// own confirmed tail as evidence.
    pub fn challenge_exit<L: RootLedgerClient>(
        &mut self,
        unit: UnitId,
        ledger: &mut L,
        operator: &BlockBuilder,
    ) -> Result<ChallengeOutcome, AgentError> {
        let record = self
            .purse
            .get(&unit)
            .ok_or(AgentError::NotInPurse { unit })?;
        let tail = record
            .history()
            .last()
            .cloned()
            .ok_or(AgentError::MissingInclusion { unit })?;
        let block = record
            .tail_included_at()
            .ok_or(AgentError::MissingInclusion { unit })?;
        let evidence = ProvenTransaction {
            proof: operator.branch_for(unit, block)?,
            txn: tail,
            block,
        };
        Ok(ledger.challenge_exit(evidence)?)
    }

    /// Settle an exit after the withdrawal period. Returns the ledger's
    /// verdict; the record advances on `ExitFinished` / `ExitCancelled`.
    pub fn finalize<L: RootLedgerClient>(
        &mut self,
        unit: UnitId,
        ledger: &mut L,
    ) -> Result<bool, AgentError> {
        let record = self.owned_record(unit)?;
        if record.status() != TokenStatus::Exiting {
            return Err(TokenError::InvalidState {
                operation: "finalize",
                status: record.status(),
            }
            .into());
        }
        Ok(ledger.finalize_exit(unit)?)
    }

    // ─── Event loop ──────────────────────────────────────────────────

    /// Drain new root-ledger events and advance the purse accordingly.
    pub fn poll<L: RootLedgerClient>(
        &mut self,
        ledger: &mut L,
        operator: &BlockBuilder,
    ) -> Result<(), AgentError> {
        let events = ledger.events_since(self.event_cursor);
        self.event_cursor += events.len();

        for event in events {
            match event {
                LedgerEvent::DepositAdded { unit, owner } => {
                    if owner != self.address {
                        continue;
                    }
                    let Some(deposit) = ledger.deposit_record(unit) else {
                        continue;
                    };
                    if let Some(record) = self.purse.get_mut(&unit) {
                        if record.status() == TokenStatus::RootLedger {
                            record.deposit(deposit.txn)?;
                            tracing::info!(%unit, "deposit confirmed");
                        }
                    }
                }
                LedgerEvent::DepositCancelled { unit } => {
                    if let Some(record) = self.purse.get_mut(&unit) {
                        if record.status() == TokenStatus::Deposited {
                            record.cancel_deposit()?;
                            tracing::info!(%unit, "deposit cancelled, unit back on root ledger");
                        }
                    }
                }
                LedgerEvent::BlockPublished { number, root } => {
                    self.on_block_published(operator, number, root)?;
                }
                LedgerEvent::ExitStarted { unit, owner } => {
                    let Some(record) = self.purse.get_mut(&unit) else {
                        continue;
                    };
                    if owner == self.address {
                        if record.status() == TokenStatus::SideLedger {
                            record.start_exit()?;
                        }
                    } else {
                        tracing::warn!(
                            %unit, claimed_by = %owner,
                            "exit started by another party for a unit in our purse"
                        );
                    }
                }
                LedgerEvent::ChallengeStarted { unit } => {
                    self.try_respond(ledger, operator, unit)?;
                }
                LedgerEvent::ChallengeCancelled { unit } => {
                    tracing::debug!(%unit, "challenge cleared");
                }
                LedgerEvent::ExitCancelled { unit } => {
                    if let Some(record) = self.purse.get_mut(&unit) {
                        if record.status() == TokenStatus::Exiting {
                            record.finalize(false)?;
                            tracing::info!(%unit, "exit cancelled, unit stays on side ledger");
                        }
                    }
                }
                LedgerEvent::ExitFinished { unit, owner } => {
                    if owner != self.address {
                        continue;
                    }
                    if let Some(record) = self.purse.get_mut(&unit) {
                        if record.status() == TokenStatus::Exiting {
                            record.finalize(true)?;
                            tracing::info!(%unit, "exit finalized, unit back on root ledger");
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Check pending inclusions against a freshly published root.
    fn on_block_published(
        &mut self,
        operator: &BlockBuilder,
        number: BlockNumber,
        root: Hash256,
    ) -> Result<(), AgentError> {
        let units: Vec<UnitId> = self.purse.keys().copied().collect();
        for unit in units {
            let Some(record) = self.purse.get(&unit) else {
                continue;
            };
            let awaiting = match record.status() {
                TokenStatus::Deposited => true,
                TokenStatus::SideLedger => record.tail_included_at().is_none(),
                TokenStatus::RootLedger | TokenStatus::Exiting => false,
            };
            if !awaiting {
                continue;
            }
            let Some(tail) = record.history().last() else {
                continue;
            };
            let leaf = tail.leaf_hash()?;
            let key = unit.tree_key(self.spec.tree_depth)?;
            let Ok(branch) = operator.branch_for(unit, number) else {
                continue;
            };
            if !verify_inclusion(&key, &leaf, &branch, &root) {
                continue;
            }
            if let Some(record) = self.purse.get_mut(&unit) {
                match record.status() {
                    TokenStatus::Deposited => {
                        record.mark_included(number)?;
                        tracing::info!(%unit, %number, "deposit included, unit live on side ledger");
                    }
                    TokenStatus::SideLedger => {
                        record.confirm_inclusion(number)?;
                        tracing::debug!(%unit, %number, "tail transfer inclusion confirmed");
                    }
                    TokenStatus::RootLedger | TokenStatus::Exiting => {}
                }
            }
        }
        Ok(())
    }

    /// Answer an interactive challenge against our own exit with the next
    /// transfer in the chain, when we have one.
    fn try_respond<L: RootLedgerClient>(
        &mut self,
        ledger: &mut L,
        operator: &BlockBuilder,
        unit: UnitId,
    ) -> Result<(), AgentError> {
        let Some(record) = self.purse.get(&unit) else {
            return Ok(());
        };
        if record.status() != TokenStatus::Exiting {
            return Ok(());
        }
        let Some(challenge) = ledger.outstanding_challenge(unit) else {
            return Ok(());
        };

        let entries = record.history().entries();
        let Some(index) = entries.iter().position(|txn| *txn == challenge.txn) else {
            tracing::warn!(%unit, "challenge transfer is outside our history; cannot respond");
            return Ok(());
        };
        let Some(response) = entries.get(index + 1).cloned() else {
            tracing::warn!(%unit, "challenge targets our tail; no newer transfer to respond with");
            return Ok(());
        };
        // The response's own inclusion block: its successor spends it, or
        // it is the tail and carries the confirmed inclusion.
        let block = match entries.get(index + 2) {
            Some(successor) => successor.prev_block,
            None => record
                .tail_included_at()
                .ok_or(AgentError::MissingInclusion { unit })?,
        };
        let proof = operator.branch_for(unit, block)?;
        ledger.respond_challenge(
            unit,
            ProvenTransaction {
                txn: response,
                proof,
                block,
            },
        )?;
        tracing::info!(%unit, "challenge answered");
        Ok(())
    }

    /// Poll until `done` holds, giving up after the block-sync grace
    /// period's worth of polls.
    pub fn sync_until<L, F>(
        &mut self,
        ledger: &mut L,
        operator: &BlockBuilder,
        waiting_for: &str,
        mut done: F,
    ) -> Result<(), AgentError>
    where
        L: RootLedgerClient,
        F: FnMut(&PartyAgent) -> bool,
    {
        let polls = self.spec.sync_grace_blocks + 1;
        for _ in 0..polls {
            self.poll(ledger, operator)?;
            if done(self) {
                return Ok(());
            }
        }
        Err(AgentError::ConfirmationTimeout {
            waiting_for: waiting_for.to_string(),
            polls,
        })
    }
}

impl std::fmt::Debug for PartyAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartyAgent")
            .field("address", &self.address)
            .field("units", &self.purse.len())
            .finish()
    }
}
