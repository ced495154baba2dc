//! # In-Memory Root Ledger
//!
//! A pure in-memory authority that enforces the full dispute contract:
//! deposit bookkeeping, proof verification against published roots, the
//! after → between → before challenge order, and withdrawal-period timing.
//! Tests and simulations run against it; a live deployment binds the same
//! [`RootLedgerClient`] trait to the real ledger, and callers cannot tell
//! the difference.
//!
//! The ledger's own height is the dispute clock: publication advances it by
//! one, and [`advance_blocks`](InMemoryRootLedger::advance_blocks) models
//! root-ledger time passing without side-ledger activity.

use std::collections::{BTreeMap, HashMap};

use plasma_core::{Address, BlockNumber, ChainSpec, Hash256, UnitId};
use plasma_crypto::smt::verify_inclusion;
use plasma_tx::{DomainSeparator, TransactionRecord};

use crate::client::{
    ChallengeOutcome, DepositRecord, LedgerError, ProvenTransaction, RootLedgerClient,
};
use crate::dispute::{is_challenge_after, is_challenge_between, ChallengeClaim, DisputeState, ExitClaim};
use crate::events::LedgerEvent;

#[derive(Debug, Clone)]
struct DepositEntry {
    depositor: Address,
    txn: TransactionRecord,
    pending: bool,
}

/// The in-memory root-ledger stand-in.
#[derive(Debug)]
pub struct InMemoryRootLedger {
    spec: ChainSpec,
    domain: DomainSeparator,
    height: BlockNumber,
    blocks: BTreeMap<BlockNumber, Hash256>,
    deposits: HashMap<UnitId, DepositEntry>,
    disputes: HashMap<UnitId, DisputeState>,
    events: Vec<LedgerEvent>,
}

impl InMemoryRootLedger {
    /// Create a fresh ledger for one deployment.
    pub fn new(spec: ChainSpec) -> Self {
        let domain = DomainSeparator::from_spec(&spec);
        Self {
            spec,
            domain,
            height: BlockNumber(0),
            blocks: BTreeMap::new(),
            deposits: HashMap::new(),
            disputes: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// The deployment this ledger enforces.
    pub fn spec(&self) -> &ChainSpec {
        &self.spec
    }

    /// Advance the ledger height by `n` blocks without publications —
    /// root-ledger time passing.
    pub fn advance_blocks(&mut self, n: u64) {
        self.height = BlockNumber(self.height.0 + n);
    }

    /// The dispute state for a unit, if an exit is outstanding.
    pub fn dispute(&self, unit: UnitId) -> Option<&DisputeState> {
        self.disputes.get(&unit)
    }

    fn emit(&mut self, event: LedgerEvent) {
        tracing::info!(event = ?event, height = self.height.0, "root ledger event");
        self.events.push(event);
    }

    /// Verify a transaction's inclusion evidence against a published root.
    fn check_inclusion(&self, proven: &ProvenTransaction) -> Result<(), LedgerError> {
        let unit = proven.txn.unit;
        let root = self
            .blocks
            .get(&proven.block)
            .ok_or(LedgerError::UnknownBlock { block: proven.block })?;
        let key = unit
            .tree_key(self.spec.tree_depth)
            .map_err(|_| LedgerError::ProofInvalid {
                unit,
                block: proven.block,
            })?;
        let leaf = proven.txn.leaf_hash()?;
        if !verify_inclusion(&key, &leaf, &proven.proof, root) {
            return Err(LedgerError::ProofInvalid {
                unit,
                block: proven.block,
            });
        }
        Ok(())
    }
}

impl RootLedgerClient for InMemoryRootLedger {
    fn deposit(&mut self, txn: &TransactionRecord) -> Result<(), LedgerError> {
        let unit = txn.unit;
        let signer = txn.signer(&self.domain)?;
        if signer != txn.new_owner {
            return Err(LedgerError::BrokenChain {
                unit,
                reason: "deposit must be self-signed by its receiver".to_string(),
            });
        }
        if txn.prev_block != BlockNumber::DEPOSIT {
            return Err(LedgerError::BrokenChain {
                unit,
                reason: "deposit must spend the reserved deposit block".to_string(),
            });
        }
        if self.deposits.contains_key(&unit) {
            return Err(LedgerError::AlreadyDeposited { unit });
        }
        self.deposits.insert(
            unit,
            DepositEntry {
                depositor: signer,
                txn: txn.clone(),
                pending: true,
            },
        );
        self.emit(LedgerEvent::DepositAdded {
            unit,
            owner: signer,
        });
        Ok(())
    }

    fn withdraw(&mut self, unit: UnitId) -> Result<(), LedgerError> {
        let entry = self
            .deposits
            .get(&unit)
            .ok_or(LedgerError::DepositUnknown { unit })?;
        if !entry.pending {
            return Err(LedgerError::DepositNotPending { unit });
        }
        self.deposits.remove(&unit);
        self.emit(LedgerEvent::DepositCancelled { unit });
        Ok(())
    }

    fn submit_block(&mut self, root: Hash256) -> Result<BlockNumber, LedgerError> {
        self.height = self.height.next();
        let number = self.height;
        self.blocks.insert(number, root);
        // The operator has now had its chance to include pending deposits;
        // direct withdrawal closes here.
        for entry in self.deposits.values_mut() {
            entry.pending = false;
        }
        self.emit(LedgerEvent::BlockPublished { number, root });
        Ok(number)
    }

    fn start_exit(
        &mut self,
        user: Address,
        parent: Option<ProvenTransaction>,
        exit: ProvenTransaction,
    ) -> Result<(), LedgerError> {
        let unit = exit.txn.unit;
        if self.disputes.contains_key(&unit) {
            return Err(LedgerError::ExitPending { unit });
        }
        if exit.txn.new_owner != user {
            return Err(LedgerError::NotOwner {
                unit,
                claimed: user,
            });
        }
        let exit_signer = exit.txn.signer(&self.domain)?;

        match &parent {
            Some(p) => {
                if p.txn.unit != unit {
                    return Err(LedgerError::BrokenChain {
                        unit,
                        reason: "parent names a different unit".to_string(),
                    });
                }
                if p.txn.new_owner != exit_signer {
                    return Err(LedgerError::BrokenChain {
                        unit,
                        reason: "exit is not signed by the parent's owner".to_string(),
                    });
                }
                if exit.txn.prev_block != p.block {
                    return Err(LedgerError::BrokenChain {
                        unit,
                        reason: "exit does not spend the parent's block".to_string(),
                    });
                }
                self.check_inclusion(p)?;
            }
            None => {
                let entry = self
                    .deposits
                    .get(&unit)
                    .ok_or(LedgerError::DepositUnknown { unit })?;
                if exit_signer != entry.depositor {
                    return Err(LedgerError::BrokenChain {
                        unit,
                        reason: "exit is not signed by the depositor".to_string(),
                    });
                }
            }
        }
        self.check_inclusion(&exit)?;

        self.disputes.insert(
            unit,
            DisputeState::Exiting(ExitClaim {
                unit,
                owner: user,
                parent,
                exit,
                started_at: self.height,
            }),
        );
        self.emit(LedgerEvent::ExitStarted { unit, owner: user });
        Ok(())
    }

    fn challenge_exit(
        &mut self,
        evidence: ProvenTransaction,
    ) -> Result<ChallengeOutcome, LedgerError> {
        let unit = evidence.txn.unit;
        let state = self
            .disputes
            .get(&unit)
            .ok_or(LedgerError::NoSuchExit { unit })?
            .clone();

        // Malformed evidence rejects before any pattern is considered.
        self.check_inclusion(&evidence)?;
        let signer = evidence.txn.signer(&self.domain)?;

        let claim = state.claim();
        let depositor = self.deposits.get(&unit).map(|entry| entry.depositor);

        // Priority order: after, then between, then the interactive
        // fallback.
        let immediate = if is_challenge_after(claim, &signer, &evidence) {
            tracing::debug!(%unit, "challenge-after matched");
            true
        } else if is_challenge_between(claim, depositor.as_ref(), &signer, &evidence) {
            tracing::debug!(%unit, "challenge-between matched");
            true
        } else {
            false
        };

        if immediate {
            self.disputes.remove(&unit);
            self.emit(LedgerEvent::ExitCancelled { unit });
            return Ok(ChallengeOutcome::Cancelled);
        }

        match state {
            DisputeState::Exiting(claim) => {
                let challenge = ChallengeClaim {
                    unit,
                    evidence,
                    raised_at: self.height,
                };
                self.disputes
                    .insert(unit, DisputeState::Challenged(claim, challenge));
                self.emit(LedgerEvent::ChallengeStarted { unit });
                Ok(ChallengeOutcome::Contested)
            }
            DisputeState::Challenged(..) => Err(LedgerError::ChallengeRejected {
                unit,
                reason: "exit is already under challenge".to_string(),
            }),
        }
    }

    fn respond_challenge(
        &mut self,
        unit: UnitId,
        response: ProvenTransaction,
    ) -> Result<(), LedgerError> {
        let state = self
            .disputes
            .get(&unit)
            .ok_or(LedgerError::NoSuchExit { unit })?;
        let (claim, challenge) = match state {
            DisputeState::Challenged(claim, challenge) => (claim.clone(), challenge.clone()),
            DisputeState::Exiting(_) => return Err(LedgerError::NotChallenged { unit }),
        };

        let closes_at = BlockNumber(claim.started_at.0 + self.spec.withdrawal_period);
        if self.height >= closes_at {
            return Err(LedgerError::ResponseWindowClosed {
                unit,
                closed_at: closes_at,
            });
        }

        if response.txn.unit != unit {
            return Err(LedgerError::InvalidResponse {
                unit,
                reason: "response names a different unit".to_string(),
            });
        }
        self.check_inclusion(&response)?;
        let signer = response.txn.signer(&self.domain)?;
        if signer != challenge.evidence.txn.new_owner {
            return Err(LedgerError::InvalidResponse {
                unit,
                reason: "response is not signed by the challenged transfer's owner".to_string(),
            });
        }
        if response.txn.prev_block != challenge.evidence.block {
            return Err(LedgerError::InvalidResponse {
                unit,
                reason: "response does not spend the challenged block".to_string(),
            });
        }

        // Continuity re-established through the challenged point.
        self.disputes.insert(unit, DisputeState::Exiting(claim));
        self.emit(LedgerEvent::ChallengeCancelled { unit });
        Ok(())
    }

    fn finalize_exit(&mut self, unit: UnitId) -> Result<bool, LedgerError> {
        let state = self
            .disputes
            .get(&unit)
            .ok_or(LedgerError::NoSuchExit { unit })?;
        let ready_at = BlockNumber(state.claim().started_at.0 + self.spec.withdrawal_period);
        if self.height < ready_at {
            return Err(LedgerError::ExitNotMature { unit, ready_at });
        }

        let state = self
            .disputes
            .remove(&unit)
            .ok_or(LedgerError::NoSuchExit { unit })?;
        match state {
            DisputeState::Exiting(claim) => {
                // Unit returns to root-ledger custody.
                self.deposits.remove(&unit);
                self.emit(LedgerEvent::ExitFinished {
                    unit,
                    owner: claim.owner,
                });
                Ok(true)
            }
            DisputeState::Challenged(..) => {
                // The challenge stood; the claim is discarded and the unit
                // stays under side-ledger custody.
                self.emit(LedgerEvent::ExitCancelled { unit });
                Ok(false)
            }
        }
    }

    fn deposit_record(&self, unit: UnitId) -> Option<DepositRecord> {
        self.deposits.get(&unit).map(|entry| DepositRecord {
            depositor: entry.depositor,
            txn: entry.txn.clone(),
            pending: entry.pending,
        })
    }

    fn outstanding_challenge(&self, unit: UnitId) -> Option<ProvenTransaction> {
        match self.disputes.get(&unit) {
            Some(DisputeState::Challenged(_, challenge)) => Some(challenge.evidence.clone()),
            _ => None,
        }
    }

    fn head_block(&self) -> BlockNumber {
        self.height
    }

    fn published_root(&self, block: BlockNumber) -> Option<Hash256> {
        self.blocks.get(&block).copied()
    }

    fn events_since(&self, cursor: usize) -> Vec<LedgerEvent> {
        if cursor >= self.events.len() {
            return Vec::new();
        }
        self.events[cursor..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plasma_core::keccak256;
    use plasma_crypto::{KeyPair, SparseMerkleTree};

    const UNIT: u64 = 7;

    fn test_pair(n: u8) -> KeyPair {
        let mut seed = [0u8; 32];
        seed[31] = n;
        KeyPair::from_seed(&seed).unwrap()
    }

    fn spec() -> ChainSpec {
        ChainSpec::new(1, Address::from_bytes([0xCC; 20]))
    }

    fn domain() -> DomainSeparator {
        DomainSeparator::from_spec(&spec())
    }

    fn deposit_txn(owner: &KeyPair) -> TransactionRecord {
        let mut txn = TransactionRecord::new(
            BlockNumber::DEPOSIT,
            UnitId::from_u64(UNIT),
            owner.address(),
        );
        txn.sign(owner, &domain()).unwrap();
        txn
    }

    fn transfer_txn(prev_block: u64, to: &KeyPair, by: &KeyPair) -> TransactionRecord {
        let mut txn = TransactionRecord::new(
            BlockNumber(prev_block),
            UnitId::from_u64(UNIT),
            to.address(),
        );
        txn.sign(by, &domain()).unwrap();
        txn
    }

    /// A minimal operator: one tree per block holding exactly the given
    /// transactions, published to the ledger. Returns proofs by key.
    fn publish_block(
        ledger: &mut InMemoryRootLedger,
        txns: &[&TransactionRecord],
    ) -> (BlockNumber, Vec<ProvenTransaction>) {
        let mut tree = SparseMerkleTree::new(ledger.spec().tree_depth).unwrap();
        for txn in txns {
            let key = txn.unit.tree_key(ledger.spec().tree_depth).unwrap();
            tree.set(&key, txn.leaf_hash().unwrap()).unwrap();
        }
        let number = ledger.submit_block(tree.root_hash()).unwrap();
        let proven = txns
            .iter()
            .map(|txn| {
                let key = txn.unit.tree_key(ledger.spec().tree_depth).unwrap();
                ProvenTransaction {
                    txn: (*txn).clone(),
                    proof: tree.branch(&key).unwrap(),
                    block: number,
                }
            })
            .collect();
        (number, proven)
    }

    // ── Deposits ─────────────────────────────────────────────────────

    #[test]
    fn test_deposit_then_withdraw_before_inclusion() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let a = test_pair(1);
        ledger.deposit(&deposit_txn(&a)).unwrap();
        assert!(ledger.deposit_record(UnitId::from_u64(UNIT)).unwrap().pending);

        ledger.withdraw(UnitId::from_u64(UNIT)).unwrap();
        assert!(ledger.deposit_record(UnitId::from_u64(UNIT)).is_none());
        let events = ledger.events_since(0);
        assert!(matches!(events[0], LedgerEvent::DepositAdded { .. }));
        assert!(matches!(events[1], LedgerEvent::DepositCancelled { .. }));
    }

    #[test]
    fn test_withdraw_after_publication_rejected() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let a = test_pair(1);
        let dep = deposit_txn(&a);
        ledger.deposit(&dep).unwrap();
        publish_block(&mut ledger, &[&dep]);

        assert_eq!(
            ledger.withdraw(UnitId::from_u64(UNIT)),
            Err(LedgerError::DepositNotPending {
                unit: UnitId::from_u64(UNIT)
            })
        );
    }

    #[test]
    fn test_deposit_must_be_self_signed() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let (a, b) = (test_pair(1), test_pair(2));
        // A signs a "deposit" naming B as receiver.
        let mut txn = TransactionRecord::new(
            BlockNumber::DEPOSIT,
            UnitId::from_u64(UNIT),
            b.address(),
        );
        txn.sign(&a, &domain()).unwrap();
        assert!(matches!(
            ledger.deposit(&txn),
            Err(LedgerError::BrokenChain { .. })
        ));
    }

    #[test]
    fn test_double_deposit_rejected() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let a = test_pair(1);
        ledger.deposit(&deposit_txn(&a)).unwrap();
        assert_eq!(
            ledger.deposit(&deposit_txn(&a)),
            Err(LedgerError::AlreadyDeposited {
                unit: UnitId::from_u64(UNIT)
            })
        );
    }

    // ── Exits ────────────────────────────────────────────────────────

    /// Deposit by A, publish, transfer A→B, publish. Returns the proven
    /// deposit and transfer.
    fn setup_a_to_b(
        ledger: &mut InMemoryRootLedger,
        a: &KeyPair,
        b: &KeyPair,
    ) -> (ProvenTransaction, ProvenTransaction) {
        let dep = deposit_txn(a);
        ledger.deposit(&dep).unwrap();
        let (dep_block, mut proven) = publish_block(ledger, &[&dep]);
        let proven_dep = proven.remove(0);

        let to_b = transfer_txn(dep_block.0, b, a);
        let (_, mut proven) = publish_block(ledger, &[&to_b]);
        (proven_dep, proven.remove(0))
    }

    #[test]
    fn test_clean_exit_finalizes() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let (a, b) = (test_pair(1), test_pair(2));
        let (proven_dep, proven_b) = setup_a_to_b(&mut ledger, &a, &b);

        ledger
            .start_exit(b.address(), Some(proven_dep), proven_b)
            .unwrap();
        assert!(ledger.dispute(UnitId::from_u64(UNIT)).is_some());

        // Too early.
        assert!(matches!(
            ledger.finalize_exit(UnitId::from_u64(UNIT)),
            Err(LedgerError::ExitNotMature { .. })
        ));

        ledger.advance_blocks(7);
        assert!(ledger.finalize_exit(UnitId::from_u64(UNIT)).unwrap());
        assert!(ledger.deposit_record(UnitId::from_u64(UNIT)).is_none());
        assert!(ledger
            .events_since(0)
            .iter()
            .any(|e| matches!(e, LedgerEvent::ExitFinished { .. })));
    }

    #[test]
    fn test_exit_by_non_owner_rejected() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let (a, b, c) = (test_pair(1), test_pair(2), test_pair(3));
        let (proven_dep, proven_b) = setup_a_to_b(&mut ledger, &a, &b);

        assert!(matches!(
            ledger.start_exit(c.address(), Some(proven_dep), proven_b),
            Err(LedgerError::NotOwner { .. })
        ));
    }

    #[test]
    fn test_exit_with_broken_chain_rejected() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let (a, b, c) = (test_pair(1), test_pair(2), test_pair(3));
        let (proven_dep, _) = setup_a_to_b(&mut ledger, &a, &b);

        // C forges a tail signed by itself; the parent's owner is A.
        let forged = transfer_txn(1, &c, &c);
        let (_, mut proven) = publish_block(&mut ledger, &[&forged]);
        let proven_forged = proven.remove(0);

        assert!(matches!(
            ledger.start_exit(c.address(), Some(proven_dep), proven_forged),
            Err(LedgerError::BrokenChain { .. })
        ));
    }

    #[test]
    fn test_exit_with_bad_proof_rejected() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let (a, b) = (test_pair(1), test_pair(2));
        let (proven_dep, mut proven_b) = setup_a_to_b(&mut ledger, &a, &b);

        proven_b.proof[5] = keccak256(b"garbage");
        assert!(matches!(
            ledger.start_exit(b.address(), Some(proven_dep), proven_b),
            Err(LedgerError::ProofInvalid { .. })
        ));
    }

    #[test]
    fn test_exit_proof_from_unpublished_block_rejected() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let (a, b) = (test_pair(1), test_pair(2));
        let (proven_dep, mut proven_b) = setup_a_to_b(&mut ledger, &a, &b);

        proven_b.block = BlockNumber(99);
        assert!(matches!(
            ledger.start_exit(b.address(), Some(proven_dep), proven_b),
            Err(LedgerError::UnknownBlock { .. })
        ));
    }

    #[test]
    fn test_second_exit_for_same_unit_rejected() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let (a, b) = (test_pair(1), test_pair(2));
        let (proven_dep, proven_b) = setup_a_to_b(&mut ledger, &a, &b);

        ledger
            .start_exit(b.address(), Some(proven_dep.clone()), proven_b.clone())
            .unwrap();
        assert_eq!(
            ledger.start_exit(b.address(), Some(proven_dep), proven_b),
            Err(LedgerError::ExitPending {
                unit: UnitId::from_u64(UNIT)
            })
        );
    }

    // ── Challenges ───────────────────────────────────────────────────

    #[test]
    fn test_challenge_after_cancels_immediately() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let (a, b, c) = (test_pair(1), test_pair(2), test_pair(3));
        let (proven_dep, proven_b) = setup_a_to_b(&mut ledger, &a, &b);

        // B spends on to C in a later block, then exits the stale A→B tail.
        let to_c = transfer_txn(proven_b.block.0, &c, &b);
        let (_, mut proven) = publish_block(&mut ledger, &[&to_c]);
        let proven_c = proven.remove(0);

        ledger
            .start_exit(b.address(), Some(proven_dep), proven_b)
            .unwrap();
        let outcome = ledger.challenge_exit(proven_c).unwrap();
        assert_eq!(outcome, ChallengeOutcome::Cancelled);
        assert!(ledger.dispute(UnitId::from_u64(UNIT)).is_none());
        assert!(ledger
            .events_since(0)
            .iter()
            .any(|e| matches!(e, LedgerEvent::ExitCancelled { .. })));
    }

    #[test]
    fn test_challenge_between_cancels_immediately() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let (a, b, c) = (test_pair(1), test_pair(2), test_pair(3));
        // Genuine chain: deposit(A) in block 1, A→B in block 2.
        let (proven_dep, proven_b) = setup_a_to_b(&mut ledger, &a, &b);

        // Colluding claim skips A→B: A re-spends to C in block 3, C exits
        // with the deposit as claimed parent.
        let to_c = transfer_txn(proven_dep.block.0, &c, &a);
        let (_, mut proven) = publish_block(&mut ledger, &[&to_c]);
        let proven_c = proven.remove(0);

        ledger
            .start_exit(c.address(), Some(proven_dep), proven_c)
            .unwrap();

        // The genuine A→B transfer sits strictly between parent and tail.
        let outcome = ledger.challenge_exit(proven_b).unwrap();
        assert_eq!(outcome, ChallengeOutcome::Cancelled);
        assert!(ledger.dispute(UnitId::from_u64(UNIT)).is_none());
    }

    #[test]
    fn test_older_history_challenge_is_interactive() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let (a, b, c) = (test_pair(1), test_pair(2), test_pair(3));
        let (proven_dep, proven_b) = setup_a_to_b(&mut ledger, &a, &b);

        // Chain continues legitimately: B→C, then C exits.
        let to_c = transfer_txn(proven_b.block.0, &c, &b);
        let (_, mut proven) = publish_block(&mut ledger, &[&to_c]);
        let proven_c = proven.remove(0);

        ledger
            .start_exit(c.address(), Some(proven_b.clone()), proven_c)
            .unwrap();

        // A censoring challenger submits the old deposit transaction.
        let outcome = ledger.challenge_exit(proven_dep).unwrap();
        assert_eq!(outcome, ChallengeOutcome::Contested);
        assert!(matches!(
            ledger.dispute(UnitId::from_u64(UNIT)),
            Some(DisputeState::Challenged(..))
        ));

        // The exiter answers with the next transfer in the chain.
        ledger
            .respond_challenge(UnitId::from_u64(UNIT), proven_b)
            .unwrap();
        assert!(matches!(
            ledger.dispute(UnitId::from_u64(UNIT)),
            Some(DisputeState::Exiting(_))
        ));

        ledger.advance_blocks(7);
        assert!(ledger.finalize_exit(UnitId::from_u64(UNIT)).unwrap());
    }

    #[test]
    fn test_unanswered_challenge_denies_exit() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let (a, b) = (test_pair(1), test_pair(2));
        let (proven_dep, proven_b) = setup_a_to_b(&mut ledger, &a, &b);

        // B exits the genuine tail, someone contests with the deposit.
        ledger
            .start_exit(b.address(), Some(proven_dep.clone()), proven_b)
            .unwrap();
        ledger.challenge_exit(proven_dep).unwrap();

        ledger.advance_blocks(7);
        assert!(!ledger.finalize_exit(UnitId::from_u64(UNIT)).unwrap());
        // Deposit record survives — the unit stays under side-ledger
        // custody.
        assert!(ledger.deposit_record(UnitId::from_u64(UNIT)).is_some());
        assert!(ledger
            .events_since(0)
            .iter()
            .any(|e| matches!(e, LedgerEvent::ExitCancelled { .. })));
    }

    #[test]
    fn test_response_after_window_rejected() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let (a, b, c) = (test_pair(1), test_pair(2), test_pair(3));
        let (proven_dep, proven_b) = setup_a_to_b(&mut ledger, &a, &b);

        let to_c = transfer_txn(proven_b.block.0, &c, &b);
        let (_, mut proven) = publish_block(&mut ledger, &[&to_c]);
        let proven_c = proven.remove(0);

        ledger
            .start_exit(c.address(), Some(proven_b.clone()), proven_c)
            .unwrap();
        ledger.challenge_exit(proven_dep).unwrap();

        ledger.advance_blocks(7);
        assert!(matches!(
            ledger.respond_challenge(UnitId::from_u64(UNIT), proven_b),
            Err(LedgerError::ResponseWindowClosed { .. })
        ));
    }

    #[test]
    fn test_challenge_without_exit_rejected() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let (a, b) = (test_pair(1), test_pair(2));
        let (_, proven_b) = setup_a_to_b(&mut ledger, &a, &b);
        assert_eq!(
            ledger.challenge_exit(proven_b),
            Err(LedgerError::NoSuchExit {
                unit: UnitId::from_u64(UNIT)
            })
        );
    }

    #[test]
    fn test_challenge_with_bad_proof_rejected_distinguishably() {
        let mut ledger = InMemoryRootLedger::new(spec());
        let (a, b, c) = (test_pair(1), test_pair(2), test_pair(3));
        let (proven_dep, proven_b) = setup_a_to_b(&mut ledger, &a, &b);

        let to_c = transfer_txn(proven_b.block.0, &c, &b);
        let (_, mut proven) = publish_block(&mut ledger, &[&to_c]);
        let mut proven_c = proven.remove(0);

        ledger
            .start_exit(b.address(), Some(proven_dep), proven_b)
            .unwrap();

        // Genuine after-challenge evidence, but the proof is mangled —
        // rejected, and the exit stands untouched.
        proven_c.proof[0] = keccak256(b"mangled");
        assert!(matches!(
            ledger.challenge_exit(proven_c),
            Err(LedgerError::ProofInvalid { .. })
        ));
        assert!(matches!(
            ledger.dispute(UnitId::from_u64(UNIT)),
            Some(DisputeState::Exiting(_))
        ));
    }
}
