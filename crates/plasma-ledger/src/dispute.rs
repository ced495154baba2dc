//! # Exit Claims and Challenge Predicates
//!
//! The per-unit dispute state and the three fraud patterns, evaluated in a
//! fixed priority order: Challenge-After, then Challenge-Between, then the
//! interactive Challenge-Before fallback.
//!
//! Each predicate is a total function over the claim's *optional* parent —
//! a claim whose tail is the deposit simply has no parent, and the
//! predicates branch on that explicitly rather than indexing into a
//! history at some assumed depth.

use serde::{Deserialize, Serialize};

use plasma_core::{Address, BlockNumber, UnitId};

use crate::client::ProvenTransaction;

/// An outstanding exit claim: the claimed history tail and when the claim
/// opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitClaim {
    /// The exiting unit.
    pub unit: UnitId,
    /// The claimed exiting owner — the exit transaction's receiver.
    pub owner: Address,
    /// The transfer the exit transaction spends, with its inclusion
    /// evidence. `None` when the claimed tail is the deposit itself.
    pub parent: Option<ProvenTransaction>,
    /// The claimed tail transfer, with its inclusion evidence.
    pub exit: ProvenTransaction,
    /// Ledger height when the claim opened; finalization is admissible
    /// once the withdrawal period has elapsed from here.
    pub started_at: BlockNumber,
}

/// An open interactive challenge against an exit claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeClaim {
    /// The contested unit.
    pub unit: UnitId,
    /// The challenger's evidence transaction.
    pub evidence: ProvenTransaction,
    /// Ledger height when the challenge was raised.
    pub raised_at: BlockNumber,
}

/// The dispute state of one unit with an outstanding exit.
///
/// A unit with no entry in the dispute map is unexited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeState {
    /// The exit is open and uncontested.
    Exiting(ExitClaim),
    /// The exit is contested; the exiter may respond within the window.
    Challenged(ExitClaim, ChallengeClaim),
}

impl DisputeState {
    /// The underlying exit claim.
    pub fn claim(&self) -> &ExitClaim {
        match self {
            Self::Exiting(claim) => claim,
            Self::Challenged(claim, _) => claim,
        }
    }
}

/// Challenge-After: the evidence spends the exit's claimed tail — the
/// exiter re-spent the unit after claiming to exit it.
///
/// The evidence must be signed by the claimed exiting owner and spend a
/// block at or after the tail's inclusion.
pub fn is_challenge_after(
    claim: &ExitClaim,
    evidence_signer: &Address,
    evidence: &ProvenTransaction,
) -> bool {
    *evidence_signer == claim.exit.txn.new_owner && evidence.txn.prev_block >= claim.exit.block
}

/// Challenge-Between: a competing spend of the exit's claimed parent,
/// included strictly between the parent and the claimed tail — a
/// double-spend predating the exit.
///
/// With no parent (the claim exits the deposit directly), the competing
/// spend is one by the recorded depositor that predates the claimed tail.
pub fn is_challenge_between(
    claim: &ExitClaim,
    depositor: Option<&Address>,
    evidence_signer: &Address,
    evidence: &ProvenTransaction,
) -> bool {
    if evidence.txn == claim.exit.txn {
        return false;
    }
    match &claim.parent {
        Some(parent) => {
            *evidence_signer == parent.txn.new_owner
                && evidence.block > parent.block
                && evidence.block < claim.exit.block
        }
        None => match depositor {
            Some(depositor) => {
                *evidence_signer == *depositor && evidence.block < claim.exit.block
            }
            None => false,
        },
    }
}
