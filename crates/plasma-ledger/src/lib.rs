//! # plasma-ledger — The Root Ledger as a Remote Authority
//!
//! The root ledger is the final arbiter of unit custody, but this stack
//! only ever talks to it through a fixed set of entrypoints and an ordered
//! event log. This crate defines that boundary:
//!
//! - [`client::RootLedgerClient`] — the entrypoint trait every deployment
//!   implements (live RPC binding or test stand-in alike).
//! - [`events::LedgerEvent`] — the tagged-union event type agents and the
//!   operator dispatch on.
//! - [`dispute`] — the exit/challenge claim model and the three challenge
//!   predicates, written as total functions over optional parents.
//! - [`memory::InMemoryRootLedger`] — a pure in-memory authority enforcing
//!   the full dispute contract: timing, proof verification, and the
//!   after → between → before evaluation order.
//!
//! Off-chain components never mutate their own state when calling an
//! entrypoint; they advance only on the events the ledger emits.

pub mod client;
pub mod dispute;
pub mod events;
pub mod memory;

pub use client::{ChallengeOutcome, DepositRecord, LedgerError, ProvenTransaction, RootLedgerClient};
pub use dispute::{ChallengeClaim, DisputeState, ExitClaim};
pub use events::LedgerEvent;
pub use memory::InMemoryRootLedger;
