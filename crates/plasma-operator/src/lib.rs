//! # plasma-operator — The Side-Ledger Block Builder
//!
//! The operator's half of the protocol: accept signed transfers into the
//! open block's commitment tree, publish the root to the root ledger, and
//! serve inclusion proofs out of the archived trees forever after.
//!
//! Admission is strict and synchronous — an untracked unit or a transfer
//! signed by anyone but the recorded owner is rejected back to the
//! submitter, never silently dropped.

pub mod builder;

pub use builder::{BlockBuilder, OperatorError};
