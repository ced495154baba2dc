//! # plasma-state — Unit Lifecycle
//!
//! A unit is always in exactly one of four states — on the root ledger,
//! deposited, live on the side ledger, or exiting — and every transition is
//! driven by a confirmed root-ledger event, never optimistically. This
//! crate defines the record type agents keep in their purses and the
//! runtime-checked transition table over it.
//!
//! States are checked at runtime rather than encoded in the type system:
//! purse collections need a uniform record type, and the legal transition
//! set is data the agent's event loop matches on.

pub mod token;

pub use token::{TokenError, TokenStatus, UnitRecord};
