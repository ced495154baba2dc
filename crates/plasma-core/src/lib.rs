//! # plasma-core — Foundational Types for the Plasma Cash Stack
//!
//! This crate is the bedrock of the off-chain Plasma Cash client. It defines
//! the type-system primitives every other crate builds on; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `UnitId`, `Address`,
//!    `BlockNumber` — all newtypes with validated constructors. No bare
//!    integers or byte slices for identifiers.
//!
//! 2. **One digest type, one hash function.** All 32-byte hashes in the
//!    system are `Hash256` values produced by [`keccak256()`]. The root
//!    ledger computes the same function, so every commitment and signing
//!    digest is reproducible on both sides.
//!
//! 3. **Deployment constants are supplied, never hard-coded.** Chain
//!    identifier, verifying-contract address, tree depth, and the protocol
//!    periods all arrive through [`ChainSpec`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `plasma-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod hash;
pub mod identity;

// Re-export primary types for ergonomic imports.
pub use config::ChainSpec;
pub use hash::{keccak256, keccak256_concat, Hash256};
pub use identity::{Address, BlockNumber, IdentityError, UnitId};
