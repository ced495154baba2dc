//! # plasma-crypto — Commitment Trees and Recoverable Signatures
//!
//! The two cryptographic mechanisms the protocol rests on:
//!
//! - [`smt`] — a fixed-depth sparse Merkle tree mapping unit keys to
//!   committed leaf values, with O(depth) inclusion proofs and a standalone
//!   [`smt::verify_inclusion`] check that mirrors what the root ledger
//!   computes.
//! - [`signer`] — secp256k1 ECDSA key pairs producing recoverable
//!   (v, r, s) signatures over 32-byte digests, and signer recovery from a
//!   digest plus signature.
//!
//! ## Crate Policy
//!
//! - Private keys are never serialized or logged.
//! - Malformed keys, signatures, and proofs reject with typed errors; no
//!   input can corrupt tree state.

pub mod signer;
pub mod smt;

pub use signer::{recover_address, KeyPair, RecoverableSignature, SignatureError};
pub use smt::{verify_inclusion, SparseMerkleTree, TreeError};
