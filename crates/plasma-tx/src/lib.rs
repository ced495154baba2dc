//! # plasma-tx — Canonical Transfer Records
//!
//! The signable unit of the protocol: "unit X, previously included at block
//! P, now owned by Y". This crate defines the record itself, its
//! domain-separated signing digest, the two wire encodings (root-ledger
//! call tuple and peer-transport bytes), and the per-unit ownership history
//! with its continuity rule.
//!
//! ## Key Design Principles
//!
//! 1. **One digest, computed one way.** The signing digest is a typed
//!    structured hash bound to the deployment's domain. The root ledger
//!    recomputes it independently, so the encoding is fixed bit-for-bit.
//!
//! 2. **Signing is final.** A record is signed at most once; the signature
//!    cannot be replaced. Owners are recovered from signatures, never
//!    asserted.
//!
//! 3. **The domain never travels.** Peer transport carries only the record
//!    fields and signature; the receiver must already agree on the domain
//!    to recover the same signer.

pub mod domain;
pub mod history;
pub mod transaction;

pub use domain::{DomainSeparator, DOMAIN_NAME, DOMAIN_VERSION};
pub use history::OwnershipHistory;
pub use transaction::{TransactionError, TransactionRecord};
