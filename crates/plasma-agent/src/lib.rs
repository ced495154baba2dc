//! # plasma-agent — The Party Agent
//!
//! One agent per participant: a key pair, a purse of unit records, and a
//! single logical thread that drives the deposit → transfer → withdraw
//! lifecycle against the root ledger and the operator.
//!
//! The agent never advances a unit's state optimistically. Every call to a
//! ledger entrypoint leaves the purse untouched; state moves only when the
//! corresponding confirmed event is observed in [`PartyAgent::poll`]. An
//! agent that abandons an in-flight request stays consistent by
//! construction.

pub mod agent;
pub mod handoff;

pub use agent::{AgentError, PartyAgent};
pub use handoff::UnitHandoff;
