//! `repcrec`: a replicated, available-copies transaction manager.
//!
//! This crate is a thin facade over the workspace's layered path crates —
//! [`repcrec_coordinator::Coordinator`] is the library entry point for
//! embedding the transaction manager in another program. The `repcrec`
//! binary (`src/main.rs`) wraps it with the command-language parser and
//! REPL/pipe/file driver from `repcrec-cli`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use repcrec_coordinator::{AbortReason, Command, Coordinator, Event, SiteDump};
pub use repcrec_core::{Error, Result, SiteId, Timestamp, TxId, Value, VarId, NUM_SITES, NUM_VARS};
