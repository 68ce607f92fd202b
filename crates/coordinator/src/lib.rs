//! The Transaction Manager: transaction table, operation queue, the
//! per-tick drive loop, and the deadlock detector.
//!
//! This crate is the Coordinator of the system — it owns the ten
//! [`repcrec_storage::Site`]s and is the only thing that ever calls into
//! them. Everything upstream (the CLI) talks to a [`Coordinator`] and
//! nothing else.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod coordinator;
pub mod detector;
pub mod event;
pub mod operation;
pub mod transaction;

pub use command::Command;
pub use coordinator::Coordinator;
pub use detector::{find_cycle, select_victim};
pub use event::{Event, SiteDump};
pub use operation::{Operation, OperationKind};
pub use transaction::{AbortReason, Transaction};
