//! Core types and errors shared across the repcrec workspace.
//!
//! This crate defines the identifiers every other layer builds on:
//! - `TxId`, `VarId`, `SiteId`: the three id spaces of the system
//! - `Value`, `Timestamp`: the value domain and the logical clock domain
//! - `Error`/`Result`: the unified error type for invalid input

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use types::{SiteId, TxId, VarId, NUM_SITES, NUM_VARS};
pub use value::{Timestamp, Value};
