//! The site (data manager) layer: per-site variable ownership, failure and
//! recovery, and waits-for edge reporting.
//!
//! Named `storage` to match the crate layout this workspace grew from,
//! even though there is nothing on disk here — only the in-memory
//! per-site variable map.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod site;

pub use site::{ReadOutcome, Site, WriteCheck};
