//! The transaction table entry and abort-reason taxonomy.

use repcrec_core::{Timestamp, TxId};
use std::fmt;

/// Why a transaction was, or will be, aborted rather than committed.
///
/// Kept separate from [`repcrec_core::Error`]: an abort is an expected
/// outcome of running a transaction to completion, not a failure of the
/// call that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// A site holding data this transaction had contacted failed before
    /// `end`.
    SiteFailure,
    /// This transaction was chosen as the youngest participant in a
    /// waits-for cycle.
    Deadlock,
    /// `end` was called while the transaction still had operations
    /// queued — the source's "operation incomplete" condition.
    OperationIncomplete,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::SiteFailure => write!(f, "site failure"),
            AbortReason::Deadlock => write!(f, "deadlock"),
            AbortReason::OperationIncomplete => write!(f, "operation incomplete"),
        }
    }
}

/// An entry in the transaction table.
///
/// `active -> aborted -> ended` or `active -> committed`; the entry is
/// removed from the table entirely once `end` is processed.
#[derive(Debug, Clone)]
pub struct Transaction {
    id: TxId,
    begin_ts: Timestamp,
    read_only: bool,
    aborted: bool,
    abort_reason: Option<AbortReason>,
}

impl Transaction {
    /// A fresh, active transaction beginning at `begin_ts`.
    pub fn new(id: TxId, begin_ts: Timestamp, read_only: bool) -> Self {
        Self {
            id,
            begin_ts,
            read_only,
            aborted: false,
            abort_reason: None,
        }
    }

    /// This transaction's id.
    pub fn id(&self) -> &TxId {
        &self.id
    }

    /// The logical tick at which this transaction began.
    pub fn begin_ts(&self) -> Timestamp {
        self.begin_ts
    }

    /// Whether this is a read-only transaction (serviced by snapshot
    /// reads rather than locking).
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether this transaction has already been marked for abort.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// The reason this transaction was aborted, if it was.
    pub fn abort_reason(&self) -> Option<AbortReason> {
        self.abort_reason
    }

    /// Mark this transaction aborted, unless it already was — the first
    /// abort reason recorded sticks.
    pub fn mark_aborted(&mut self, reason: AbortReason) {
        if !self.aborted {
            self.aborted = true;
            self.abort_reason = Some(reason);
        }
    }
}
