//! The command vocabulary the Coordinator executes, one per input line.

use repcrec_core::{SiteId, TxId, Value, VarId};

/// A single parsed input command (§6 of the external interface).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `begin(T)` — start a read-write transaction.
    Begin(TxId),
    /// `beginRO(T)` — start a read-only transaction at the current clock.
    BeginReadOnly(TxId),
    /// `R(T, xN)` — enqueue a read.
    Read(TxId, VarId),
    /// `W(T, xN, v)` — enqueue a write.
    Write(TxId, VarId, Value),
    /// `end(T)` — commit or abort, depending on `T`'s state.
    End(TxId),
    /// `dump()` — report every site's committed values.
    Dump,
    /// `fail(i)` — take site `i` down.
    Fail(SiteId),
    /// `recover(i)` — bring site `i` back up.
    Recover(SiteId),
}
