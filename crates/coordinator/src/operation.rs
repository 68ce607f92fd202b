//! Pending read/write operations held in the Coordinator's FIFO queue.

use repcrec_core::{TxId, Value, VarId};

/// What an operation does: a read of a variable, or a write of a value to
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Read `VarId`.
    Read(VarId),
    /// Write `Value` to `VarId`.
    Write(VarId, Value),
}

/// A queued `R`/`W` request, waiting for its transaction's locks (or, for
/// read-only transactions, a site able to serve the snapshot).
#[derive(Debug, Clone)]
pub struct Operation {
    tx: TxId,
    kind: OperationKind,
}

impl Operation {
    /// A new pending operation for `tx`.
    pub fn new(tx: TxId, kind: OperationKind) -> Self {
        Self { tx, kind }
    }

    /// The transaction this operation belongs to.
    pub fn tx(&self) -> &TxId {
        &self.tx
    }

    /// What this operation does.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}
