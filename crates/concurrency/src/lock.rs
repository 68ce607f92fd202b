//! Per-variable lock state machine.
//!
//! A Rust sum type in place of the original's class hierarchy
//! (`LockItem`/`ReadLockItem`/`WriteLockItem`): the lock is either free,
//! shared by a non-empty set of readers, or exclusively held by one writer,
//! plus an ordered wait queue of requests that could not be granted yet.

use repcrec_core::TxId;
use std::collections::BTreeSet;

/// The kind of a lock request: read (shared) or write (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKind {
    /// A shared read-lock request.
    Read,
    /// An exclusive write-lock request.
    Write,
}

/// The current lock held on a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// No transaction holds the lock.
    Free,
    /// One or more transactions hold a shared read lock. Never empty —
    /// the last holder's release transitions the table back to `Free`.
    Shared(BTreeSet<TxId>),
    /// One transaction holds the exclusive write lock.
    Exclusive(TxId),
}

/// A pending lock request, held in a variable's FIFO wait queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// The kind of lock being requested.
    pub kind: LockKind,
    /// The transaction requesting it.
    pub tx: TxId,
}

/// The outcome of a lock-acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// The lock was granted; the caller may proceed.
    Granted,
    /// The lock could not be granted; the request was enqueued (or was
    /// already queued) and the caller must retry on a later tick.
    Blocked,
}

/// The lock state and wait queue for a single variable.
#[derive(Debug, Clone)]
pub struct LockTable {
    state: LockState,
    queue: Vec<QueueEntry>,
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LockTable {
    /// An unlocked table with an empty wait queue.
    pub fn new() -> Self {
        Self {
            state: LockState::Free,
            queue: Vec::new(),
        }
    }

    /// The current lock state.
    pub fn state(&self) -> &LockState {
        &self.state
    }

    /// The current wait queue, in arrival order.
    pub fn queue(&self) -> &[QueueEntry] {
        &self.queue
    }

    /// Whether any transaction other than `tx` has a queued write request.
    ///
    /// Drives both the read-lock fairness rule and the promotion rule: a
    /// queued writer from someone else blocks new shared readers and
    /// blocks promotion.
    fn is_write_waiting_except(&self, tx: &TxId) -> bool {
        self.queue
            .iter()
            .any(|e| e.kind == LockKind::Write && &e.tx != tx)
    }

    /// Append a request to the queue, deduplicated on `(kind, tx)`.
    fn enqueue(&mut self, kind: LockKind, tx: TxId) {
        if !self.queue.iter().any(|e| e.kind == kind && e.tx == tx) {
            self.queue.push(QueueEntry { kind, tx });
        }
    }

    /// Attempt to grant a shared read lock to `tx`.
    pub fn try_acquire_read(&mut self, tx: &TxId) -> Grant {
        enum Action {
            NewShared,
            AlreadyShared,
            JoinShared,
            AlreadyExclusive,
            Block,
        }

        let action = match &self.state {
            LockState::Free => Action::NewShared,
            LockState::Shared(holders) => {
                if holders.contains(tx) {
                    Action::AlreadyShared
                } else if self.is_write_waiting_except(tx) {
                    Action::Block
                } else {
                    Action::JoinShared
                }
            }
            LockState::Exclusive(holder) => {
                if holder == tx {
                    Action::AlreadyExclusive
                } else {
                    Action::Block
                }
            }
        };

        match action {
            Action::NewShared => {
                let mut holders = BTreeSet::new();
                holders.insert(tx.clone());
                self.state = LockState::Shared(holders);
                Grant::Granted
            }
            Action::AlreadyShared | Action::AlreadyExclusive => Grant::Granted,
            Action::JoinShared => {
                if let LockState::Shared(holders) = &mut self.state {
                    holders.insert(tx.clone());
                }
                Grant::Granted
            }
            Action::Block => {
                self.enqueue(LockKind::Read, tx.clone());
                Grant::Blocked
            }
        }
    }

    /// Attempt to grant (or promote to) an exclusive write lock to `tx`.
    pub fn try_acquire_write(&mut self, tx: &TxId) -> Grant {
        enum Action {
            NewExclusive,
            Promote,
            AlreadyExclusive,
            Block,
        }

        let action = match &self.state {
            LockState::Free => Action::NewExclusive,
            LockState::Shared(holders) => {
                if holders.len() == 1 && holders.contains(tx) && !self.is_write_waiting_except(tx)
                {
                    Action::Promote
                } else {
                    Action::Block
                }
            }
            LockState::Exclusive(holder) => {
                if holder == tx {
                    Action::AlreadyExclusive
                } else {
                    Action::Block
                }
            }
        };

        match action {
            Action::NewExclusive | Action::Promote => {
                self.state = LockState::Exclusive(tx.clone());
                Grant::Granted
            }
            Action::AlreadyExclusive => Grant::Granted,
            Action::Block => {
                self.enqueue(LockKind::Write, tx.clone());
                Grant::Blocked
            }
        }
    }

    /// Release every lock and queue entry held by `tx`.
    ///
    /// Does not dequeue waiters — they are re-driven by the Coordinator's
    /// global execute pass on the next tick.
    pub fn release(&mut self, tx: &TxId) {
        match &mut self.state {
            LockState::Shared(holders) => {
                holders.remove(tx);
                if holders.is_empty() {
                    self.state = LockState::Free;
                }
            }
            LockState::Exclusive(holder) if holder == tx => {
                self.state = LockState::Free;
            }
            _ => {}
        }
        self.queue.retain(|e| &e.tx != tx);
    }

    /// Discard the current lock and every queued request, unconditionally.
    ///
    /// Used when a site fails: every lock and wait queue on it is wiped,
    /// regardless of who held what.
    pub fn clear(&mut self) {
        self.state = LockState::Free;
        self.queue.clear();
    }
}
