//! The per-site data manager: a site's variable map, availability, and
//! the transaction-contact bookkeeping needed for abort propagation.

use repcrec_concurrency::{Grant, LockKind, LockState, VersionedVariable};
use repcrec_core::{SiteId, Timestamp, TxId, Value, VarId};
use std::collections::{BTreeMap, BTreeSet};

/// The outcome of a read attempt against a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The lock was granted (or already held); here is the visible value.
    Present(Value),
    /// The lock is held by someone else; the caller should keep waiting.
    Blocked,
    /// The site does not hold this variable, or holds an unavailable
    /// replicated copy — the caller should try another site.
    Absent,
}

/// The outcome of a write-lock check against a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCheck {
    /// The exclusive lock was granted (or already held).
    Granted,
    /// Held by someone else; the caller should keep waiting.
    Blocked,
}

/// One of the ten logical data partitions.
///
/// A site owns every replicated variable plus whichever non-replicated
/// variables call it home, an up/down flag, and the set of transactions
/// that have successfully read or written through it since its last
/// recovery (consulted when a site fails, to know which transactions to
/// abort).
#[derive(Debug, Clone)]
pub struct Site {
    id: SiteId,
    variables: BTreeMap<VarId, VersionedVariable>,
    up: bool,
    contacted: BTreeSet<TxId>,
    down_events: Vec<Timestamp>,
}

impl Site {
    /// Build a site with every variable it owns seeded at its initial
    /// value, per the fixed replication topology.
    pub fn new(id: SiteId) -> Self {
        let variables = VarId::all()
            .filter(|v| v.is_replicated() || v.home_site() == id)
            .map(|v| (v, VersionedVariable::new(v.initial_value())))
            .collect();
        Self {
            id,
            variables,
            up: true,
            contacted: BTreeSet::new(),
            down_events: Vec::new(),
        }
    }

    /// This site's id.
    pub fn id(&self) -> SiteId {
        self.id
    }

    /// Whether the site is currently reachable.
    pub fn is_up(&self) -> bool {
        self.up
    }

    /// Transactions that have successfully contacted this site since its
    /// last recovery.
    pub fn contacted(&self) -> &BTreeSet<TxId> {
        &self.contacted
    }

    /// Whether this site owns `var` at all.
    pub fn owns(&self, var: VarId) -> bool {
        self.variables.contains_key(&var)
    }

    fn continuously_up_since(&self, commit_ts: Timestamp, begin_ts: Timestamp) -> bool {
        !self
            .down_events
            .iter()
            .any(|&failed_at| failed_at > commit_ts && failed_at <= begin_ts)
    }

    /// Attempt a current (non-snapshot) read of `var` as `tx`.
    pub fn read(&mut self, tx: &TxId, var: VarId) -> ReadOutcome {
        let Some(vv) = self.variables.get_mut(&var) else {
            return ReadOutcome::Absent;
        };
        if var.is_replicated() && !vv.is_available() {
            return ReadOutcome::Absent;
        }
        match vv.try_acquire_read(tx) {
            Grant::Granted => {
                self.contacted.insert(tx.clone());
                ReadOutcome::Present(vv.tentative_read(tx))
            }
            Grant::Blocked => ReadOutcome::Blocked,
        }
    }

    /// Snapshot read of `var` as of `begin_ts`, honoring continuous
    /// uptime since the selected version's commit for replicated copies.
    pub fn read_snapshot(&self, begin_ts: Timestamp, var: VarId) -> Option<Value> {
        let vv = self.variables.get(&var)?;
        let version = vv.snapshot_version(begin_ts)?;
        if var.is_replicated() && !self.continuously_up_since(version.commit_ts, begin_ts) {
            return None;
        }
        Some(version.value)
    }

    /// Try to acquire the exclusive write lock for `tx` on `var`.
    /// Vacuously granted if this site doesn't hold `var`.
    pub fn check_write(&mut self, tx: &TxId, var: VarId) -> WriteCheck {
        match self.variables.get_mut(&var) {
            None => WriteCheck::Granted,
            Some(vv) => match vv.try_acquire_write(tx) {
                Grant::Granted => WriteCheck::Granted,
                Grant::Blocked => WriteCheck::Blocked,
            },
        }
    }

    /// Stage `tx`'s write of `value` to `var`. No-op if absent here.
    pub fn stage_write(&mut self, tx: &TxId, var: VarId, value: Value) {
        if let Some(vv) = self.variables.get_mut(&var) {
            vv.stage_write(value);
            self.contacted.insert(tx.clone());
        }
    }

    /// Commit `tx`: every variable where it holds the exclusive lock gets
    /// its staged value appended to history at `commit_ts`; every variable
    /// it touched (read or wrote) has its lock released.
    pub fn commit(&mut self, tx: &TxId, commit_ts: Timestamp) {
        for vv in self.variables.values_mut() {
            if holds_exclusive(vv, tx) {
                vv.commit_write(tx, commit_ts);
                tracing::debug!(tx = %tx, commit_ts, "committed write at site");
            } else {
                vv.release_read(tx);
            }
        }
    }

    /// Abort `tx`: discard any staged write, release every lock it holds.
    pub fn abort(&mut self, tx: &TxId) {
        for vv in self.variables.values_mut() {
            if holds_exclusive(vv, tx) {
                vv.abort_write(tx);
            } else {
                vv.release_read(tx);
            }
        }
    }

    /// Fail this site: it stops serving requests, every lock and wait
    /// queue on it is wiped, and its replicated copies become unavailable
    /// until their next commit. The contacted set survives until recovery.
    pub fn fail(&mut self, at: Timestamp) {
        tracing::warn!(site = self.id.index(), at, "site failed");
        self.up = false;
        self.down_events.push(at);
        for (var, vv) in self.variables.iter_mut() {
            vv.lock_mut().clear();
            if var.is_replicated() {
                vv.mark_unavailable();
            }
        }
    }

    /// Recover this site: it resumes serving requests and forgets which
    /// transactions it previously contacted. Replicated copies stay
    /// unavailable until their next write commits.
    pub fn recover(&mut self) {
        tracing::info!(site = self.id.index(), "site recovered");
        self.up = true;
        self.contacted.clear();
    }

    /// The latest committed value of every variable this site owns,
    /// ascending by variable index.
    pub fn dump(&self) -> Vec<(VarId, Value)> {
        self.variables
            .iter()
            .map(|(&id, vv)| (id, vv.read_committed()))
            .collect()
    }

    /// Directed waits-for edges `(waiter, holder)` implied by this site's
    /// lock state and wait queues.
    pub fn waits_for_local(&self) -> Vec<(TxId, TxId)> {
        let mut edges = Vec::new();
        for vv in self.variables.values() {
            let queue = vv.lock().queue();
            if queue.is_empty() {
                continue;
            }
            let state = vv.lock().state();
            for entry in queue {
                for holder in blocking_holders(state, entry.kind, &entry.tx) {
                    edges.push((entry.tx.clone(), holder));
                }
            }
            for j in 0..queue.len() {
                for i in (j + 1)..queue.len() {
                    let (q_j, q_i) = (&queue[j], &queue[i]);
                    let conflict = !(q_j.kind == LockKind::Read && q_i.kind == LockKind::Read)
                        && q_j.tx != q_i.tx;
                    if conflict {
                        edges.push((q_i.tx.clone(), q_j.tx.clone()));
                    }
                }
            }
        }
        edges.sort();
        edges.dedup();
        edges
    }
}

fn holds_exclusive(vv: &VersionedVariable, tx: &TxId) -> bool {
    matches!(vv.lock().state(), LockState::Exclusive(holder) if holder == tx)
}

/// The holders (distinct from `tx`) that the current lock state would
/// block `tx`'s queued `kind` request against, using the same conflict
/// rules as the acquire functions.
fn blocking_holders(state: &LockState, kind: LockKind, tx: &TxId) -> Vec<TxId> {
    match state {
        LockState::Free => Vec::new(),
        LockState::Shared(holders) => {
            let sole_self = holders.len() == 1 && holders.contains(tx);
            if kind == LockKind::Write && !sole_self {
                holders.iter().filter(|h| *h != tx).cloned().collect()
            } else {
                Vec::new()
            }
        }
        LockState::Exclusive(holder) => {
            if holder != tx {
                vec![holder.clone()]
            } else {
                Vec::new()
            }
        }
    }
}
