//! The Transaction Manager: the global clock, transaction table, operation
//! queue, and the per-tick drive loop that ties sites and the deadlock
//! detector together (§4.4).
//!
//! One call to [`Coordinator::apply`] is one tick: it applies the command,
//! advances the clock, then alternates running deadlock detection and
//! re-driving the pending operation queue (FIFO order) until a round
//! changes nothing (§5).

use std::collections::{BTreeMap, VecDeque};

use repcrec_core::{Error, Result, SiteId, Timestamp, TxId, Value, VarId};
use repcrec_storage::{ReadOutcome, Site, WriteCheck};

use crate::command::Command;
use crate::detector::{find_cycle, select_victim};
use crate::event::{Event, SiteDump};
use crate::operation::{Operation, OperationKind};
use crate::transaction::{AbortReason, Transaction};

/// The Coordinator: owns the ten sites, the transaction table, and the
/// pending operation queue; drives the global clock.
pub struct Coordinator {
    clock: Timestamp,
    sites: Vec<Site>,
    transactions: BTreeMap<TxId, Transaction>,
    queue: VecDeque<Operation>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    /// A fresh Coordinator: clock at 0, ten sites each seeded per the
    /// fixed replication topology, no transactions, an empty queue.
    pub fn new() -> Self {
        Self {
            clock: 0,
            sites: SiteId::all().map(Site::new).collect(),
            transactions: BTreeMap::new(),
            queue: VecDeque::new(),
        }
    }

    /// The current tick.
    pub fn timestamp(&self) -> Timestamp {
        self.clock
    }

    /// Whether `tx` is currently in the transaction table.
    pub fn has_transaction(&self, tx: &TxId) -> bool {
        self.transactions.contains_key(tx)
    }

    /// Apply one input command and run the tick to completion: increment
    /// the clock, then drive the queue and the deadlock detector together
    /// to a fixpoint. Returns everything observable that happened, in the
    /// order it happened.
    ///
    /// A single execute-then-detect pass is not enough: an operation that
    /// *closes* a waits-for cycle only updates a site's lock queue when
    /// `execute_pass` retries it, so the detector has to run again after
    /// that same pass to see the edge it just created. Symmetrically, a
    /// detector-aborted victim can free up a lock another queued operation
    /// was waiting on, and that operation should get to run in the same
    /// tick rather than sit queued into the next command's `end` check.
    /// So the two are alternated until neither makes progress.
    pub fn apply(&mut self, command: Command) -> Result<Vec<Event>> {
        let ts = self.clock;
        let mut events = Vec::new();

        match command {
            Command::Begin(tx) => self.begin(tx, false, ts, &mut events)?,
            Command::BeginReadOnly(tx) => self.begin(tx, true, ts, &mut events)?,
            Command::Read(tx, var) => self.add_read(tx, var)?,
            Command::Write(tx, var, value) => self.add_write(tx, var, value)?,
            Command::End(tx) => self.end(tx, ts, &mut events)?,
            Command::Dump => events.push(Event::Dump(self.dump())),
            Command::Fail(site) => self.fail(site, ts, &mut events)?,
            Command::Recover(site) => self.recover(site, &mut events)?,
        }

        self.clock = ts + 1;
        loop {
            let progressed = self.execute_pass(&mut events);
            let aborted = self.detect_deadlocks(&mut events);
            if !progressed && !aborted {
                break;
            }
        }
        Ok(events)
    }

    /// The latest committed value of every variable at every site,
    /// ascending by site id then variable index.
    pub fn dump(&self) -> Vec<SiteDump> {
        self.sites
            .iter()
            .map(|s| SiteDump {
                site: s.id(),
                up: s.is_up(),
                values: s.dump(),
            })
            .collect()
    }

    fn site_mut(&mut self, id: SiteId) -> &mut Site {
        &mut self.sites[(id.index() - 1) as usize]
    }

    fn begin(
        &mut self,
        tx: TxId,
        read_only: bool,
        ts: Timestamp,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        if self.transactions.contains_key(&tx) {
            return Err(Error::DuplicateTransaction(tx.to_string()));
        }
        tracing::info!(tx = %tx, read_only, begin_ts = ts, "transaction began");
        self.transactions
            .insert(tx.clone(), Transaction::new(tx.clone(), ts, read_only));
        events.push(Event::Began { tx, read_only });
        Ok(())
    }

    fn add_read(&mut self, tx: TxId, var: VarId) -> Result<()> {
        if !self.transactions.contains_key(&tx) {
            return Err(Error::UnknownTransaction(tx.to_string()));
        }
        self.queue.push_back(Operation::new(tx, OperationKind::Read(var)));
        Ok(())
    }

    fn add_write(&mut self, tx: TxId, var: VarId, value: Value) -> Result<()> {
        if !self.transactions.contains_key(&tx) {
            return Err(Error::UnknownTransaction(tx.to_string()));
        }
        self.queue
            .push_back(Operation::new(tx, OperationKind::Write(var, value)));
        Ok(())
    }

    /// `end(tx)`: commit if `tx` is still healthy and has nothing left
    /// queued, otherwise abort. A transaction reaching `end` while an
    /// operation of its is still queued is itself grounds for abort (the
    /// "operation incomplete" open question, §9) — `end` never fails for
    /// a known transaction, it only chooses commit or abort.
    fn end(&mut self, tx: TxId, ts: Timestamp, events: &mut Vec<Event>) -> Result<()> {
        if !self.transactions.contains_key(&tx) {
            return Err(Error::UnknownTransaction(tx.to_string()));
        }
        if self.queue.iter().any(|op| op.tx() == &tx) {
            self.transactions
                .get_mut(&tx)
                .expect("checked above")
                .mark_aborted(AbortReason::OperationIncomplete);
        }

        let txn = self.transactions.get(&tx).expect("checked above");
        if txn.is_aborted() {
            let reason = txn.abort_reason().expect("is_aborted implies a reason");
            for site in &mut self.sites {
                site.abort(&tx);
            }
            self.queue.retain(|op| op.tx() != &tx);
            self.transactions.remove(&tx);
            tracing::warn!(tx = %tx, %reason, "transaction aborted");
            events.push(Event::Aborted { tx, reason });
        } else {
            for site in self.sites.iter_mut().filter(|s| s.is_up()) {
                site.commit(&tx, ts);
            }
            self.transactions.remove(&tx);
            tracing::info!(tx = %tx, commit_ts = ts, "transaction committed");
            events.push(Event::Committed { tx });
        }
        Ok(())
    }

    /// `fail(i)`: take the site down and abort every transaction that had
    /// successfully contacted it since its last recovery.
    fn fail(&mut self, site_id: SiteId, ts: Timestamp, events: &mut Vec<Event>) -> Result<()> {
        if !self.site_mut(site_id).is_up() {
            return Err(Error::InvalidCommand(format!(
                "site {} is already down",
                site_id
            )));
        }
        let contacted: Vec<TxId> = self.site_mut(site_id).contacted().iter().cloned().collect();
        self.site_mut(site_id).fail(ts);
        for tx_id in contacted {
            if let Some(t) = self.transactions.get_mut(&tx_id) {
                t.mark_aborted(AbortReason::SiteFailure);
            }
        }
        events.push(Event::SiteFailed { site: site_id });
        Ok(())
    }

    /// `recover(i)`: bring the site back up.
    fn recover(&mut self, site_id: SiteId, events: &mut Vec<Event>) -> Result<()> {
        if self.site_mut(site_id).is_up() {
            return Err(Error::InvalidCommand(format!(
                "site {} is already up",
                site_id
            )));
        }
        self.site_mut(site_id).recover();
        events.push(Event::SiteRecovered { site: site_id });
        Ok(())
    }

    /// Union every up site's local waits-for edges and abort cycles'
    /// youngest participant until the union is acyclic (§4.5). Returns
    /// whether any victim was aborted.
    fn detect_deadlocks(&mut self, events: &mut Vec<Event>) -> bool {
        let mut aborted_any = false;
        loop {
            let edges: Vec<(TxId, TxId)> = self
                .sites
                .iter()
                .filter(|s| s.is_up())
                .flat_map(|s| s.waits_for_local())
                .collect();
            let Some(cycle) = find_cycle(&edges) else {
                break;
            };
            let victim = select_victim(&cycle, |tx| {
                self.transactions.get(tx).map(Transaction::begin_ts).unwrap_or(0)
            });
            tracing::warn!(tx = %victim, cycle_len = cycle.len(), "deadlock detected, aborting victim");
            for site in &mut self.sites {
                site.abort(&victim);
            }
            if let Some(t) = self.transactions.get_mut(&victim) {
                t.mark_aborted(AbortReason::Deadlock);
            }
            self.queue.retain(|op| op.tx() != &victim);
            events.push(Event::Aborted {
                tx: victim,
                reason: AbortReason::Deadlock,
            });
            aborted_any = true;
        }
        aborted_any
    }

    /// Scan the pending queue once in FIFO order, dropping orphaned and
    /// aborted-but-not-yet-ended ops, retrying the rest, and leaving
    /// still-blocked ops in place for the next tick. Returns whether any
    /// operation in the pass was resolved (satisfied, staged, or dropped).
    fn execute_pass(&mut self, events: &mut Vec<Event>) -> bool {
        let pending = std::mem::take(&mut self.queue);
        let mut progressed = false;
        for op in pending {
            let tx_id = op.tx().clone();
            let Some(txn) = self.transactions.get(&tx_id) else {
                progressed = true;
                continue; // orphan: transaction no longer exists
            };
            if txn.is_aborted() {
                progressed = true;
                continue; // silently discarded once aborted (§4.4)
            }
            let read_only = txn.is_read_only();
            let begin_ts = txn.begin_ts();

            match op.kind() {
                OperationKind::Read(var) => match self.try_read(&tx_id, var, read_only, begin_ts) {
                    Some(value) => {
                        progressed = true;
                        tracing::debug!(tx = %tx_id, %var, value, "read satisfied");
                        events.push(Event::ReadResult {
                            tx: tx_id,
                            var,
                            value,
                        });
                    }
                    None => self.queue.push_back(op),
                },
                OperationKind::Write(var, value) => {
                    if self.try_write(&tx_id, var, value) {
                        progressed = true;
                        tracing::debug!(tx = %tx_id, %var, value, "write staged");
                        events.push(Event::WriteAccepted {
                            tx: tx_id,
                            var,
                            value,
                        });
                    } else {
                        self.queue.push_back(op);
                    }
                }
            }
        }
        progressed
    }

    /// Attempt to satisfy a read, per the Available-Copies rule: first up
    /// site to yield a value wins; a blocked or absent site does not stop
    /// iteration.
    fn try_read(&mut self, tx: &TxId, var: VarId, read_only: bool, begin_ts: Timestamp) -> Option<Value> {
        if read_only {
            self.sites
                .iter()
                .filter(|s| s.is_up())
                .find_map(|s| s.read_snapshot(begin_ts, var))
        } else {
            self.sites.iter_mut().filter(|s| s.is_up()).find_map(|s| {
                match s.read(tx, var) {
                    ReadOutcome::Present(v) => Some(v),
                    ReadOutcome::Blocked | ReadOutcome::Absent => None,
                }
            })
        }
    }

    /// Two-phase write attempt: the exclusive lock must be granted on
    /// every up site before any is staged.
    fn try_write(&mut self, tx: &TxId, var: VarId, value: Value) -> bool {
        let all_granted = self
            .sites
            .iter_mut()
            .filter(|s| s.is_up())
            .all(|s| s.check_write(tx, var) == WriteCheck::Granted);
        if !all_granted {
            return false;
        }
        for site in self.sites.iter_mut().filter(|s| s.is_up()) {
            site.stage_write(tx, var, value);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repcrec_core::TxId;

    fn tx(s: &str) -> TxId {
        TxId::new(s)
    }

    fn var(i: u8) -> VarId {
        VarId::new(i).unwrap()
    }

    fn site(i: u8) -> SiteId {
        SiteId::new(i).unwrap()
    }

    #[test]
    fn begin_rejects_duplicate_id() {
        let mut c = Coordinator::new();
        c.apply(Command::Begin(tx("T1"))).unwrap();
        let err = c.apply(Command::Begin(tx("T1"))).unwrap_err();
        assert!(matches!(err, Error::DuplicateTransaction(_)));
    }

    #[test]
    fn read_write_ops_on_unknown_tx_are_rejected() {
        let mut c = Coordinator::new();
        let err = c.apply(Command::Read(tx("T9"), var(2))).unwrap_err();
        assert!(matches!(err, Error::UnknownTransaction(_)));
    }

    #[test]
    fn round_trip_write_then_commit_is_visible_everywhere() {
        let mut c = Coordinator::new();
        c.apply(Command::Begin(tx("T1"))).unwrap();
        c.apply(Command::Write(tx("T1"), var(6), 66)).unwrap();
        c.apply(Command::End(tx("T1"))).unwrap();
        let dump = c.dump();
        for site_dump in &dump {
            assert!(site_dump.values.contains(&(var(6), 66)));
        }
    }

    #[test]
    fn idempotent_read_returns_tentative_after_own_write() {
        let mut c = Coordinator::new();
        c.apply(Command::Begin(tx("T1"))).unwrap();
        let events = c.apply(Command::Read(tx("T1"), var(2))).unwrap();
        assert!(events.iter().any(
            |e| matches!(e, Event::ReadResult { value, .. } if *value == 20)
        ));
        c.apply(Command::Write(tx("T1"), var(2), 99)).unwrap();
        let events = c.apply(Command::Read(tx("T1"), var(2))).unwrap();
        assert!(events.iter().any(
            |e| matches!(e, Event::ReadResult { value, .. } if *value == 99)
        ));
    }

    #[test]
    fn read_only_transaction_sees_snapshot_as_of_begin() {
        let mut c = Coordinator::new();
        c.apply(Command::Begin(tx("T1"))).unwrap();
        c.apply(Command::Write(tx("T1"), var(6), 66)).unwrap();
        c.apply(Command::End(tx("T1"))).unwrap();
        c.apply(Command::BeginReadOnly(tx("T2"))).unwrap();
        let events = c.apply(Command::Read(tx("T2"), var(6))).unwrap();
        assert!(events.iter().any(
            |e| matches!(e, Event::ReadResult { value, .. } if *value == 66)
        ));
    }

    #[test]
    fn site_failure_aborts_only_contacted_transactions() {
        let mut c = Coordinator::new();
        c.apply(Command::Begin(tx("T1"))).unwrap();
        c.apply(Command::Write(tx("T1"), var(8), 88)).unwrap();
        // x8 is replicated (even index): T1's write contacts every site,
        // so failing any one of them, e.g. site 9, must abort T1.
        c.apply(Command::Fail(site(9))).unwrap();
        let events = c.apply(Command::End(tx("T1"))).unwrap();
        assert!(events.iter().any(
            |e| matches!(e, Event::Aborted { reason: AbortReason::SiteFailure, .. })
        ));
        for site_dump in c.dump() {
            assert!(site_dump.values.contains(&(var(8), 80)));
        }
    }

    #[test]
    fn non_replicated_var_is_immediately_readable_after_recovery() {
        let mut c = Coordinator::new();
        c.apply(Command::Begin(tx("T1"))).unwrap();
        c.apply(Command::Read(tx("T1"), var(1))).unwrap();
        c.apply(Command::Fail(site(2))).unwrap();
        c.apply(Command::Recover(site(2))).unwrap();
        let events = c.apply(Command::Read(tx("T1"), var(1))).unwrap();
        assert!(events.iter().any(
            |e| matches!(e, Event::ReadResult { value, .. } if *value == 10)
        ));
        let events = c.apply(Command::End(tx("T1"))).unwrap();
        assert!(events.iter().any(|e| matches!(e, Event::Committed { .. })));
    }

    #[test]
    fn replicated_copy_stays_unavailable_until_next_commit_after_recovery() {
        let mut c = Coordinator::new();
        c.apply(Command::BeginReadOnly(tx("T1"))).unwrap();
        c.apply(Command::Fail(site(1))).unwrap();
        c.apply(Command::Recover(site(1))).unwrap();
        let events = c.apply(Command::Read(tx("T1"), var(2))).unwrap();
        assert!(events.iter().any(
            |e| matches!(e, Event::ReadResult { value, .. } if *value == 20)
        ));
    }

    #[test]
    fn promotion_blocks_behind_a_sharer_then_proceeds_after_release() {
        let mut c = Coordinator::new();
        c.apply(Command::Begin(tx("T1"))).unwrap();
        c.apply(Command::Begin(tx("T2"))).unwrap();
        c.apply(Command::Read(tx("T1"), var(4))).unwrap();
        c.apply(Command::Read(tx("T2"), var(4))).unwrap();
        let events = c.apply(Command::Write(tx("T1"), var(4), 44)).unwrap();
        assert!(!events.iter().any(|e| matches!(e, Event::WriteAccepted { .. })));
        let events = c.apply(Command::End(tx("T2"))).unwrap();
        assert!(events.iter().any(|e| matches!(e, Event::WriteAccepted { .. })));
        let events = c.apply(Command::End(tx("T1"))).unwrap();
        assert!(events.iter().any(|e| matches!(e, Event::Committed { .. })));
    }

    #[test]
    fn deadlock_cycle_aborts_the_younger_transaction() {
        let mut c = Coordinator::new();
        c.apply(Command::Begin(tx("T1"))).unwrap();
        c.apply(Command::Begin(tx("T2"))).unwrap();
        c.apply(Command::Write(tx("T1"), var(1), 101)).unwrap();
        c.apply(Command::Write(tx("T2"), var(2), 202)).unwrap();
        c.apply(Command::Read(tx("T1"), var(2))).unwrap();
        // T2's read of x1 is what closes the wait-for cycle; the detector
        // catches it in this same tick and T1's now-unblocked read of x2
        // is serviced in the same tick too.
        let events = c.apply(Command::Read(tx("T2"), var(1))).unwrap();
        assert!(events.iter().any(
            |e| matches!(e, Event::Aborted { tx, reason: AbortReason::Deadlock, .. } if tx.as_str() == "T2")
        ));
        assert!(events.iter().any(
            |e| matches!(e, Event::ReadResult { tx, var: v, value } if tx.as_str() == "T1" && *v == var(2) && *value == 20)
        ));
        // The victim stays in the table (aborted = true) until `end` is
        // called on it, same as a site-failure abort.
        assert!(c.has_transaction(&tx("T1")));
        assert!(c.has_transaction(&tx("T2")));

        let t1_end = c.apply(Command::End(tx("T1"))).unwrap();
        assert!(t1_end.iter().any(|e| matches!(e, Event::Committed { tx } if tx.as_str() == "T1")));

        let t2_end = c.apply(Command::End(tx("T2"))).unwrap();
        assert!(t2_end.iter().any(
            |e| matches!(e, Event::Aborted { tx, reason: AbortReason::Deadlock, .. } if tx.as_str() == "T2")
        ));
        assert!(!c.has_transaction(&tx("T2")));
    }

    #[test]
    fn end_with_residual_queued_op_aborts_as_operation_incomplete() {
        let mut c = Coordinator::new();
        c.apply(Command::Begin(tx("T1"))).unwrap();
        c.apply(Command::Begin(tx("T2"))).unwrap();
        // T2 holds x2 exclusively so T1's write blocks and stays queued.
        c.apply(Command::Write(tx("T2"), var(2), 1)).unwrap();
        c.apply(Command::Write(tx("T1"), var(2), 2)).unwrap();
        let events = c.apply(Command::End(tx("T1"))).unwrap();
        assert!(events.iter().any(
            |e| matches!(e, Event::Aborted { reason: AbortReason::OperationIncomplete, .. })
        ));
    }

    #[test]
    fn fail_on_down_site_is_an_invalid_command() {
        let mut c = Coordinator::new();
        c.apply(Command::Fail(site(3))).unwrap();
        let err = c.apply(Command::Fail(site(3))).unwrap_err();
        assert!(matches!(err, Error::InvalidCommand(_)));
    }

    #[test]
    fn recover_on_up_site_is_an_invalid_command() {
        let mut c = Coordinator::new();
        let err = c.apply(Command::Recover(site(3))).unwrap_err();
        assert!(matches!(err, Error::InvalidCommand(_)));
    }
}
