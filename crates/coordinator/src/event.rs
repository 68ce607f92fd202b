//! Observable outcomes of applying a [`crate::Command`], for the caller to
//! render (§10.2 formatting is the CLI's job; this crate only reports facts).

use crate::transaction::AbortReason;
use repcrec_core::{SiteId, TxId, Value, VarId};

/// The committed values a single site reports for `dump()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteDump {
    /// The site being reported.
    pub site: SiteId,
    /// Whether the site is currently up.
    pub up: bool,
    /// Latest committed value of each variable the site owns, ascending
    /// by variable index.
    pub values: Vec<(VarId, Value)>,
}

/// Something that happened while applying a command or re-driving the
/// operation queue in the same tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A transaction began.
    Began {
        /// The transaction that began.
        tx: TxId,
        /// Whether it is read-only.
        read_only: bool,
    },
    /// A queued read was satisfied this tick.
    ReadResult {
        /// The reading transaction.
        tx: TxId,
        /// The variable read.
        var: VarId,
        /// The value observed.
        value: Value,
    },
    /// A queued write was staged (locks acquired) this tick. Not yet
    /// committed — that happens at `end`.
    WriteAccepted {
        /// The writing transaction.
        tx: TxId,
        /// The variable written.
        var: VarId,
        /// The staged value.
        value: Value,
    },
    /// A transaction committed.
    Committed {
        /// The transaction that committed.
        tx: TxId,
    },
    /// A transaction aborted, by `end` on an already-doomed transaction or
    /// by deadlock-victim selection.
    Aborted {
        /// The transaction that aborted.
        tx: TxId,
        /// Why.
        reason: AbortReason,
    },
    /// A site went down.
    SiteFailed {
        /// The site that failed.
        site: SiteId,
    },
    /// A site came back up.
    SiteRecovered {
        /// The site that recovered.
        site: SiteId,
    },
    /// `dump()`'s report, one entry per site in ascending site-id order.
    Dump(Vec<SiteDump>),
}
