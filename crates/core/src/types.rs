//! Identifier types for the repcrec workspace.
//!
//! This module defines the three id spaces the system operates over:
//! - `TxId`: a transaction identifier (`T1`, `T2`, ...)
//! - `VarId`: a variable identifier (`x1` .. `x20`)
//! - `SiteId`: a site identifier (`1` .. `10`)

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Number of variables in the fixed universe (`x1..x20`).
pub const NUM_VARS: u8 = 20;

/// Number of sites in the fixed topology (`1..10`).
pub const NUM_SITES: u8 = 10;

/// A transaction identifier, e.g. `T1`.
///
/// Transaction ids are opaque strings assigned by the input stream. Ordering
/// is lexicographic on the underlying string, which is what the deadlock
/// detector's victim tie-break relies on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxId(String);

impl TxId {
    /// Wrap a raw identifier string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TxId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TxId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A variable identifier, `x1..x20`.
///
/// Stored as the 1-based index rather than the rendered string so that
/// replication/residency (`index % 2`, `index % 10 + 1`) is a cheap integer
/// computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(u8);

impl VarId {
    /// Construct a `VarId` from its 1-based index.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCommand`] if `index` is outside `1..=20`.
    pub fn new(index: u8) -> crate::Result<Self> {
        if index == 0 || index > NUM_VARS {
            return Err(Error::InvalidCommand(format!(
                "variable index {} out of range 1..={}",
                index, NUM_VARS
            )));
        }
        Ok(Self(index))
    }

    /// The 1-based index of this variable.
    pub fn index(&self) -> u8 {
        self.0
    }

    /// Whether this variable is replicated at every site (even index).
    pub fn is_replicated(&self) -> bool {
        self.0 % 2 == 0
    }

    /// The single site that owns a non-replicated variable.
    ///
    /// Only meaningful when [`VarId::is_replicated`] is `false`; replicated
    /// variables live at every site and have no single "home".
    pub fn home_site(&self) -> SiteId {
        SiteId::new((self.0 % 10) + 1).expect("home_site formula stays within 1..=10")
    }

    /// Iterate every variable in the fixed universe, in ascending order.
    pub fn all() -> impl Iterator<Item = VarId> {
        (1..=NUM_VARS).map(|i| VarId(i))
    }

    /// The initial committed value for this variable: `10 * index`.
    pub fn initial_value(&self) -> crate::Value {
        10 * i64::from(self.0)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl FromStr for VarId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('x')
            .ok_or_else(|| Error::InvalidCommand(format!("invalid variable name: {}", s)))?;
        let index: u8 = digits
            .parse()
            .map_err(|_| Error::InvalidCommand(format!("invalid variable name: {}", s)))?;
        VarId::new(index)
    }
}

/// A site identifier, `1..10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SiteId(u8);

impl SiteId {
    /// Construct a `SiteId` from its 1-based index.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCommand`] if `index` is outside `1..=10`.
    pub fn new(index: u8) -> crate::Result<Self> {
        if index == 0 || index > NUM_SITES {
            return Err(Error::InvalidCommand(format!(
                "site {} does not exist",
                index
            )));
        }
        Ok(Self(index))
    }

    /// The 1-based index of this site.
    pub fn index(&self) -> u8 {
        self.0
    }

    /// Iterate every site in the fixed topology, in ascending site-id order.
    ///
    /// Site iteration order is part of observable behavior: it determines
    /// which site answers a read first.
    pub fn all() -> impl Iterator<Item = SiteId> {
        (1..=NUM_SITES).map(|i| SiteId(i))
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
