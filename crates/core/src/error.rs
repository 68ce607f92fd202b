//! Error types for repcrec.
//!
//! We use `thiserror` for automatic `Display`/`Error` impls.
//!
//! `Blocked` is deliberately *not* a variant here: a
//! blocked operation is not an error, it just stays queued. Abort is also
//! not modeled as an `Error` — a transaction that gets aborted (by site
//! failure or by the deadlock detector) is a normal, expected outcome
//! surfaced through the transaction table's `abort_reason`, not a failure
//! of the call that triggered it.

use thiserror::Error as ThisError;

/// Result type alias for repcrec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for invalid input.
#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unknown verb, malformed arguments, duplicate `begin`, an operation
    /// referencing an unknown transaction, an out-of-range site id, or a
    /// redundant `fail`/`recover`.
    #[error("ERROR: {0}")]
    InvalidCommand(String),

    /// A transaction id was referenced that does not exist in the
    /// transaction table.
    #[error("ERROR: Transaction {0} does not exist")]
    UnknownTransaction(String),

    /// `begin`/`beginRO` was called with an id already in the table.
    #[error("ERROR: Transaction {0} already exists")]
    DuplicateTransaction(String),
}

impl Error {
    /// Whether this error concerns transaction lookup (unknown or
    /// duplicate), as opposed to malformed syntax.
    ///
    /// Used by the CLI layer to decide whether to prefix diagnostics with
    /// the offending transaction id.
    pub fn is_transaction_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownTransaction(_) | Error::DuplicateTransaction(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_command_displays_with_error_prefix() {
        let err = Error::InvalidCommand("bad site id".to_string());
        assert_eq!(err.to_string(), "ERROR: bad site id");
    }

    #[test]
    fn unknown_transaction_displays_the_id() {
        let err = Error::UnknownTransaction("T9".to_string());
        assert!(err.to_string().contains("T9"));
        assert!(err.is_transaction_error());
    }

    #[test]
    fn duplicate_transaction_displays_the_id() {
        let err = Error::DuplicateTransaction("T1".to_string());
        assert!(err.to_string().contains("T1"));
        assert!(err.is_transaction_error());
    }

    #[test]
    fn invalid_command_is_not_a_transaction_error() {
        assert!(!Error::InvalidCommand("x".to_string()).is_transaction_error());
    }
}
