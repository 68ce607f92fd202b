//! Value and logical-clock types.

/// The value domain for variables: a plain signed integer.
pub type Value = i64;

/// The logical clock domain.
///
/// This is the Coordinator's tick counter: it starts at 0 and increments by
/// one per processed input command, supplying both transaction `begin_ts`
/// and write `commit_ts`.
pub type Timestamp = u64;
