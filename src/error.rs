//! # Error Module
//!
//! Typed failure taxonomy for the merge-join and history layers.
//!
//! Every variant propagates to the immediate caller. This crate is a pure,
//! synchronous transformation over already-fetched batch data: it performs no
//! retries and no partial recovery. The caller decides whether to skip the
//! offending entity, log, or halt the run.

use crate::model::Table;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, DossierError>;

/// All errors surfaced by this crate.
#[derive(Debug, Error)]
pub enum DossierError {
    /// `peek`/`advance` was called past the end of a stream.
    ///
    /// The merge-join never touches a stream past `is_done()`, so seeing this
    /// from `MergeJoin` indicates an internal bug rather than bad input.
    #[error("record stream is exhausted")]
    Exhausted,

    /// An input record carried an unparseable entity identifier, or its
    /// origin did not match the shard pattern.
    #[error("malformed key in table {table} (origin {origin:?}): {detail}")]
    MalformedKey {
        table: Table,
        origin: String,
        detail: String,
    },

    /// A history method needed a table that was not part of the requested
    /// table set. Configuration error, surfaced immediately.
    #[error("table {0} was not requested for this bundle")]
    MissingTable(Table),

    /// A field value could not be coerced into a calendar date.
    #[error("field {field}: cannot parse {value:?} as a date")]
    DateParse { field: String, value: String },

    /// A required field is absent from a record.
    #[error("required field {field} is missing")]
    MissingField { field: String },

    /// A data-integrity assumption was violated, e.g. a training record with
    /// no registration period preceding it. Signals upstream corruption and
    /// is never silently dropped.
    #[error("inconsistent history: {0}")]
    InconsistentHistory(String),
}
