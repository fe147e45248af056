//! # Dossier
//!
//! A streaming multi-table merge-join over sharded, sorted administrative
//! records, plus the interval algebra used to reconstruct a person's
//! chronological employment, unemployment and training history from them.
//!
//! The data sets this crate targets are too large to hold in memory and are
//! spread across many shard files, each individually sorted by entity
//! identifier but not globally sorted. [`MergeJoin`] stitches the per-table
//! streams into one [`EntityBundle`] per entity in a single pass, in strictly
//! increasing [`EntityKey`] order; [`EntityHistory`] then combines the
//! bundle's rows into [`IntervalSet`]s and applies the algebra to answer
//! reconstruction queries.
//!
//! Everything is single-threaded and pull-based: streams advance only when
//! the merge asks for the next record, and each bundle is exclusively owned
//! by the consumer iterating the merge output. Stopping between bundles
//! abandons the partially-read streams; nothing needs rolling back.

pub mod config;
pub mod error;
pub mod history;
pub mod merge;
pub mod model;
pub mod stream;
pub mod temporal;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

// Re-export main types for convenience
pub use config::{ReconstructionTuning, TuningProfile};
pub use error::{DossierError, Result};
pub use history::{EntityHistory, JobSpell, JobSpells};
pub use merge::MergeJoin;
pub use model::{EntityBundle, EntityKey, Record, ShardPattern, Table, Value};
pub use stream::{PeekStream, RecordSource};
pub use temporal::{Interval, IntervalSet};
