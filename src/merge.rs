//! # Merge Module
//!
//! K-way synchronized merge-join across per-table record streams.
//!
//! Each requested table contributes one primed [`PeekStream`]. On every step
//! the merge picks the minimum entity key visible across the live streams,
//! drains every row matching that key from every stream, and emits one
//! [`EntityBundle`]. Because every individual stream is sorted by key,
//! choosing the minimum guarantees that no stream can later produce a smaller
//! key, so the emitted sequence is strictly increasing and needs no buffering
//! beyond the current entity's rows.
//!
//! Mis-sorted input is a documented precondition, not a runtime check: a key
//! arriving after a larger one was emitted silently produces duplicated or
//! split bundles. Keeping the merge single-pass is the deliberate trade.
//!
//! A record with a malformed key acts as a stream boundary: the bundle being
//! drained when it is found is still emitted, and the error surfaces on the
//! following call, aborting the run there.

use crate::error::{DossierError, Result};
use crate::model::{entity_key, EntityBundle, EntityKey, Record, ShardPattern, Table};
use crate::stream::{PeekStream, RecordSource};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

struct TableStream {
    table: Table,
    stream: PeekStream<Record>,
}

/// Lazy, finite, single-pass, non-restartable sequence of [`EntityBundle`]s,
/// strictly increasing by [`EntityKey`].
pub struct MergeJoin {
    streams: Vec<TableStream>,
    pattern: ShardPattern,
    deferred: Option<DossierError>,
    failed: bool,
}

impl MergeJoin {
    /// Open one stream per requested table and start the run.
    ///
    /// Duplicate table names are collapsed; requesting no tables yields an
    /// empty sequence.
    pub fn run(source: &dyn RecordSource, tables: &[Table], pattern: ShardPattern) -> Self {
        let mut streams: Vec<TableStream> = Vec::with_capacity(tables.len());
        for &table in tables {
            if streams.iter().any(|existing| existing.table == table) {
                continue;
            }
            streams.push(TableStream {
                table,
                stream: PeekStream::from_boxed(source.open_table(table)),
            });
        }
        debug!(tables = streams.len(), "starting merge-join run");
        Self {
            streams,
            pattern,
            deferred: None,
            failed: false,
        }
    }

    /// Assemble the next bundle, or `None` when all streams are done.
    fn next_bundle(&mut self) -> Result<Option<EntityBundle>> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        let mut target: Option<EntityKey> = None;
        for ts in &self.streams {
            if ts.stream.is_done() {
                continue;
            }
            let key = entity_key(ts.stream.peek()?, &self.pattern, ts.table)?;
            if target.as_ref().map_or(true, |current| key < *current) {
                target = Some(key);
            }
        }
        let Some(target) = target else {
            return Ok(None);
        };

        let mut tables: FxHashMap<Table, Vec<Record>> = FxHashMap::default();
        for ts in &mut self.streams {
            let mut rows = Vec::new();
            while !ts.stream.is_done() {
                // A malformed record closes the current entity; the bundle
                // drained so far is still valid, so hold the error until the
                // next call.
                let key = match entity_key(ts.stream.peek()?, &self.pattern, ts.table) {
                    Ok(key) => key,
                    Err(err) => {
                        self.deferred = Some(err);
                        break;
                    }
                };
                if key != target {
                    break;
                }
                rows.push(ts.stream.advance()?);
            }
            tables.insert(ts.table, rows);
        }
        Ok(Some(EntityBundle::new(target, tables)))
    }
}

impl Iterator for MergeJoin {
    type Item = Result<EntityBundle>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_bundle() {
            Ok(Some(bundle)) => Some(Ok(bundle)),
            Ok(None) => None,
            Err(err) => {
                self.failed = true;
                warn!(error = %err, "merge-join run aborted");
                Some(Err(err))
            }
        }
    }
}
