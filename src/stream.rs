//! # Stream Module
//!
//! The input contract for record sources and the primed lookahead wrapper the
//! merge-join drives.

use crate::error::{DossierError, Result};
use crate::model::{Record, Table};

/// A lazily-read, ordered sequence of records for one table.
pub type RecordIter = Box<dyn Iterator<Item = Record>>;

/// Where records come from. The merge-join only ever sees this interface.
///
/// For each table the source yields records sorted by
/// [`EntityKey`](crate::model::EntityKey) across all shards: shard order
/// first, then entity id within the shard. The merge-join does not verify
/// that ordering; a mis-sorted source produces duplicated or split bundles.
/// File formats, encodings and I/O are the source's own business.
pub trait RecordSource {
    fn open_table(&self, table: Table) -> RecordIter;
}

/// Single-item lookahead over a read-once sequence.
///
/// Constructed primed: the first item (if any) is fetched up front, so
/// [`is_done`](PeekStream::is_done) is correct before the first
/// [`advance`](PeekStream::advance). Repeated [`peek`](PeekStream::peek)
/// calls return the same item until the stream advances.
pub struct PeekStream<T> {
    inner: Box<dyn Iterator<Item = T>>,
    next: Option<T>,
}

impl<T> PeekStream<T> {
    pub fn new(iter: impl Iterator<Item = T> + 'static) -> Self {
        Self::from_boxed(Box::new(iter))
    }

    pub fn from_boxed(mut inner: Box<dyn Iterator<Item = T>>) -> Self {
        let next = inner.next();
        Self { inner, next }
    }

    /// True once the underlying sequence is exhausted.
    pub fn is_done(&self) -> bool {
        self.next.is_none()
    }

    /// The next item without consuming it.
    pub fn peek(&self) -> Result<&T> {
        self.next.as_ref().ok_or(DossierError::Exhausted)
    }

    /// The next item, advancing the stream.
    pub fn advance(&mut self) -> Result<T> {
        let item = self.next.take().ok_or(DossierError::Exhausted)?;
        self.next = self.inner.next();
        Ok(item)
    }
}

impl<T> std::fmt::Debug for PeekStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeekStream")
            .field("is_done", &self.is_done())
            .finish()
    }
}
