//! Engine-facing index accessor contract
//!
//! The shape is identical for a composite index and a single-kind index —
//! the engine cannot distinguish them. All multi-part fan-out semantics
//! (best-effort attempts, first-failure propagation) are behind these
//! methods.

use super::pacing::FlushPacing;
use super::predicate::{ResultOrdering, ValuePredicate};
use super::reporter::ConsistencyReporter;
use super::scan::{EntryScan, FileScan};
use super::update::{IndexUpdate, UpdateMode};
use crate::error::Result;
use crate::types::EntityId;

/// The standard index accessor contract.
pub trait IndexAccessor: Send + Sync {
    /// Delete the index's on-disk structures. Every part is attempted even
    /// if one fails; the first failure is surfaced after all attempts.
    /// Already-dropped parts stay dropped.
    fn drop_index(&self) -> Result<()>;

    /// Open an updater. Fails with `ClosedAccessor` once the accessor is
    /// closed or dropped.
    fn new_updater(&self, mode: UpdateMode) -> Result<Box<dyn IndexUpdater>>;

    /// Flush every open part synchronously, pacing passed through
    fn force(&self, pacing: FlushPacing) -> Result<()>;

    /// Refresh read visibility. Parts manage their own read snapshots, so
    /// this is a no-op for this engine.
    fn refresh(&self) -> Result<()>;

    /// Close every open part exactly once. Idempotent: a second call is
    /// absorbed without a double release.
    fn close(&self) -> Result<()>;

    /// Open a reader bound to the live-parts snapshot at call time
    fn new_reader(&self) -> Result<Box<dyn IndexReader>>;

    /// Bounded scan over every live part's entries, concatenated in kind
    /// order. Not globally value-sorted.
    fn entry_scan(&self) -> Result<Box<dyn EntryScan>>;

    /// Lazily concatenated file inventory over every live part, for online
    /// backup
    fn snapshot_files(&self) -> Result<Box<dyn FileScan>>;

    /// Whether at least one live part has unflushed writes
    fn is_dirty(&self) -> bool;

    /// Check every live part against the shared sink; `true` only when all
    /// parts are consistent. Checking continues past the first violation.
    fn consistency_check(&self, reporter: &dyn ConsistencyReporter) -> Result<bool>;
}

/// A write session against an index.
pub trait IndexUpdater: Send {
    /// Route one update to the affected part(s)
    fn apply(&mut self, update: IndexUpdate) -> Result<()>;

    /// Close every per-part writer opened during this session, each exactly
    /// once. A second close fails with `ClosedAccessor`.
    fn close(&mut self) -> Result<()>;
}

/// A read session against an index.
pub trait IndexReader: Send {
    /// Entities matching the predicate.
    ///
    /// A predicate bound to a kind with no materialized part yields an
    /// empty result — absence of a part means no values of that kind were
    /// ever indexed.
    fn query(
        &self,
        predicate: &ValuePredicate,
        ordering: ResultOrdering,
    ) -> Result<Vec<EntityId>>;
}
