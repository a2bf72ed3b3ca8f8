//! Part storage collaborator traits
//!
//! A part is one single-kind ordered structure. The composite layer never
//! looks inside it; everything it needs is behind [`PartStorage`]. The
//! default implementation lives in `chronidx-storage`; tests substitute
//! in-memory doubles to inject failures.

use super::pacing::FlushPacing;
use super::predicate::KeyProbe;
use super::reporter::ConsistencyReporter;
use super::scan::{EntryScan, FileScan, IndexEntry};
use super::update::{PartWrite, UpdateMode};
use crate::error::Result;
use crate::kind::TemporalKind;

/// One single-kind ordered index structure.
///
/// Implementations are internally synchronized: the composite layer calls
/// them from multiple threads through a shared handle.
pub trait PartStorage: Send + Sync {
    /// The kind of every value in this part
    fn kind(&self) -> TemporalKind;

    /// Open a writer. Each writer must be closed exactly once.
    fn begin_write(&self, mode: UpdateMode) -> Result<Box<dyn PartWriter>>;

    /// Point or range read; entries come back value-ordered
    fn read(&self, probe: &KeyProbe) -> Result<Vec<IndexEntry>>;

    /// Bounded full scan with a size hint
    fn entry_scan(&self) -> Result<Box<dyn EntryScan>>;

    /// File inventory for online backup
    fn snapshot_files(&self) -> Result<Box<dyn FileScan>>;

    /// Flush staged writes through a durability barrier, paced by `pacing`
    fn force(&self, pacing: FlushPacing) -> Result<()>;

    /// Whether there are writes not yet covered by a `force`
    fn is_dirty(&self) -> bool;

    /// Check structural consistency, reporting every violation to the sink.
    /// Returns `true` when no violation was found.
    fn consistency_check(&self, reporter: &dyn ConsistencyReporter) -> Result<bool>;

    /// Close and delete the on-disk structure
    fn drop_storage(&self) -> Result<()>;

    /// Release the in-memory structure; the file stays
    fn close(&self) -> Result<()>;
}

/// A writer into one part, lazily opened by the composite updater.
pub trait PartWriter: Send {
    /// Apply one write operation
    fn apply(&mut self, op: PartWrite) -> Result<()>;

    /// Release the writer. Called exactly once.
    fn close(&mut self) -> Result<()>;
}
