//! Bounded scans and resource sequences
//!
//! Aggregate reads over an index stream lazily instead of materializing
//! every part at once. Both scan shapes here are *resources*: the caller
//! must `close()` them, and early termination — including a size
//! computation that short-circuits to unknown — must still release every
//! underlying per-part sequence.

use crate::error::Result;
use crate::key::OrderKey;
use crate::types::EntityId;
use std::path::PathBuf;

/// One entry in a part: an order key and the entity indexed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// The value's order-preserving key
    pub key: OrderKey,
    /// The indexed entity
    pub entity: EntityId,
}

impl IndexEntry {
    /// Build an entry
    pub fn new(key: OrderKey, entity: EntityId) -> Self {
        IndexEntry { key, entity }
    }
}

/// Size hint of a bounded scan: exact, or unknown when any contributing
/// part cannot count its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCount {
    /// The scan will yield exactly this many entries
    Exact(u64),
    /// At least one contributor cannot report a count
    Unknown,
}

impl EntryCount {
    /// Aggregate two counts; any unknown operand makes the sum unknown
    pub fn add(self, other: EntryCount) -> EntryCount {
        match (self, other) {
            (EntryCount::Exact(a), EntryCount::Exact(b)) => EntryCount::Exact(a + b),
            _ => EntryCount::Unknown,
        }
    }

    /// The exact count, if known
    pub fn exact(&self) -> Option<u64> {
        match self {
            EntryCount::Exact(n) => Some(*n),
            EntryCount::Unknown => None,
        }
    }
}

/// A bounded, lazy sequence of index entries.
///
/// `size()` is independent of iteration progress and of resource release:
/// a scan whose size short-circuits to unknown still owns its underlying
/// sequences until `close()`.
pub trait EntryScan: Send {
    /// Total entries this scan will yield, or unknown
    fn size(&self) -> EntryCount;

    /// Next entry, or `None` when exhausted
    fn next(&mut self) -> Option<IndexEntry>;

    /// Release underlying resources. Called exactly once.
    fn close(&mut self) -> Result<()>;
}

/// A lazy resource sequence over index files, used for online backup.
pub trait FileScan: Send {
    /// Next file path, or `None` when exhausted
    fn next(&mut self) -> Option<PathBuf>;

    /// Release underlying resources. Called exactly once.
    fn close(&mut self) -> Result<()>;
}
