//! The index engine contract
//!
//! Everything the surrounding storage engine sees of an index lives here:
//! the accessor/updater/reader traits, the part-storage collaborator
//! traits, predicates, update records, scan resources, flush pacing, and
//! consistency reporting. A composite index and a single-kind index expose
//! the identical shape, so the engine cannot tell them apart.

mod accessor;
mod pacing;
mod predicate;
mod reporter;
mod scan;
mod storage;
mod update;

pub use accessor::{IndexAccessor, IndexReader, IndexUpdater};
pub use pacing::FlushPacing;
pub use predicate::{KeyProbe, ResultOrdering, ValuePredicate};
pub use reporter::{CollectingReporter, ConsistencyReporter, ConsistencyViolation};
pub use scan::{EntryCount, EntryScan, FileScan, IndexEntry};
pub use storage::{PartStorage, PartWriter};
pub use update::{IndexUpdate, PartWrite, UpdateMode};
