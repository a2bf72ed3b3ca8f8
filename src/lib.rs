//! chronidx - Embedded partitioned temporal index engine
//!
//! chronidx implements a logical index over values whose runtime type
//! varies across six temporal kinds (date, local/zoned date-time,
//! local/zoned time, duration). Each kind is backed by its own single-kind
//! ordered structure on disk; the composite layer routes writes by value
//! kind, fans aggregate reads out over the live parts, and exposes the
//! standard index-accessor contract so the engine cannot tell a composite
//! index from a simple one.
//!
//! # Quick Start
//!
//! ```ignore
//! use chronidx::{
//!     CompositeIndexAccessor, IndexAccessor, IndexDescriptor, IndexUpdate,
//!     EntityId, StoreConfig, TemporalValue, UpdateMode,
//! };
//!
//! let descriptor = IndexDescriptor::new(1, false);
//! let accessor = CompositeIndexAccessor::open(descriptor, dir, StoreConfig::default())?;
//!
//! let mut updater = accessor.new_updater(UpdateMode::Online)?;
//! updater.apply(IndexUpdate::added(EntityId(1), TemporalValue::date(today)))?;
//! updater.close()?;
//! ```
//!
//! # Architecture
//!
//! - `chronidx-core`: kinds, values, order keys, the accessor contract
//! - `chronidx-storage`: the file-backed single-kind part store
//! - `chronidx-index`: registry, factory, and the composite
//!   accessor/updater/reader

// Re-export the public API
pub use chronidx_core::{
    CollectingReporter, ConsistencyReporter, ConsistencyViolation, EntityId, EntryCount,
    EntryScan, FileScan, FlushPacing, IndexAccessor, IndexDescriptor, IndexEntry, IndexError,
    IndexReader, IndexUpdate, IndexUpdater, IndexValue, KeyProbe, OrderKey, PartStorage,
    PartWrite, PartWriter, Result, ResultOrdering, TemporalKind, TemporalValue, UpdateMode,
    ValuePredicate,
};
pub use chronidx_index::{
    CompositeIndexAccessor, CompositeIndexReader, CompositeIndexUpdater, Part, PartFactory,
    PartRegistry, PartitionLayout,
};
pub use chronidx_storage::{FilePartStore, PartBootstrap, StoreConfig};
