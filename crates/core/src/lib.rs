//! Core types and traits for chronidx
//!
//! This crate defines the foundational types used throughout the engine:
//! - TemporalKind: the six partition kinds the index splits by
//! - TemporalValue / IndexValue: normalized temporal values and the
//!   supported/unsupported split the engine hands to the index
//! - OrderKey: order-preserving binary keys within one part
//! - EntityId / IndexDescriptor: identity types
//! - IndexError: error type hierarchy
//! - contract: the engine-facing accessor contract and the part-storage
//!   collaborator traits

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
pub mod contract;
pub mod error;
pub mod key;
pub mod kind;
pub mod types;
pub mod value;

// Re-export commonly used types and traits
pub use error::{IndexError, Result};
pub use key::OrderKey;
pub use kind::TemporalKind;
pub use types::{EntityId, IndexDescriptor};
pub use value::{IndexValue, TemporalValue};

// Re-export contract types at crate root for convenience
pub use contract::{
    CollectingReporter, ConsistencyReporter, ConsistencyViolation, EntryCount, EntryScan,
    FileScan, FlushPacing, IndexAccessor, IndexEntry, IndexReader, IndexUpdate, IndexUpdater,
    KeyProbe, PartStorage, PartWrite, PartWriter, ResultOrdering, UpdateMode, ValuePredicate,
};
