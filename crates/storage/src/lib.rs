//! Single-kind part storage for chronidx
//!
//! This crate implements the storage collaborator the composite layer
//! fans out to:
//! - FilePartStore: one file-backed ordered structure per temporal kind
//! - PartBootstrap: the create-empty / mark-populated / close sequence for
//!   never-touched kinds
//! - The on-disk format: a 24-byte identity header followed by CRC-framed
//!   append-only records
//!
//! The structure itself stays deliberately simple — an append log replayed
//! into an in-memory ordered map. The composite layer above never depends
//! on anything here beyond the `PartStorage` trait.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod config;
pub mod format;
pub mod store;

pub use bootstrap::PartBootstrap;
pub use config::StoreConfig;
pub use format::{PartHeader, PartRecord, RecordReader, PART_FORMAT_VERSION, PART_MAGIC};
pub use store::FilePartStore;
