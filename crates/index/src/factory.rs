//! File-backed part factory
//!
//! Bridges the registry to `chronidx-storage`. A never-touched kind goes
//! through the bootstrap sequence (create empty, mark populated, close the
//! bootstrap handle) before opening; a previously-populated kind opens
//! directly. Both paths end in an open part, so the two cases stay
//! symmetric for everything above.

use crate::files::PartitionLayout;
use crate::registry::PartFactory;
use chronidx_core::{IndexDescriptor, PartStorage, Result, TemporalKind};
use chronidx_storage::{FilePartStore, StoreConfig};
use std::sync::Arc;

/// Builds file-backed parts under one index directory.
pub struct FilePartFactory {
    layout: PartitionLayout,
    descriptor: IndexDescriptor,
    config: StoreConfig,
}

impl FilePartFactory {
    /// Factory for the index described by `descriptor`, rooted at `layout`
    pub fn new(layout: PartitionLayout, descriptor: IndexDescriptor, config: StoreConfig) -> Self {
        let config = config.with_unique(descriptor.unique);
        FilePartFactory {
            layout,
            descriptor,
            config,
        }
    }
}

impl PartFactory for FilePartFactory {
    fn create(&self, kind: TemporalKind) -> Result<Arc<dyn PartStorage>> {
        let path = self.layout.part_path(kind);
        let store = if path.exists() {
            FilePartStore::open(&path, kind, self.descriptor.index_uuid, self.config.clone())?
        } else {
            FilePartStore::bootstrap(&path, kind, self.descriptor.index_uuid, self.config.clone())?
        };
        Ok(Arc::new(store))
    }
}
