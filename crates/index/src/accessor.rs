//! Composite index accessor
//!
//! The engine-facing face of the partitioned index. Owns the part
//! registry, fans every aggregate operation out over the live-parts
//! snapshot, and aggregates results so the index looks exactly like a
//! single-kind accessor from above.
//!
//! Fan-out policy everywhere: every part is attempted regardless of
//! earlier failures, and the first failure is the one re-raised after all
//! attempts complete.

use crate::factory::FilePartFactory;
use crate::files::PartitionLayout;
use crate::reader::CompositeIndexReader;
use crate::registry::{PartFactory, PartRegistry};
use crate::scan::{CompositeEntryScan, CompositeFileScan};
use crate::updater::CompositeIndexUpdater;
use chronidx_core::{
    ConsistencyReporter, EntryScan, FileScan, FlushPacing, IndexAccessor, IndexDescriptor,
    IndexError, IndexReader, IndexUpdater, PartStorage, Result, UpdateMode,
};
use chronidx_storage::StoreConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// The logical index presented to the engine, backed by zero-to-six parts.
pub struct CompositeIndexAccessor {
    descriptor: IndexDescriptor,
    registry: Arc<PartRegistry>,
}

impl std::fmt::Debug for CompositeIndexAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeIndexAccessor")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl CompositeIndexAccessor {
    /// Open the index at `dir`, materializing every part whose file
    /// already exists on disk.
    pub fn open(descriptor: IndexDescriptor, dir: &Path, config: StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| IndexError::unavailable("create index directory", e))?;

        let layout = PartitionLayout::new(dir);
        let existing = layout.existing_kinds();
        let factory = FilePartFactory::new(layout, descriptor.clone(), config);
        let accessor = Self::with_factory(descriptor, Box::new(factory));

        for kind in &existing {
            accessor.registry.get_or_create(*kind)?;
        }
        info!(
            index_id = accessor.descriptor.index_id,
            parts = existing.len(),
            "opened composite index accessor"
        );
        Ok(accessor)
    }

    /// Accessor over an arbitrary part factory (used by tests to inject
    /// in-memory parts)
    pub fn with_factory(descriptor: IndexDescriptor, factory: Box<dyn PartFactory>) -> Self {
        CompositeIndexAccessor {
            descriptor,
            registry: Arc::new(PartRegistry::new(factory)),
        }
    }

    /// The index's descriptor
    pub fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    fn fail_if_closed(&self) -> Result<()> {
        if self.registry.is_closed() {
            return Err(IndexError::ClosedAccessor);
        }
        Ok(())
    }
}

impl IndexAccessor for CompositeIndexAccessor {
    fn drop_index(&self) -> Result<()> {
        info!(index_id = self.descriptor.index_id, "dropping composite index");
        self.registry.drop_all()
    }

    fn new_updater(&self, mode: UpdateMode) -> Result<Box<dyn IndexUpdater>> {
        self.fail_if_closed()?;
        Ok(Box::new(CompositeIndexUpdater::new(
            Arc::clone(&self.registry),
            mode,
        )))
    }

    fn force(&self, pacing: FlushPacing) -> Result<()> {
        self.fail_if_closed()?;
        let mut first_failure = None;
        for part in self.registry.snapshot() {
            if let Err(e) = part.storage().force(pacing) {
                first_failure.get_or_insert(e);
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn refresh(&self) -> Result<()> {
        // Parts manage their own read snapshots
        Ok(())
    }

    fn close(&self) -> Result<()> {
        match self.registry.close_all() {
            // Absorb the second close; later operations still fail with
            // ClosedAccessor individually
            Err(IndexError::ClosedAccessor) => {
                debug!(index_id = self.descriptor.index_id, "accessor already closed");
                Ok(())
            }
            other => other,
        }
    }

    fn new_reader(&self) -> Result<Box<dyn IndexReader>> {
        self.fail_if_closed()?;
        Ok(Box::new(CompositeIndexReader::new(
            self.registry.snapshot(),
            self.descriptor.unique,
        )))
    }

    fn entry_scan(&self) -> Result<Box<dyn EntryScan>> {
        self.fail_if_closed()?;
        let parts = self.registry.snapshot();
        let mut scans: Vec<Box<dyn EntryScan>> = Vec::with_capacity(parts.len());
        for part in &parts {
            match part.storage().entry_scan() {
                Ok(scan) => scans.push(scan),
                Err(e) => {
                    // Acquisition failed mid-way: the scans already opened
                    // must not leak
                    for mut scan in scans {
                        let _ = scan.close();
                    }
                    return Err(e);
                }
            }
        }
        Ok(Box::new(CompositeEntryScan::new(scans)))
    }

    fn snapshot_files(&self) -> Result<Box<dyn FileScan>> {
        self.fail_if_closed()?;
        let parts = self.registry.snapshot();
        let mut scans: Vec<Box<dyn FileScan>> = Vec::with_capacity(parts.len());
        for part in &parts {
            match part.storage().snapshot_files() {
                Ok(scan) => scans.push(scan),
                Err(e) => {
                    for mut scan in scans {
                        let _ = scan.close();
                    }
                    return Err(e);
                }
            }
        }
        Ok(Box::new(CompositeFileScan::new(scans)))
    }

    fn is_dirty(&self) -> bool {
        self.registry
            .snapshot()
            .iter()
            .any(|part| part.storage().is_dirty())
    }

    fn consistency_check(&self, reporter: &dyn ConsistencyReporter) -> Result<bool> {
        self.fail_if_closed()?;
        let mut all_consistent = true;
        let mut first_failure = None;
        for part in self.registry.snapshot() {
            // Keep checking the remaining parts so the sink accumulates
            // every violation, not just the first
            match part.storage().consistency_check(reporter) {
                Ok(consistent) => all_consistent &= consistent,
                Err(e) => {
                    first_failure.get_or_insert(e);
                }
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(all_consistent),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
