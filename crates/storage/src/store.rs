//! File-backed single-kind part store.
//!
//! One store owns one part file. The file is an append-only record log;
//! opening replays it into an in-memory ordered map, writes stage in
//! memory and reach the file on `force` (or on `close`), and the dirty
//! flag tracks whether anything is staged or written but not yet behind a
//! durability barrier.
//!
//! The store is internally synchronized and shared through `Arc` by the
//! composite layer. Scans, writers, and file snapshots each hold a lease;
//! leases exist so a leaked sub-sequence is observable instead of silent.

use crate::bootstrap::PartBootstrap;
use crate::config::StoreConfig;
use crate::format::{encode_record, PartHeader, PartRecord, RecordReader, PART_HEADER_SIZE};
use chronidx_core::{
    ConsistencyReporter, ConsistencyViolation, EntityId, EntryCount, EntryScan, FileScan,
    FlushPacing, IndexEntry, IndexError, KeyProbe, OrderKey, PartStorage, PartWrite, PartWriter,
    Result, TemporalKind, UpdateMode,
};
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

type EntitySet = SmallVec<[EntityId; 1]>;
type KeyTree = BTreeMap<OrderKey, EntitySet>;

/// Lifecycle state of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreStatus {
    Open,
    Closed,
    Dropped,
}

struct PartState {
    tree: KeyTree,
    file: Option<File>,
    staged: Vec<u8>,
    dirty: bool,
    status: StoreStatus,
    /// Damage found while replaying the log at open time
    replay_damage: Option<String>,
    /// Total (key, entity) pairs
    entries: u64,
}

/// A lease on a store held by a writer, scan, or file snapshot.
///
/// Released exactly once, on explicit close or as a drop backstop.
struct Lease {
    counter: Arc<AtomicUsize>,
    released: bool,
}

impl Lease {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Lease {
            counter: Arc::clone(counter),
            released: false,
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.counter.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.release();
    }
}

/// File-backed ordered index structure for one temporal kind.
pub struct FilePartStore {
    kind: TemporalKind,
    path: PathBuf,
    index_uuid: Uuid,
    config: StoreConfig,
    state: Arc<RwLock<PartState>>,
    leases: Arc<AtomicUsize>,
}

impl std::fmt::Debug for FilePartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePartStore")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("index_uuid", &self.index_uuid)
            .finish_non_exhaustive()
    }
}

impl FilePartStore {
    /// Bootstrap an empty structure at `path`, then open it.
    ///
    /// The sequence is create empty → mark populated → close the bootstrap
    /// handle → open live, so a crash can never leave an openable but
    /// half-created file.
    pub fn bootstrap(
        path: &Path,
        kind: TemporalKind,
        index_uuid: Uuid,
        config: StoreConfig,
    ) -> Result<Self> {
        let mut bootstrap = PartBootstrap::create_empty(path, kind, index_uuid)?;
        bootstrap.mark_populated()?;
        bootstrap.close()?;
        info!(kind = %kind, path = %path.display(), "created empty part structure");
        Self::open(path, kind, index_uuid, config)
    }

    /// Open an existing part file, replaying its log.
    pub fn open(
        path: &Path,
        kind: TemporalKind,
        index_uuid: Uuid,
        config: StoreConfig,
    ) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| IndexError::unavailable(format!("open {kind} part file"), e))?;
        let mut reader = BufReader::new(file);

        let mut header_bytes = [0u8; PART_HEADER_SIZE];
        reader
            .read_exact(&mut header_bytes)
            .map_err(|e| IndexError::unavailable(format!("read {kind} part header"), e))?;
        let header = PartHeader::from_bytes(&header_bytes);
        header.validate(kind, *index_uuid.as_bytes())?;

        let mut tree = KeyTree::new();
        let mut entries = 0u64;
        let mut replay_damage = None;
        let mut records = RecordReader::new(reader);
        loop {
            match records.read_next() {
                Ok(Some(record)) => {
                    apply_record(&mut tree, &mut entries, record);
                }
                Ok(None) => break,
                Err(e) => {
                    // Keep what replayed cleanly; the damage is surfaced by
                    // the consistency check, not by open
                    warn!(kind = %kind, error = %e, "part log damaged, replay stopped");
                    replay_damage = Some(e.to_string());
                    break;
                }
            }
        }

        let append = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| IndexError::unavailable(format!("open {kind} part for append"), e))?;

        debug!(kind = %kind, entries, path = %path.display(), "opened part store");
        let staging_capacity = config.staging_capacity;
        Ok(FilePartStore {
            kind,
            path: path.to_path_buf(),
            index_uuid,
            config,
            state: Arc::new(RwLock::new(PartState {
                tree,
                file: Some(append),
                staged: Vec::with_capacity(staging_capacity),
                dirty: false,
                status: StoreStatus::Open,
                replay_damage,
                entries,
            })),
            leases: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of live leases (writers, scans, file snapshots).
    ///
    /// Observability hook: a nonzero count after every session closed
    /// means a sub-sequence leaked.
    pub fn active_leases(&self) -> usize {
        self.leases.load(Ordering::SeqCst)
    }

    /// Total (key, entity) pairs currently indexed
    pub fn entry_count(&self) -> u64 {
        self.state.read().entries
    }

    fn check_open(state: &PartState) -> Result<()> {
        match state.status {
            StoreStatus::Open => Ok(()),
            StoreStatus::Closed | StoreStatus::Dropped => Err(IndexError::ClosedAccessor),
        }
    }
}

/// Apply a record to the tree, returning `false` when it was redundant
/// (already-present addition, absent removal).
fn apply_record(tree: &mut KeyTree, entries: &mut u64, record: PartRecord) -> bool {
    match record {
        PartRecord::Add { key, entity } => add_entry(tree, entries, key, entity),
        PartRecord::Remove { key, entity } => remove_entry(tree, entries, &key, entity),
        PartRecord::Change {
            before,
            after,
            entity,
        } => {
            let removed = remove_entry(tree, entries, &before, entity);
            let added = add_entry(tree, entries, after, entity);
            removed && added
        }
    }
}

fn add_entry(tree: &mut KeyTree, entries: &mut u64, key: OrderKey, entity: EntityId) -> bool {
    let set = tree.entry(key).or_default();
    if set.contains(&entity) {
        return false;
    }
    set.push(entity);
    *entries += 1;
    true
}

fn remove_entry(tree: &mut KeyTree, entries: &mut u64, key: &OrderKey, entity: EntityId) -> bool {
    let emptied = {
        let Some(set) = tree.get_mut(key) else {
            return false;
        };
        let Some(pos) = set.iter().position(|e| *e == entity) else {
            return false;
        };
        set.remove(pos);
        set.is_empty()
    };
    *entries -= 1;
    if emptied {
        tree.remove(key);
    }
    true
}

/// An inverted or empty range must yield nothing instead of panicking in
/// `BTreeMap::range`.
fn range_is_searchable(lower: &Bound<OrderKey>, upper: &Bound<OrderKey>) -> bool {
    match (lower, upper) {
        (Bound::Included(lo), Bound::Included(hi)) => lo <= hi,
        (Bound::Included(lo), Bound::Excluded(hi)) => lo < hi,
        (Bound::Excluded(lo), Bound::Included(hi)) => lo < hi,
        (Bound::Excluded(lo), Bound::Excluded(hi)) => lo < hi,
        _ => true,
    }
}

impl PartStorage for FilePartStore {
    fn kind(&self) -> TemporalKind {
        self.kind
    }

    fn begin_write(&self, mode: UpdateMode) -> Result<Box<dyn PartWriter>> {
        let state = self.state.read();
        Self::check_open(&state)?;
        drop(state);
        Ok(Box::new(FilePartWriter {
            kind: self.kind,
            state: Arc::clone(&self.state),
            lease: Lease::acquire(&self.leases),
            mode,
            closed: false,
        }))
    }

    fn read(&self, probe: &KeyProbe) -> Result<Vec<IndexEntry>> {
        let state = self.state.read();
        Self::check_open(&state)?;
        let mut out = Vec::new();
        match probe {
            KeyProbe::Exact(key) => {
                if let Some(set) = state.tree.get(key) {
                    out.extend(
                        set.iter()
                            .map(|&entity| IndexEntry::new(key.clone(), entity)),
                    );
                }
            }
            KeyProbe::Range { lower, upper } => {
                if range_is_searchable(lower, upper) {
                    for (key, set) in state.tree.range((lower.clone(), upper.clone())) {
                        out.extend(
                            set.iter()
                                .map(|&entity| IndexEntry::new(key.clone(), entity)),
                        );
                    }
                }
            }
            KeyProbe::All => {
                for (key, set) in state.tree.iter() {
                    out.extend(
                        set.iter()
                            .map(|&entity| IndexEntry::new(key.clone(), entity)),
                    );
                }
            }
        }
        Ok(out)
    }

    fn entry_scan(&self) -> Result<Box<dyn EntryScan>> {
        let state = self.state.read();
        Self::check_open(&state)?;
        let size = EntryCount::Exact(state.entries);
        drop(state);
        Ok(Box::new(PartEntryScan {
            state: Arc::clone(&self.state),
            size,
            batch: None,
            lease: Lease::acquire(&self.leases),
            closed: false,
        }))
    }

    fn snapshot_files(&self) -> Result<Box<dyn FileScan>> {
        let state = self.state.read();
        Self::check_open(&state)?;
        drop(state);
        Ok(Box::new(PartFileScan {
            files: vec![self.path.clone()].into_iter(),
            lease: Lease::acquire(&self.leases),
            closed: false,
        }))
    }

    fn force(&self, pacing: FlushPacing) -> Result<()> {
        let mut state = self.state.write();
        Self::check_open(&state)?;
        if state.staged.is_empty() && !state.dirty {
            return Ok(());
        }

        let kind = self.kind;
        let staged = std::mem::take(&mut state.staged);
        let result = match state.file.as_mut() {
            Some(file) => flush_staged(file, &staged, pacing)
                .map_err(|e| IndexError::unavailable(format!("force {kind} part"), e)),
            None => Err(IndexError::ClosedAccessor),
        };
        match result {
            Ok(()) => {
                debug!(kind = %kind, bytes = staged.len(), "part forced");
                state.dirty = false;
                Ok(())
            }
            Err(e) => {
                // The backlog stays staged so a later force can retry
                state.staged = staged;
                Err(e)
            }
        }
    }

    fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }

    fn consistency_check(&self, reporter: &dyn ConsistencyReporter) -> Result<bool> {
        let state = self.state.read();
        Self::check_open(&state)?;
        let mut consistent = true;

        if let Some(damage) = &state.replay_damage {
            reporter.report(ConsistencyViolation::new(
                self.kind,
                format!("log damage found at open: {damage}"),
            ));
            consistent = false;
        }

        // Rebuild the structure from what is durable plus what is staged;
        // the in-memory tree must match exactly
        match self.replay_for_check(&state.staged, state.replay_damage.is_some()) {
            Ok((scratch, scratch_entries)) => {
                if scratch != state.tree {
                    reporter.report(ConsistencyViolation::new(
                        self.kind,
                        "in-memory structure diverges from log replay",
                    ));
                    consistent = false;
                }
                if scratch_entries != state.entries {
                    reporter.report(ConsistencyViolation::new(
                        self.kind,
                        format!(
                            "entry counter {} does not match replayed count {}",
                            state.entries, scratch_entries
                        ),
                    ));
                    consistent = false;
                }
            }
            Err(e) => {
                reporter.report(ConsistencyViolation::new(
                    self.kind,
                    format!("log unreadable: {e}"),
                ));
                consistent = false;
            }
        }

        if self.config.unique {
            for set in state.tree.values() {
                if set.len() > 1 {
                    reporter.report(ConsistencyViolation::new(
                        self.kind,
                        format!("{} entities indexed under one value in a unique index", set.len()),
                    ));
                    consistent = false;
                }
            }
        }

        Ok(consistent)
    }

    fn drop_storage(&self) -> Result<()> {
        let mut state = self.state.write();
        Self::check_open(&state)?;
        state.status = StoreStatus::Dropped;
        state.file = None;
        state.staged.clear();
        state.dirty = false;
        std::fs::remove_file(&self.path)
            .map_err(|e| IndexError::unavailable(format!("drop {} part file", self.kind), e))?;
        info!(kind = %self.kind, path = %self.path.display(), "dropped part storage");
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.write();
        Self::check_open(&state)?;

        // Staged records still reach the file: close checkpoints like a
        // final unpaced force
        let staged = std::mem::take(&mut state.staged);
        if let Some(file) = state.file.as_mut() {
            if !staged.is_empty() {
                if let Err(e) = flush_staged(file, &staged, FlushPacing::Unlimited) {
                    state.staged = staged;
                    return Err(IndexError::unavailable(
                        format!("flush {} part on close", self.kind),
                        e,
                    ));
                }
            }
        }
        state.file = None;
        state.dirty = false;
        state.status = StoreStatus::Closed;
        debug!(kind = %self.kind, "closed part store");
        Ok(())
    }
}

fn flush_staged(file: &mut File, staged: &[u8], pacing: FlushPacing) -> std::io::Result<()> {
    match pacing.chunk_bytes() {
        None => {
            file.write_all(staged)?;
            file.sync_data()
        }
        Some(chunk) => {
            for piece in staged.chunks(chunk) {
                file.write_all(piece)?;
                file.sync_data()?;
            }
            Ok(())
        }
    }
}

impl FilePartStore {
    /// Replay the on-disk log plus the staged backlog into a scratch tree.
    ///
    /// `stop_at_damage` mirrors what open did: when open already recorded
    /// log damage, replay stops at the same point instead of failing.
    fn replay_for_check(&self, staged: &[u8], stop_at_damage: bool) -> Result<(KeyTree, u64)> {
        let file = File::open(&self.path)
            .map_err(|e| IndexError::unavailable(format!("reopen {} part", self.kind), e))?;
        let mut reader = BufReader::new(file);
        let mut header_bytes = [0u8; PART_HEADER_SIZE];
        reader
            .read_exact(&mut header_bytes)
            .map_err(|e| IndexError::unavailable(format!("reread {} header", self.kind), e))?;
        let header = PartHeader::from_bytes(&header_bytes);
        header.validate(self.kind, *self.index_uuid.as_bytes())?;

        let mut scratch = KeyTree::new();
        let mut entries = 0u64;
        let mut records = RecordReader::new(reader);
        loop {
            match records.read_next() {
                Ok(Some(record)) => {
                    apply_record(&mut scratch, &mut entries, record);
                }
                Ok(None) => break,
                // Damage past what open saw is reported by the caller; stop
                // replay at the same point open would
                Err(_) if stop_at_damage => break,
                Err(e) => return Err(e),
            }
        }

        let mut staged_records = RecordReader::new(std::io::Cursor::new(staged));
        while let Some(record) = staged_records.read_next()? {
            apply_record(&mut scratch, &mut entries, record);
        }
        Ok((scratch, entries))
    }
}

/// Writer into one part, holding a lease for its lifetime.
struct FilePartWriter {
    kind: TemporalKind,
    state: Arc<RwLock<PartState>>,
    lease: Lease,
    mode: UpdateMode,
    closed: bool,
}

impl PartWriter for FilePartWriter {
    fn apply(&mut self, op: PartWrite) -> Result<()> {
        if self.closed {
            return Err(IndexError::ClosedAccessor);
        }
        let mut state = self.state.write();
        FilePartStore::check_open(&state)?;

        let record = PartRecord::from(op);
        let frame = encode_record(&record)?;
        let applied = {
            let PartState { tree, entries, .. } = &mut *state;
            apply_record(tree, entries, record)
        };
        if !applied && !self.mode.tolerates_replay() {
            warn!(kind = %self.kind, "redundant online write absorbed");
        }
        state.staged.extend_from_slice(&frame);
        state.dirty = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(IndexError::ClosedAccessor);
        }
        self.closed = true;
        self.lease.release();
        Ok(())
    }
}

/// Bounded full scan over one part.
///
/// The part's entries materialize on first `next()`, never at creation,
/// so a composite scan over many parts holds at most one part's working
/// set plus its own cursor.
struct PartEntryScan {
    state: Arc<RwLock<PartState>>,
    size: EntryCount,
    batch: Option<std::vec::IntoIter<IndexEntry>>,
    lease: Lease,
    closed: bool,
}

impl EntryScan for PartEntryScan {
    fn size(&self) -> EntryCount {
        self.size
    }

    fn next(&mut self) -> Option<IndexEntry> {
        if self.closed {
            return None;
        }
        if self.batch.is_none() {
            let state = self.state.read();
            let entries: Vec<IndexEntry> = if state.status == StoreStatus::Open {
                state
                    .tree
                    .iter()
                    .flat_map(|(key, set)| {
                        set.iter()
                            .map(|&entity| IndexEntry::new(key.clone(), entity))
                            .collect::<Vec<_>>()
                    })
                    .collect()
            } else {
                Vec::new()
            };
            self.batch = Some(entries.into_iter());
        }
        self.batch.as_mut().and_then(|batch| batch.next())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.batch = None;
            self.lease.release();
        }
        Ok(())
    }
}

/// File inventory sequence for one part.
struct PartFileScan {
    files: std::vec::IntoIter<PathBuf>,
    lease: Lease,
    closed: bool,
}

impl FileScan for PartFileScan {
    fn next(&mut self) -> Option<PathBuf> {
        if self.closed {
            return None;
        }
        self.files.next()
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.lease.release();
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
