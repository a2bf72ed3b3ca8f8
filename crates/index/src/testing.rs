//! In-memory part storage doubles for tests
//!
//! The composite layer's fan-out semantics (best-effort shutdown,
//! first-failure propagation, unknown counts, leaked sub-sequences) are
//! awkward to provoke with real files. [`MemoryPartFactory`] builds
//! in-memory parts with injectable failures, and its [`FactoryProbe`]
//! counts every lifecycle call so tests can assert exactly-once behavior.

use crate::registry::PartFactory;
use chronidx_core::{
    ConsistencyReporter, ConsistencyViolation, EntityId, EntryCount, EntryScan, FileScan,
    FlushPacing, IndexEntry, IndexError, KeyProbe, OrderKey, PartStorage, PartWrite, PartWriter,
    Result, TemporalKind, UpdateMode,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn injected(context: &str) -> IndexError {
    IndexError::unavailable(
        context.to_string(),
        std::io::Error::new(std::io::ErrorKind::Other, "injected failure"),
    )
}

/// Per-kind lifecycle counters shared between a factory and its test.
#[derive(Debug, Default)]
pub struct FactoryProbe {
    created: Mutex<Vec<TemporalKind>>,
    close_calls: [AtomicUsize; 6],
    drop_calls: [AtomicUsize; 6],
    force_calls: [AtomicUsize; 6],
    scan_close_calls: [AtomicUsize; 6],
    file_scan_close_calls: [AtomicUsize; 6],
    writer_close_calls: [AtomicUsize; 6],
}

impl FactoryProbe {
    /// Kinds materialized so far, in creation order
    pub fn created_kinds(&self) -> Vec<TemporalKind> {
        self.created.lock().clone()
    }

    /// Times `close` was called on the kind's part
    pub fn close_calls(&self, kind: TemporalKind) -> usize {
        self.close_calls[kind.ordinal()].load(Ordering::SeqCst)
    }

    /// Times `drop_storage` was called on the kind's part
    pub fn drop_calls(&self, kind: TemporalKind) -> usize {
        self.drop_calls[kind.ordinal()].load(Ordering::SeqCst)
    }

    /// Times `force` was called on the kind's part
    pub fn force_calls(&self, kind: TemporalKind) -> usize {
        self.force_calls[kind.ordinal()].load(Ordering::SeqCst)
    }

    /// Times an entry scan of the kind's part was closed
    pub fn scan_close_calls(&self, kind: TemporalKind) -> usize {
        self.scan_close_calls[kind.ordinal()].load(Ordering::SeqCst)
    }

    /// Times a file scan of the kind's part was closed
    pub fn file_scan_close_calls(&self, kind: TemporalKind) -> usize {
        self.file_scan_close_calls[kind.ordinal()].load(Ordering::SeqCst)
    }

    /// Times a writer into the kind's part was closed
    pub fn writer_close_calls(&self, kind: TemporalKind) -> usize {
        self.writer_close_calls[kind.ordinal()].load(Ordering::SeqCst)
    }
}

/// Injectable behavior for one kind's part
#[derive(Debug, Clone, Default)]
struct Behavior {
    fail_create: bool,
    fail_close: bool,
    fail_force: bool,
    fail_drop: bool,
    fail_scan_close: bool,
    fail_writer_close: bool,
    unknown_count: bool,
    violation: Option<String>,
}

/// Factory building in-memory parts with injectable failures.
#[derive(Default)]
pub struct MemoryPartFactory {
    probe: Arc<FactoryProbe>,
    behaviors: [Behavior; 6],
    create_delay: Option<Duration>,
}

impl MemoryPartFactory {
    /// Factory with no injected failures
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared lifecycle probe
    pub fn probe(&self) -> Arc<FactoryProbe> {
        Arc::clone(&self.probe)
    }

    /// Make `create` fail for the kind
    pub fn failing_create(mut self, kind: TemporalKind) -> Self {
        self.behaviors[kind.ordinal()].fail_create = true;
        self
    }

    /// Make the kind's part fail on `close`
    pub fn failing_close(mut self, kind: TemporalKind) -> Self {
        self.behaviors[kind.ordinal()].fail_close = true;
        self
    }

    /// Make the kind's part fail on `force`
    pub fn failing_force(mut self, kind: TemporalKind) -> Self {
        self.behaviors[kind.ordinal()].fail_force = true;
        self
    }

    /// Make the kind's part fail on `drop_storage`
    pub fn failing_drop(mut self, kind: TemporalKind) -> Self {
        self.behaviors[kind.ordinal()].fail_drop = true;
        self
    }

    /// Make scans of the kind's part fail on `close`
    pub fn failing_scan_close(mut self, kind: TemporalKind) -> Self {
        self.behaviors[kind.ordinal()].fail_scan_close = true;
        self
    }

    /// Make writers into the kind's part fail on `close`
    pub fn failing_writer_close(mut self, kind: TemporalKind) -> Self {
        self.behaviors[kind.ordinal()].fail_writer_close = true;
        self
    }

    /// Make the kind's part report an unknown entry count
    pub fn unknown_count(mut self, kind: TemporalKind) -> Self {
        self.behaviors[kind.ordinal()].unknown_count = true;
        self
    }

    /// Make the kind's part report a consistency violation
    pub fn with_violation(mut self, kind: TemporalKind, detail: &str) -> Self {
        self.behaviors[kind.ordinal()].violation = Some(detail.to_string());
        self
    }

    /// Sleep inside `create` to widen bootstrap race windows
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }
}

impl PartFactory for MemoryPartFactory {
    fn create(&self, kind: TemporalKind) -> Result<Arc<dyn PartStorage>> {
        let behavior = self.behaviors[kind.ordinal()].clone();
        if behavior.fail_create {
            return Err(injected("create part"));
        }
        if let Some(delay) = self.create_delay {
            std::thread::sleep(delay);
        }
        self.probe.created.lock().push(kind);
        Ok(Arc::new(MemoryPartStore {
            kind,
            behavior,
            probe: Arc::clone(&self.probe),
            state: Arc::new(Mutex::new(MemState {
                tree: BTreeMap::new(),
                dirty: false,
                open: true,
            })),
        }))
    }
}

struct MemState {
    tree: BTreeMap<OrderKey, Vec<EntityId>>,
    dirty: bool,
    open: bool,
}

impl MemState {
    fn pairs(&self) -> u64 {
        self.tree.values().map(|set| set.len() as u64).sum()
    }

    fn entries(&self) -> Vec<IndexEntry> {
        self.tree
            .iter()
            .flat_map(|(key, set)| {
                set.iter()
                    .map(|&entity| IndexEntry::new(key.clone(), entity))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// In-memory part storage with injectable failures.
pub struct MemoryPartStore {
    kind: TemporalKind,
    behavior: Behavior,
    probe: Arc<FactoryProbe>,
    state: Arc<Mutex<MemState>>,
}

impl PartStorage for MemoryPartStore {
    fn kind(&self) -> TemporalKind {
        self.kind
    }

    fn begin_write(&self, _mode: UpdateMode) -> Result<Box<dyn PartWriter>> {
        if !self.state.lock().open {
            return Err(IndexError::ClosedAccessor);
        }
        Ok(Box::new(MemoryPartWriter {
            kind: self.kind,
            fail_close: self.behavior.fail_writer_close,
            probe: Arc::clone(&self.probe),
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }

    fn read(&self, probe: &KeyProbe) -> Result<Vec<IndexEntry>> {
        let state = self.state.lock();
        if !state.open {
            return Err(IndexError::ClosedAccessor);
        }
        let mut out = Vec::new();
        match probe {
            KeyProbe::Exact(key) => {
                if let Some(set) = state.tree.get(key) {
                    out.extend(set.iter().map(|&e| IndexEntry::new(key.clone(), e)));
                }
            }
            KeyProbe::Range { lower, upper } => {
                let searchable = match (lower, upper) {
                    (Bound::Included(lo), Bound::Included(hi)) => lo <= hi,
                    (Bound::Included(lo), Bound::Excluded(hi))
                    | (Bound::Excluded(lo), Bound::Included(hi))
                    | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo < hi,
                    _ => true,
                };
                if searchable {
                    for (key, set) in state.tree.range((lower.clone(), upper.clone())) {
                        out.extend(set.iter().map(|&e| IndexEntry::new(key.clone(), e)));
                    }
                }
            }
            KeyProbe::All => out.extend(state.entries()),
        }
        Ok(out)
    }

    fn entry_scan(&self) -> Result<Box<dyn EntryScan>> {
        let state = self.state.lock();
        if !state.open {
            return Err(IndexError::ClosedAccessor);
        }
        let size = if self.behavior.unknown_count {
            EntryCount::Unknown
        } else {
            EntryCount::Exact(state.pairs())
        };
        Ok(Box::new(MemoryEntryScan {
            kind: self.kind,
            entries: state.entries().into_iter(),
            size,
            fail_close: self.behavior.fail_scan_close,
            probe: Arc::clone(&self.probe),
            closed: false,
        }))
    }

    fn snapshot_files(&self) -> Result<Box<dyn FileScan>> {
        if !self.state.lock().open {
            return Err(IndexError::ClosedAccessor);
        }
        let path = PathBuf::from(format!("/mem/{}.part", self.kind.file_stem()));
        Ok(Box::new(MemoryFileScan {
            kind: self.kind,
            files: vec![path].into_iter(),
            fail_close: self.behavior.fail_scan_close,
            probe: Arc::clone(&self.probe),
            closed: false,
        }))
    }

    fn force(&self, _pacing: FlushPacing) -> Result<()> {
        self.probe.force_calls[self.kind.ordinal()].fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if !state.open {
            return Err(IndexError::ClosedAccessor);
        }
        if self.behavior.fail_force {
            return Err(injected("force part"));
        }
        state.dirty = false;
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    fn consistency_check(&self, reporter: &dyn ConsistencyReporter) -> Result<bool> {
        if !self.state.lock().open {
            return Err(IndexError::ClosedAccessor);
        }
        match &self.behavior.violation {
            Some(detail) => {
                reporter.report(ConsistencyViolation::new(self.kind, detail.clone()));
                Ok(false)
            }
            None => Ok(true),
        }
    }

    fn drop_storage(&self) -> Result<()> {
        self.probe.drop_calls[self.kind.ordinal()].fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if !state.open {
            return Err(IndexError::ClosedAccessor);
        }
        state.open = false;
        if self.behavior.fail_drop {
            return Err(injected("drop part"));
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.probe.close_calls[self.kind.ordinal()].fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if !state.open {
            return Err(IndexError::ClosedAccessor);
        }
        state.open = false;
        if self.behavior.fail_close {
            return Err(injected("close part"));
        }
        Ok(())
    }
}

struct MemoryPartWriter {
    kind: TemporalKind,
    fail_close: bool,
    probe: Arc<FactoryProbe>,
    state: Arc<Mutex<MemState>>,
    closed: bool,
}

impl PartWriter for MemoryPartWriter {
    fn apply(&mut self, op: PartWrite) -> Result<()> {
        if self.closed {
            return Err(IndexError::ClosedAccessor);
        }
        let mut state = self.state.lock();
        if !state.open {
            return Err(IndexError::ClosedAccessor);
        }
        match op {
            PartWrite::Add { key, entity } => {
                let set = state.tree.entry(key).or_default();
                if !set.contains(&entity) {
                    set.push(entity);
                }
            }
            PartWrite::Remove { key, entity } => {
                let emptied = match state.tree.get_mut(&key) {
                    Some(set) => {
                        set.retain(|e| *e != entity);
                        set.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    state.tree.remove(&key);
                }
            }
            PartWrite::Change {
                before,
                after,
                entity,
            } => {
                let emptied = match state.tree.get_mut(&before) {
                    Some(set) => {
                        set.retain(|e| *e != entity);
                        set.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    state.tree.remove(&before);
                }
                let set = state.tree.entry(after).or_default();
                if !set.contains(&entity) {
                    set.push(entity);
                }
            }
        }
        state.dirty = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(IndexError::ClosedAccessor);
        }
        self.closed = true;
        self.probe.writer_close_calls[self.kind.ordinal()].fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(injected("close part writer"));
        }
        Ok(())
    }
}

struct MemoryEntryScan {
    kind: TemporalKind,
    entries: std::vec::IntoIter<IndexEntry>,
    size: EntryCount,
    fail_close: bool,
    probe: Arc<FactoryProbe>,
    closed: bool,
}

impl EntryScan for MemoryEntryScan {
    fn size(&self) -> EntryCount {
        self.size
    }

    fn next(&mut self) -> Option<IndexEntry> {
        if self.closed {
            return None;
        }
        self.entries.next()
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.probe.scan_close_calls[self.kind.ordinal()].fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(injected("close entry scan"));
        }
        Ok(())
    }
}

struct MemoryFileScan {
    kind: TemporalKind,
    files: std::vec::IntoIter<PathBuf>,
    fail_close: bool,
    probe: Arc<FactoryProbe>,
    closed: bool,
}

impl FileScan for MemoryFileScan {
    fn next(&mut self) -> Option<PathBuf> {
        if self.closed {
            return None;
        }
        self.files.next()
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.probe.file_scan_close_calls[self.kind.ordinal()].fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(injected("close file scan"));
        }
        Ok(())
    }
}
