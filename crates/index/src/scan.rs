//! Composite fan-out sequences
//!
//! Aggregates per-part scans into one engine-facing sequence. Two rules
//! hold throughout:
//! - size computation and resource release are independent concerns: a
//!   size that short-circuits to unknown must never skip releasing an
//!   already-opened per-part sub-sequence;
//! - closing is best-effort across every sub-sequence, with the first
//!   failure retained and re-raised after the rest are released, so one
//!   damaged part cannot hide a leak in another.

use chronidx_core::{EntryCount, EntryScan, FileScan, IndexEntry, Result};
use std::path::PathBuf;

/// Close a set of resources best-effort, returning the first failure
/// after every close has been attempted.
fn close_all<T, F>(items: &mut [T], mut close: F) -> Result<()>
where
    F: FnMut(&mut T) -> Result<()>,
{
    let mut first_failure = None;
    for item in items.iter_mut() {
        if let Err(e) = close(item) {
            first_failure.get_or_insert(e);
        }
    }
    match first_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Every live part's entries, concatenated in kind order.
///
/// Iteration is lazy across parts: at most one part's sub-scan is being
/// drained at a time. Entries are not globally value-sorted — cross-part
/// entity order is unspecified.
pub struct CompositeEntryScan {
    scans: Vec<Box<dyn EntryScan>>,
    current: usize,
    closed: bool,
}

impl CompositeEntryScan {
    /// Concatenate per-part scans, already in kind order
    pub(crate) fn new(scans: Vec<Box<dyn EntryScan>>) -> Self {
        CompositeEntryScan {
            scans,
            current: 0,
            closed: false,
        }
    }
}

impl EntryScan for CompositeEntryScan {
    fn size(&self) -> EntryCount {
        let mut total = EntryCount::Exact(0);
        for scan in &self.scans {
            total = total.add(scan.size());
            if total == EntryCount::Unknown {
                // Short-circuit the arithmetic only; the sub-scans stay
                // owned until close()
                break;
            }
        }
        total
    }

    fn next(&mut self) -> Option<IndexEntry> {
        if self.closed {
            return None;
        }
        while self.current < self.scans.len() {
            if let Some(entry) = self.scans[self.current].next() {
                return Some(entry);
            }
            self.current += 1;
        }
        None
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        close_all(&mut self.scans, |scan| scan.close())
    }
}

impl Drop for CompositeEntryScan {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            for scan in &mut self.scans {
                let _ = scan.close();
            }
        }
    }
}

/// Every live part's file inventory, lazily concatenated in kind order.
pub struct CompositeFileScan {
    scans: Vec<Box<dyn FileScan>>,
    current: usize,
    closed: bool,
}

impl CompositeFileScan {
    /// Concatenate per-part file scans, already in kind order
    pub(crate) fn new(scans: Vec<Box<dyn FileScan>>) -> Self {
        CompositeFileScan {
            scans,
            current: 0,
            closed: false,
        }
    }
}

impl FileScan for CompositeFileScan {
    fn next(&mut self) -> Option<PathBuf> {
        if self.closed {
            return None;
        }
        while self.current < self.scans.len() {
            if let Some(path) = self.scans[self.current].next() {
                return Some(path);
            }
            self.current += 1;
        }
        None
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        close_all(&mut self.scans, |scan| scan.close())
    }
}

impl Drop for CompositeFileScan {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            for scan in &mut self.scans {
                let _ = scan.close();
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
