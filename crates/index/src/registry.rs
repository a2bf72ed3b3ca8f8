//! Lazy part registry
//!
//! Maps partition kind → materialized part. Each kind has its own guarded
//! lazy slot, so a part is instantiated at most once per registry lifetime
//! and bootstraps for different kinds can run in parallel. A terminal
//! closed flag makes the close/create race safe: `close_all` sets the flag
//! before touching any slot, and `get_or_create` checks it under the slot
//! lock, so a racing create either completes before close reaches that
//! slot (and is closed there) or fails with `ClosedAccessor`.

use chronidx_core::{IndexError, PartStorage, Result, TemporalKind};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Builds the storage behind one partition kind.
///
/// Implementations bootstrap an empty on-disk structure when the kind has
/// never been touched, so "never-touched" and "previously-populated" both
/// end in an open part.
pub trait PartFactory: Send + Sync {
    /// Materialize the part storage for `kind`
    fn create(&self, kind: TemporalKind) -> Result<Arc<dyn PartStorage>>;
}

/// A materialized part: one kind plus its live storage.
#[derive(Clone)]
pub struct Part {
    kind: TemporalKind,
    store: Arc<dyn PartStorage>,
}

impl Part {
    /// Wrap a storage as a part
    pub fn new(kind: TemporalKind, store: Arc<dyn PartStorage>) -> Self {
        Part { kind, store }
    }

    /// The part's kind
    pub fn kind(&self) -> TemporalKind {
        self.kind
    }

    /// The part's storage
    pub fn storage(&self) -> &dyn PartStorage {
        self.store.as_ref()
    }

    /// Whether two handles refer to the same part instance
    pub fn same_instance(&self, other: &Part) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }
}

impl std::fmt::Debug for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Part").field("kind", &self.kind).finish()
    }
}

/// Owns zero-to-six parts, growing lazily and closing exactly once.
pub struct PartRegistry {
    factory: Box<dyn PartFactory>,
    slots: [Mutex<Option<Part>>; 6],
    closed: AtomicBool,
}

impl PartRegistry {
    /// Empty registry over a factory
    pub fn new(factory: Box<dyn PartFactory>) -> Self {
        PartRegistry {
            factory,
            slots: std::array::from_fn(|_| Mutex::new(None)),
            closed: AtomicBool::new(false),
        }
    }

    /// The part for `kind`, materializing it on first request.
    ///
    /// Concurrent callers for the same kind serialize on the kind's slot;
    /// exactly one invokes the factory and every caller gets the single
    /// resulting part. Callers for different kinds do not contend.
    pub fn get_or_create(&self, kind: TemporalKind) -> Result<Part> {
        let mut slot = self.slots[kind.ordinal()].lock();
        if self.closed.load(Ordering::SeqCst) {
            return Err(IndexError::ClosedAccessor);
        }
        if let Some(part) = slot.as_ref() {
            return Ok(part.clone());
        }
        let store = self.factory.create(kind)?;
        let part = Part::new(kind, store);
        *slot = Some(part.clone());
        debug!(kind = %kind, "materialized part");
        Ok(part)
    }

    /// The part for `kind` if it is already materialized
    pub fn get(&self, kind: TemporalKind) -> Option<Part> {
        self.slots[kind.ordinal()].lock().clone()
    }

    /// Materialized parts in canonical kind order.
    ///
    /// A point-in-time snapshot: parts materialized after the call are not
    /// included, which is exactly what aggregate reads are allowed to see.
    pub fn snapshot(&self) -> Vec<Part> {
        TemporalKind::ALL
            .iter()
            .filter_map(|kind| self.slots[kind.ordinal()].lock().clone())
            .collect()
    }

    /// Whether the terminal flag is set
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Set the terminal flag and close every materialized part exactly
    /// once, in kind order. Every part is attempted even if one fails; the
    /// first failure is re-raised after all attempts. A second call fails
    /// with `ClosedAccessor`.
    pub fn close_all(&self) -> Result<()> {
        self.shutdown(|part| part.storage().close())
    }

    /// Set the terminal flag and drop every materialized part's storage.
    /// Same attempt-all/first-failure policy as `close_all`; parts dropped
    /// before a failure stay dropped.
    pub fn drop_all(&self) -> Result<()> {
        self.shutdown(|part| part.storage().drop_storage())
    }

    fn shutdown(&self, release: impl Fn(&Part) -> Result<()>) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(IndexError::ClosedAccessor);
        }
        let mut first_failure = None;
        for kind in TemporalKind::ALL {
            // Taking the slot lock here serializes with any in-flight
            // create for this kind
            let part = self.slots[kind.ordinal()].lock().take();
            if let Some(part) = part {
                if let Err(e) = release(&part) {
                    first_failure.get_or_insert(e);
                }
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for PartRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartRegistry")
            .field("closed", &self.is_closed())
            .field(
                "materialized",
                &self.snapshot().iter().map(Part::kind).collect::<Vec<_>>(),
            )
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
