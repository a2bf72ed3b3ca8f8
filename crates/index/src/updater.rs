//! Composite index updater
//!
//! Routes per-entity value changes to the correct part. The interesting
//! case is a value whose runtime kind changes between updates on the same
//! entity: the transition splits into a removal on the before-part and an
//! addition on the after-part, leaving the entity in exactly the
//! after-part. Same-kind changes stay one operation so the part mutates
//! its structure once.

use crate::registry::{Part, PartRegistry};
use chronidx_core::{
    EntityId, IndexError, IndexUpdate, IndexUpdater, PartStorage, PartWrite, PartWriter, Result,
    TemporalKind, TemporalValue, UpdateMode,
};
use std::sync::Arc;
use tracing::warn;

/// A write session over the composite index.
///
/// Per-part writers open lazily on first touch and are each closed exactly
/// once when the session closes. Additions materialize previously-unseen
/// kinds through the registry; removals never do — a kind with no part has
/// nothing to remove.
pub struct CompositeIndexUpdater {
    registry: Arc<PartRegistry>,
    mode: UpdateMode,
    writers: [Option<Box<dyn PartWriter>>; 6],
    closed: bool,
}

impl CompositeIndexUpdater {
    /// Open a session against the registry
    pub(crate) fn new(registry: Arc<PartRegistry>, mode: UpdateMode) -> Self {
        CompositeIndexUpdater {
            registry,
            mode,
            writers: Default::default(),
            closed: false,
        }
    }

    fn writer_for(&mut self, part: &Part) -> Result<&mut Box<dyn PartWriter>> {
        let slot = &mut self.writers[part.kind().ordinal()];
        if slot.is_none() {
            *slot = Some(part.storage().begin_write(self.mode)?);
        }
        match slot.as_mut() {
            Some(writer) => Ok(writer),
            None => Err(IndexError::ClosedAccessor),
        }
    }

    fn add(&mut self, entity: EntityId, value: TemporalValue) -> Result<()> {
        let part = self.registry.get_or_create(value.kind())?;
        self.writer_for(&part)?.apply(PartWrite::Add {
            key: value.order_key(),
            entity,
        })
    }

    fn remove(&mut self, entity: EntityId, value: TemporalValue) -> Result<()> {
        let kind = value.kind();
        match self.registry.get(kind) {
            Some(part) => self.writer_for(&part)?.apply(PartWrite::Remove {
                key: value.order_key(),
                entity,
            }),
            None => {
                // A part that never existed holds nothing; a missing part
                // outside recovery means the engine fed us a stale before
                if !self.mode.tolerates_replay() {
                    warn!(kind = %kind, entity = %entity, "removal for a kind with no part");
                }
                Ok(())
            }
        }
    }

    fn change(
        &mut self,
        entity: EntityId,
        before: TemporalValue,
        after: TemporalValue,
    ) -> Result<()> {
        let part = self.registry.get_or_create(after.kind())?;
        self.writer_for(&part)?.apply(PartWrite::Change {
            before: before.order_key(),
            after: after.order_key(),
            entity,
        })
    }
}

impl IndexUpdater for CompositeIndexUpdater {
    fn apply(&mut self, update: IndexUpdate) -> Result<()> {
        if self.closed {
            return Err(IndexError::ClosedAccessor);
        }
        let IndexUpdate {
            entity,
            before,
            after,
        } = update;

        // Unsupported sides simply do not involve this index
        let before = before.as_ref().and_then(|v| v.temporal().copied());
        let after = after.as_ref().and_then(|v| v.temporal().copied());

        match (before, after) {
            (None, None) => Ok(()),
            (None, Some(a)) => self.add(entity, a),
            (Some(b), None) => self.remove(entity, b),
            (Some(b), Some(a)) if b.kind() == a.kind() => self.change(entity, b, a),
            (Some(b), Some(a)) => {
                // Kind transition: the entity leaves the before-part and
                // lands in the after-part
                self.remove(entity, b)?;
                self.add(entity, a)
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(IndexError::ClosedAccessor);
        }
        self.closed = true;

        let mut first_failure = None;
        for kind in TemporalKind::ALL {
            if let Some(mut writer) = self.writers[kind.ordinal()].take() {
                if let Err(e) = writer.close() {
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

// ============================================================================
// Tests
// ============================================================================
