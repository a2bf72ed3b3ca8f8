//! Update records and part-level write operations
//!
//! The engine describes a change to an entity's indexed value as an
//! [`IndexUpdate`] with optional before/after sides. The composite layer
//! routes it to the affected part(s) as [`PartWrite`] operations.

use crate::key::OrderKey;
use crate::types::EntityId;
use crate::value::IndexValue;

/// How an updater is being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Regular online writes; the engine serializes writers above this layer
    Online,
    /// Replay of logged updates after a crash. Redundant operations
    /// (re-adding a present entry, removing an absent one) are tolerated,
    /// and lazy part creation for previously-unseen kinds is expected.
    Recovery,
}

impl UpdateMode {
    /// Whether redundant operations are expected and must be absorbed
    pub const fn tolerates_replay(&self) -> bool {
        matches!(self, UpdateMode::Recovery)
    }
}

/// A change to one entity's indexed value.
///
/// An addition has only `after`, a removal only `before`, a change both.
/// Either side may be `Unsupported`, in which case that side simply does
/// not involve this index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexUpdate {
    /// The entity whose value changed
    pub entity: EntityId,
    /// Value before the change, if the entity was indexed
    pub before: Option<IndexValue>,
    /// Value after the change, if the entity remains indexed
    pub after: Option<IndexValue>,
}

impl IndexUpdate {
    /// The entity gained an indexed value
    pub fn added(entity: EntityId, after: impl Into<IndexValue>) -> Self {
        IndexUpdate {
            entity,
            before: None,
            after: Some(after.into()),
        }
    }

    /// The entity's indexed value was removed
    pub fn removed(entity: EntityId, before: impl Into<IndexValue>) -> Self {
        IndexUpdate {
            entity,
            before: Some(before.into()),
            after: None,
        }
    }

    /// The entity's indexed value changed
    pub fn changed(
        entity: EntityId,
        before: impl Into<IndexValue>,
        after: impl Into<IndexValue>,
    ) -> Self {
        IndexUpdate {
            entity,
            before: Some(before.into()),
            after: Some(after.into()),
        }
    }
}

/// A single write routed to one part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartWrite {
    /// Index `entity` under `key`
    Add {
        /// Key to index under
        key: OrderKey,
        /// Entity to index
        entity: EntityId,
    },
    /// Remove `entity` from under `key`
    Remove {
        /// Key the entity is indexed under
        key: OrderKey,
        /// Entity to remove
        entity: EntityId,
    },
    /// Move `entity` from `before` to `after` within the same part.
    /// One operation instead of remove+add, so the part can mutate its
    /// structure once.
    Change {
        /// Key the entity is currently indexed under
        before: OrderKey,
        /// Key the entity moves to
        after: OrderKey,
        /// Entity being moved
        entity: EntityId,
    },
}
