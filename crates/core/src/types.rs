//! Identity types shared across the index engine

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an indexed entity (node, row, document — the engine decides)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Raw id value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        EntityId(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptor of one logical index, supplied by the engine's schema store.
///
/// The UUID is the index's persistent identity: every part file header
/// carries it, and a part file stamped with a different UUID is refused at
/// open. Reopening an index therefore requires the same descriptor the
/// index was created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Engine-assigned index id, used for directory naming
    pub index_id: u64,
    /// Whether the index enforces at most one entity per value
    pub unique: bool,
    /// Persistent identity stamped into part file headers
    pub index_uuid: Uuid,
}

impl IndexDescriptor {
    /// Create a descriptor for a new index with a fresh identity
    pub fn new(index_id: u64, unique: bool) -> Self {
        IndexDescriptor {
            index_id,
            unique,
            index_uuid: Uuid::new_v4(),
        }
    }

    /// Create a descriptor with a known identity (reopening an index)
    pub fn with_uuid(index_id: u64, unique: bool, index_uuid: Uuid) -> Self {
        IndexDescriptor {
            index_id,
            unique,
            index_uuid,
        }
    }
}
