//! Order-preserving part keys
//!
//! Every indexed value is reduced to an [`OrderKey`]: a fixed layout of
//! big-endian, sign-flipped components whose lexicographic byte order equals
//! the value order of its kind. Parts store entries under these keys, and
//! the reader's merge compares them directly without decoding.

use serde::{Deserialize, Serialize};

/// An order-preserving binary key within a single part.
///
/// Keys are only comparable between values of the same temporal kind;
/// cross-kind ordering is handled by kind precedence above this layer.
/// Byte equality is value identity for indexing purposes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderKey(Vec<u8>);

impl OrderKey {
    /// Start building a key with the given component capacity in bytes
    pub fn with_capacity(bytes: usize) -> Self {
        OrderKey(Vec::with_capacity(bytes))
    }

    /// Append a signed 64-bit component.
    ///
    /// The sign bit is flipped so that negative values sort below positive
    /// ones under unsigned lexicographic comparison.
    pub fn push_i64(&mut self, v: i64) {
        self.0.extend_from_slice(&((v as u64) ^ (1 << 63)).to_be_bytes());
    }

    /// Append a signed 32-bit component (sign-flipped, big-endian)
    pub fn push_i32(&mut self, v: i32) {
        self.0.extend_from_slice(&((v as u32) ^ (1 << 31)).to_be_bytes());
    }

    /// Append an unsigned 32-bit component (big-endian)
    pub fn push_u32(&mut self, v: u32) {
        self.0.extend_from_slice(&v.to_be_bytes());
    }

    /// Key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key holds no components
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
