//! Error types for the index engine
//!
//! One taxonomy is shared by every crate in the workspace. We use
//! `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Two things are deliberately *not* errors here: values of an unsupported
//! kind (silently excluded from the index) and consistency violations
//! (reported through the checking sink, never thrown).

use std::io;
use thiserror::Error;

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, IndexError>;

/// Error types for the index engine
#[derive(Debug, Error)]
pub enum IndexError {
    /// I/O failure opening, flushing, or dropping a part's on-disk structure.
    /// Fatal for the invoking operation; never retried at this layer.
    #[error("part storage unavailable ({context}): {source}")]
    Unavailable {
        /// What the engine was doing when the I/O failed
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An operation was attempted after `close()`/`drop()` completed
    #[error("index accessor is closed")]
    ClosedAccessor,

    /// A part file was refused at open (bad magic, version, kind, identity,
    /// or an incomplete bootstrap)
    #[error("part file rejected: {0}")]
    Corrupted(String),

    /// Record payload could not be encoded or decoded
    #[error("codec error: {0}")]
    Codec(String),

    /// A range predicate mixed values of different kinds
    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),
}

impl IndexError {
    /// Wrap an I/O error with the operation that hit it
    pub fn unavailable(context: impl Into<String>, source: io::Error) -> Self {
        IndexError::Unavailable {
            context: context.into(),
            source,
        }
    }
}

impl From<bincode::Error> for IndexError {
    fn from(e: bincode::Error) -> Self {
        IndexError::Codec(e.to_string())
    }
}
