//! Flush pacing policy
//!
//! `force` pushes a part's staged writes through a durability barrier. The
//! pacing policy controls how that I/O is throttled: one barrier for the
//! whole backlog, or a barrier per bounded chunk so a large flush does not
//! monopolize the device.

/// Throttling policy passed through `force` to every part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPacing {
    /// Write the whole backlog, then one durability barrier
    Unlimited,
    /// Write at most `chunk_bytes` between durability barriers
    Paced {
        /// Upper bound on bytes written per barrier, always > 0
        chunk_bytes: usize,
    },
}

impl FlushPacing {
    /// Paced flushing with the given chunk size (clamped to at least 1 byte)
    pub fn paced(chunk_bytes: usize) -> Self {
        FlushPacing::Paced {
            chunk_bytes: chunk_bytes.max(1),
        }
    }

    /// The chunk bound, or `None` when unlimited
    pub fn chunk_bytes(&self) -> Option<usize> {
        match self {
            FlushPacing::Unlimited => None,
            FlushPacing::Paced { chunk_bytes } => Some(*chunk_bytes),
        }
    }
}

impl Default for FlushPacing {
    fn default() -> Self {
        FlushPacing::Unlimited
    }
}
