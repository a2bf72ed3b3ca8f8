//! Part store configuration.

/// Configuration shared by every part store of one index.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether the owning index enforces at most one entity per value.
    ///
    /// Uniqueness is not enforced on the write path (the engine verifies
    /// constraints above this layer); it widens the consistency check.
    pub unique: bool,

    /// Initial capacity of the staging buffer in bytes (default: 64KB).
    ///
    /// Staged records accumulate here between `force` calls.
    pub staging_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            unique: false,
            staging_capacity: 64 * 1024,
        }
    }
}

impl StoreConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the uniqueness flag (builder pattern)
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Set the staging buffer capacity (builder pattern)
    pub fn with_staging_capacity(mut self, bytes: usize) -> Self {
        self.staging_capacity = bytes;
        self
    }
}
