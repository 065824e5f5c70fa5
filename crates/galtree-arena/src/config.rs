//! Allocator configuration parameters.

/// Configuration for the block allocator.
///
/// All values are fixed once the allocator is built.
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    /// Number of live-block table entries reserved up front.
    ///
    /// Default: 1024. The table doubles when full, up to
    /// `max_table_entries`.
    pub initial_table_capacity: usize,

    /// Hard limit on simultaneously live blocks.
    ///
    /// Default: 1_048_576. Reaching it is an allocator failure.
    pub max_table_entries: usize,

    /// Optional cap on outstanding bytes.
    ///
    /// Default: `None`. When set, a request that would push the
    /// outstanding total past the cap fails as if the system were out of
    /// memory.
    pub memory_limit: Option<usize>,
}

impl ArenaConfig {
    /// Default initial table capacity.
    pub const DEFAULT_INITIAL_TABLE_CAPACITY: usize = 1024;

    /// Default maximum table size.
    pub const DEFAULT_MAX_TABLE_ENTRIES: usize = 1 << 20;

    /// Create a config with default limits.
    pub fn new() -> Self {
        Self {
            initial_table_capacity: Self::DEFAULT_INITIAL_TABLE_CAPACITY,
            max_table_entries: Self::DEFAULT_MAX_TABLE_ENTRIES,
            memory_limit: None,
        }
    }

    /// Initial table capacity after clamping into `[1, max_table_entries]`.
    pub fn effective_initial_capacity(&self) -> usize {
        let max = self.max_table_entries.max(1);
        self.initial_table_capacity.clamp(1, max)
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}
