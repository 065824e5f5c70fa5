//! Allocator telemetry.

/// Point-in-time allocator and scope counters.
///
/// Produced by [`MemoryArena::stats()`](crate::MemoryArena::stats) for
/// logging and telemetry collaborators.
///
/// Only blocks obtained from the arena are counted. Bookkeeping a caller
/// keeps in ordinary collections, such as a tree context's per-halo done
/// flags and galaxy slices, is not part of these figures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Number of live blocks.
    pub live_blocks: usize,
    /// Bytes outstanding across all live blocks.
    pub outstanding_bytes: usize,
    /// Largest outstanding byte total seen so far.
    pub high_water_bytes: usize,
    /// Current live-block table capacity.
    pub table_capacity: usize,
    /// Number of open scopes.
    pub open_scopes: usize,
}
