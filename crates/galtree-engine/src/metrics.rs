//! Per-forest counters for logging and telemetry.
//!
//! [`ForestStats`] is a snapshot of a [`TreeContext`](crate::TreeContext)'s
//! counters plus the arena's memory figures.

use galtree_arena::ArenaStats;

/// Counters accumulated while traversing one forest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForestStats {
    /// Halos in the forest.
    pub halos: usize,
    /// Halos whose `halo_done` flag has been set.
    pub halos_visited: usize,
    /// FOF groups finalized.
    pub groups_processed: usize,
    /// Galaxies created for primordial halos.
    pub galaxies_created: u64,
    /// Galaxies whose type changed to orphan during a merger. A galaxy
    /// that was already an orphan is not counted again when it is carried
    /// through a later merger.
    pub orphans_created: u64,
    /// Progenitor links spanning more than one snapshot.
    pub gap_count: u64,
    /// Largest number of snapshots skipped by a single progenitor link.
    pub max_gap: u32,
    /// Mergers whose first progenitor was not the most massive.
    pub dominance_mismatches: u64,
    /// Deepest explicit work stack used by a tree walk.
    pub max_stack_depth: usize,
    /// Records in the working galaxy array.
    pub working_galaxies: usize,
    /// Records in the output galaxy array.
    pub output_galaxies: usize,
    /// Allocator figures at the time of the snapshot. Covers galaxy
    /// storage and work stacks, not the per-halo flag arrays.
    pub arena: ArenaStats,
}
