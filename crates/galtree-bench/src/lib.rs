//! Benchmark profiles for the galtree merger-tree engine.
//!
//! - [`reference_forest`]: a few hundred trees over 32 snapshots
//! - [`stress_forest`]: several thousand trees over 64 snapshots
//! - [`deep_chain`]: one unbranched tree, for work-stack depth

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use galtree_core::{Halo, RunParams};
use galtree_engine::EngineConfig;
use galtree_test_utils::{random_forest, ForestShape, TreeBuilder};

/// Reference forest: 256 trees, 32 snapshots, up to 2 progenitors each.
pub fn reference_forest(seed: u64) -> (Vec<Halo>, RunParams) {
    let shape = ForestShape {
        trees: 256,
        snapshots: 32,
        max_progenitors: 2,
        max_group_size: 4,
        gap_chance: 0.05,
    };
    (random_forest(seed, &shape), RunParams::with_snapshots(shape.snapshots))
}

/// Stress forest: 4096 trees, 64 snapshots.
///
/// Same branching as [`reference_forest`], so halo count grows mostly
/// with tree count.
pub fn stress_forest(seed: u64) -> (Vec<Halo>, RunParams) {
    let shape = ForestShape {
        trees: 4096,
        snapshots: 64,
        max_progenitors: 2,
        max_group_size: 4,
        gap_chance: 0.05,
    };
    (random_forest(seed, &shape), RunParams::with_snapshots(shape.snapshots))
}

/// A single chain of `length` halos, each the sole progenitor of the next.
pub fn deep_chain(length: usize) -> (Vec<Halo>, RunParams) {
    let snapshots = length.max(1) as i32;
    let mut builder = TreeBuilder::new();
    for i in 0..length {
        builder = builder.halo(snapshots - 1 - i as i32, 100);
        if i > 0 {
            builder = builder.progenitor(i - 1, i);
        }
    }
    (builder.build(), RunParams::with_snapshots(snapshots))
}

/// Engine configuration used by every benchmark.
pub fn bench_config() -> EngineConfig {
    EngineConfig {
        initial_galaxy_capacity: 1024,
        ..EngineConfig::default()
    }
}
