//! Small named merger trees.
//!
//! - [`binary_tree`]: root at snapshot 0, one halo at snapshot 1, two
//!   leaves at snapshot 2.
//! - [`fof_pair`]: two halos sharing a FOF group, each with one
//!   progenitor.
//! - [`three_way_merger`]: three progenitors of relative mass 800, 500,
//!   200 merging into one descendant.
//! - [`snapshot_gap`]: a progenitor four snapshots removed from its
//!   descendant.

use galtree_core::Halo;

use crate::TreeBuilder;

/// `0 <- 1 <- {2, 3}`; post order is `[2, 3, 1, 0]`.
pub fn binary_tree() -> Vec<Halo> {
    TreeBuilder::new()
        .halo(0, 120)
        .halo(1, 100)
        .halo(2, 60)
        .halo(2, 40)
        .progenitor(0, 1)
        .progenitor(1, 2)
        .progenitor(1, 3)
        .build()
}

/// Halos 0 and 1 at snapshot 1 in one group rooted at 0; halo 2 feeds 0
/// and halo 3 feeds 1, both at snapshot 0.
pub fn fof_pair() -> Vec<Halo> {
    TreeBuilder::new()
        .halo(1, 200)
        .halo(1, 80)
        .halo(0, 150)
        .halo(0, 60)
        .progenitor(0, 2)
        .progenitor(1, 3)
        .fof_group(&[0, 1])
        .build()
}

/// Halos 1, 2, 3 (lengths 800, 500, 200) at snapshot 0 merge into halo 0.
pub fn three_way_merger() -> Vec<Halo> {
    TreeBuilder::new()
        .halo(1, 1500)
        .halo(0, 800)
        .halo(0, 500)
        .halo(0, 200)
        .progenitor(0, 1)
        .progenitor(0, 2)
        .progenitor(0, 3)
        .build()
}

/// Halo 1 at snapshot 5 is the only progenitor of halo 0 at snapshot 10.
pub fn snapshot_gap() -> Vec<Halo> {
    TreeBuilder::new()
        .halo(10, 300)
        .halo(5, 250)
        .progenitor(0, 1)
        .build()
}
