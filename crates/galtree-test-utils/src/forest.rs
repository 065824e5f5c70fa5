//! Seeded synthetic forests.

use galtree_core::Halo;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::TreeBuilder;

/// Parameters for [`random_forest`].
#[derive(Clone, Debug)]
pub struct ForestShape {
    /// Independent trees, each rooted at the last snapshot.
    pub trees: usize,
    /// Snapshots in the run; roots sit at `snapshots - 1`.
    pub snapshots: i32,
    /// Upper bound on progenitors per halo (uniform in `0..=max`).
    pub max_progenitors: usize,
    /// Upper bound on FOF group size.
    pub max_group_size: usize,
    /// Probability that a progenitor skips one snapshot.
    pub gap_chance: f64,
}

impl Default for ForestShape {
    fn default() -> Self {
        Self {
            trees: 4,
            snapshots: 8,
            max_progenitors: 3,
            max_group_size: 3,
            gap_chance: 0.1,
        }
    }
}

/// Build a well-formed forest from `seed`.
///
/// Each halo's first progenitor is its heaviest. FOF groups are formed
/// from consecutive runs of halos sharing a snapshot, so groups regularly
/// span trees. The same seed and shape always yield the same forest.
pub fn random_forest(seed: u64, shape: &ForestShape) -> Vec<Halo> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut builder = TreeBuilder::new();
    let last = shape.snapshots.max(1) - 1;

    for _ in 0..shape.trees {
        let root = builder.len();
        let len = 1000 + below(&mut rng, 1000) as i32;
        builder = builder.halo(last, len);

        let mut frontier = vec![root];
        while let Some(halo) = frontier.pop() {
            let Halo { snap_num, len, .. } = builder.halos()[halo];
            if snap_num == 0 {
                continue;
            }
            let count = below(&mut rng, shape.max_progenitors + 1);
            let mut prog_len = (len * 4 / 5).max(1);
            for _ in 0..count {
                let step = if snap_num >= 2 && unit(&mut rng) < shape.gap_chance {
                    2
                } else {
                    1
                };
                let prog = builder.len();
                builder = builder.halo(snap_num - step, prog_len).progenitor(halo, prog);
                frontier.push(prog);
                prog_len = (prog_len / 2).max(1);
            }
        }
    }

    let mut by_snapshot: Vec<Vec<usize>> = vec![Vec::new(); (last + 1) as usize];
    for (index, halo) in builder.halos().iter().enumerate() {
        by_snapshot[halo.snap_num as usize].push(index);
    }
    let max_group = shape.max_group_size.max(1);
    for members in by_snapshot {
        let mut rest = members.as_slice();
        while !rest.is_empty() {
            let size = (1 + below(&mut rng, max_group)).min(rest.len());
            let (group, tail) = rest.split_at(size);
            builder = builder.fof_group(group);
            rest = tail;
        }
    }
    builder.build()
}

fn below(rng: &mut ChaCha8Rng, bound: usize) -> usize {
    (rng.next_u64() % bound.max(1) as u64) as usize
}

fn unit(rng: &mut ChaCha8Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}
