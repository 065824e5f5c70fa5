//! Forest-level properties over seeded random forests.

use std::collections::BTreeSet;

use galtree_arena::MemoryArena;
use galtree_core::{GalaxyId, GalaxyType, Halo, RunParams, NO_LINK};
use galtree_engine::{EngineConfig, ProgenitorOrder, TreeContext};
use galtree_test_utils::{random_forest, ForestShape};
use proptest::prelude::*;

fn progenitors(halos: &[Halo], halo: usize) -> Vec<usize> {
    let mut list = Vec::new();
    let mut next = halos[halo].first_progenitor;
    while next != NO_LINK {
        list.push(next as usize);
        next = halos[next as usize].next_progenitor;
    }
    list
}

fn ids(ctx: &TreeContext<'_>, halo: usize) -> BTreeSet<GalaxyId> {
    ctx.galaxies_of(halo).iter().map(|g| g.id).collect()
}

fn shape() -> impl Strategy<Value = ForestShape> {
    (1usize..6, 2i32..8, 0usize..4, 1usize..4, 0.0f64..0.5).prop_map(
        |(trees, snapshots, max_progenitors, max_group_size, gap_chance)| ForestShape {
            trees,
            snapshots,
            max_progenitors,
            max_group_size,
            gap_chance,
        },
    )
}

fn order() -> impl Strategy<Value = ProgenitorOrder> {
    prop_oneof![
        Just(ProgenitorOrder::TrustInput),
        Just(ProgenitorOrder::SortByMass)
    ]
}

proptest! {
    #[test]
    fn galaxies_are_conserved_across_mergers(seed in any::<u64>(), shape in shape(), order in order()) {
        let halos = random_forest(seed, &shape);
        let params = RunParams::with_snapshots(shape.snapshots);
        let config = EngineConfig { progenitor_order: order, ..EngineConfig::default() };
        let mut arena = MemoryArena::default();
        let mut ctx = TreeContext::new(&halos, &params, config, &mut arena).unwrap();
        ctx.run_forest().unwrap();

        for halo in 0..halos.len() {
            let progs = progenitors(&halos, halo);
            if progs.is_empty() {
                prop_assert_eq!(ctx.galaxies_of(halo).len(), 1);
                continue;
            }
            let expected: BTreeSet<_> = progs.iter().flat_map(|&p| ids(&ctx, p)).collect();
            let total: usize = progs.iter().map(|&p| ctx.galaxies_of(p).len()).sum();
            prop_assert_eq!(ctx.galaxies_of(halo).len(), total);
            prop_assert_eq!(ids(&ctx, halo), expected);
        }
    }

    #[test]
    fn only_dominant_galaxies_escape_orphaning(seed in any::<u64>(), shape in shape()) {
        let halos = random_forest(seed, &shape);
        let params = RunParams::with_snapshots(shape.snapshots);
        let mut arena = MemoryArena::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        ctx.run_forest().unwrap();

        for halo in 0..halos.len() {
            let progs = progenitors(&halos, halo);
            if progs.len() < 2 {
                continue;
            }
            let galaxies = ctx.galaxies_of(halo);
            let dominant = ids(&ctx, progs[0]);
            for g in &galaxies {
                if !dominant.contains(&g.id) {
                    prop_assert_eq!(g.kind, GalaxyType::Orphan);
                }
            }
            prop_assert_ne!(galaxies[0].kind, GalaxyType::Orphan);
        }
    }

    #[test]
    fn traversal_is_post_order_and_complete(seed in any::<u64>(), shape in shape()) {
        let halos = random_forest(seed, &shape);
        let params = RunParams::with_snapshots(shape.snapshots);
        let mut arena = MemoryArena::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        let mut order = Vec::new();
        let stats = ctx.run_forest_with(|h| order.push(h)).unwrap();

        prop_assert_eq!(order.len(), halos.len());
        let mut position = vec![usize::MAX; halos.len()];
        for (i, &h) in order.iter().enumerate() {
            prop_assert!(h < halos.len());
            prop_assert_eq!(position[h], usize::MAX, "halo {} finished twice", h);
            position[h] = i;
        }
        for halo in 0..halos.len() {
            prop_assert!(ctx.is_halo_done(halo));
            for p in progenitors(&halos, halo) {
                prop_assert!(position[p] < position[halo]);
            }
        }
        prop_assert_eq!(stats.halos_visited, halos.len());
        prop_assert!(!ctx.is_halo_done(halos.len()));
    }

    #[test]
    fn every_group_is_finalized_once(seed in any::<u64>(), shape in shape()) {
        let halos = random_forest(seed, &shape);
        let params = RunParams::with_snapshots(shape.snapshots);
        let mut arena = MemoryArena::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        let stats = ctx.run_forest().unwrap();

        let roots: BTreeSet<_> = halos
            .iter()
            .map(|h| h.first_halo_in_fof_group as usize)
            .collect();
        for &root in &roots {
            prop_assert!(ctx.is_fof_done(root));
        }
        prop_assert_eq!(stats.groups_processed, roots.len());
        prop_assert_eq!(stats.output_galaxies, stats.working_galaxies);
    }

    #[test]
    fn arena_returns_to_baseline(seed in any::<u64>(), shape in shape()) {
        let halos = random_forest(seed, &shape);
        let params = RunParams::with_snapshots(shape.snapshots);
        let mut arena = MemoryArena::default();
        let baseline = arena.stats();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        ctx.run_forest().unwrap();
        ctx.finish();
        prop_assert_eq!(arena.stats().live_blocks, baseline.live_blocks);
        prop_assert_eq!(arena.stats().outstanding_bytes, baseline.outstanding_bytes);
        prop_assert_eq!(arena.scope_depth(), 0);
    }
}
