//! Post-order traversal of merger trees.
//!
//! [`TreeContext::visit`] resolves every transitive progenitor of a halo
//! before the halo itself, using an explicit work stack held in the
//! arena rather than native recursion, so deep trees cannot overflow the
//! call stack. Visitation order is identical to a recursive walk that
//! descends into `FirstProgenitor` and then each `NextProgenitor`.
//!
//! # Per-tree scope
//!
//! Each call to `visit` opens a nested arena scope for its work stack and
//! closes it before returning, on success or on error. Galaxies and
//! property blocks produced during the walk belong to the context's own
//! scope and survive it.

use galtree_arena::MemoryArena;
use galtree_core::{BlockHandle, TreeError};

use crate::context::TreeContext;
use crate::metrics::ForestStats;

// ── WorkStack ────────────────────────────────────────────────────

const INITIAL_STACK_WORDS: usize = 64;

/// LIFO of `(halo, expanded)` entries packed one per word.
///
/// `expanded` marks an entry whose progenitors have already been pushed;
/// popping it means the halo is ready to finish.
struct WorkStack {
    block: BlockHandle,
    len: usize,
    capacity: usize,
}

impl WorkStack {
    fn new(arena: &mut MemoryArena) -> Self {
        let block = arena.alloc_scoped(INITIAL_STACK_WORDS * std::mem::size_of::<u64>());
        Self {
            block,
            len: 0,
            capacity: INITIAL_STACK_WORDS,
        }
    }

    fn push(&mut self, arena: &mut MemoryArena, halo: usize, expanded: bool) {
        if self.len == self.capacity {
            self.capacity *= 2;
            arena.realloc(self.block, self.capacity * std::mem::size_of::<u64>());
        }
        arena.live_block_mut(self.block)[self.len] = ((halo as u64) << 1) | u64::from(expanded);
        self.len += 1;
    }

    fn pop(&mut self, arena: &MemoryArena) -> Option<(usize, bool)> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        let word = arena.live_block(self.block)[self.len];
        Some(((word >> 1) as usize, word & 1 == 1))
    }

    fn len(&self) -> usize {
        self.len
    }
}

// ── Traversal ────────────────────────────────────────────────────

impl TreeContext<'_> {
    /// Resolve `halo` and every transitive progenitor, in post order.
    ///
    /// Each halo reached has its galaxies produced and its done flag set
    /// exactly once; halos already done are skipped. Whenever a halo's
    /// FOF group becomes ready it is finalized.
    pub fn visit(&mut self, halo: usize) -> Result<(), TreeError> {
        self.visit_with(halo, &mut |_| {})
    }

    /// [`visit`](Self::visit), calling `visitor` with each halo as it is
    /// finished, in traversal order.
    pub fn visit_with<F>(&mut self, halo: usize, visitor: &mut F) -> Result<(), TreeError>
    where
        F: FnMut(usize),
    {
        self.check_halo(halo)?;
        if self.halo_done[halo] {
            return Ok(());
        }
        let scope = self.arena.begin_scope();
        let result = self.walk(halo, visitor);
        if let Err(e) = self.arena.end_scope_to(scope) {
            tracing::warn!(error = %e, halo, "tree scope already closed");
        }
        if result.is_err() {
            self.on_stack.fill(false);
        }
        result
    }

    /// Visit every tree root (`Descendant == -1`) in index order.
    ///
    /// Halos not reachable from any root are visited afterwards so that
    /// every halo in the forest ends up done.
    pub fn run_forest(&mut self) -> Result<ForestStats, TreeError> {
        self.run_forest_with(|_| {})
    }

    /// [`run_forest`](Self::run_forest) with a visitor called at each halo
    /// in traversal order.
    pub fn run_forest_with<F>(&mut self, mut visitor: F) -> Result<ForestStats, TreeError>
    where
        F: FnMut(usize),
    {
        let mut trees = 0usize;
        for root in 0..self.halos.len() {
            if !self.halos[root].is_root() || self.halo_done[root] {
                continue;
            }
            let before = self.counters.halos_visited;
            self.visit_with(root, &mut visitor)?;
            trees += 1;
            tracing::debug!(
                root,
                halos = self.counters.halos_visited - before,
                live_blocks = self.arena.stats().live_blocks,
                "tree visited"
            );
        }

        let unreached = self.halo_done.iter().filter(|done| !**done).count();
        if unreached > 0 {
            tracing::warn!(unreached, "halos not reachable from any tree root");
            for halo in 0..self.halos.len() {
                if !self.halo_done[halo] {
                    self.visit_with(halo, &mut visitor)?;
                }
            }
        }

        let stats = self.stats();
        tracing::info!(
            trees,
            halos = stats.halos,
            groups = stats.groups_processed,
            galaxies = stats.working_galaxies,
            orphans = stats.orphans_created,
            gaps = stats.gap_count,
            max_gap = stats.max_gap,
            high_water_bytes = stats.arena.high_water_bytes,
            "forest traversed"
        );
        Ok(stats)
    }

    fn walk<F>(&mut self, start: usize, visitor: &mut F) -> Result<(), TreeError>
    where
        F: FnMut(usize),
    {
        let mut stack = WorkStack::new(self.arena);
        stack.push(self.arena, start, false);

        while let Some((halo, expanded)) = stack.pop(self.arena) {
            if expanded {
                self.on_stack[halo] = false;
                self.finish_halo(halo, visitor)?;
                continue;
            }
            if self.halo_done[halo] {
                continue;
            }
            if self.on_stack[halo] {
                return Err(TreeError::ProgenitorCycle { halo });
            }
            self.on_stack[halo] = true;
            stack.push(self.arena, halo, true);
            let progenitors = self.progenitors(halo)?;
            for &prog in progenitors.iter().rev() {
                if !self.halo_done[prog] {
                    stack.push(self.arena, prog, false);
                }
            }
            self.counters.max_stack_depth = self.counters.max_stack_depth.max(stack.len());
        }
        Ok(())
    }

    fn finish_halo<F>(&mut self, halo: usize, visitor: &mut F) -> Result<(), TreeError>
    where
        F: FnMut(usize),
    {
        visitor(halo);
        self.populate(halo)?;
        self.halo_done[halo] = true;
        self.counters.halos_visited += 1;

        let root = self.fof_root(halo)?;
        if !self.fof_done[root] && self.pending[root] == 0 {
            self.process_group(root)?;
        }
        if let Some(descendant) = self.consumer[halo] {
            let group = self.fof_root(descendant)?;
            self.pending[group] = self.pending[group].saturating_sub(1);
            if !self.fof_done[group] && self.pending[group] == 0 {
                self.process_group(group)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use galtree_core::{GalaxyType, RunParams};
    use galtree_test_utils::{fixtures, TreeBuilder};

    use super::*;
    use crate::config::EngineConfig;

    fn visit_order(halos: &[galtree_core::Halo]) -> Vec<usize> {
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(halos, &params, EngineConfig::default(), &mut arena).unwrap();
        let mut order = Vec::new();
        ctx.run_forest_with(|h| order.push(h)).unwrap();
        order
    }

    #[test]
    fn binary_tree_is_post_order() {
        let halos = fixtures::binary_tree();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        let mut order = Vec::new();
        ctx.run_forest_with(|h| order.push(h)).unwrap();
        assert_eq!(order, vec![2, 3, 1, 0]);
        assert!((0..4).all(|h| ctx.is_halo_done(h)));
    }

    #[test]
    fn visitor_does_not_change_result() {
        let halos = fixtures::binary_tree();
        let mut arena_a = MemoryArena::default();
        let mut arena_b = MemoryArena::default();
        let params = RunParams::default();
        let mut plain = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena_a).unwrap();
        let mut watched =
            TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena_b).unwrap();
        plain.run_forest().unwrap();
        watched.run_forest_with(|_| {}).unwrap();
        assert_eq!(plain.working_words(), watched.working_words());
        assert_eq!(plain.output_words(), watched.output_words());
    }

    #[test]
    fn every_tree_in_forest_is_visited() {
        let halos = TreeBuilder::new()
            .halo(1, 10)
            .halo(0, 10)
            .halo(1, 10)
            .halo(0, 10)
            .halo(2, 10)
            .progenitor(0, 1)
            .progenitor(2, 3)
            .build();
        assert_eq!(visit_order(&halos), vec![1, 0, 3, 2, 4]);
    }

    #[test]
    fn empty_forest_runs() {
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&[], &params, EngineConfig::default(), &mut arena).unwrap();
        let stats = ctx.run_forest().unwrap();
        assert_eq!(stats.halos_visited, 0);
        assert_eq!(stats.working_galaxies, 0);
    }

    #[test]
    fn visiting_twice_is_a_no_op() {
        let halos = fixtures::binary_tree();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        ctx.visit(0).unwrap();
        let stats = ctx.stats();
        ctx.visit(0).unwrap();
        ctx.visit(2).unwrap();
        assert_eq!(ctx.stats(), stats);
    }

    #[test]
    fn work_stack_scope_is_closed_after_visit() {
        let halos = fixtures::binary_tree();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        let depth = ctx.arena_stats().open_scopes;
        ctx.visit(0).unwrap();
        assert_eq!(ctx.arena_stats().open_scopes, depth);
        // Working array, output array, one property block per primordial halo.
        assert_eq!(ctx.arena_stats().live_blocks, 2 + 2);
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let depth = 20_000;
        let mut builder = TreeBuilder::new();
        for i in 0..depth {
            builder = builder.halo(0, 10);
            if i > 0 {
                builder = builder.progenitor(i - 1, i);
            }
        }
        let halos = builder.build();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        let stats = ctx.run_forest().unwrap();
        assert_eq!(stats.halos_visited, depth);
        assert_eq!(ctx.galaxies_of(0)[0].kind, GalaxyType::Central);
    }

    #[test]
    fn progenitor_cycle_is_structural_error() {
        let mut halos = TreeBuilder::new().halo(2, 10).halo(1, 10).halo(0, 10).build();
        // 1 <- 2 <- 1, detached from root 0.
        halos[1].descendant = 2;
        halos[1].first_progenitor = 2;
        halos[2].descendant = 1;
        halos[2].first_progenitor = 1;
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        let depth = ctx.arena_stats().open_scopes;
        assert_eq!(ctx.run_forest(), Err(TreeError::ProgenitorCycle { halo: 1 }));
        assert_eq!(ctx.arena_stats().open_scopes, depth);
        assert!(!ctx.is_halo_done(1));
        assert!(!ctx.is_halo_done(2));
    }

    #[test]
    fn unreachable_halo_is_still_visited() {
        // Halo 2 names 0 as descendant but is missing from its progenitor list.
        let mut halos = TreeBuilder::new().halo(1, 10).halo(0, 10).halo(0, 5).progenitor(0, 1).build();
        halos[2].descendant = 0;
        assert_eq!(visit_order(&halos), vec![1, 0, 2]);
    }

    #[test]
    fn visit_rejects_unknown_halo() {
        let halos = fixtures::binary_tree();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        assert_eq!(
            ctx.visit(4),
            Err(TreeError::HaloOutOfRange {
                halo: 4,
                halo_count: 4
            })
        );
    }

    #[test]
    fn group_closes_when_last_progenitor_finishes() {
        let halos = fixtures::fof_pair();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        ctx.visit(2).unwrap();
        assert!(!ctx.is_fof_done(0));
        ctx.visit(3).unwrap();
        // Neither member has been visited, but nothing feeds the group any more.
        assert!(ctx.is_fof_done(0));
        assert!(!ctx.is_halo_done(0));
        assert!(!ctx.is_halo_done(1));
        assert_eq!(ctx.galaxy_slice(1).unwrap().count, 1);
    }

    #[test]
    fn closed_fof_ring_traverses() {
        let mut halos = fixtures::fof_pair();
        halos[1].next_halo_in_fof_group = 0;
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        let stats = ctx.run_forest().unwrap();
        assert_eq!(stats.groups_processed, 3);
        assert_eq!(ctx.galaxies_of(0)[0].kind, GalaxyType::Central);
        assert_eq!(ctx.galaxies_of(1)[0].kind, GalaxyType::Satellite);
    }

    #[test]
    fn wide_group_finalizes_once() {
        // One FOF group of 3000 members, each fed by its own progenitor.
        let members = 3000;
        let mut builder = TreeBuilder::new();
        for _ in 0..members {
            builder = builder.halo(1, 10);
        }
        for m in 0..members {
            builder = builder.halo(0, 10).progenitor(m, members + m);
        }
        let group: Vec<usize> = (0..members).collect();
        let halos = builder.fof_group(&group).build();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        let stats = ctx.run_forest().unwrap();
        assert!(ctx.is_fof_done(0));
        assert_eq!(stats.groups_processed, members + 1);
        assert_eq!(stats.output_galaxies, 2 * members);
        let satellites = (1..members)
            .filter(|&m| ctx.galaxies_of(m)[0].kind == GalaxyType::Satellite)
            .count();
        assert_eq!(satellites, members - 1);
    }

    #[test]
    fn work_stack_grows() {
        let mut arena = MemoryArena::default();
        let mut stack = WorkStack::new(&mut arena);
        for h in 0..(INITIAL_STACK_WORDS * 3) {
            stack.push(&mut arena, h, h % 2 == 0);
        }
        for h in (0..(INITIAL_STACK_WORDS * 3)).rev() {
            assert_eq!(stack.pop(&arena), Some((h, h % 2 == 0)));
        }
        assert_eq!(stack.pop(&arena), None);
    }
}
