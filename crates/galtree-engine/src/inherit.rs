//! Galaxy creation and inheritance across mergers.
//!
//! A primordial halo gets one new central galaxy. Any other halo gets a
//! copy of every galaxy its progenitors own: the dominant progenitor's
//! galaxies keep their type and come first, every other progenitor's
//! galaxies become orphans. Nothing is dropped, so a descendant's galaxy
//! count is the sum of its progenitors' counts.

use galtree_core::{Galaxy, GalaxyIndex, GalaxyType, TreeError};

use crate::config::ProgenitorOrder;
use crate::context::{GalaxySlice, TreeContext};

impl TreeContext<'_> {
    /// Create the single central galaxy of a primordial `halo`.
    ///
    /// Returns `Ok(true)` if the galaxy was created by this call. A halo
    /// with progenitors, or one already populated, is left untouched.
    pub fn collect(&mut self, halo: usize) -> Result<bool, TreeError> {
        self.check_halo(halo)?;
        if self.populated[halo] || !self.halos[halo].is_primordial() {
            return Ok(false);
        }
        let id = self.next_galaxy_id();
        let properties = self.alloc_properties();
        let record = self.halos[halo];
        let galaxy = Galaxy::central(id, halo as i32, record.snap_num, properties);
        let index = self.working.append(self.arena, &galaxy);

        self.slices[halo] = GalaxySlice {
            first: Some(index),
            count: 1,
        };
        self.populated[halo] = true;
        self.counters.galaxies_created += 1;
        Ok(true)
    }

    /// Carry every progenitor galaxy into `halo`, orphaning all but the
    /// dominant progenitor's.
    ///
    /// Returns `Ok(true)` if the slice was produced by this call, and
    /// `Ok(false)` for a primordial or already populated halo, or while
    /// any progenitor is still unresolved.
    pub fn inherit_with_orphans(&mut self, halo: usize) -> Result<bool, TreeError> {
        self.check_halo(halo)?;
        if self.populated[halo] || self.halos[halo].is_primordial() {
            return Ok(false);
        }
        let progenitors = self.progenitors(halo)?;
        if progenitors.iter().any(|&p| !self.halo_done[p]) {
            return Ok(false);
        }
        let Some(dominant) = self.dominant_progenitor(halo, &progenitors) else {
            return Ok(false);
        };

        let snap_num = self.halos[halo].snap_num;
        let first = self.working.count();
        let mut count = 0;
        let order = std::iter::once(dominant)
            .chain(progenitors.iter().copied().filter(|&p| p != dominant));
        for prog in order {
            self.record_gap(snap_num, self.halos[prog].snap_num);
            let inherited = prog == dominant;
            for index in self.slices[prog].indices() {
                let Some(mut galaxy) = self.galaxy(index) else {
                    continue;
                };
                galaxy.halo = halo as i32;
                galaxy.snap_num = snap_num;
                galaxy.central = None;
                if !inherited && galaxy.kind != GalaxyType::Orphan {
                    galaxy.kind = GalaxyType::Orphan;
                    galaxy.orphaned_at = Some(snap_num);
                    self.counters.orphans_created += 1;
                }
                self.working.append(self.arena, &galaxy);
                count += 1;
            }
        }

        self.slices[halo] = GalaxySlice {
            first: (count > 0).then_some(GalaxyIndex(first as u32)),
            count,
        };
        self.populated[halo] = true;
        Ok(true)
    }

    /// Produce `halo`'s galaxies by whichever path applies. Idempotent.
    pub(crate) fn populate(&mut self, halo: usize) -> Result<(), TreeError> {
        if self.halos[halo].is_primordial() {
            self.collect(halo)?;
        } else {
            self.inherit_with_orphans(halo)?;
        }
        Ok(())
    }

    fn dominant_progenitor(&mut self, halo: usize, progenitors: &[usize]) -> Option<usize> {
        let first = *progenitors.first()?;
        let heaviest = progenitors.iter().copied().fold(first, |best, p| {
            if self.halos[p].mass_proxy() > self.halos[best].mass_proxy() {
                p
            } else {
                best
            }
        });
        match self.config.progenitor_order {
            ProgenitorOrder::SortByMass => Some(heaviest),
            ProgenitorOrder::TrustInput => {
                if heaviest != first {
                    self.counters.dominance_mismatches += 1;
                    tracing::warn!(
                        halo,
                        first,
                        heaviest,
                        "first progenitor is not the most massive"
                    );
                }
                Some(first)
            }
        }
    }

    fn record_gap(&mut self, snap_num: i32, progenitor_snap: i32) {
        let step = snap_num - progenitor_snap;
        if step > 1 {
            let skipped = (step - 1) as u32;
            self.counters.gap_count += 1;
            self.counters.max_gap = self.counters.max_gap.max(skipped);
        }
    }
}

#[cfg(test)]
mod tests {
    use galtree_arena::MemoryArena;
    use galtree_core::RunParams;
    use galtree_test_utils::{fixtures, TreeBuilder};

    use super::*;
    use crate::config::EngineConfig;

    fn kinds(ctx: &TreeContext<'_>, halo: usize) -> Vec<GalaxyType> {
        ctx.galaxies_of(halo).iter().map(|g| g.kind).collect()
    }

    #[test]
    fn primordial_halo_gets_one_central() {
        let halos = TreeBuilder::new().halo(3, 40).build();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();

        assert!(ctx.collect(0).unwrap());
        assert!(!ctx.collect(0).unwrap());
        let galaxies = ctx.galaxies_of(0);
        assert_eq!(galaxies.len(), 1);
        assert_eq!(galaxies[0].kind, GalaxyType::Central);
        assert_eq!(galaxies[0].snap_num, 3);
        assert_eq!(galaxies[0].halo, 0);
        assert!(galaxies[0].properties.is_some());
        assert_eq!(ctx.stats().galaxies_created, 1);
    }

    #[test]
    fn collect_ignores_halo_with_progenitors() {
        let halos = TreeBuilder::new().halo(1, 100).halo(0, 50).progenitor(0, 1).build();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        assert!(!ctx.collect(0).unwrap());
        assert_eq!(ctx.galaxy_slice(0).unwrap().count, 0);
    }

    #[test]
    fn inheritance_waits_for_progenitors() {
        let halos = TreeBuilder::new().halo(1, 100).halo(0, 50).progenitor(0, 1).build();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        assert!(!ctx.inherit_with_orphans(0).unwrap());
        ctx.collect(1).unwrap();
        assert!(!ctx.inherit_with_orphans(0).unwrap());
        ctx.halo_done[1] = true;
        assert!(ctx.inherit_with_orphans(0).unwrap());
        assert!(!ctx.inherit_with_orphans(0).unwrap());
        assert_eq!(ctx.galaxy_slice(0).unwrap().count, 1);
    }

    #[test]
    fn merger_orphans_non_dominant_galaxies() {
        let halos = fixtures::three_way_merger();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        let before = ctx.stats().orphans_created;
        for p in 1..4 {
            ctx.collect(p).unwrap();
            ctx.halo_done[p] = true;
        }
        assert!(ctx.inherit_with_orphans(0).unwrap());

        assert_eq!(
            kinds(&ctx, 0),
            vec![GalaxyType::Central, GalaxyType::Orphan, GalaxyType::Orphan]
        );
        assert_eq!(ctx.stats().orphans_created - before, 2);
        let ids: Vec<_> = ctx.galaxies_of(0).iter().map(|g| g.id).collect();
        let mut expected: Vec<_> = (1..4).flat_map(|p| ctx.galaxies_of(p)).map(|g| g.id).collect();
        expected.sort();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(sorted, expected);
        for g in ctx.galaxies_of(0).iter().skip(1) {
            assert_eq!(g.orphaned_at, Some(halos[0].snap_num));
        }
    }

    #[test]
    fn orphans_are_counted_once() {
        // 3 merges into 1 and is orphaned, then 1 merges into 0 as non-dominant.
        let halos = TreeBuilder::new()
            .halo(2, 1000)
            .halo(1, 300)
            .halo(0, 100)
            .halo(0, 50)
            .halo(1, 900)
            .halo(0, 800)
            .progenitor(0, 4)
            .progenitor(0, 1)
            .progenitor(1, 2)
            .progenitor(1, 3)
            .progenitor(4, 5)
            .build();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        ctx.run_forest().unwrap();
        // Halo 1: one orphan from halo 2. Halo 0: both galaxies of halo 1
        // are orphaned, but only one of them changes type.
        assert_eq!(ctx.stats().orphans_created, 2);
        assert_eq!(
            kinds(&ctx, 0),
            vec![GalaxyType::Central, GalaxyType::Orphan, GalaxyType::Orphan]
        );
    }

    #[test]
    fn gap_is_recorded_without_changing_inheritance() {
        let halos = fixtures::snapshot_gap();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        ctx.run_forest().unwrap();
        let stats = ctx.stats();
        assert_eq!(stats.gap_count, 1);
        assert_eq!(stats.max_gap, 4);
        assert_eq!(kinds(&ctx, 0), vec![GalaxyType::Central]);
    }

    #[test]
    fn decreasing_snapshots_are_not_gaps() {
        let halos = fixtures::binary_tree();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        ctx.run_forest().unwrap();
        assert_eq!(ctx.stats().gap_count, 0);
    }

    #[test]
    fn trusted_order_counts_mismatch() {
        // The lighter progenitor is listed first.
        let halos = TreeBuilder::new()
            .halo(1, 100)
            .halo(0, 10)
            .halo(0, 90)
            .progenitor(0, 1)
            .progenitor(0, 2)
            .build();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        ctx.run_forest().unwrap();
        let first = ctx.galaxies_of(0)[0];
        assert_eq!(first.id, ctx.galaxies_of(1)[0].id);
        assert_eq!(ctx.stats().dominance_mismatches, 1);
    }

    #[test]
    fn mass_order_picks_heaviest() {
        let halos = TreeBuilder::new()
            .halo(1, 100)
            .halo(0, 10)
            .halo(0, 90)
            .progenitor(0, 1)
            .progenitor(0, 2)
            .build();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let config = EngineConfig {
            progenitor_order: ProgenitorOrder::SortByMass,
            ..EngineConfig::default()
        };
        let mut ctx = TreeContext::new(&halos, &params, config, &mut arena).unwrap();
        ctx.run_forest().unwrap();
        let galaxies = ctx.galaxies_of(0);
        assert_eq!(galaxies[0].id, ctx.galaxies_of(2)[0].id);
        assert_eq!(galaxies[0].kind, GalaxyType::Central);
        assert_eq!(galaxies[1].kind, GalaxyType::Orphan);
        assert_eq!(ctx.stats().dominance_mismatches, 0);
    }

    #[test]
    fn virial_mass_outranks_particle_count() {
        let halos = TreeBuilder::new()
            .halo(1, 100)
            .halo(0, 90)
            .halo(0, 10)
            .mvir(1, 1.0)
            .mvir(2, 5.0)
            .progenitor(0, 1)
            .progenitor(0, 2)
            .build();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let config = EngineConfig {
            progenitor_order: ProgenitorOrder::SortByMass,
            ..EngineConfig::default()
        };
        let mut ctx = TreeContext::new(&halos, &params, config, &mut arena).unwrap();
        ctx.run_forest().unwrap();
        assert_eq!(ctx.galaxies_of(0)[0].id, ctx.galaxies_of(2)[0].id);
    }

    #[test]
    fn copies_share_property_block() {
        let halos = TreeBuilder::new().halo(1, 100).halo(0, 50).progenitor(0, 1).build();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
        ctx.run_forest().unwrap();
        let old = ctx.galaxy_slice(1).unwrap().first.unwrap();
        let new = ctx.galaxy_slice(0).unwrap().first.unwrap();
        assert!(ctx.set_property(old, 3, 2.5));
        assert_eq!(ctx.property(new, 3), Some(2.5));
        assert_eq!(ctx.property(new, 4), Some(0.0));
        assert_eq!(ctx.property(new, 16), None);
    }

    #[test]
    fn no_property_blocks_when_disabled() {
        let halos = TreeBuilder::new().halo(0, 10).build();
        let mut arena = MemoryArena::default();
        let params = RunParams::default();
        let config = EngineConfig {
            property_bytes: 0,
            ..EngineConfig::default()
        };
        let mut ctx = TreeContext::new(&halos, &params, config, &mut arena).unwrap();
        ctx.collect(0).unwrap();
        let index = ctx.galaxy_slice(0).unwrap().first.unwrap();
        assert_eq!(ctx.galaxy(index).unwrap().properties, None);
        assert_eq!(ctx.property(index, 0), None);
        assert!(!ctx.set_property(index, 0, 1.0));
    }
}
