//! Per-forest traversal state.
//!
//! [`TreeContext`] borrows the halo array, the run parameters, and the
//! worker's [`MemoryArena`] for its whole lifetime. It opens one arena
//! scope at creation; the working and output galaxy arrays and every
//! galaxy property block live in that scope and are released together
//! when the context is finished or dropped.

use smallvec::SmallVec;

use galtree_arena::{ArenaStats, MemoryArena, ScopeId};
use galtree_core::{
    BlockHandle, Galaxy, GalaxyId, GalaxyIndex, Halo, HaloLink, RunParams, TreeError, NO_LINK,
};

use crate::config::{ConfigError, EngineConfig};
use crate::galaxy_array::GalaxyArray;
use crate::metrics::ForestStats;

/// Short list of halo indices (progenitors, FOF members).
pub(crate) type HaloList = SmallVec<[usize; 8]>;

// ── GalaxySlice ──────────────────────────────────────────────────

/// The run of working-array records owned by one halo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GalaxySlice {
    /// Index of the first record, or `None` for a halo with no galaxies.
    pub first: Option<GalaxyIndex>,
    /// Number of records.
    pub count: usize,
}

impl GalaxySlice {
    /// Indices covered by this slice, in order.
    pub fn indices(self) -> impl Iterator<Item = GalaxyIndex> {
        let start = self.first.map_or(0, |f| f.0);
        (start..start + self.count as u32).map(GalaxyIndex)
    }
}

// ── Counters ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) halos_visited: usize,
    pub(crate) groups_processed: usize,
    pub(crate) galaxies_created: u64,
    pub(crate) orphans_created: u64,
    pub(crate) gap_count: u64,
    pub(crate) max_gap: u32,
    pub(crate) dominance_mismatches: u64,
    pub(crate) max_stack_depth: usize,
}

// ── TreeContext ──────────────────────────────────────────────────

/// State for traversing one forest.
///
/// Created once per forest with [`new()`](TreeContext::new) and consumed
/// by [`finish()`](TreeContext::finish) once the output has been read.
/// An empty halo array is valid and traverses to nothing.
pub struct TreeContext<'a> {
    pub(crate) halos: &'a [Halo],
    params: &'a RunParams,
    pub(crate) config: EngineConfig,
    pub(crate) arena: &'a mut MemoryArena,
    scope: ScopeId,
    pub(crate) working: GalaxyArray,
    pub(crate) output: GalaxyArray,
    pub(crate) halo_done: Vec<bool>,
    pub(crate) fof_done: Vec<bool>,
    pub(crate) populated: Vec<bool>,
    pub(crate) on_stack: Vec<bool>,
    pub(crate) slices: Vec<GalaxySlice>,
    /// Per FOF root: progenitors of its members not yet done.
    pub(crate) pending: Vec<u32>,
    /// Per halo: the halo whose progenitor list holds it.
    pub(crate) consumer: Vec<Option<usize>>,
    next_galaxy_id: u64,
    pub(crate) counters: Counters,
}

impl<'a> TreeContext<'a> {
    /// Build a context over `halos`.
    ///
    /// Validates the configuration, the run parameters, and every link
    /// and snapshot number of the halo array, counts the progenitors each
    /// FOF group waits on, then opens the context's arena scope and
    /// allocates the working and output arrays in it.
    pub fn new(
        halos: &'a [Halo],
        params: &'a RunParams,
        config: EngineConfig,
        arena: &'a mut MemoryArena,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        params.validate()?;
        validate_halos(halos, params)?;
        let (pending, consumer) = dependency_counts(halos)?;

        let scope = arena.begin_scope();
        let working = GalaxyArray::new(
            arena,
            config.initial_galaxy_capacity,
            config.galaxy_growth_factor,
        );
        let output = GalaxyArray::new(
            arena,
            config.initial_galaxy_capacity,
            config.galaxy_growth_factor,
        );
        let n = halos.len();
        tracing::debug!(halos = n, %scope, "tree context created");

        Ok(Self {
            halos,
            params,
            config,
            arena,
            scope,
            working,
            output,
            halo_done: vec![false; n],
            fof_done: vec![false; n],
            populated: vec![false; n],
            on_stack: vec![false; n],
            slices: vec![GalaxySlice::default(); n],
            pending,
            consumer,
            next_galaxy_id: 0,
            counters: Counters::default(),
        })
    }

    /// Release everything the context allocated and return its final counters.
    ///
    /// The returned arena figures are taken before the release.
    pub fn finish(self) -> ForestStats {
        self.stats()
    }

    // ── Accessors ────────────────────────────────────────────────

    /// The halo array.
    pub fn halos(&self) -> &'a [Halo] {
        self.halos
    }

    /// Number of halos in the forest.
    pub fn halo_count(&self) -> usize {
        self.halos.len()
    }

    /// The run parameters.
    pub fn params(&self) -> &'a RunParams {
        self.params
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The arena this context allocates from.
    pub fn arena(&self) -> &MemoryArena {
        self.arena
    }

    /// The arena scope holding this context's allocations.
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Whether `halo`'s progenitors are resolved and its galaxies built.
    pub fn is_halo_done(&self, halo: usize) -> bool {
        self.halo_done.get(halo).copied().unwrap_or(false)
    }

    /// Whether the FOF group rooted at `root` has been finalized.
    pub fn is_fof_done(&self, root: usize) -> bool {
        self.fof_done.get(root).copied().unwrap_or(false)
    }

    /// The working-array slice owned by `halo`.
    pub fn galaxy_slice(&self, halo: usize) -> Option<GalaxySlice> {
        self.slices.get(halo).copied()
    }

    /// Copies of every galaxy owned by `halo`, in slice order.
    pub fn galaxies_of(&self, halo: usize) -> Vec<Galaxy> {
        self.galaxy_slice(halo)
            .map(|slice| slice.indices().filter_map(|i| self.galaxy(i)).collect())
            .unwrap_or_default()
    }

    /// The working-array record at `index`.
    pub fn galaxy(&self, index: GalaxyIndex) -> Option<Galaxy> {
        self.working.get(self.arena, index)
    }

    /// The output-array record at `index`.
    pub fn output_galaxy(&self, index: GalaxyIndex) -> Option<Galaxy> {
        self.output.get(self.arena, index)
    }

    /// The working galaxy array.
    pub fn working(&self) -> &GalaxyArray {
        &self.working
    }

    /// The output galaxy array (finalized groups, in finalization order).
    pub fn output(&self) -> &GalaxyArray {
        &self.output
    }

    /// Raw words of the working array.
    pub fn working_words(&self) -> &[u64] {
        self.working.as_words(self.arena)
    }

    /// Raw words of the output array.
    pub fn output_words(&self) -> &[u64] {
        self.output.as_words(self.arena)
    }

    /// Read `f64` property `slot` of the galaxy at working `index`.
    pub fn property(&self, index: GalaxyIndex, slot: usize) -> Option<f64> {
        let handle = self.galaxy(index)?.properties?;
        let word = self.arena.block(handle)?.get(slot)?;
        Some(f64::from_bits(*word))
    }

    /// Write `f64` property `slot` of the galaxy at working `index`.
    ///
    /// Every copy of the galaxy shares the block, so the write is visible
    /// through all of them. Returns `false` if there is no such slot.
    pub fn set_property(&mut self, index: GalaxyIndex, slot: usize, value: f64) -> bool {
        let Some(handle) = self.galaxy(index).and_then(|g| g.properties) else {
            return false;
        };
        match self.arena.block_mut(handle).and_then(|b| b.get_mut(slot)) {
            Some(word) => {
                *word = value.to_bits();
                true
            }
            None => false,
        }
    }

    /// Current allocator figures.
    pub fn arena_stats(&self) -> ArenaStats {
        self.arena.stats()
    }

    /// Current counters.
    pub fn stats(&self) -> ForestStats {
        ForestStats {
            halos: self.halos.len(),
            halos_visited: self.counters.halos_visited,
            groups_processed: self.counters.groups_processed,
            galaxies_created: self.counters.galaxies_created,
            orphans_created: self.counters.orphans_created,
            gap_count: self.counters.gap_count,
            max_gap: self.counters.max_gap,
            dominance_mismatches: self.counters.dominance_mismatches,
            max_stack_depth: self.counters.max_stack_depth,
            working_galaxies: self.working.count(),
            output_galaxies: self.output.count(),
            arena: self.arena.stats(),
        }
    }

    // ── Graph access ─────────────────────────────────────────────

    pub(crate) fn check_halo(&self, halo: usize) -> Result<(), TreeError> {
        if halo < self.halos.len() {
            Ok(())
        } else {
            Err(TreeError::HaloOutOfRange {
                halo,
                halo_count: self.halos.len(),
            })
        }
    }

    /// Follow one relationship field of an in-range `halo`.
    pub(crate) fn link(&self, halo: usize, link: HaloLink) -> Result<Option<usize>, TreeError> {
        let value = self.halos[halo].link(link);
        if value == NO_LINK {
            return Ok(None);
        }
        match usize::try_from(value) {
            Ok(target) if target < self.halos.len() => Ok(Some(target)),
            _ => Err(TreeError::LinkOutOfRange {
                halo,
                link,
                value,
                halo_count: self.halos.len(),
            }),
        }
    }

    /// Progenitors of `halo` in list order.
    pub(crate) fn progenitors(&self, halo: usize) -> Result<HaloList, TreeError> {
        let mut list = HaloList::new();
        let mut next = self.link(halo, HaloLink::FirstProgenitor)?;
        while let Some(prog) = next {
            if list.len() >= self.halos.len() {
                return Err(TreeError::ProgenitorCycle { halo: prog });
            }
            list.push(prog);
            next = self.link(prog, HaloLink::NextProgenitor)?;
        }
        Ok(list)
    }

    /// Root of `halo`'s FOF group. A halo without one is its own root.
    pub(crate) fn fof_root(&self, halo: usize) -> Result<usize, TreeError> {
        Ok(self
            .link(halo, HaloLink::FirstHaloInFofGroup)?
            .unwrap_or(halo))
    }

    /// Members of the FOF group starting at `root`, root first.
    ///
    /// The chain ends at [`NO_LINK`] or on returning to `root`.
    pub(crate) fn fof_members(&self, root: usize) -> Result<HaloList, TreeError> {
        let mut list = HaloList::new();
        list.push(root);
        let mut next = self.link(root, HaloLink::NextHaloInFofGroup)?;
        while let Some(member) = next {
            if member == root {
                break;
            }
            if list.len() >= self.halos.len() {
                return Err(TreeError::FofCycle { root });
            }
            list.push(member);
            next = self.link(member, HaloLink::NextHaloInFofGroup)?;
        }
        Ok(list)
    }

    // ── Allocation ───────────────────────────────────────────────

    pub(crate) fn next_galaxy_id(&mut self) -> GalaxyId {
        let id = GalaxyId(self.next_galaxy_id);
        self.next_galaxy_id += 1;
        id
    }

    /// A zeroed property block in the context's scope, if enabled.
    pub(crate) fn alloc_properties(&mut self) -> Option<BlockHandle> {
        let bytes = self.config.property_bytes;
        if bytes == 0 {
            return None;
        }
        // The context's scope stays open for as long as it holds the arena.
        self.arena.alloc_in(self.scope, bytes).ok()
    }
}

impl Drop for TreeContext<'_> {
    fn drop(&mut self) {
        let expected = self.scope.depth() + 1;
        if self.arena.scope_depth() != expected {
            tracing::warn!(
                expected,
                open = self.arena.scope_depth(),
                "tree context scope is not innermost at destruction"
            );
        }
        match self.arena.end_scope_to(self.scope) {
            Ok(freed) => tracing::debug!(freed, "tree context destroyed"),
            Err(e) => tracing::warn!(error = %e, "tree context scope already closed"),
        }
    }
}

/// Check every link and snapshot number before anything is traversed.
fn validate_halos(halos: &[Halo], params: &RunParams) -> Result<(), TreeError> {
    let halo_count = halos.len();
    for (index, halo) in halos.iter().enumerate() {
        for link in HaloLink::ALL {
            let value = halo.link(link);
            let in_range = value == NO_LINK
                || usize::try_from(value).is_ok_and(|target| target < halo_count);
            if !in_range {
                return Err(TreeError::LinkOutOfRange {
                    halo: index,
                    link,
                    value,
                    halo_count,
                });
            }
        }
        if halo.snap_num < 0 || halo.snap_num >= params.snapshot_count {
            return Err(TreeError::SnapshotOutOfRange {
                halo: index,
                snap_num: halo.snap_num,
                snapshot_count: params.snapshot_count,
            });
        }
    }
    Ok(())
}

/// Count, per FOF root, the progenitors its members wait on, and record
/// which halo's progenitor list each halo belongs to.
///
/// Links must already be in range.
fn dependency_counts(halos: &[Halo]) -> Result<(Vec<u32>, Vec<Option<usize>>), TreeError> {
    let mut pending = vec![0u32; halos.len()];
    let mut consumer: Vec<Option<usize>> = vec![None; halos.len()];
    for (halo, record) in halos.iter().enumerate() {
        let root = match record.first_halo_in_fof_group {
            NO_LINK => halo,
            value => value as usize,
        };
        let mut next = record.first_progenitor;
        while next != NO_LINK {
            let prog = next as usize;
            match consumer[prog] {
                Some(first) if first == halo => {
                    return Err(TreeError::ProgenitorCycle { halo: prog })
                }
                Some(first) => {
                    return Err(TreeError::SharedProgenitor {
                        halo: prog,
                        first,
                        second: halo,
                    })
                }
                None => {}
            }
            consumer[prog] = Some(halo);
            pending[root] += 1;
            next = halos[prog].next_progenitor;
        }
    }
    Ok((pending, consumer))
}
