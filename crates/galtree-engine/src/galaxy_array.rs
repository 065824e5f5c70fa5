//! Growable, index-addressed galaxy storage.
//!
//! A [`GalaxyArray`] keeps its records in a single arena block of
//! [`Galaxy::WORDS`]-word runs. Growing the array reallocates that block,
//! so record addresses move but [`GalaxyIndex`] values do not. Property
//! blocks referenced from records are separate allocations and never
//! move or get copied when the array grows.

use galtree_arena::MemoryArena;
use galtree_core::{BlockHandle, Galaxy, GalaxyIndex};

/// Galaxy records stored in an arena block.
///
/// The array does not hold a borrow of the arena; every call takes the
/// arena explicitly. The block is allocated in the arena's innermost
/// scope at construction and is released when that scope closes.
#[derive(Debug)]
pub struct GalaxyArray {
    block: BlockHandle,
    len: usize,
    capacity: usize,
    growth_factor: f64,
}

impl GalaxyArray {
    /// Reserve room for `capacity` records (at least one).
    ///
    /// `growth_factor` is the capacity multiplier applied when the array
    /// is full; values at or below 1 still grow by one record.
    pub fn new(arena: &mut MemoryArena, capacity: usize, growth_factor: f64) -> Self {
        let capacity = capacity.max(1);
        let block = arena.alloc_scoped(capacity * Galaxy::BYTES);
        Self {
            block,
            len: 0,
            capacity,
            growth_factor,
        }
    }

    /// Copy `galaxy` into the array and return its index.
    pub fn append(&mut self, arena: &mut MemoryArena, galaxy: &Galaxy) -> GalaxyIndex {
        if self.len == self.capacity {
            self.grow(arena);
        }
        let index = self.len;
        let start = index * Galaxy::WORDS;
        arena.live_block_mut(self.block)[start..start + Galaxy::WORDS]
            .copy_from_slice(&galaxy.to_words());
        self.len += 1;
        GalaxyIndex(index as u32)
    }

    /// The record at `index`, or `None` past the end.
    pub fn get(&self, arena: &MemoryArena, index: GalaxyIndex) -> Option<Galaxy> {
        let i = index.as_usize();
        if i >= self.len {
            return None;
        }
        let start = i * Galaxy::WORDS;
        Galaxy::from_words(&arena.live_block(self.block)[start..start + Galaxy::WORDS])
    }

    /// [`get`](Self::get) for a signed raw index; negative indices are not found.
    pub fn get_signed(&self, arena: &MemoryArena, raw: i64) -> Option<Galaxy> {
        GalaxyIndex::from_signed(raw).and_then(|index| self.get(arena, index))
    }

    /// Overwrite the record at `index`. Returns `false` past the end.
    pub fn set(&self, arena: &mut MemoryArena, index: GalaxyIndex, galaxy: &Galaxy) -> bool {
        let i = index.as_usize();
        if i >= self.len {
            return false;
        }
        let start = i * Galaxy::WORDS;
        arena.live_block_mut(self.block)[start..start + Galaxy::WORDS]
            .copy_from_slice(&galaxy.to_words());
        true
    }

    /// Decoded records in index order.
    pub fn iter<'a>(&self, arena: &'a MemoryArena) -> impl Iterator<Item = Galaxy> + 'a {
        self.as_words(arena)
            .chunks_exact(Galaxy::WORDS)
            .filter_map(Galaxy::from_words)
    }

    /// Contiguous raw view of every stored record, for bulk export.
    pub fn as_words<'a>(&self, arena: &'a MemoryArena) -> &'a [u64] {
        &arena.live_block(self.block)[..self.len * Galaxy::WORDS]
    }

    /// Number of appended records.
    pub fn count(&self) -> usize {
        self.len
    }

    /// Whether no record has been appended.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Records the current block can hold without growing.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Handle of the backing block.
    pub fn handle(&self) -> BlockHandle {
        self.block
    }

    fn grow(&mut self, arena: &mut MemoryArena) {
        let scaled = (self.capacity as f64 * self.growth_factor).ceil() as usize;
        let new_capacity = scaled.max(self.capacity + 1);
        arena.realloc(self.block, new_capacity * Galaxy::BYTES);
        tracing::trace!(from = self.capacity, to = new_capacity, "galaxy array grown");
        self.capacity = new_capacity;
    }
}
