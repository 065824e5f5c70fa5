//! The live-block table.
//!
//! [`BlockAllocator`] records every block it hands out together with its
//! aligned size, so that any block can be found again by handle, the
//! whole table can be dumped when something goes wrong, and a high-water
//! mark of outstanding bytes is always available.

use std::num::NonZeroU64;

use galtree_core::BlockHandle;
use indexmap::IndexMap;

use crate::config::ArenaConfig;
use crate::error::ArenaError;

const WORD: usize = std::mem::size_of::<u64>();

/// Round a request up to a whole number of 8-byte words, minimum one word.
///
/// Returns `None` on overflow.
pub fn aligned_size(size: usize) -> Option<usize> {
    Some(size.max(1).checked_add(WORD - 1)? & !(WORD - 1))
}

struct Block {
    words: Vec<u64>,
    bytes: usize,
}

/// Allocator that tracks every live block in a table.
///
/// Freeing moves the last table entry into the freed slot, so the table
/// stays dense and the dump order is stable between frees.
pub struct BlockAllocator {
    table: IndexMap<BlockHandle, Block>,
    table_capacity: usize,
    max_table_entries: usize,
    memory_limit: Option<usize>,
    next_handle: NonZeroU64,
    outstanding_bytes: usize,
    high_water_bytes: usize,
}

impl BlockAllocator {
    /// Create an empty allocator.
    pub fn new(config: &ArenaConfig) -> Self {
        let table_capacity = config.effective_initial_capacity();
        Self {
            table: IndexMap::with_capacity(table_capacity),
            table_capacity,
            max_table_entries: config.max_table_entries.max(1),
            memory_limit: config.memory_limit,
            next_handle: NonZeroU64::MIN,
            outstanding_bytes: 0,
            high_water_bytes: 0,
        }
    }

    /// Allocate a zeroed block of at least `size` bytes.
    pub fn try_alloc(&mut self, size: usize) -> Result<BlockHandle, ArenaError> {
        let bytes = aligned_size(size).ok_or(ArenaError::SizeOverflow { requested: size })?;
        self.ensure_table_slot()?;
        self.check_limit(bytes, 0)?;
        let words = zeroed_words(bytes / WORD).ok_or(ArenaError::AllocationFailed {
            requested: bytes,
            outstanding: self.outstanding_bytes,
        })?;

        let handle = BlockHandle::new(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        self.table.insert(handle, Block { words, bytes });
        self.outstanding_bytes += bytes;
        self.high_water_bytes = self.high_water_bytes.max(self.outstanding_bytes);
        Ok(handle)
    }

    /// Resize a live block, preserving its contents up to the smaller size.
    ///
    /// Any live block may be resized, not only the most recent one. The
    /// handle stays the same; newly exposed words are zeroed.
    pub fn try_realloc(&mut self, handle: BlockHandle, size: usize) -> Result<(), ArenaError> {
        let bytes = aligned_size(size).ok_or(ArenaError::SizeOverflow { requested: size })?;
        let old_bytes = self
            .table
            .get(&handle)
            .map(|b| b.bytes)
            .ok_or(ArenaError::UnknownBlock { handle })?;
        self.check_limit(bytes, old_bytes)?;
        let outstanding = self.outstanding_bytes;
        let block = self
            .table
            .get_mut(&handle)
            .ok_or(ArenaError::UnknownBlock { handle })?;

        let new_len = bytes / WORD;
        if new_len > block.words.len() {
            block
                .words
                .try_reserve_exact(new_len - block.words.len())
                .map_err(|_| ArenaError::AllocationFailed {
                    requested: bytes,
                    outstanding,
                })?;
        }
        block.words.resize(new_len, 0);
        block.words.shrink_to(new_len);
        block.bytes = bytes;

        self.outstanding_bytes = self.outstanding_bytes - old_bytes + bytes;
        self.high_water_bytes = self.high_water_bytes.max(self.outstanding_bytes);
        Ok(())
    }

    /// Release a block. `None` is a no-op.
    pub fn try_free(&mut self, handle: Option<BlockHandle>) -> Result<(), ArenaError> {
        let Some(handle) = handle else {
            return Ok(());
        };
        let block = self
            .table
            .swap_remove(&handle)
            .ok_or(ArenaError::UnknownBlock { handle })?;
        self.outstanding_bytes -= block.bytes;
        Ok(())
    }

    /// Like [`try_alloc`](Self::try_alloc), aborting the process on failure.
    pub fn alloc(&mut self, size: usize) -> BlockHandle {
        match self.try_alloc(size) {
            Ok(handle) => handle,
            Err(e) => self.fatal(&e),
        }
    }

    /// Like [`try_realloc`](Self::try_realloc), aborting the process on failure.
    pub fn realloc(&mut self, handle: BlockHandle, size: usize) {
        if let Err(e) = self.try_realloc(handle, size) {
            self.fatal(&e);
        }
    }

    /// Like [`try_free`](Self::try_free), aborting the process on failure.
    pub fn free(&mut self, handle: Option<BlockHandle>) {
        if let Err(e) = self.try_free(handle) {
            self.fatal(&e);
        }
    }

    /// Words of a live block.
    pub fn block(&self, handle: BlockHandle) -> Option<&[u64]> {
        self.table.get(&handle).map(|b| b.words.as_slice())
    }

    /// Mutable words of a live block.
    pub fn block_mut(&mut self, handle: BlockHandle) -> Option<&mut [u64]> {
        self.table.get_mut(&handle).map(|b| b.words.as_mut_slice())
    }

    /// Words of a block the caller knows to be live.
    ///
    /// Aborts the process like [`free`](Self::free) if it is not.
    pub fn live_block(&self, handle: BlockHandle) -> &[u64] {
        match self.table.get(&handle) {
            Some(block) => &block.words,
            None => self.fatal(&ArenaError::UnknownBlock { handle }),
        }
    }

    /// Mutable words of a block the caller knows to be live.
    ///
    /// Aborts the process like [`free`](Self::free) if it is not.
    pub fn live_block_mut(&mut self, handle: BlockHandle) -> &mut [u64] {
        let Some(slot) = self.table.get_index_of(&handle) else {
            self.fatal(&ArenaError::UnknownBlock { handle })
        };
        &mut self.table[slot].words
    }

    /// Aligned size of a live block in bytes.
    pub fn size_of(&self, handle: BlockHandle) -> Option<usize> {
        self.table.get(&handle).map(|b| b.bytes)
    }

    /// Whether `handle` names a live block.
    pub fn contains(&self, handle: BlockHandle) -> bool {
        self.table.contains_key(&handle)
    }

    /// Number of live blocks.
    pub fn live_blocks(&self) -> usize {
        self.table.len()
    }

    /// Bytes currently outstanding across all live blocks.
    pub fn outstanding_bytes(&self) -> usize {
        self.outstanding_bytes
    }

    /// Largest value `outstanding_bytes` has reached.
    pub fn high_water_bytes(&self) -> usize {
        self.high_water_bytes
    }

    /// Current table capacity in entries.
    pub fn table_capacity(&self) -> usize {
        self.table_capacity
    }

    /// Live blocks in table order as `(handle, bytes)`.
    pub fn iter(&self) -> impl Iterator<Item = (BlockHandle, usize)> + '_ {
        self.table.iter().map(|(h, b)| (*h, b.bytes))
    }

    /// Log every live block at `error` level.
    pub fn dump_live_blocks(&self) {
        for (slot, (handle, bytes)) in self.iter().enumerate() {
            tracing::error!(slot, %handle, bytes, "live block");
        }
    }

    fn fatal(&self, err: &ArenaError) -> ! {
        tracing::error!(
            error = %err,
            live_blocks = self.live_blocks(),
            outstanding_bytes = self.outstanding_bytes,
            high_water_bytes = self.high_water_bytes,
            "fatal allocator failure"
        );
        self.dump_live_blocks();
        std::process::abort()
    }

    fn ensure_table_slot(&mut self) -> Result<(), ArenaError> {
        if self.table.len() < self.table_capacity {
            return Ok(());
        }
        if self.table_capacity >= self.max_table_entries {
            return Err(ArenaError::TableFull {
                entries: self.table.len(),
            });
        }
        let grown = self
            .table_capacity
            .saturating_mul(2)
            .min(self.max_table_entries);
        self.table
            .try_reserve(grown - self.table.len())
            .map_err(|_| ArenaError::TableFull {
                entries: self.table.len(),
            })?;
        tracing::debug!(from = self.table_capacity, to = grown, "block table grown");
        self.table_capacity = grown;
        Ok(())
    }

    fn check_limit(&self, bytes: usize, replacing: usize) -> Result<(), ArenaError> {
        let Some(limit) = self.memory_limit else {
            return Ok(());
        };
        let after = (self.outstanding_bytes - replacing).saturating_add(bytes);
        if after > limit {
            return Err(ArenaError::AllocationFailed {
                requested: bytes,
                outstanding: self.outstanding_bytes,
            });
        }
        Ok(())
    }
}

impl Default for BlockAllocator {
    fn default() -> Self {
        Self::new(&ArenaConfig::default())
    }
}

fn zeroed_words(len: usize) -> Option<Vec<u64>> {
    let mut words = Vec::new();
    words.try_reserve_exact(len).ok()?;
    words.resize(len, 0);
    Some(words)
}
