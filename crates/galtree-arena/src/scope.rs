//! LIFO memory scopes layered on the block allocator.
//!
//! [`MemoryArena`] owns one [`BlockAllocator`] and a stack of frames.
//! Every block allocated through the scoped path while a frame is open
//! is recorded in that frame, and closing the frame frees all of them in
//! one pass. One arena belongs to one worker; it is passed explicitly to
//! whatever needs to allocate, never reached through a global.

use std::fmt;

use galtree_core::BlockHandle;

use crate::block::BlockAllocator;
use crate::config::ArenaConfig;
use crate::error::{ArenaError, ScopeError};
use crate::stats::ArenaStats;

/// Position of an open scope on the stack (0 = outermost).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
    /// Depth of this scope on the stack.
    pub fn depth(self) -> usize {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Block allocator plus a stack of allocation frames.
pub struct MemoryArena {
    blocks: BlockAllocator,
    frames: Vec<Vec<BlockHandle>>,
}

impl MemoryArena {
    /// Create an arena with no open scopes.
    pub fn new(config: &ArenaConfig) -> Self {
        Self {
            blocks: BlockAllocator::new(config),
            frames: Vec::new(),
        }
    }

    /// Open a new, empty scope on top of the stack.
    pub fn begin_scope(&mut self) -> ScopeId {
        self.frames.push(Vec::new());
        ScopeId(self.frames.len() - 1)
    }

    /// Close the innermost scope, freeing every block it recorded.
    ///
    /// Returns the number of blocks freed. With no scope open, logs a
    /// warning and returns [`ScopeError::NoOpenScope`]; nothing is freed.
    pub fn end_scope(&mut self) -> Result<usize, ScopeError> {
        let Some(frame) = self.frames.pop() else {
            tracing::warn!("end_scope called with no open scope");
            return Err(ScopeError::NoOpenScope);
        };
        let freed = frame.len();
        for handle in frame {
            self.blocks.free(Some(handle));
        }
        Ok(freed)
    }

    /// Close `scope` and every scope opened after it.
    ///
    /// Each inner scope closed on the way is a missing `end_scope` in the
    /// caller and is logged. Returns the total number of blocks freed.
    pub fn end_scope_to(&mut self, scope: ScopeId) -> Result<usize, ScopeError> {
        if scope.0 >= self.frames.len() {
            tracing::warn!(%scope, open = self.frames.len(), "closing a scope that is not open");
            return Err(ScopeError::UnknownScope {
                scope,
                open: self.frames.len(),
            });
        }
        let mut freed = 0;
        while self.frames.len() > scope.0 + 1 {
            tracing::warn!(
                depth = self.frames.len() - 1,
                target = %scope,
                "implicitly closing unbalanced scope"
            );
            freed += self.end_scope()?;
        }
        freed += self.end_scope()?;
        Ok(freed)
    }

    /// Run `f` inside a fresh scope that is closed when `f` returns.
    pub fn with_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let scope = self.begin_scope();
        let result = f(self);
        // f may itself leave scopes open; close down to ours.
        let _ = self.end_scope_to(scope);
        result
    }

    /// Record `handle` in the innermost scope.
    ///
    /// A `None` handle, no open scope, or a handle already held by an open
    /// scope is a no-op, so a block is freed at most once.
    pub fn register(&mut self, handle: Option<BlockHandle>) {
        match handle {
            Some(handle) if !self.is_registered(handle) => self.record(handle),
            _ => {}
        }
    }

    /// Record `handle` in a specific open scope. `None`, or a handle
    /// already held by any open scope, is a no-op.
    pub fn register_in(
        &mut self,
        scope: ScopeId,
        handle: Option<BlockHandle>,
    ) -> Result<(), ScopeError> {
        let open = self.frames.len();
        if scope.0 >= open {
            return Err(ScopeError::UnknownScope { scope, open });
        }
        if let Some(handle) = handle {
            if !self.is_registered(handle) {
                self.frames[scope.0].push(handle);
            }
        }
        Ok(())
    }

    /// Allocate a block recorded in the innermost scope.
    ///
    /// Aborts the process if the allocator fails.
    pub fn alloc_scoped(&mut self, size: usize) -> BlockHandle {
        let handle = self.blocks.alloc(size);
        self.record(handle);
        handle
    }

    /// Fallible form of [`alloc_scoped`](Self::alloc_scoped).
    pub fn try_alloc_scoped(&mut self, size: usize) -> Result<BlockHandle, ArenaError> {
        let handle = self.blocks.try_alloc(size)?;
        self.record(handle);
        Ok(handle)
    }

    /// Allocate a block recorded in `scope` rather than the innermost one.
    ///
    /// Aborts the process if the allocator fails.
    pub fn alloc_in(&mut self, scope: ScopeId, size: usize) -> Result<BlockHandle, ScopeError> {
        if scope.0 >= self.frames.len() {
            return Err(ScopeError::UnknownScope {
                scope,
                open: self.frames.len(),
            });
        }
        let handle = self.blocks.alloc(size);
        self.frames[scope.0].push(handle);
        Ok(handle)
    }

    /// Allocate a block that belongs to no scope.
    ///
    /// The caller must [`free`](Self::free) it. Aborts on failure.
    pub fn alloc(&mut self, size: usize) -> BlockHandle {
        self.blocks.alloc(size)
    }

    /// Resize a live block. Aborts on failure.
    pub fn realloc(&mut self, handle: BlockHandle, size: usize) {
        self.blocks.realloc(handle, size);
    }

    /// Fallible form of [`realloc`](Self::realloc).
    pub fn try_realloc(&mut self, handle: BlockHandle, size: usize) -> Result<(), ArenaError> {
        self.blocks.try_realloc(handle, size)
    }

    /// Free a block early, removing it from whichever scope recorded it.
    ///
    /// `None` is a no-op. Aborts if the block is not live.
    pub fn free(&mut self, handle: Option<BlockHandle>) {
        let Some(handle) = handle else {
            return;
        };
        self.forget(handle);
        self.blocks.free(Some(handle));
    }

    /// Fallible form of [`free`](Self::free).
    pub fn try_free(&mut self, handle: Option<BlockHandle>) -> Result<(), ArenaError> {
        let Some(handle) = handle else {
            return Ok(());
        };
        self.blocks.try_free(Some(handle))?;
        self.forget(handle);
        Ok(())
    }

    /// Words of a live block.
    pub fn block(&self, handle: BlockHandle) -> Option<&[u64]> {
        self.blocks.block(handle)
    }

    /// Mutable words of a live block.
    pub fn block_mut(&mut self, handle: BlockHandle) -> Option<&mut [u64]> {
        self.blocks.block_mut(handle)
    }

    /// Words of a block the caller knows to be live. Aborts if it is not.
    pub fn live_block(&self, handle: BlockHandle) -> &[u64] {
        self.blocks.live_block(handle)
    }

    /// Mutable words of a block the caller knows to be live. Aborts if it is not.
    pub fn live_block_mut(&mut self, handle: BlockHandle) -> &mut [u64] {
        self.blocks.live_block_mut(handle)
    }

    /// Read-only view of the underlying allocator.
    pub fn blocks(&self) -> &BlockAllocator {
        &self.blocks
    }

    /// Number of open scopes.
    pub fn scope_depth(&self) -> usize {
        self.frames.len()
    }

    /// Number of blocks recorded in `scope`, if it is open.
    pub fn scope_len(&self, scope: ScopeId) -> Option<usize> {
        self.frames.get(scope.0).map(Vec::len)
    }

    /// Current counters.
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            live_blocks: self.blocks.live_blocks(),
            outstanding_bytes: self.blocks.outstanding_bytes(),
            high_water_bytes: self.blocks.high_water_bytes(),
            table_capacity: self.blocks.table_capacity(),
            open_scopes: self.frames.len(),
        }
    }

    fn record(&mut self, handle: BlockHandle) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push(handle);
        }
    }

    fn is_registered(&self, handle: BlockHandle) -> bool {
        self.frames.iter().any(|frame| frame.contains(&handle))
    }

    fn forget(&mut self, handle: BlockHandle) {
        for frame in self.frames.iter_mut().rev() {
            if let Some(pos) = frame.iter().rposition(|h| *h == handle) {
                frame.swap_remove(pos);
                return;
            }
        }
    }
}

impl Default for MemoryArena {
    fn default() -> Self {
        Self::new(&ArenaConfig::default())
    }
}

impl Drop for MemoryArena {
    fn drop(&mut self) {
        if !self.frames.is_empty() {
            let leaked: usize = self.frames.iter().map(Vec::len).sum();
            tracing::warn!(
                open_scopes = self.frames.len(),
                leaked_blocks = leaked,
                "memory arena dropped with open scopes"
            );
        }
    }
}
