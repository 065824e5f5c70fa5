//! Tracked block allocation with LIFO memory scopes.
//!
//! Trees are processed one at a time and must leave nothing behind, so
//! every allocation the traversal makes goes through a table that knows
//! each live block, and is released in bulk when the scope that made it
//! closes.
//!
//! # Architecture
//!
//! ```text
//! MemoryArena (one per worker, passed explicitly)
//! ├── BlockAllocator
//! │   └── IndexMap<BlockHandle, Block> (live-block table, Vec<u64> words)
//! └── frames: Vec<Vec<BlockHandle>> (scope stack, innermost last)
//! ```
//!
//! # Failure model
//!
//! The `try_*` methods return [`ArenaError`]. The plain methods treat any
//! allocator error as fatal: they log the full live-block table at
//! `error` level and abort the process. Scope imbalance is a caller bug,
//! so it is logged and reported as [`ScopeError`] but never aborts.
//!
//! Blocks are `u64` word buffers, which gives the 8-byte alignment the
//! table promises without any `unsafe`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod config;
pub mod error;
pub mod scope;
pub mod stats;

pub use block::BlockAllocator;
pub use config::ArenaConfig;
pub use error::{ArenaError, ScopeError};
pub use scope::{MemoryArena, ScopeId};
pub use stats::ArenaStats;
