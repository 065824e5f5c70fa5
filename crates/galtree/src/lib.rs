//! galtree: merger-tree traversal and galaxy inheritance for semi-analytic
//! galaxy formation codes.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the galtree sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use galtree::prelude::*;
//!
//! // Halo 1 (snapshot 0) is the sole progenitor of halo 0 (snapshot 1).
//! let mut descendant = Halo::isolated(1, 200);
//! descendant.first_progenitor = 1;
//! descendant.first_halo_in_fof_group = 0;
//! let mut progenitor = Halo::isolated(0, 150);
//! progenitor.descendant = 0;
//! progenitor.first_halo_in_fof_group = 1;
//! let halos = [descendant, progenitor];
//!
//! let params = RunParams::default();
//! let mut arena = MemoryArena::default();
//! let mut ctx = TreeContext::new(&halos, &params, EngineConfig::default(), &mut arena).unwrap();
//! let stats = ctx.run_forest().unwrap();
//! assert_eq!(stats.halos_visited, 2);
//!
//! // The progenitor's galaxy was carried into its descendant.
//! let galaxies = ctx.galaxies_of(0);
//! assert_eq!(galaxies.len(), 1);
//! assert_eq!(galaxies[0].kind, GalaxyType::Central);
//!
//! // Everything the context allocated is released with it.
//! ctx.finish();
//! assert_eq!(arena.stats().live_blocks, 0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `galtree-core` | Halo and galaxy records, ids, run parameters, structural errors |
//! | [`arena`] | `galtree-arena` | Block allocator and memory scopes |
//! | [`engine`] | `galtree-engine` | Tree context, inheritance, FOF groups, traversal |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Halo and galaxy records, ids, and run parameters (`galtree-core`).
pub use galtree_core as types;

/// Block allocator and LIFO memory scopes (`galtree-arena`).
///
/// One [`arena::MemoryArena`] per worker; pass it to every
/// [`engine::TreeContext`] that worker creates.
pub use galtree_arena as arena;

/// Per-forest traversal (`galtree-engine`).
pub use galtree_engine as engine;

/// Common imports for typical galtree usage.
///
/// ```rust
/// use galtree::prelude::*;
/// ```
pub mod prelude {
    // Records and ids
    pub use galtree_core::{Galaxy, GalaxyId, GalaxyIndex, GalaxyType, Halo, HaloLink, NO_LINK};

    // Parameters and errors
    pub use galtree_core::{ParamsError, RunParams, TreeError};

    // Memory
    pub use galtree_arena::{ArenaConfig, ArenaStats, MemoryArena, ScopeId};

    // Engine
    pub use galtree_engine::{
        ConfigError, EngineConfig, ForestStats, GalaxyArray, GalaxySlice, ProgenitorOrder,
        TreeContext,
    };
}
