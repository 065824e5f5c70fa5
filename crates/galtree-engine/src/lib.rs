//! Merger-tree traversal and galaxy inheritance.
//!
//! A [`TreeContext`] owns the per-forest state: the borrowed halo array,
//! done flags, each halo's slice of the working galaxy array, and running
//! counters. Traversal walks every tree in post order, builds each halo's
//! galaxies once its progenitors are resolved, and finalizes a FOF group
//! as soon as every progenitor feeding any of its members is done.
//!
//! All memory goes through a caller-supplied
//! [`MemoryArena`](galtree_arena::MemoryArena). The context brackets its
//! lifetime with one scope and each tree walk with a nested one, so
//! nothing survives [`TreeContext::finish`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
mod fof;
pub mod galaxy_array;
mod inherit;
pub mod metrics;
pub mod traversal;

pub use config::{ConfigError, EngineConfig, ProgenitorOrder};
pub use context::{GalaxySlice, TreeContext};
pub use galaxy_array::GalaxyArray;
pub use metrics::ForestStats;
