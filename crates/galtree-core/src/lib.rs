//! Core types for the galtree merger-tree engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the records exchanged with the I/O and physics collaborators: halo
//! records, galaxy records, typed identifiers, run parameters, and the
//! structural error raised when a halo graph is malformed.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod galaxy;
pub mod halo;
pub mod id;
pub mod params;

pub use error::TreeError;
pub use galaxy::{Galaxy, GalaxyType};
pub use halo::{Halo, HaloLink, NO_LINK};
pub use id::{BlockHandle, GalaxyId, GalaxyIndex};
pub use params::{ParamsError, RunParams};
