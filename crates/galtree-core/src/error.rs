//! Structural errors in a halo graph.
//!
//! Producing well-formed halo arrays is the reader's job; detecting a
//! malformed one before it is read out of bounds is the traversal's.
//! Normal states (primordial halos, groups not yet ready, snapshot gaps)
//! are never errors.

use std::error::Error;
use std::fmt;

use crate::halo::HaloLink;

/// A halo array that cannot be traversed safely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeError {
    /// A relationship field points outside `[-1, halo_count)`.
    LinkOutOfRange {
        /// Halo holding the bad link.
        halo: usize,
        /// Which field.
        link: HaloLink,
        /// The offending value.
        value: i32,
        /// Number of halos in the forest.
        halo_count: usize,
    },
    /// A halo's snapshot number is outside `[0, snapshot_count)`.
    SnapshotOutOfRange {
        /// Halo holding the bad snapshot number.
        halo: usize,
        /// The offending value.
        snap_num: i32,
        /// Number of snapshots in the run.
        snapshot_count: i32,
    },
    /// A halo was reached again while its own progenitors were still
    /// being resolved.
    ProgenitorCycle {
        /// The halo reached twice.
        halo: usize,
    },
    /// A halo appears in the progenitor lists of two different halos.
    SharedProgenitor {
        /// The halo listed twice.
        halo: usize,
        /// First halo listing it.
        first: usize,
        /// Second halo listing it.
        second: usize,
    },
    /// Walking a FOF group revisited a member other than its root.
    FofCycle {
        /// Root the walk started from.
        root: usize,
    },
    /// A caller asked for a halo index the forest does not contain.
    HaloOutOfRange {
        /// The requested index.
        halo: usize,
        /// Number of halos in the forest.
        halo_count: usize,
    },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkOutOfRange {
                halo,
                link,
                value,
                halo_count,
            } => write!(
                f,
                "halo {halo}: {link} = {value} is outside [-1, {halo_count})"
            ),
            Self::SnapshotOutOfRange {
                halo,
                snap_num,
                snapshot_count,
            } => write!(
                f,
                "halo {halo}: snapshot {snap_num} is outside [0, {snapshot_count})"
            ),
            Self::ProgenitorCycle { halo } => {
                write!(f, "progenitor cycle through halo {halo}")
            }
            Self::SharedProgenitor {
                halo,
                first,
                second,
            } => write!(
                f,
                "halo {halo} is a progenitor of both halo {first} and halo {second}"
            ),
            Self::FofCycle { root } => write!(f, "FOF group rooted at {root} does not terminate"),
            Self::HaloOutOfRange { halo, halo_count } => {
                write!(f, "halo {halo} is outside a forest of {halo_count} halos")
            }
        }
    }
}

impl Error for TreeError {}
