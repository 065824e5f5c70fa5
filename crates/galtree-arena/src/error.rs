//! Allocator and scope error types.

use std::error::Error;
use std::fmt;

use galtree_core::BlockHandle;

use crate::scope::ScopeId;

/// Errors from the block allocator.
///
/// The fatal entry points never return these; they abort after dumping
/// the live-block table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The live-block table is at `max_table_entries` and cannot grow.
    TableFull {
        /// Number of live entries.
        entries: usize,
    },
    /// The underlying allocation failed or would exceed the memory limit.
    AllocationFailed {
        /// Aligned size of the failed request in bytes.
        requested: usize,
        /// Bytes outstanding when the request was made.
        outstanding: usize,
    },
    /// The handle does not name a live block.
    UnknownBlock {
        /// The unrecognised handle.
        handle: BlockHandle,
    },
    /// Rounding the request up to 8 bytes overflowed.
    SizeOverflow {
        /// The requested size in bytes.
        requested: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableFull { entries } => {
                write!(f, "block table full: {entries} live blocks")
            }
            Self::AllocationFailed {
                requested,
                outstanding,
            } => write!(
                f,
                "allocation of {requested} bytes failed with {outstanding} bytes outstanding"
            ),
            Self::UnknownBlock { handle } => write!(f, "unknown block {handle}"),
            Self::SizeOverflow { requested } => {
                write!(f, "request of {requested} bytes overflows alignment")
            }
        }
    }
}

impl Error for ArenaError {}

/// Scope imbalance. Always a bug in the calling code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeError {
    /// `end_scope` was called with no scope open.
    NoOpenScope,
    /// The scope id does not name an open scope.
    UnknownScope {
        /// The requested scope.
        scope: ScopeId,
        /// Number of scopes currently open.
        open: usize,
    },
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOpenScope => write!(f, "end_scope called with no open scope"),
            Self::UnknownScope { scope, open } => {
                write!(f, "scope {scope} is not open ({open} open)")
            }
        }
    }
}

impl Error for ScopeError {}
