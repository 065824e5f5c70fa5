//! Strongly-typed identifiers.

use std::fmt;
use std::num::NonZeroU64;

/// Identifies a live block owned by a block allocator.
///
/// Handles are never zero, so `Option<BlockHandle>` is the "null" block
/// and costs no extra space. A handle stays valid across `realloc` and
/// becomes dangling once the block is freed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockHandle(NonZeroU64);

impl BlockHandle {
    /// Wrap a non-zero handle value.
    pub fn new(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    /// Wrap a raw handle value. Returns `None` for zero.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// The raw, non-zero handle value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identity of a galaxy within one forest.
///
/// Assigned from a monotonically increasing counter owned by the tree
/// context; every copy of a galaxy record carries the same id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GalaxyId(pub u64);

impl fmt::Display for GalaxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for GalaxyId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Logical position of a record in a galaxy array.
///
/// Indices, not addresses, are the stable handle across array growth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GalaxyIndex(pub u32);

impl GalaxyIndex {
    /// Convert a signed raw index. Negative values have no index.
    pub fn from_signed(raw: i64) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }

    /// The index as a `usize` suitable for slicing.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GalaxyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for GalaxyIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
