//! Galaxy records and their fixed word layout.
//!
//! Galaxy arrays store records as runs of [`Galaxy::WORDS`] `u64` words
//! inside allocator blocks, so a record is `Copy` and carries no owned
//! data. Its astrophysical properties live in a separate block referenced
//! by handle; that block is shared by every copy of the record and never
//! moves when the array grows.

use std::fmt;

use crate::id::{BlockHandle, GalaxyId, GalaxyIndex};

/// Role of a galaxy relative to the halos of its FOF group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GalaxyType {
    /// The galaxy at the centre of a FOF group's root halo.
    Central,
    /// The main galaxy of a non-root member of a FOF group.
    Satellite,
    /// A galaxy whose host halo was absorbed by a merger and no longer
    /// has a halo of its own.
    Orphan,
}

impl GalaxyType {
    /// Stable numeric tag used by the word layout and by output writers.
    pub fn tag(self) -> u8 {
        match self {
            Self::Central => 0,
            Self::Satellite => 1,
            Self::Orphan => 2,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Central),
            1 => Some(Self::Satellite),
            2 => Some(Self::Orphan),
            _ => None,
        }
    }
}

impl fmt::Display for GalaxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Central => f.write_str("central"),
            Self::Satellite => f.write_str("satellite"),
            Self::Orphan => f.write_str("orphan"),
        }
    }
}

/// One galaxy as tracked by the traversal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Galaxy {
    /// Forest-unique identity, preserved across inheritance.
    pub id: GalaxyId,
    /// Current role.
    pub kind: GalaxyType,
    /// Snapshot of the halo currently carrying this galaxy.
    pub snap_num: i32,
    /// Index of the halo currently carrying this galaxy.
    pub halo: i32,
    /// Working-array index of the central galaxy of this galaxy's group,
    /// once the group has been finalized.
    pub central: Option<GalaxyIndex>,
    /// Snapshot at which the galaxy became an orphan.
    pub orphaned_at: Option<i32>,
    /// Property block owned by the physics collaborators.
    pub properties: Option<BlockHandle>,
}

const NONE_WORD: u64 = u64::MAX;

impl Galaxy {
    /// Number of `u64` words one record occupies.
    pub const WORDS: usize = 7;

    /// Size of one record in bytes.
    pub const BYTES: usize = Self::WORDS * std::mem::size_of::<u64>();

    /// A freshly formed central galaxy in `halo`.
    pub fn central(
        id: GalaxyId,
        halo: i32,
        snap_num: i32,
        properties: Option<BlockHandle>,
    ) -> Self {
        Self {
            id,
            kind: GalaxyType::Central,
            snap_num,
            halo,
            central: None,
            orphaned_at: None,
            properties,
        }
    }

    /// Encode into the array word layout.
    pub fn to_words(&self) -> [u64; Self::WORDS] {
        [
            self.id.0,
            u64::from(self.kind.tag()),
            u64::from(self.snap_num as u32),
            u64::from(self.halo as u32),
            self.central.map_or(NONE_WORD, |c| u64::from(c.0)),
            self.orphaned_at.map_or(NONE_WORD, |s| u64::from(s as u32)),
            self.properties.map_or(0, BlockHandle::get),
        ]
    }

    /// Decode from the array word layout.
    ///
    /// Returns `None` if fewer than [`WORDS`](Self::WORDS) words are given
    /// or the type tag is unknown.
    pub fn from_words(words: &[u64]) -> Option<Self> {
        let w = words.get(..Self::WORDS)?;
        let kind = GalaxyType::from_tag(u8::try_from(w[1]).ok()?)?;
        Some(Self {
            id: GalaxyId(w[0]),
            kind,
            snap_num: w[2] as u32 as i32,
            halo: w[3] as u32 as i32,
            central: optional_word(w[4]).map(|c| GalaxyIndex(c as u32)),
            orphaned_at: optional_word(w[5]).map(|s| s as u32 as i32),
            properties: BlockHandle::from_raw(w[6]),
        })
    }

    /// Whether this galaxy still has a halo of its own.
    pub fn is_hosted(&self) -> bool {
        !matches!(self.kind, GalaxyType::Orphan)
    }
}

fn optional_word(word: u64) -> Option<u64> {
    (word != NONE_WORD).then_some(word)
}
