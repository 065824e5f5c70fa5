//! Halo records as supplied by the tree reader.
//!
//! Halos live in one flat array per forest and refer to each other by
//! zero-based index. [`NO_LINK`] (`-1`) marks an absent relationship.
//! Indices are resolved by the I/O layer; whether they are in range is
//! checked by the traversal, not here.

use std::fmt;

/// Sentinel index for "no such halo".
pub const NO_LINK: i32 = -1;

/// One dark-matter halo at one snapshot.
///
/// `first_progenitor`/`next_progenitor` form a singly-linked list of the
/// halos that merge into this one; by convention the first entry is the
/// dominant (most massive) progenitor. `first_halo_in_fof_group`/
/// `next_halo_in_fof_group` chain every halo of one friends-of-friends
/// group, starting at the group's root.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Halo {
    /// Snapshot this halo was identified at.
    pub snap_num: i32,
    /// Index of the halo this one flows into, or [`NO_LINK`] for a tree root.
    pub descendant: i32,
    /// Head of the progenitor list.
    pub first_progenitor: i32,
    /// Next sibling in the descendant's progenitor list.
    pub next_progenitor: i32,
    /// Root of this halo's FOF group.
    pub first_halo_in_fof_group: i32,
    /// Next member of the FOF group.
    pub next_halo_in_fof_group: i32,
    /// Particle count.
    pub len: i32,
    /// Virial mass in 10^10 Msun/h.
    pub mvir: f32,
}

impl Halo {
    /// A halo at `snap_num` with no links, forming its own FOF group once
    /// `first_halo_in_fof_group` is set by the caller.
    pub fn isolated(snap_num: i32, len: i32) -> Self {
        Self {
            snap_num,
            descendant: NO_LINK,
            first_progenitor: NO_LINK,
            next_progenitor: NO_LINK,
            first_halo_in_fof_group: NO_LINK,
            next_halo_in_fof_group: NO_LINK,
            len,
            mvir: 0.0,
        }
    }

    /// Raw value of one relationship field.
    pub fn link(&self, link: HaloLink) -> i32 {
        match link {
            HaloLink::Descendant => self.descendant,
            HaloLink::FirstProgenitor => self.first_progenitor,
            HaloLink::NextProgenitor => self.next_progenitor,
            HaloLink::FirstHaloInFofGroup => self.first_halo_in_fof_group,
            HaloLink::NextHaloInFofGroup => self.next_halo_in_fof_group,
        }
    }

    /// Whether this halo is the root of a tree.
    pub fn is_root(&self) -> bool {
        self.descendant == NO_LINK
    }

    /// Whether this halo has no progenitor (a primordial halo).
    pub fn is_primordial(&self) -> bool {
        self.first_progenitor == NO_LINK
    }

    /// Proxy used to rank progenitors by dominance.
    ///
    /// Uses the virial mass when the reader supplied one, otherwise the
    /// particle count.
    pub fn mass_proxy(&self) -> f64 {
        if self.mvir > 0.0 {
            f64::from(self.mvir)
        } else {
            f64::from(self.len)
        }
    }
}

/// Names one relationship field of a [`Halo`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HaloLink {
    /// `descendant`.
    Descendant,
    /// `first_progenitor`.
    FirstProgenitor,
    /// `next_progenitor`.
    NextProgenitor,
    /// `first_halo_in_fof_group`.
    FirstHaloInFofGroup,
    /// `next_halo_in_fof_group`.
    NextHaloInFofGroup,
}

impl HaloLink {
    /// Every relationship field, in declaration order.
    pub const ALL: [HaloLink; 5] = [
        HaloLink::Descendant,
        HaloLink::FirstProgenitor,
        HaloLink::NextProgenitor,
        HaloLink::FirstHaloInFofGroup,
        HaloLink::NextHaloInFofGroup,
    ];
}

impl fmt::Display for HaloLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Descendant => "Descendant",
            Self::FirstProgenitor => "FirstProgenitor",
            Self::NextProgenitor => "NextProgenitor",
            Self::FirstHaloInFofGroup => "FirstHaloInFOFgroup",
            Self::NextHaloInFofGroup => "NextHaloInFOFgroup",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolated_halo_is_root_and_primordial() {
        let h = Halo::isolated(3, 100);
        assert!(h.is_root());
        assert!(h.is_primordial());
        for link in HaloLink::ALL {
            assert_eq!(h.link(link), NO_LINK);
        }
    }

    #[test]
    fn mass_proxy_prefers_mvir() {
        let mut h = Halo::isolated(0, 500);
        assert_eq!(h.mass_proxy(), 500.0);
        h.mvir = 12.5;
        assert_eq!(h.mass_proxy(), 12.5);
    }

    #[test]
    fn link_reads_named_field() {
        let mut h = Halo::isolated(0, 1);
        h.next_halo_in_fof_group = 9;
        assert_eq!(h.link(HaloLink::NextHaloInFofGroup), 9);
        assert_eq!(HaloLink::NextHaloInFofGroup.to_string(), "NextHaloInFOFgroup");
    }
}
