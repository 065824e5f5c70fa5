//! Test fixtures and synthetic merger trees for galtree development.
//!
//! - [`TreeBuilder`]: hand-built halo arrays with consistent links.
//! - [`fixtures`]: small named trees used across the test suites.
//! - [`random_forest`]: deterministic, seeded forests for property tests
//!   and benchmarks.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
mod forest;

pub use forest::{random_forest, ForestShape};

use galtree_core::{Halo, NO_LINK};

/// Builder for halo arrays with consistent progenitor and FOF links.
///
/// Every halo starts as the sole member of its own FOF group. Indices are
/// assigned in insertion order. Invalid indices panic; this is test code.
#[derive(Clone, Debug, Default)]
pub struct TreeBuilder {
    halos: Vec<Halo>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a halo at `snap_num` with `len` particles.
    pub fn halo(mut self, snap_num: i32, len: i32) -> Self {
        let index = self.halos.len() as i32;
        let mut halo = Halo::isolated(snap_num, len);
        halo.first_halo_in_fof_group = index;
        self.halos.push(halo);
        self
    }

    /// Set the virial mass of `halo`.
    pub fn mvir(mut self, halo: usize, mvir: f32) -> Self {
        self.halos[halo].mvir = mvir;
        self
    }

    /// Append `progenitor` to the end of `descendant`'s progenitor list.
    pub fn progenitor(mut self, descendant: usize, progenitor: usize) -> Self {
        self.halos[progenitor].descendant = descendant as i32;
        let head = self.halos[descendant].first_progenitor;
        if head == NO_LINK {
            self.halos[descendant].first_progenitor = progenitor as i32;
            return self;
        }
        let mut tail = head as usize;
        while self.halos[tail].next_progenitor != NO_LINK {
            tail = self.halos[tail].next_progenitor as usize;
        }
        self.halos[tail].next_progenitor = progenitor as i32;
        self
    }

    /// Chain `members` into one FOF group rooted at `members[0]`.
    pub fn fof_group(mut self, members: &[usize]) -> Self {
        let Some(&root) = members.first() else {
            return self;
        };
        for pair in members.windows(2) {
            self.halos[pair[0]].next_halo_in_fof_group = pair[1] as i32;
        }
        for &member in members {
            self.halos[member].first_halo_in_fof_group = root as i32;
        }
        if let Some(&last) = members.last() {
            self.halos[last].next_halo_in_fof_group = NO_LINK;
        }
        self
    }

    pub fn halos(&self) -> &[Halo] {
        &self.halos
    }

    pub fn len(&self) -> usize {
        self.halos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.halos.is_empty()
    }

    pub fn build(self) -> Vec<Halo> {
        self.halos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progenitors_chain_in_insertion_order() {
        let halos = TreeBuilder::new()
            .halo(1, 100)
            .halo(0, 50)
            .halo(0, 30)
            .halo(0, 10)
            .progenitor(0, 1)
            .progenitor(0, 2)
            .progenitor(0, 3)
            .build();
        assert_eq!(halos[0].first_progenitor, 1);
        assert_eq!(halos[1].next_progenitor, 2);
        assert_eq!(halos[2].next_progenitor, 3);
        assert_eq!(halos[3].next_progenitor, NO_LINK);
        assert!(halos[1..].iter().all(|h| h.descendant == 0));
        assert!(halos[0].is_root());
    }

    #[test]
    fn fof_group_links_ring() {
        let halos = TreeBuilder::new()
            .halo(0, 10)
            .halo(0, 10)
            .halo(0, 10)
            .fof_group(&[1, 0, 2])
            .build();
        assert!(halos.iter().all(|h| h.first_halo_in_fof_group == 1));
        assert_eq!(halos[1].next_halo_in_fof_group, 0);
        assert_eq!(halos[0].next_halo_in_fof_group, 2);
        assert_eq!(halos[2].next_halo_in_fof_group, NO_LINK);
    }

    #[test]
    fn new_halo_is_own_group() {
        let halos = TreeBuilder::new().halo(0, 1).halo(0, 1).build();
        assert_eq!(halos[1].first_halo_in_fof_group, 1);
        assert_eq!(halos[1].next_halo_in_fof_group, NO_LINK);
    }
}
