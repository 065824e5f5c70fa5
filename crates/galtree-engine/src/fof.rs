//! Friends-of-friends group readiness and finalization.
//!
//! A group is ready once every progenitor of every member is done.
//! Finalizing it populates any member not yet populated, assigns group
//! roles, and copies the group's galaxies to the output array.

use galtree_core::{GalaxyType, TreeError};

use crate::context::TreeContext;

impl TreeContext<'_> {
    /// Whether every progenitor of every member of `root`'s group is done.
    ///
    /// `root` may be any member; it is resolved to the group root first.
    /// Once true for a group it stays true.
    pub fn is_ready(&self, root: usize) -> Result<bool, TreeError> {
        self.check_halo(root)?;
        let root = self.fof_root(root)?;
        for member in self.fof_members(root)? {
            for prog in self.progenitors(member)? {
                if !self.halo_done[prog] {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Finalize the group rooted at `root`.
    ///
    /// Returns `Ok(false)` without touching anything if the group is
    /// already finalized or not yet ready.
    pub fn process_group(&mut self, root: usize) -> Result<bool, TreeError> {
        self.check_halo(root)?;
        let root = self.fof_root(root)?;
        if self.fof_done[root] || !self.is_ready(root)? {
            return Ok(false);
        }
        let members = self.fof_members(root)?;
        for &member in &members {
            self.populate(member)?;
        }

        let central = self.slices[root].first;
        let mut galaxies = 0usize;
        for &member in &members {
            let slice = self.slices[member];
            for (position, index) in slice.indices().enumerate() {
                let Some(mut galaxy) = self.galaxy(index) else {
                    continue;
                };
                if position == 0 && galaxy.kind != GalaxyType::Orphan {
                    galaxy.kind = if member == root {
                        GalaxyType::Central
                    } else {
                        GalaxyType::Satellite
                    };
                }
                galaxy.central = central;
                self.working.set(self.arena, index, &galaxy);
                self.output.append(self.arena, &galaxy);
                galaxies += 1;
            }
        }

        self.fof_done[root] = true;
        self.counters.groups_processed += 1;
        tracing::trace!(root, members = members.len(), galaxies, "fof group finalized");
        Ok(true)
    }
}
