use std::collections::BTreeSet;
use std::sync::Arc;

use log::debug;

use crate::{Error, System};
use crate::locator::NeighborItem;

use super::{NeighborList, ListLengths, check_neighbors_count};

impl NeighborList {
    /// Update the lists after moving only the atoms in `modified`, without
    /// rebuilding everything.
    ///
    /// This is intended for Monte-Carlo simulations, where a few atoms are
    /// moved at each step. The lists of the modified atoms are rebuilt, and
    /// the lists of all the atoms which were or are now neighbors of the
    /// modified atoms are updated. This function returns the set of all atoms
    /// whose lists changed, including the modified atoms.
    ///
    /// This requires `full_lists`, and a valid neighbor list. If this function
    /// fails, the list is left invalid and must be rebuilt.
    pub fn remake_lists(&mut self, modified: &BTreeSet<usize>) -> Result<BTreeSet<usize>, Error> {
        if self.invalid {
            return Err(Error::Invalidated(
                "the neighbor list must be updated before calling remake_lists".into()
            ));
        }

        if !self.parameters.full_lists {
            return Err(Error::Precondition(
                "remake_lists can only be used with full_lists".into()
            ));
        }

        if modified.is_empty() {
            return Err(Error::Precondition(
                "remake_lists called without any modified atom".into()
            ));
        }

        if let Some(&atom) = modified.iter().find(|&&atom| atom >= self.primary.len()) {
            return Err(Error::InvalidParameter(format!(
                "atom index {} is out of bounds for a system with {} atoms",
                atom, self.primary.len()
            )));
        }

        let system = Arc::clone(&self.system);
        let system = system.read()?;

        self.invalid = true;
        let affected = self.remake_lists_with(&*system, modified)?;
        self.invalid = false;

        return Ok(affected);
    }

    #[time_graph::instrument(name = "NeighborList::remake_lists")]
    fn remake_lists_with(&mut self, system: &dyn System, modified: &BTreeSet<usize>) -> Result<BTreeSet<usize>, Error> {
        let atoms = modified.iter().copied().collect::<Vec<_>>();
        self.locator.renormalize_subset(system, &atoms)?;

        let mut affected = modified.clone();

        // remove the references to the modified atoms from their neighbors
        let cell = system.cell()?;
        let positions = system.positions()?;
        let list_cutoff = self.list_cutoff();
        for &atom in &atoms {
            for primary_side in [true, false] {
                let entries = if primary_side {
                    std::mem::take(&mut self.primary[atom])
                } else {
                    std::mem::take(&mut self.complementary[atom])
                };

                for item in &entries {
                    let neighbor = item.neighbor as usize;
                    affected.insert(neighbor);
                    if modified.contains(&neighbor) {
                        continue;
                    }

                    let mirror = NeighborItem {
                        neighbor: atom as u32,
                        translation: self.locator.inverse_translation(item.translation),
                    };

                    let opposite = if primary_side {
                        &mut self.complementary[neighbor]
                    } else {
                        &mut self.primary[neighbor]
                    };

                    if let Some(position) = opposite.iter().position(|other| *other == mirror) {
                        opposite.remove(position);
                    } else {
                        let distance = cell.distance(positions[atom], positions[neighbor]);
                        if distance <= list_cutoff {
                            return Err(Error::Inconsistent {
                                first: atom,
                                second: neighbor,
                                distance: distance,
                                expected: list_cutoff,
                            });
                        }
                    }
                }

                // give the memory back to the list
                let mut entries = entries;
                entries.clear();
                if primary_side {
                    self.primary[atom] = entries;
                } else {
                    self.complementary[atom] = entries;
                }
            }
        }

        // get new lists for the modified atoms, and add the mirror entries to
        // the lists of their new neighbors. The other entries of these lists
        // are kept as they are, they were computed from the reference
        // positions.
        let mut buffer = Vec::new();
        let mut max_lengths = self.max_lengths;
        let mut new_neighbors = BTreeSet::new();
        for &atom in &atoms {
            max_lengths = max_lengths.max(self.refill(atom, &mut buffer)?);

            for primary_side in [true, false] {
                buffer.clear();
                if primary_side {
                    buffer.extend_from_slice(&self.primary[atom]);
                } else {
                    buffer.extend_from_slice(&self.complementary[atom]);
                }

                for item in &buffer {
                    let neighbor = item.neighbor as usize;
                    if modified.contains(&neighbor) {
                        continue;
                    }

                    let mirror = NeighborItem {
                        neighbor: atom as u32,
                        translation: self.locator.inverse_translation(item.translation),
                    };

                    if primary_side {
                        self.complementary[neighbor].push(mirror);
                    } else {
                        self.primary[neighbor].push(mirror);
                    }
                    new_neighbors.insert(neighbor);
                }
            }
        }

        for &atom in &new_neighbors {
            let lengths = ListLengths::new(&self.primary[atom], &self.complementary[atom]);
            check_neighbors_count(atom, lengths.total, self.parameters.max_neighbors)?;
            max_lengths = max_lengths.max(lengths);
        }

        debug!(
            "updated neighbor lists of {} modified atoms and {} neighbors",
            atoms.len(), new_neighbors.len()
        );

        affected.extend(new_neighbors);

        self.locator.update_reference_positions(system, &atoms)?;
        self.update_max_lengths(max_lengths);
        self.rescale_translations(&cell);

        // the new entries were found with the current positions of the other
        // atoms, which can be up to `max_displacement` away from their
        // reference positions
        self.patch_margin = f64::max(self.patch_margin, self.max_displacement);
        if self.patch_margin > 0.0 {
            debug!(
                "{} of the drift margin is used by patched lists",
                self.patch_margin
            );
        }

        return Ok(affected);
    }
}
