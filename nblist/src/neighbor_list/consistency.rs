use std::sync::Arc;

use crate::{Error, UnitCell, Vector3D};
use crate::locator::NeighborItem;

use super::NeighborList;

impl NeighborList {
    /// Check that the primary and complementary lists agree with each other:
    /// each entry in the primary list of an atom must have a mirror entry in
    /// the complementary list of the neighbor, and the other way around.
    /// Missing entries are accepted for pairs further apart than
    /// `cutoff + 2 * drift`.
    ///
    /// If `strict` is `true`, this also checks that all pairs in the lists are
    /// closer than `cutoff + 2 * drift`, which is only true right after a
    /// rebuild.
    pub fn check_consistency(&self, strict: bool) -> Result<(), Error> {
        if self.invalid {
            return Err(Error::Invalidated(
                "the neighbor list must be updated before checking its consistency".into()
            ));
        }

        if !self.parameters.full_lists {
            return Err(Error::Precondition(
                "checking consistency requires full_lists".into()
            ));
        }

        let system = Arc::clone(&self.system);
        let system = system.read()?;
        let cell = system.cell()?;
        let positions = system.positions()?;

        let checker = ConsistencyChecker {
            list: self,
            cell: cell,
            positions: positions,
            periodic: self.reference_cell.is_periodic(),
            list_cutoff: self.list_cutoff(),
        };

        for atom in 0..self.n_atoms {
            for item in &self.primary[atom] {
                checker.check_mirror(atom, item, &self.complementary)?;
                if strict {
                    checker.check_distance(atom, item)?;
                }
            }

            for item in &self.complementary[atom] {
                checker.check_mirror(atom, item, &self.primary)?;
                if strict {
                    checker.check_distance(atom, item)?;
                }
            }
        }

        return Ok(());
    }
}

struct ConsistencyChecker<'a> {
    list: &'a NeighborList,
    cell: UnitCell,
    /// raw positions from the system
    positions: &'a [Vector3D],
    periodic: bool,
    list_cutoff: f64,
}

impl ConsistencyChecker<'_> {
    /// Check that the mirror of `item` exists in the `opposite` lists. A
    /// missing mirror is fine if the atoms are further apart than the list
    /// cutoff.
    fn check_mirror(&self, atom: usize, item: &NeighborItem, opposite: &[Vec<NeighborItem>]) -> Result<(), Error> {
        let neighbor = item.neighbor as usize;
        let mirror = NeighborItem {
            neighbor: atom as u32,
            translation: self.list.locator.inverse_translation(item.translation),
        };

        if opposite[neighbor].contains(&mirror) {
            return Ok(());
        }

        let distance = self.cell.distance(self.positions[atom], self.positions[neighbor]);
        if distance > self.list_cutoff {
            return Ok(());
        }

        return Err(Error::Inconsistent {
            first: atom,
            second: neighbor,
            distance: distance,
            expected: self.list_cutoff,
        });
    }

    /// Check that the pair stored in `item` is within the list cutoff
    fn check_distance(&self, atom: usize, item: &NeighborItem) -> Result<(), Error> {
        let neighbor = item.neighbor as usize;
        let wrapped = self.list.locator.wrapped_positions();
        let mut vector = wrapped[neighbor] - wrapped[atom];
        if self.periodic {
            vector -= self.list.scaled_translations[item.translation as usize];
        }

        let distance = vector.norm();
        if distance > self.list_cutoff {
            return Err(Error::Inconsistent {
                first: atom,
                second: neighbor,
                distance: distance,
                expected: self.list_cutoff,
            });
        }

        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, RwLock};

    use approx::assert_ulps_eq;

    use crate::NeighborListParameters;
    use crate::systems::test_utils::test_system;
    use super::super::tests::{shared, full_parameters};
    use super::*;

    #[test]
    fn consistent_lists() {
        for name in ["fcc", "triclinic", "slab", "cluster"] {
            let mut list = NeighborList::new(shared(test_system(name)), full_parameters(3.0)).unwrap();
            list.make_list().unwrap();
            list.check_consistency(true).unwrap();
        }
    }

    #[test]
    fn preconditions() {
        let system = shared(test_system("fcc"));
        let list = NeighborList::new(system.clone(), full_parameters(3.0)).unwrap();
        let result = list.check_consistency(false);
        assert!(matches!(result, Err(Error::Invalidated(_))));

        let mut list = NeighborList::new(system, NeighborListParameters::new(3.0)).unwrap();
        list.make_list().unwrap();
        let result = list.check_consistency(false);
        assert!(matches!(result, Err(Error::Precondition(_))));
    }

    #[test]
    fn missing_mirror() {
        let mut list = NeighborList::new(shared(test_system("dimer")), full_parameters(2.0)).unwrap();
        list.make_list().unwrap();
        list.check_consistency(true).unwrap();

        list.complementary[1].clear();
        let error = list.check_consistency(false).unwrap_err();
        match error {
            Error::Inconsistent { first, second, distance, expected } => {
                assert_eq!(first, 0);
                assert_eq!(second, 1);
                assert_ulps_eq!(distance, 1.5);
                assert_ulps_eq!(expected, 2.2);
            }
            _ => panic!("unexpected error {:?}", error),
        }

        // an atom can not be its own neighbor without a translation
        let mut list = NeighborList::new(shared(test_system("dimer")), full_parameters(2.0)).unwrap();
        list.make_list().unwrap();
        list.primary[0].push(NeighborItem { neighbor: 0, translation: 0 });
        let result = list.check_consistency(false);
        assert!(matches!(result, Err(Error::Inconsistent { first: 0, second: 0, .. })));
    }

    #[test]
    fn pair_too_far() {
        let system = Arc::new(RwLock::new(test_system("dimer")));
        let mut list = NeighborList::new(system.clone(), full_parameters(2.0)).unwrap();
        list.make_list().unwrap();

        system.write().unwrap().positions_mut()[1] = Vector3D::new(4.0, 0.0, 0.0);
        assert!(list.check_neighbor_list().unwrap());

        // the lists still agree with each other, but contain a pair which is
        // too far away
        list.check_consistency(false).unwrap();
        let error = list.check_consistency(true).unwrap_err();
        match error {
            Error::Inconsistent { first, second, distance, .. } => {
                assert_eq!((first, second), (0, 1));
                assert_ulps_eq!(distance, 4.0);
            }
            _ => panic!("unexpected error {:?}", error),
        }
    }
}
