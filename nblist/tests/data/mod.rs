#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use nblist::{NeighborList, NeighborListParameters, SimpleSystem, System, UnitCell, Vector3D};

/// Get a system with `n_atoms` at random positions in the given cell. Atoms
/// are placed in fractional coordinates between -0.2 and 1.2, i.e. some of
/// them are outside of the cell.
pub fn random_system(seed: u64, cell: UnitCell, n_atoms: usize) -> SimpleSystem {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut system = SimpleSystem::new(cell);

    if cell.is_infinite() {
        let size = f64::cbrt(n_atoms as f64 * 10.0);
        for _ in 0..n_atoms {
            system.add_atom(Vector3D::new(
                rng.gen_range(-size..size),
                rng.gen_range(-size..size),
                rng.gen_range(-size..size),
            ));
        }
    } else {
        for _ in 0..n_atoms {
            let fractional = Vector3D::new(
                rng.gen_range(-0.2..1.2),
                rng.gen_range(-0.2..1.2),
                rng.gen_range(-0.2..1.2),
            );
            system.add_atom(cell.cartesian(fractional));
        }
    }

    return system;
}

/// All the systems used in the tests, with their name
pub fn all_systems() -> Vec<(&'static str, SimpleSystem)> {
    vec![
        ("cubic", random_system(1, UnitCell::cubic(12.0), 150)),
        ("orthorhombic", random_system(2, UnitCell::orthorhombic(10.0, 12.0, 14.0), 150)),
        ("triclinic", random_system(3, UnitCell::triclinic(11.0, 12.0, 13.0, 75.0, 100.0, 115.0), 150)),
        ("slab", random_system(4, UnitCell::cubic(12.0).with_periodicity([true, true, false]), 120)),
        ("wire", random_system(5, UnitCell::cubic(12.0).with_periodicity([false, false, true]), 100)),
        ("cluster", random_system(6, UnitCell::infinite(), 80)),
    ]
}

/// Get a random vector with norm smaller than `max`
pub fn random_displacement(rng: &mut StdRng, max: f64) -> Vector3D {
    loop {
        let vector = Vector3D::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if vector.norm2() < 1.0 {
            return max * vector;
        }
    }
}

/// Compute all pairs closer than `cutoff` by checking every pair of atoms.
/// This is only valid when the cutoff is smaller than half of the distance
/// between faces of the cell.
pub fn brute_force(system: &dyn System, cutoff: f64) -> Vec<BTreeSet<usize>> {
    let cell = system.cell().unwrap();
    let positions = system.positions().unwrap();

    let mut neighbors = vec![BTreeSet::new(); positions.len()];
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            if cell.distance2(positions[i], positions[j]) < cutoff * cutoff {
                neighbors[i].insert(j);
                neighbors[j].insert(i);
            }
        }
    }

    return neighbors;
}

pub fn shared(system: SimpleSystem) -> Arc<RwLock<SimpleSystem>> {
    Arc::new(RwLock::new(system))
}

pub fn full_lists(cutoff: f64) -> NeighborListParameters {
    NeighborListParameters {
        full_lists: true,
        ..NeighborListParameters::new(cutoff)
    }
}

/// Get all the neighbors of `atom` within the cutoff, using the query
/// interface of the neighbor list
pub fn query(list: &NeighborList, atom: usize) -> BTreeSet<usize> {
    let mut neighbors = vec![0; list.max_neighbor_list_length()];
    let count = list.get_full_neighbor_indices(atom, &mut neighbors, None).unwrap();
    return neighbors[..count].iter().copied().collect();
}

/// Get the neighbor sets of all atoms, as stored in the lists (i.e. including
/// atoms further than the cutoff)
pub fn stored(list: &NeighborList, n_atoms: usize) -> Vec<BTreeSet<usize>> {
    (0..n_atoms).map(|atom| {
        list.primary(atom).iter()
            .chain(list.complementary(atom))
            .map(|item| item.neighbor as usize)
            .collect()
    }).collect()
}
