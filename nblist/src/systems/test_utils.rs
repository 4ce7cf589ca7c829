use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{System, Vector3D};
use super::{UnitCell, SimpleSystem};

pub fn test_system(name: &str) -> SimpleSystem {
    match name {
        "dimer" => get_dimer(),
        "fcc" => get_fcc(),
        "triclinic" => get_triclinic(),
        "slab" => get_slab(),
        "cluster" => get_cluster(),
        _ => panic!("unknown test system {}", name)
    }
}

/// Two atoms 1.5 apart in a large cubic cell
fn get_dimer() -> SimpleSystem {
    let mut system = SimpleSystem::new(UnitCell::cubic(10.0));
    system.add_atom(Vector3D::new(0.0, 0.0, 0.0));
    system.add_atom(Vector3D::new(1.5, 0.0, 0.0));
    return system;
}

/// 3x3x3 conventional cells of a FCC crystal, with lattice parameter 3.6 and
/// small random displacements
fn get_fcc() -> SimpleSystem {
    let lattice = 3.6;
    let mut rng = StdRng::seed_from_u64(0xfcc);
    let mut system = SimpleSystem::new(UnitCell::cubic(3.0 * lattice));
    let basis = [
        [0.0, 0.0, 0.0],
        [0.5, 0.5, 0.0],
        [0.5, 0.0, 0.5],
        [0.0, 0.5, 0.5],
    ];

    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                for b in &basis {
                    let position = Vector3D::new(
                        (i as f64 + b[0]) * lattice + rng.gen_range(-0.05..0.05),
                        (j as f64 + b[1]) * lattice + rng.gen_range(-0.05..0.05),
                        (k as f64 + b[2]) * lattice + rng.gen_range(-0.05..0.05),
                    );
                    system.add_atom(position);
                }
            }
        }
    }
    return system;
}

/// Random atoms in a triclinic cell, some of them outside of the cell
fn get_triclinic() -> SimpleSystem {
    let mut rng = StdRng::seed_from_u64(0x7c);
    let cell = UnitCell::triclinic(9.0, 10.0, 11.0, 80.0, 95.0, 110.0);
    let mut system = SimpleSystem::new(cell);
    for _ in 0..60 {
        let fractional = Vector3D::new(
            rng.gen_range(-0.2..1.2),
            rng.gen_range(-0.2..1.2),
            rng.gen_range(-0.2..1.2),
        );
        system.add_atom(cell.cartesian(fractional));
    }
    return system;
}

/// Random atoms in a slab, periodic along x and y only
fn get_slab() -> SimpleSystem {
    let mut rng = StdRng::seed_from_u64(0x51ab);
    let cell = UnitCell::orthorhombic(8.0, 9.0, 12.0).with_periodicity([true, true, false]);
    let mut system = SimpleSystem::new(cell);
    for _ in 0..50 {
        system.add_atom(Vector3D::new(
            rng.gen_range(0.0..8.0),
            rng.gen_range(0.0..9.0),
            rng.gen_range(-2.0..14.0),
        ));
    }
    return system;
}

/// Random atoms without any periodic boundary condition
fn get_cluster() -> SimpleSystem {
    let mut rng = StdRng::seed_from_u64(0xc1);
    let mut system = SimpleSystem::new(UnitCell::infinite());
    for _ in 0..40 {
        system.add_atom(Vector3D::new(
            rng.gen_range(-4.0..4.0),
            rng.gen_range(-4.0..4.0),
            rng.gen_range(-4.0..4.0),
        ));
    }
    return system;
}

/// Compute the set of neighbors of all atoms in the system by checking all
/// pairs of atoms, using the minimal image convention. This is only valid if
/// the cell is larger than twice the cutoff in all periodic directions.
pub fn brute_force_neighbors(system: &dyn System, cutoff: f64, ghosts: bool) -> Vec<BTreeSet<usize>> {
    let cell = system.cell().unwrap();
    let positions = system.positions().unwrap();
    let n_atoms = system.size().unwrap();
    let n_all = if ghosts { positions.len() } else { n_atoms };

    let mut neighbors = vec![BTreeSet::new(); positions.len()];
    for i in 0..n_all {
        for j in (i + 1)..n_all {
            if cell.distance2(positions[i], positions[j]) < cutoff * cutoff {
                neighbors[i].insert(j);
                neighbors[j].insert(i);
            }
        }
    }

    return neighbors;
}
