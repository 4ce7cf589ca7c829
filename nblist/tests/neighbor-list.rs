use std::collections::BTreeSet;

use approx::assert_ulps_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use nblist::{Error, NeighborItem, NeighborList, NeighborListParameters, SimpleSystem, System, UnitCell, Vector3D};

mod data;
use data::{brute_force, full_lists, query, shared, stored};

#[test]
fn coverage() {
    for (name, system) in data::all_systems() {
        let n_atoms = system.positions().unwrap().len();
        let expected = brute_force(&system, 3.0);

        let mut list = NeighborList::new(shared(system), full_lists(3.0)).unwrap();
        list.make_list().unwrap();

        let stored = stored(&list, n_atoms);
        for atom in 0..n_atoms {
            assert!(stored[atom].is_superset(&expected[atom]), "missing neighbors of atom {} in {}", atom, name);
            assert_eq!(query(&list, atom), expected[atom], "wrong neighbors of atom {} in {}", atom, name);
        }
    }
}

#[test]
fn half_lists() {
    for (name, system) in data::all_systems() {
        let n_atoms = system.positions().unwrap().len();
        let expected = brute_force(&system, 3.0);

        let mut list = NeighborList::new(shared(system), NeighborListParameters::new(3.0)).unwrap();
        list.make_list().unwrap();

        let mut neighbors = vec![0; list.max_neighbor_list_length()];
        for atom in 0..n_atoms {
            assert!(list.complementary(atom).is_empty());

            let count = list.get_neighbor_indices(atom, &mut neighbors, None).unwrap();
            for &neighbor in &neighbors[..count] {
                assert!(expected[atom].contains(&neighbor), "{} is not a neighbor of {} in {}", neighbor, atom, name);
            }
        }

        // each pair is stored exactly once
        for atom in 0..n_atoms {
            for &neighbor in &expected[atom] {
                let forward = list.primary(atom).iter().filter(|item| item.neighbor as usize == neighbor).count();
                let backward = list.primary(neighbor).iter().filter(|item| item.neighbor as usize == atom).count();
                assert_eq!(forward + backward, 1, "pair {}-{} in {}", atom, neighbor, name);
            }
        }
    }
}

#[test]
fn drift() {
    let parameters = NeighborListParameters {
        drift_factor: 0.1,
        ..full_lists(3.0)
    };

    let mut rng = StdRng::seed_from_u64(0xd81f7);
    for (name, system) in data::all_systems() {
        let n_atoms = system.positions().unwrap().len();
        let initial = system.positions().unwrap().to_vec();

        let system = shared(system);
        let mut list = NeighborList::new(system.clone(), parameters.clone()).unwrap();
        list.make_list().unwrap();

        for _ in 0..5 {
            {
                let mut system = system.write().unwrap();
                for (position, initial) in system.positions_mut().iter_mut().zip(&initial) {
                    *position = initial + data::random_displacement(&mut rng, 0.29);
                }
            }

            assert!(!list.check_and_update().unwrap(), "unexpected rebuild in {}", name);
            list.check_consistency(false).unwrap();

            let expected = brute_force(&*system.read().unwrap(), 3.0);
            for atom in 0..n_atoms {
                assert_eq!(query(&list, atom), expected[atom], "wrong neighbors of atom {} in {}", atom, name);
            }
        }

        // moving a single atom further than the drift triggers a rebuild
        system.write().unwrap().positions_mut()[7] = initial[7] + Vector3D::new(0.0, 0.31, 0.0);
        assert!(list.check_neighbor_list().unwrap());
        assert!(list.check_and_update().unwrap());
        list.check_consistency(true).unwrap();
    }
}

#[test]
fn query_vectors() {
    let mut rng = StdRng::seed_from_u64(0x9e7);
    for (name, system) in data::all_systems() {
        let n_atoms = system.positions().unwrap().len();
        let system = shared(system);
        let mut list = NeighborList::new(system.clone(), full_lists(3.0)).unwrap();
        list.make_list().unwrap();

        {
            let mut system = system.write().unwrap();
            for position in system.positions_mut() {
                *position += data::random_displacement(&mut rng, 0.1);
            }
        }
        assert!(!list.check_and_update().unwrap());

        let system = system.read().unwrap();
        let cell = system.cell().unwrap();
        let positions = system.positions().unwrap();

        let size = list.max_neighbor_list_length();
        let mut neighbors = vec![0; size];
        let mut vectors = vec![Vector3D::zero(); size];
        let mut distances2 = vec![0.0; size];
        for atom in 0..n_atoms {
            let count = list.get_full_neighbors(atom, &mut neighbors, &mut vectors, &mut distances2, None).unwrap();
            for i in 0..count {
                let mut expected = positions[neighbors[i]] - positions[atom];
                cell.vector_image(&mut expected);
                assert_ulps_eq!(vectors[i], expected, epsilon = 1e-9);
                assert!(distances2[i] < 9.0, "neighbor too far in {}", name);
            }
        }
    }
}

#[test]
fn symmetry() {
    for (name, system) in data::all_systems() {
        let n_atoms = system.positions().unwrap().len();
        let mut list = NeighborList::new(shared(system), full_lists(3.0)).unwrap();
        list.make_list().unwrap();
        list.check_consistency(true).unwrap();

        let translations = list.translations();
        for atom in 0..n_atoms {
            for item in list.primary(atom) {
                let mirror = NeighborItem {
                    neighbor: atom as u32,
                    translation: translations.inverse(item.translation),
                };
                assert!(
                    list.complementary(item.neighbor as usize).contains(&mirror),
                    "missing mirror of {:?} for atom {} in {}", item, atom, name
                );
            }
        }
    }
}

#[test]
fn rebuild_is_idempotent() {
    for (name, system) in data::all_systems() {
        let n_atoms = system.positions().unwrap().len();
        let mut list = NeighborList::new(shared(system), full_lists(3.0)).unwrap();

        list.make_list().unwrap();
        let first = stored(&list, n_atoms);
        list.make_list().unwrap();
        let second = stored(&list, n_atoms);

        assert_eq!(first, second, "different lists in {}", name);
    }
}

#[test]
fn ghosts() {
    let mut system = data::random_system(7, UnitCell::infinite(), 50);
    let real = system.positions().unwrap().to_vec();
    for position in real.iter().take(20) {
        system.add_ghost(position + Vector3D::new(8.0, 0.0, 0.0));
    }
    let expected = brute_force(&system, 3.0);
    let n_all = system.positions().unwrap().len();

    let parameters = NeighborListParameters {
        ghost_neighbors: true,
        ..full_lists(3.0)
    };
    let mut list = NeighborList::new(shared(system.clone()), parameters).unwrap();
    list.make_list().unwrap();
    for atom in 0..n_all {
        assert_eq!(query(&list, atom), expected[atom], "wrong neighbors of atom {}", atom);
    }

    // without ghost neighbors, ghosts are ignored
    let mut list = NeighborList::new(shared(system), full_lists(3.0)).unwrap();
    list.make_list().unwrap();
    for atom in 0..50 {
        let expected = expected[atom].iter().copied().filter(|&n| n < 50).collect::<BTreeSet<_>>();
        assert_eq!(query(&list, atom), expected);
    }
    for atom in 50..n_all {
        assert!(query(&list, atom).is_empty());
    }
}

#[test]
fn dimer() {
    let mut system = SimpleSystem::new(UnitCell::cubic(10.0));
    system.add_atom(Vector3D::new(0.0, 0.0, 0.0));
    system.add_atom(Vector3D::new(1.5, 0.0, 0.0));
    let system = shared(system);

    let parameters = NeighborListParameters {
        drift_factor: 0.1,
        ..NeighborListParameters::new(2.0)
    };
    let mut list = NeighborList::new(system.clone(), parameters).unwrap();
    list.make_list().unwrap();

    let mut neighbors = [0; 2];
    let mut vectors = [Vector3D::zero(); 2];
    let mut distances2 = [0.0; 2];
    let count = list.get_neighbors(0, &mut neighbors, &mut vectors, &mut distances2, None).unwrap();
    assert_eq!(count, 1);
    assert_eq!(neighbors[0], 1);
    assert_ulps_eq!(distances2[0], 2.25);

    assert!(!list.check_neighbor_list().unwrap());

    system.write().unwrap().positions_mut()[1] = Vector3D::new(1.9, 0.0, 0.0);
    assert!(list.check_neighbor_list().unwrap());
}

#[test]
fn cell_too_small() {
    let mut system = SimpleSystem::new(UnitCell::orthorhombic(10.0, 10.0, 3.9));
    system.add_atom(Vector3D::new(0.0, 0.0, 0.0));
    system.add_atom(Vector3D::new(1.5, 0.0, 0.0));

    let mut list = NeighborList::new(shared(system), NeighborListParameters::new(2.0)).unwrap();
    let error = list.make_list().unwrap_err();
    assert!(matches!(error, Error::Configuration(_)));
    assert!(list.check_neighbor_list().unwrap());
}

#[test]
fn json_parameters() {
    let system = shared(data::random_system(8, UnitCell::cubic(12.0), 100));
    let mut list = NeighborList::from_json(system, r#"{
        "cutoff": 3.0,
        "drift_factor": 0.2,
        "full_lists": true
    }"#).unwrap();

    assert_eq!(list.cutoff(), 3.0);
    assert_ulps_eq!(list.drift(), 0.6);
    assert!(list.full_lists());

    list.make_list().unwrap();
    list.check_consistency(true).unwrap();
}
