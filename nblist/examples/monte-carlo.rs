use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use nblist::{NeighborList, NeighborListParameters, SimpleSystem, UnitCell, Vector3D};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut system = SimpleSystem::new(UnitCell::cubic(10.0));
    for i in 0..5 {
        for j in 0..5 {
            for k in 0..5 {
                system.add_atom(Vector3D::new(2.0 * i as f64, 2.0 * j as f64, 2.0 * k as f64));
            }
        }
    }
    let system = Arc::new(RwLock::new(system));

    let parameters = NeighborListParameters {
        full_lists: true,
        ..NeighborListParameters::new(2.5)
    };
    let mut list = NeighborList::new(system.clone(), parameters)?;
    list.make_list()?;

    let mut neighbors = vec![0; list.max_neighbor_list_length()];
    let count = list.get_full_neighbor_indices(0, &mut neighbors, None)?;
    println!("atom 0 has {} neighbors: {:?}", count, &neighbors[..count]);

    // move atom 0 to the center of the cell, and update the lists
    system.write().expect("poisoned lock").positions_mut()[0] = Vector3D::new(5.0, 5.0, 5.0);
    let affected = list.remake_lists(&BTreeSet::from([0]))?;
    println!("the lists of {} atoms were updated", affected.len());

    let mut neighbors = vec![0; list.max_neighbor_list_length()];
    let count = list.get_full_neighbor_indices(0, &mut neighbors, None)?;
    println!("atom 0 now has {} neighbors: {:?}", count, &neighbors[..count]);

    Ok(())
}
