use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use nblist::{NeighborList, NeighborListParameters, SimpleSystem, System, UnitCell, Vector3D};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let n_atoms = match std::env::args().nth(1) {
        Some(value) => value.parse()?,
        None => 5000,
    };

    // enable collection of profiling data
    time_graph::enable_data_collection(true);
    // clear any existing collected data
    time_graph::clear_collected_data();

    time_graph::spanned!("Full simulation", {
        simulate(n_atoms)?;
    });

    // get the call graph and display it
    let graph = time_graph::get_full_graph();
    // (this requires the "table" feature for the time_graph crate)
    println!("{}", graph.as_short_table());

    // also available for saving profiling data to the disk & future analysis
    // (this requires the "json" feature for the time_graph crate)
    println!("{}", graph.as_json());

    Ok(())
}

/// Run a fake simulation, alternating between small moves of all atoms (as
/// in molecular dynamics) and large moves of single atoms (as in Monte-Carlo)
fn simulate(n_atoms: usize) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(42);

    // liquid-like density of 0.05 atoms/A^3
    let length = f64::cbrt(n_atoms as f64 / 0.05);
    let cell = UnitCell::cubic(length);
    let mut system = SimpleSystem::new(cell);
    for _ in 0..n_atoms {
        system.add_atom(Vector3D::new(
            rng.gen_range(0.0..length),
            rng.gen_range(0.0..length),
            rng.gen_range(0.0..length),
        ));
    }
    let system = Arc::new(RwLock::new(system));

    let parameters = NeighborListParameters {
        drift_factor: 0.1,
        full_lists: true,
        ..NeighborListParameters::new(5.0)
    };
    let mut list = NeighborList::new(system.clone(), parameters)?;
    list.make_list()?;

    let mut rebuilds = 0;
    for _ in 0..50 {
        {
            let mut system = system.write().expect("poisoned lock");
            for position in system.positions_mut() {
                *position += Vector3D::new(
                    rng.gen_range(-0.02..0.02),
                    rng.gen_range(-0.02..0.02),
                    rng.gen_range(-0.02..0.02),
                );
            }
        }

        if list.check_and_update()? {
            rebuilds += 1;
        }
    }

    for _ in 0..1000 {
        let atom = rng.gen_range(0..n_atoms);
        let position = cell.cartesian(Vector3D::new(rng.gen(), rng.gen(), rng.gen()));
        system.write().expect("poisoned lock").positions_mut()[atom] = position;
        list.remake_lists(&BTreeSet::from([atom]))?;
    }

    list.check_consistency(false)?;

    let n_all = system.read().expect("poisoned lock").size()?;
    println!(
        "{} atoms, {} rebuilds, {} bytes used by the neighbor list",
        n_all, rebuilds, list.memory_usage()
    );

    Ok(())
}
