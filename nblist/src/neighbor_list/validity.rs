use std::sync::Arc;

use log::debug;

use crate::{Error, System, UnitCell, Vector3D};
use super::NeighborList;

impl NeighborList {
    /// Check if the lists need to be rebuilt, using the current positions in
    /// the system.
    ///
    /// This also updates the positions used by the query functions, and must
    /// be called after atoms moved, before getting neighbors. This function
    /// returns `true` if the list is invalid, if the number of atoms or the
    /// periodic boundary conditions changed, or if atoms moved too much since
    /// the last rebuild.
    pub fn check_neighbor_list(&mut self) -> Result<bool, Error> {
        let system = Arc::clone(&self.system);
        let system = system.read()?;
        return self.check_with(&*system);
    }

    /// Check the lists with [`NeighborList::check_neighbor_list`], and rebuild
    /// them if needed. This returns `true` if the lists were rebuilt.
    pub fn check_and_update(&mut self) -> Result<bool, Error> {
        let system = Arc::clone(&self.system);
        let system = system.read()?;
        return self.check_and_update_with(&*system);
    }

    /// Same as [`NeighborList::check_and_update`], but opening access to the
    /// system with [`System::begin_access`] before the update and closing it
    /// with [`System::end_access`] after. The access is closed even if the
    /// update fails.
    pub fn check_and_update_scoped(&mut self, view: &(dyn std::any::Any + Send + Sync)) -> Result<bool, Error> {
        let system = Arc::clone(&self.system);
        let mut system = system.write()?;

        system.begin_access(view)?;
        let result = self.check_and_update_with(&*system);
        system.end_access();

        return result;
    }

    fn check_and_update_with(&mut self, system: &dyn System) -> Result<bool, Error> {
        let update = self.check_with(system)?;
        if update {
            self.make_list_with(system)?;
        }
        return Ok(update);
    }

    #[time_graph::instrument(name = "NeighborList::check")]
    fn check_with(&mut self, system: &dyn System) -> Result<bool, Error> {
        if self.invalid {
            debug!("neighbor list is invalid, it must be rebuilt");
            return Ok(true);
        }

        if system.size()? != self.n_atoms || system.ghosts()? != self.n_ghosts {
            debug!("the number of atoms changed, the neighbor list must be rebuilt");
            return Ok(true);
        }

        let cell = system.cell()?;
        if cell.periodic() != self.reference_cell.periodic() {
            debug!("the periodic boundary conditions changed, the neighbor list must be rebuilt");
            return Ok(true);
        }

        self.locator.renormalize_positions(system)?;
        self.rescale_translations(&cell);

        let budget = self.drift - self.patch_margin - self.strain_displacement(&cell);
        if budget <= 0.0 {
            debug!("the unit cell changed too much, the neighbor list must be rebuilt");
            self.max_displacement = f64::INFINITY;
            return Ok(true);
        }

        let budget2 = budget * budget;
        let positions = system.positions()?;
        let reference = self.locator.reference_positions();
        let mut max_displacement2 = 0.0;
        for (atom, (&position, &reference)) in positions.iter().zip(reference).take(self.n_atoms).enumerate() {
            let displacement2 = (position - reference).norm2();
            if displacement2 > budget2 {
                debug!("atom {} moved too much, the neighbor list must be rebuilt", atom);
                self.max_displacement = f64::INFINITY;
                return Ok(true);
            }
            max_displacement2 = f64::max(max_displacement2, displacement2);
        }

        self.max_displacement = f64::sqrt(max_displacement2);
        return Ok(false);
    }

    /// Get the largest displacement between two atoms in the lists that can
    /// be caused by the deformation of the unit cell since the last rebuild
    fn strain_displacement(&self, cell: &UnitCell) -> f64 {
        let periodic = self.reference_cell.periodic();
        let matrix = cell.matrix();
        let reference = self.reference_cell.matrix();
        let list_cutoff = self.list_cutoff();

        let mut deformations = [Vector3D::zero(); 3];
        for xyz in 0..3 {
            if periodic[xyz] {
                let delta = matrix.row(xyz) - reference.row(xyz);
                deformations[xyz] = delta * (list_cutoff / self.reference_heights[xyz]);
            }
        }

        let mut strain = 0.0;
        for signs in [
            [1.0, 1.0, 1.0], [1.0, 1.0, -1.0], [1.0, -1.0, 1.0], [1.0, -1.0, -1.0],
            [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, -1.0, -1.0],
        ] {
            let displacement = signs[0] * deformations[0] + signs[1] * deformations[1] + signs[2] * deformations[2];
            strain = f64::max(strain, displacement.norm());
        }

        return strain;
    }
}
