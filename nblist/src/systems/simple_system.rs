use crate::Error;

use super::{UnitCell, System, Vector3D};

/// A simple implementation of `System` to use when no other is available
#[derive(Clone, Debug)]
pub struct SimpleSystem {
    cell: UnitCell,
    positions: Vec<Vector3D>,
    n_ghosts: usize,
}

impl SimpleSystem {
    /// Create a new empty system with the given unit cell
    pub fn new(cell: UnitCell) -> SimpleSystem {
        SimpleSystem {
            cell: cell,
            positions: Vec::new(),
            n_ghosts: 0,
        }
    }

    /// Add a real atom at the given position to this system.
    ///
    /// # Panics
    ///
    /// If ghost atoms were already added to this system, since real atoms
    /// must come before ghosts.
    pub fn add_atom(&mut self, position: Vector3D) {
        assert!(self.n_ghosts == 0, "can not add real atoms after ghost atoms");
        self.positions.push(position);
    }

    /// Add a ghost atom at the given position to this system
    pub fn add_ghost(&mut self, position: Vector3D) {
        self.positions.push(position);
        self.n_ghosts += 1;
    }

    /// Get mutable access to the positions of all atoms, to move them
    pub fn positions_mut(&mut self) -> &mut [Vector3D] {
        &mut self.positions
    }

    /// Change the unit cell of this system, keeping the atoms in place
    pub fn set_cell(&mut self, cell: UnitCell) {
        self.cell = cell;
    }

    /// Change the unit cell of this system, and move atoms so that their
    /// fractional coordinates stay the same
    pub fn deform_cell(&mut self, cell: UnitCell) {
        for position in &mut self.positions {
            *position = cell.cartesian(self.cell.fractional(*position));
        }
        self.cell = cell;
    }
}

impl System for SimpleSystem {
    fn size(&self) -> Result<usize, Error> {
        Ok(self.positions.len() - self.n_ghosts)
    }

    fn ghosts(&self) -> Result<usize, Error> {
        Ok(self.n_ghosts)
    }

    fn positions(&self) -> Result<&[Vector3D], Error> {
        Ok(&self.positions)
    }

    fn cell(&self) -> Result<UnitCell, Error> {
        Ok(self.cell)
    }
}
