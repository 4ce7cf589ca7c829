use std::sync::{Arc, RwLock};

use crate::{Error, Vector3D};

mod cell;
pub use self::cell::{UnitCell, CellShape};

mod simple_system;
pub use self::simple_system::SimpleSystem;

#[cfg(test)]
pub(crate) mod test_utils;

/// A `System` deals with the storage of atoms and related information. The
/// neighbor list only reads from the system, and never creates or removes
/// atoms.
///
/// Atoms are indexed from `0` to `size() + ghosts()`. The first `size()`
/// atoms are real atoms; the remaining ones are ghost atoms, i.e. copies of
/// real atoms used to deal with boundaries without periodic wrapping.
pub trait System: Send + Sync {
    /// Get the unit cell for this system, including the periodic boundary
    /// conditions along each cell vector
    fn cell(&self) -> Result<UnitCell, Error>;

    /// Get the number of real atoms in this system
    fn size(&self) -> Result<usize, Error>;

    /// Get the number of ghost atoms in this system
    fn ghosts(&self) -> Result<usize, Error> {
        Ok(0)
    }

    /// Get the positions for all atoms in this system. The returned value must
    /// be a slice of length `self.size() + self.ghosts()` containing the
    /// Cartesian coordinates of all real atoms followed by all ghost atoms.
    /// The positions do not need to be wrapped inside the unit cell.
    fn positions(&self) -> Result<&[Vector3D], Error>;

    /// Open the system for access from outside its usual scope (for example
    /// from outside a calculation on a distributed system). The `view` value
    /// is opaque to the neighbor list, and only interpreted by the system.
    fn begin_access(&mut self, view: &(dyn std::any::Any + Send + Sync)) -> Result<(), Error> {
        let _ = view;
        Ok(())
    }

    /// Close an access opened with `begin_access`
    fn end_access(&mut self) {}
}

/// Shared handle to a system, used by everything that needs to outlive a
/// single borrow of the system (typically neighbor lists).
pub type SharedSystem = Arc<RwLock<dyn System>>;
