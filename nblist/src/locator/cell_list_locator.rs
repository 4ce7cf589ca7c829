use log::warn;

use crate::{Error, System, UnitCell, Vector3D};

use super::{NeighborItem, NeighborLocator};
use super::{CellList, BinLocation, CellShift, TranslationTable};

/// Which side of a pair should be reported by `CellListLocator::collect`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Primary,
    Complementary,
}

impl Side {
    /// Should a pair between `atom` and `neighbor` with the given `shift` (as
    /// reported by the cell list) be stored on this side?
    fn contains(self, atom: usize, neighbor: usize, shift: CellShift) -> bool {
        match self {
            Side::Primary => {
                neighbor > atom || (neighbor == atom && shift.is_positive())
            }
            Side::Complementary => {
                neighbor < atom || (neighbor == atom && (-shift).is_positive())
            }
        }
    }
}

/// Implementation of [`NeighborLocator`] based on a [`CellList`].
///
/// Positions are wrapped inside the unit cell along periodic directions when
/// calling `rebuild_all`, and the periodic offset used for each atom is kept
/// until the next call to `rebuild_all`. This means that atoms moving outside
/// of the cell are not wrapped back, and that translation identifiers stay
/// valid between rebuilds.
#[derive(Debug, Clone)]
pub struct CellListLocator {
    /// cutoff used to search for neighbors
    cutoff: f64,
    /// should we report pairs involving ghost atoms
    ghost_neighbors: bool,
    /// is the spatial index up to date
    valid: bool,
    /// number of real atoms at the last rebuild
    n_atoms: usize,
    /// unit cell at the last renormalization
    cell: UnitCell,
    /// periodic offset of each atom, such that `wrapped = raw - offset * H`
    offsets: Vec<CellShift>,
    /// positions wrapped inside the unit cell
    wrapped: Vec<Vector3D>,
    /// raw positions at the last rebuild
    reference: Vec<Vector3D>,
    /// spatial index, `None` before the first rebuild
    cell_list: Option<CellList>,
    /// location of each atom in the cell list, `None` for atoms which are not
    /// part of the cell list (ghosts)
    locations: Vec<Option<BinLocation>>,
    /// largest component of the shifts of atoms inside the cell list
    max_atom_shift: i32,
    /// all the translations we can produce
    translations: TranslationTable,
}

impl CellListLocator {
    /// Create a new locator searching for neighbors up to `cutoff`
    pub fn new(cutoff: f64) -> Result<CellListLocator, Error> {
        if !(cutoff > 0.0 && cutoff.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "cutoff must be a positive number, got {}", cutoff
            )));
        }

        Ok(CellListLocator {
            cutoff: cutoff,
            ghost_neighbors: false,
            valid: false,
            n_atoms: 0,
            cell: UnitCell::infinite(),
            offsets: Vec::new(),
            wrapped: Vec::new(),
            reference: Vec::new(),
            cell_list: None,
            locations: Vec::new(),
            max_atom_shift: 0,
            translations: TranslationTable::new(),
        })
    }

    /// Get the spatial index, or an error if it is not up to date
    fn cell_list(&self) -> Result<&CellList, Error> {
        match self.cell_list {
            Some(ref cell_list) if self.valid => Ok(cell_list),
            _ => Err(Error::Invalidated(
                "the neighbor locator must be rebuilt before use".into()
            )),
        }
    }

    /// Get the positions from `system`, checking that the number of atoms
    /// did not change since the last rebuild
    fn same_positions<'a>(&self, system: &'a dyn System) -> Result<&'a [Vector3D], Error> {
        self.cell_list()?;
        let positions = system.positions()?;
        if positions.len() != self.wrapped.len() || system.size()? != self.n_atoms {
            return Err(Error::Invalidated(
                "the number of atoms changed since the last rebuild of the neighbor locator".into()
            ));
        }
        return Ok(positions);
    }

    fn check_atom(&self, atom: usize) -> Result<(), Error> {
        if atom >= self.wrapped.len() {
            return Err(Error::InvalidParameter(format!(
                "atom index {} is out of bounds for a system with {} atoms",
                atom, self.wrapped.len()
            )));
        }
        Ok(())
    }

    #[time_graph::instrument(name = "CellListLocator::collect")]
    fn collect(&self, atom: usize, side: Side, output: &mut Vec<NeighborItem>) -> Result<usize, Error> {
        output.clear();
        let cell_list = self.cell_list()?;
        self.check_atom(atom)?;

        let location = match self.locations[atom] {
            Some(location) => location,
            None => return Ok(0),
        };

        let cell_matrix = self.cell.matrix();
        let cutoff2 = self.cutoff * self.cutoff;

        let mut missing = None;
        cell_list.for_each_candidate(location, |neighbor, shift| {
            if !side.contains(atom, neighbor, shift) {
                return;
            }

            let vector = self.wrapped[neighbor] - self.wrapped[atom] + shift.cartesian(&cell_matrix);
            let distance2 = vector.norm2();
            if distance2 >= cutoff2 {
                return;
            }

            if side == Side::Primary && distance2 < 1e-3 {
                warn!(
                    "atoms {} and {} are very close to one another ({} A)",
                    atom, neighbor, distance2.sqrt()
                );
            }

            // the entries store the translation to subtract from the
            // neighbor position, which is the opposite of the cell list shift
            match self.translations.id(-shift) {
                Some(translation) => output.push(NeighborItem {
                    neighbor: neighbor as u32,
                    translation: translation,
                }),
                None => missing = Some(shift),
            }
        });

        if let Some(shift) = missing {
            return Err(Error::Internal(format!(
                "missing translation {:?} for neighbors of atom {}", -shift, atom
            )));
        }

        return Ok(output.len());
    }
}

impl NeighborLocator for CellListLocator {
    fn cutoff(&self) -> f64 {
        self.cutoff
    }

    fn enable_ghost_neighbors(&mut self, enable: bool) {
        if self.ghost_neighbors != enable {
            self.ghost_neighbors = enable;
            self.valid = false;
        }
    }

    #[time_graph::instrument(name = "CellListLocator::rebuild_all")]
    fn rebuild_all(&mut self, system: &dyn System) -> Result<(), Error> {
        self.valid = false;

        let cell = system.cell()?;
        let n_atoms = system.size()?;
        let n_ghosts = system.ghosts()?;
        let positions = system.positions()?;

        if positions.len() != n_atoms + n_ghosts {
            return Err(Error::InvalidParameter(format!(
                "expected {} positions ({} atoms and {} ghosts), got {}",
                n_atoms + n_ghosts, n_atoms, n_ghosts, positions.len()
            )));
        }

        if positions.len() >= u32::MAX as usize {
            return Err(Error::InvalidParameter(format!(
                "too many atoms for the neighbor list: {}", positions.len()
            )));
        }

        let periodic = cell.periodic();
        let cell_matrix = cell.matrix();

        self.offsets.clear();
        self.wrapped.clear();
        for &position in positions {
            let mut offset = [0; 3];
            if cell.is_periodic() {
                let fractional = cell.fractional(position);
                for xyz in 0..3 {
                    if periodic[xyz] {
                        offset[xyz] = f64::floor(fractional[xyz]) as i32;
                    }
                }
            }

            let offset = CellShift(offset);
            self.wrapped.push(position - offset.cartesian(&cell_matrix));
            self.offsets.push(offset);
        }
        self.reference = positions.to_vec();

        let mut cell_list = CellList::new(cell, self.cutoff);
        let mut max_atom_shift = 0;
        self.locations.clear();
        for (index, &position) in self.wrapped.iter().enumerate() {
            if index >= n_atoms && !self.ghost_neighbors {
                self.locations.push(None);
                continue;
            }

            let location = cell_list.add_atom(index, position);
            max_atom_shift = i32::max(max_atom_shift, location.shift().max_abs());
            self.locations.push(Some(location));
        }

        self.translations.extend_to(cell_list.max_pair_shift(max_atom_shift));

        self.max_atom_shift = max_atom_shift;
        self.cell_list = Some(cell_list);
        self.cell = cell;
        self.n_atoms = n_atoms;
        self.valid = true;

        return Ok(());
    }

    fn renormalize_positions(&mut self, system: &dyn System) -> Result<(), Error> {
        let positions = self.same_positions(system)?;
        let cell = system.cell()?;
        if cell.periodic() != self.cell.periodic() {
            return Err(Error::Invalidated(
                "the periodic boundary conditions changed since the last rebuild of the neighbor locator".into()
            ));
        }

        let cell_matrix = cell.matrix();
        for ((wrapped, offset), &position) in self.wrapped.iter_mut().zip(&self.offsets).zip(positions) {
            *wrapped = position - offset.cartesian(&cell_matrix);
        }
        self.cell = cell;

        return Ok(());
    }

    fn renormalize_subset(&mut self, system: &dyn System, atoms: &[usize]) -> Result<(), Error> {
        let positions = self.same_positions(system)?;
        for &atom in atoms {
            self.check_atom(atom)?;
        }

        let cell_list = self.cell_list.as_mut().ok_or_else(|| Error::Internal(
            "missing cell list in a valid neighbor locator".into()
        ))?;

        let cell_matrix = self.cell.matrix();
        let mut max_atom_shift = self.max_atom_shift;
        for &atom in atoms {
            self.wrapped[atom] = positions[atom] - self.offsets[atom].cartesian(&cell_matrix);

            if let Some(location) = self.locations[atom] {
                if !cell_list.remove_atom(atom, location) {
                    return Err(Error::Internal(format!(
                        "atom {} is missing from the cell list", atom
                    )));
                }

                let location = cell_list.add_atom(atom, self.wrapped[atom]);
                max_atom_shift = i32::max(max_atom_shift, location.shift().max_abs());
                self.locations[atom] = Some(location);
            }
        }

        if max_atom_shift > self.max_atom_shift {
            self.translations.extend_to(cell_list.max_pair_shift(max_atom_shift));
            self.max_atom_shift = max_atom_shift;
        }

        return Ok(());
    }

    fn invalidate(&mut self) {
        self.valid = false;
    }

    fn candidates(&self, atom: usize, output: &mut Vec<NeighborItem>) -> Result<usize, Error> {
        self.collect(atom, Side::Primary, output)
    }

    fn complementary_candidates(&self, atom: usize, output: &mut Vec<NeighborItem>) -> Result<usize, Error> {
        self.collect(atom, Side::Complementary, output)
    }

    fn wrapped_positions(&self) -> &[Vector3D] {
        &self.wrapped
    }

    fn reference_positions(&self) -> &[Vector3D] {
        &self.reference
    }

    fn update_reference_positions(&mut self, system: &dyn System, atoms: &[usize]) -> Result<(), Error> {
        let positions = self.same_positions(system)?;
        for &atom in atoms {
            self.check_atom(atom)?;
            self.reference[atom] = positions[atom];
        }
        return Ok(());
    }

    fn translations(&self) -> &TranslationTable {
        &self.translations
    }
}
