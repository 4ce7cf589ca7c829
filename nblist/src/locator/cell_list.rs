use ndarray::Array3;

use crate::{UnitCell, Vector3D};
use super::CellShift;

/// Maximal number of cells, we need to use this to prevent having too many
/// cells with a small unit cell and a large cutoff
const MAX_NUMBER_OF_CELLS: f64 = 1e5;

/// Data associated with an atoms inside the `CellList`
#[derive(Debug, Clone)]
struct AtomData {
    /// index of the atom in the original system
    index: usize,
    /// the shift vector from the actual atom position to the image of this atom
    /// inside the unit cell
    shift: CellShift,
}

/// Where an atom was stored in a `CellList`. This is required to remove the
/// atom from the list, and to find candidate neighbors around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinLocation {
    /// index of the bin containing this atom
    bin: [usize; 3],
    /// the shift vector from the actual atom position to the image of this
    /// atom inside the bin
    shift: CellShift,
}

impl BinLocation {
    /// Get the shift vector from the actual atom position to the image of
    /// this atom inside the unit cell
    pub fn shift(&self) -> CellShift {
        self.shift
    }
}

/// The cell list is used to sort atoms inside bins/cells.
///
/// The list of candidate neighbors of an atom is then constructed by looking
/// through all neighboring cells (the number of cells to search depends on the
/// cutoff and the size of the cells).
///
/// Along periodic directions, bin indexes are wrapped around and the atoms in
/// the wrapped bins are reported with the corresponding cell shift. Along
/// non-periodic directions, atoms outside of the cell are put in the first or
/// last bin, and the search stops at the cell boundaries.
#[derive(Debug, Clone)]
pub struct CellList {
    /// How many cells do we need to look at when searching neighbors to include
    /// all neighbors below cutoff
    n_search: [i32; 3],
    /// the cells themselves
    cells: Array3<Vec<AtomData>>,
    /// Unit cell defining periodic boundary conditions
    unit_cell: UnitCell,
}

impl CellList {
    /// Create a new `CellList` for the given unit cell and cutoff, determining
    /// all required parameters.
    pub fn new(unit_cell: UnitCell, cutoff: f64) -> CellList {
        let distances_between_faces = if unit_cell.is_infinite() {
            // use a pseudo orthorhombic cell with size 1, `n_search` below will
            // make sure we look to every cell up to the cutoff
            Vector3D::new(1.0, 1.0, 1.0)
        } else {
            unit_cell.distances_between_faces()
        };

        let mut n_cells = [
            f64::clamp(f64::trunc(distances_between_faces[0] / cutoff), 1.0, f64::INFINITY),
            f64::clamp(f64::trunc(distances_between_faces[1] / cutoff), 1.0, f64::INFINITY),
            f64::clamp(f64::trunc(distances_between_faces[2] / cutoff), 1.0, f64::INFINITY),
        ];

        assert!(n_cells[0].is_finite() && n_cells[1].is_finite() && n_cells[2].is_finite());

        // limit memory consumption by ensuring we have less than `MAX_N_CELLS`
        // cells to look though
        let n_cells_total = n_cells[0] * n_cells[1] * n_cells[2];
        if n_cells_total > MAX_NUMBER_OF_CELLS {
            // set the total number of cells close to MAX_N_CELLS, while keeping
            // roughly the ratio of cells in each direction
            let ratio_x_y = n_cells[0] / n_cells[1];
            let ratio_y_z = n_cells[1] / n_cells[2];

            n_cells[2] = f64::max(1.0, f64::trunc(f64::cbrt(MAX_NUMBER_OF_CELLS / (ratio_x_y * ratio_y_z * ratio_y_z))));
            n_cells[1] = f64::max(1.0, f64::trunc(ratio_y_z * n_cells[2]));
            n_cells[0] = f64::max(1.0, f64::trunc(ratio_x_y * n_cells[1]));
        }

        // number of cells to search in each direction to make sure all possible
        // pairs below the cutoff are accounted for.
        let mut n_search = [
            f64::ceil(cutoff * n_cells[0] / distances_between_faces[0]) as i32,
            f64::ceil(cutoff * n_cells[1] / distances_between_faces[1]) as i32,
            f64::ceil(cutoff * n_cells[2] / distances_between_faces[2]) as i32,
        ];

        let n_cells = [
            n_cells[0] as usize,
            n_cells[1] as usize,
            n_cells[2] as usize,
        ];

        let periodic = unit_cell.periodic();
        for xyz in 0..3 {
            if n_search[xyz] < 1 {
                n_search[xyz] = 1;
            }

            // don't look for neighboring cells if we have only one cell and no
            // periodic boundary condition
            if n_cells[xyz] == 1 && !periodic[xyz] {
                n_search[xyz] = 0;
            }
        }

        CellList {
            n_search: n_search,
            cells: Array3::from_elem(n_cells, Default::default()),
            unit_cell: unit_cell,
        }
    }

    fn n_cells(&self) -> [usize; 3] {
        let n_cells = self.cells.shape();
        [n_cells[0], n_cells[1], n_cells[2]]
    }

    /// Get the largest absolute value of the cell shift between two atoms
    /// reported by `for_each_candidate`, if no atom in the list has a shift
    /// larger than `max_atom_shift`.
    pub fn max_pair_shift(&self, max_atom_shift: i32) -> [i32; 3] {
        let n_cells = self.n_cells();
        let periodic = self.unit_cell.periodic();

        let mut range = [0; 3];
        for xyz in 0..3 {
            if periodic[xyz] {
                let n_cells = n_cells[xyz] as i32;
                let max_bin_shift = (self.n_search[xyz] + n_cells - 1) / n_cells;
                range[xyz] = max_bin_shift + 2 * max_atom_shift;
            }
        }
        return range;
    }

    /// Add a single atom to the cell list at the given `position`. The atom is
    /// uniquely identified by its `index`.
    pub fn add_atom(&mut self, index: usize, position: Vector3D) -> BinLocation {
        let fractional = if self.unit_cell.is_infinite() {
            position
        } else {
            self.unit_cell.fractional(position)
        };

        let n_cells = self.n_cells();
        let periodic = self.unit_cell.periodic();

        let mut bin = [0; 3];
        let mut shift = [0; 3];
        for xyz in 0..3 {
            // find the subcell in which this atom 'should go'
            let cell_index = f64::floor(fractional[xyz] * n_cells[xyz] as f64);

            if periodic[xyz] {
                // deal with pbc by wrapping the atom inside if it was outside
                // of the cell
                let (quotient, remainder) = divmod(cell_index as i32, n_cells[xyz]);
                shift[xyz] = quotient;
                bin[xyz] = remainder;
            } else {
                let max_index = (n_cells[xyz] - 1) as f64;
                bin[xyz] = f64::clamp(cell_index, 0.0, max_index) as usize;
            }
        }

        let location = BinLocation {
            bin: bin,
            shift: CellShift(shift),
        };

        self.cells[location.bin].push(AtomData {
            index: index,
            shift: location.shift,
        });

        return location;
    }

    /// Remove the atom with the given `index` from the cell list. The
    /// `location` must be the one returned by `add_atom` for this atom.
    ///
    /// Returns `false` if the atom was not found at this location.
    pub fn remove_atom(&mut self, index: usize, location: BinLocation) -> bool {
        let atoms = &mut self.cells[location.bin];
        if let Some(position) = atoms.iter().position(|atom| atom.index == index) {
            atoms.remove(position);
            return true;
        }
        return false;
    }

    /// Call `callback` with the index and cell shift of all the potential
    /// neighbors of the atom stored at `location`. Some of these might be
    /// separated by more than `cutoff`, so additional filtering is required.
    ///
    /// The vector between the atoms can be constructed as
    /// `position[neighbor] - position[atom] + shift.cartesian(unit_cell)`,
    /// where positions are the ones given to `add_atom`. The atom itself is
    /// also part of the candidates, with a zero shift.
    pub fn for_each_candidate(&self, location: BinLocation, mut callback: impl FnMut(usize, CellShift)) {
        let search_x = -self.n_search[0]..=self.n_search[0];
        let search_y = -self.n_search[1]..=self.n_search[1];
        let search_z = -self.n_search[2]..=self.n_search[2];

        // look through each neighboring cell
        for delta_x in search_x {
            for delta_y in search_y.clone() {
                for delta_z in search_z.clone() {
                    let cell_i = [
                        location.bin[0] as i32 + delta_x,
                        location.bin[1] as i32 + delta_y,
                        location.bin[2] as i32 + delta_z,
                    ];

                    // shift vector from one cell to the other and index of
                    // the neighboring cell
                    let (cell_shift, neighbor_cell_i) = match self.neighbor_cell(cell_i) {
                        Some(neighbor) => neighbor,
                        None => continue,
                    };

                    for atom_j in &self.cells[neighbor_cell_i] {
                        let shift = cell_shift + location.shift - atom_j.shift;
                        callback(atom_j.index, shift);
                    }
                }
            }
        }
    }

    /// Find the actual cell corresponding to the (possibly out of bounds)
    /// `cell_i`, and the associated shift. This returns `None` if the cell is
    /// outside of the unit cell along a non-periodic direction.
    fn neighbor_cell(&self, cell_i: [i32; 3]) -> Option<(CellShift, [usize; 3])> {
        let n_cells = self.n_cells();
        let periodic = self.unit_cell.periodic();

        let mut shift = [0; 3];
        let mut index = [0; 3];
        for xyz in 0..3 {
            if periodic[xyz] {
                let (quotient, remainder) = divmod(cell_i[xyz], n_cells[xyz]);
                shift[xyz] = quotient;
                index[xyz] = remainder;
            } else if cell_i[xyz] < 0 || cell_i[xyz] >= n_cells[xyz] as i32 {
                return None;
            } else {
                index[xyz] = cell_i[xyz] as usize;
            }
        }

        return Some((CellShift(shift), index));
    }
}

/// Function to compute both quotient and remainder of the division of a by b.
/// This function follows Python convention, making sure the remainder have the
/// same sign as `b`.
fn divmod(a: i32, b: usize) -> (i32, usize) {
    debug_assert!(b < (i32::MAX as usize));
    let b = b as i32;
    let mut quotient = a / b;
    let mut remainder = a % b;
    if remainder < 0 {
        remainder += b;
        quotient -= 1;
    }
    return (quotient, remainder as usize);
}
