use indexmap::IndexSet;

use crate::{Matrix3, Vector3D};

/// A cell shift represents the displacement along cell axis between the actual
/// position of an atom and a periodic image of this atom.
///
/// The cell shift can be used to reconstruct the vector between two points,
/// wrapped inside the unit cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CellShift(pub [i32; 3]);

impl std::ops::Add<CellShift> for CellShift {
    type Output = CellShift;

    fn add(mut self, rhs: CellShift) -> Self::Output {
        self.0[0] += rhs[0];
        self.0[1] += rhs[1];
        self.0[2] += rhs[2];
        return self;
    }
}

impl std::ops::Sub<CellShift> for CellShift {
    type Output = CellShift;

    fn sub(mut self, rhs: CellShift) -> Self::Output {
        self.0[0] -= rhs[0];
        self.0[1] -= rhs[1];
        self.0[2] -= rhs[2];
        return self;
    }
}

impl std::ops::Neg for CellShift {
    type Output = CellShift;

    fn neg(self) -> Self::Output {
        CellShift([-self[0], -self[1], -self[2]])
    }
}

impl std::ops::Index<usize> for CellShift {
    type Output = i32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl CellShift {
    /// Compute the shift vector in cartesian coordinates, using the given cell
    /// matrix (stored in row major order).
    pub fn cartesian(&self, cell: &Matrix3) -> Vector3D {
        let x = cell[0][0] * self[0] as f64 + cell[1][0] * self[1] as f64 + cell[2][0] * self[2] as f64;
        let y = cell[0][1] * self[0] as f64 + cell[1][1] * self[1] as f64 + cell[2][1] * self[2] as f64;
        let z = cell[0][2] * self[0] as f64 + cell[1][2] * self[1] as f64 + cell[2][2] * self[2] as f64;
        Vector3D::new(x, y, z)
    }

    /// Is this the zero shift?
    pub fn is_zero(&self) -> bool {
        self[0] == 0 && self[1] == 0 && self[2] == 0
    }

    /// Check if this shift is in the "positive" half of all shifts. For every
    /// non-zero shift `s`, exactly one of `s` and `-s` is in the positive
    /// half. The zero shift is not in the positive half.
    pub fn is_positive(&self) -> bool {
        let sum = self[0] + self[1] + self[2];
        if sum != 0 {
            return sum > 0;
        }

        // on the sum == 0 plane, keep the shifts indicated with `O` and
        // drop the ones indicated with `X` (y is horizontal, z vertical)
        //
        //  O O O │ O O O
        //  O O O │ O O O
        //  O O O │ O O O
        // ─X─X─X─┼─O─O─O─
        //  X X X │ X X X
        //  X X X │ X X X
        //  X X X │ X X X
        return self[2] > 0 || (self[2] == 0 && self[1] > 0);
    }

    /// Largest absolute value of the components of this shift
    pub fn max_abs(&self) -> i32 {
        i32::max(self[0].abs(), i32::max(self[1].abs(), self[2].abs()))
    }
}

/// The translation table associates a small integer identifier to every
/// periodic image offset used in a neighbor list.
///
/// Identifiers are stable: once an offset got an identifier, the identifier
/// never changes, even if the table grows or the cell changes shape. The
/// opposite of every offset in the table is also in the table.
#[derive(Debug, Clone)]
pub struct TranslationTable {
    shifts: IndexSet<CellShift>,
    inverse: Vec<u32>,
}

impl Default for TranslationTable {
    fn default() -> Self {
        TranslationTable::new()
    }
}

impl TranslationTable {
    /// Create a table containing only the zero offset, with identifier 0
    pub fn new() -> TranslationTable {
        let mut shifts = IndexSet::new();
        shifts.insert(CellShift::default());
        TranslationTable {
            shifts: shifts,
            inverse: vec![0],
        }
    }

    /// Make sure all offsets with `|shift[i]| <= range[i]` are part of this
    /// table. Existing identifiers are not modified.
    pub fn extend_to(&mut self, range: [i32; 3]) {
        let before = self.shifts.len();
        for x in -range[0]..=range[0] {
            for y in -range[1]..=range[1] {
                for z in -range[2]..=range[2] {
                    self.shifts.insert(CellShift([x, y, z]));
                }
            }
        }

        if self.shifts.len() != before {
            self.inverse = self.shifts.iter()
                .map(|&shift| {
                    let inverse = self.shifts.get_index_of(&-shift).expect("the table should be symmetric");
                    inverse as u32
                })
                .collect();
        }
    }

    /// Get the number of offsets in this table
    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    /// Check if this table is empty. This is never the case since the zero
    /// offset is always present.
    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// Get the identifier of the given `shift`, if it is in the table
    pub fn id(&self, shift: CellShift) -> Option<u32> {
        self.shifts.get_index_of(&shift).map(|id| id as u32)
    }

    /// Get the offset associated with the identifier `id`.
    ///
    /// # Panics
    ///
    /// If `id` is not a valid identifier
    pub fn shift(&self, id: u32) -> CellShift {
        self.shifts[id as usize]
    }

    /// Get the identifier of the opposite of the offset with identifier `id`
    pub fn inverse(&self, id: u32) -> u32 {
        self.inverse[id as usize]
    }

    /// Get all the offsets in this table, in identifier order
    pub fn shifts(&self) -> impl ExactSizeIterator<Item = &CellShift> + '_ {
        self.shifts.iter()
    }

    /// Get the cartesian vector associated with each offset in the table,
    /// using the given cell matrix
    pub fn scaled(&self, cell: &Matrix3) -> Vec<Vector3D> {
        self.shifts.iter().map(|shift| shift.cartesian(cell)).collect()
    }
}
