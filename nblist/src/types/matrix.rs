use std::ops::{Add, Sub, Mul, Index, IndexMut};

use super::Vector3D;

/// A 3x3 matrix type, stored in row-major order. Cell matrices store the
/// three cell vectors as rows.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Matrix3([[f64; 3]; 3]);

impl Matrix3 {
    /// Create a new `Matrix3` from the given rows
    pub const fn new(rows: [[f64; 3]; 3]) -> Matrix3 {
        Matrix3(rows)
    }

    /// Create a new `Matrix3` with all components set to 0
    pub const fn zero() -> Matrix3 {
        Matrix3([[0.0; 3]; 3])
    }

    /// Create the identity matrix
    pub const fn one() -> Matrix3 {
        Matrix3([
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ])
    }

    /// Get the determinant of this matrix
    pub fn determinant(&self) -> f64 {
        let m = &self.0;
        m[0][0] * (m[1][1] * m[2][2] - m[2][1] * m[1][2]) -
        m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0]) +
        m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Get the inverse of this matrix.
    ///
    /// # Panics
    ///
    /// If the matrix is not invertible
    pub fn inverse(&self) -> Matrix3 {
        let determinant = self.determinant();
        assert!(determinant.abs() > f64::EPSILON, "this matrix is not invertible");

        let m = &self.0;
        let inv = 1.0 / determinant;
        Matrix3([
            [
                (m[1][1] * m[2][2] - m[2][1] * m[1][2]) * inv,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv,
                (m[1][0] * m[0][2] - m[0][0] * m[1][2]) * inv,
            ],
            [
                (m[1][0] * m[2][1] - m[2][0] * m[1][1]) * inv,
                (m[2][0] * m[0][1] - m[0][0] * m[2][1]) * inv,
                (m[0][0] * m[1][1] - m[1][0] * m[0][1]) * inv,
            ],
        ])
    }

    /// Get the transposed of this matrix
    pub fn transposed(&self) -> Matrix3 {
        let m = &self.0;
        Matrix3([
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ])
    }

    /// Get the `i`-th row of this matrix as a vector
    pub fn row(&self, i: usize) -> Vector3D {
        Vector3D::from(self.0[i])
    }
}

impl From<[[f64; 3]; 3]> for Matrix3 {
    fn from(rows: [[f64; 3]; 3]) -> Matrix3 {
        Matrix3(rows)
    }
}

impl Index<usize> for Matrix3 {
    type Output = [f64; 3];
    #[inline]
    fn index(&self, index: usize) -> &[f64; 3] {
        &self.0[index]
    }
}

impl IndexMut<usize> for Matrix3 {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut [f64; 3] {
        &mut self.0[index]
    }
}

impl_arithmetic!(
    Matrix3, Matrix3, Add, add, Matrix3,
    self, other,
    {
        let mut result = Matrix3::zero();
        for i in 0..3 {
            for j in 0..3 {
                result[i][j] = self[i][j] + other[i][j];
            }
        }
        result
    }
);

impl_arithmetic!(
    Matrix3, Matrix3, Sub, sub, Matrix3,
    self, other,
    {
        let mut result = Matrix3::zero();
        for i in 0..3 {
            for j in 0..3 {
                result[i][j] = self[i][j] - other[i][j];
            }
        }
        result
    }
);

impl_arithmetic!(
    Matrix3, Matrix3, Mul, mul, Matrix3,
    self, other,
    {
        let mut result = Matrix3::zero();
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    result[i][j] += self[i][k] * other[k][j];
                }
            }
        }
        result
    }
);

impl_arithmetic!(
    Matrix3, Vector3D, Mul, mul, Vector3D,
    self, other,
    Vector3D::new(
        self[0][0] * other[0] + self[0][1] * other[1] + self[0][2] * other[2],
        self[1][0] * other[0] + self[1][1] * other[1] + self[1][2] * other[2],
        self[2][0] * other[0] + self[2][1] * other[1] + self[2][2] * other[2],
    )
);
