// SPDX-License-Identifier: MPL-2.0

//! Interoperability conversions between plain arrays and nalgebra types.
//!
//! Calibration files and serialized camera models store vectors as `[x, y, z]`
//! and matrices as a list of rows, while computations use nalgebra.

use nalgebra::{Matrix3, Vector3};

/// A 3D vector as stored in files.
pub type Array3 = [f64; 3];

/// A 3x3 matrix as stored in files, row by row.
pub type Rows3 = [[f64; 3]; 3];

// Convert nalgebra types into arrays ------------------------------------------
// -----------------------------------------------------------------------------

pub trait ToArray {
    type Array;
    fn to_array(&self) -> Self::Array;
}

impl ToArray for Vector3<f64> {
    type Array = Array3;
    fn to_array(&self) -> Array3 {
        [self.x, self.y, self.z]
    }
}

/// Row major, inverse operation of `matrix_from_rows`.
impl ToArray for Matrix3<f64> {
    type Array = Rows3;
    fn to_array(&self) -> Rows3 {
        let mut rows = [[0.0; 3]; 3];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, x) in row.iter_mut().enumerate() {
                *x = self[(i, j)];
            }
        }
        rows
    }
}

// Convert arrays into nalgebra types ------------------------------------------
// -----------------------------------------------------------------------------

/// Inverse operation of `Vector3::to_array`.
pub fn vector_from_array(a: &Array3) -> Vector3<f64> {
    Vector3::new(a[0], a[1], a[2])
}

/// Build a matrix from its rows.
///
/// nalgebra storage is column major, so this is not a plain copy.
pub fn matrix_from_rows(rows: &Rows3) -> Matrix3<f64> {
    Matrix3::from_fn(|i, j| rows[i][j])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_stay_rows() {
        let rows = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let m = matrix_from_rows(&rows);
        assert_eq!(m[(0, 2)], 3.0);
        assert_eq!(m[(2, 0)], 7.0);
        assert_eq!(m.row(1).transpose(), Vector3::new(4.0, 5.0, 6.0));
        assert_eq!(m.to_array(), rows);
    }

    #[test]
    fn vector_coordinates_in_order() {
        let v = vector_from_array(&[0.762, -1.4097, -3.3667]);
        assert_eq!(v.y, -1.4097);
        assert_eq!(v.to_array(), [0.762, -1.4097, -3.3667]);
    }
}
