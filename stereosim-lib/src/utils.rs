// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper module for functions that didn't fit anywhere else.

use nalgebra::{Matrix3, Vector3};

/// Largest absolute entry of `R·Rᵀ - I`.
/// This is zero (up to rounding) for orthonormal matrices.
pub fn orthonormality_error(m: &Matrix3<f64>) -> f64 {
    (m * m.transpose() - Matrix3::identity()).amax()
}

/// Check that all coefficients of a matrix are finite.
pub fn matrix_is_finite(m: &Matrix3<f64>) -> bool {
    m.iter().all(|x| x.is_finite())
}

/// Check that all coordinates of a vector are finite.
pub fn vector_is_finite(v: &Vector3<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}
