// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Coordinate rotations of the Pan-Tilt Unit frame.

use nalgebra::Vector3;

/// Rotate a vector by an azimuth (about Z) followed by an elevation (about Y).
/// Angles are in degrees.
///
/// The elevation step is sequential: the new z coordinate is computed
/// from the already rotated x coordinate, not from the one before the step.
/// Camera models embedded in existing labels were produced this way,
/// so this is not a proper rotation when both angles are non-zero
/// and it cannot be undone by negating the angles.
pub fn rotate(v: &Vector3<f64>, azimuth_deg: f64, elevation_deg: f64) -> Vector3<f64> {
    let az = azimuth_deg.to_radians();
    let el = elevation_deg.to_radians();

    // Azimuth, rotation around Z.
    let x = v.x * az.cos() - v.y * az.sin();
    let y = v.x * az.sin() + v.y * az.cos();
    let z = v.z;

    // Elevation, rotation around Y.
    let x = x * el.cos() + z * el.sin();
    let z = z * el.cos() - x * el.sin();

    Vector3::new(x, y, z)
}

/// Basis change from the calibration frame into the physical frame
/// of the Pan-Tilt Unit: `(x, y, z) -> (z, -x, -y)`.
///
/// This encodes how the cameras are mounted on the rig.
pub fn permute_ptu_axes(v: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(v.z, -v.x, -v.y)
}
