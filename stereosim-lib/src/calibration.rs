// SPDX-License-Identifier: MPL-2.0

//! Photogrammetric parameters of one camera of the stereo rig.

use nalgebra::{Matrix3, Vector3};
use std::convert::TryFrom;
use thiserror::Error;

use crate::utils;

/// Maximum deviation of `R·Rᵀ` from the identity accepted for a rotation matrix.
pub const ROTATION_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Focal length must be positive, got {0} mm")]
    FocalLength(f64),
    #[error("Pixel size must be positive, got {0} mm")]
    PixelSize(f64),
    #[error("Image size must be positive, got {lines} lines x {samples} samples")]
    ImageSize { lines: usize, samples: usize },
    #[error("Rotation matrix is not orthonormal: |R.Rt - I| = {0:e}")]
    NotOrthonormal(f64),
    #[error("Rotation matrix is not a proper rotation: det = {0}")]
    Improper(f64),
    #[error("Non finite value in {0}")]
    NonFinite(&'static str),
}

/// Unchecked photogrammetric parameters, as provided by a calibration.
/// Converted into `PhotogrammetricParameters` with `TryFrom`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotogrammetricInput {
    pub focal_length_mm: f64,
    /// Square pixels.
    pub pixel_size_mm: f64,
    /// (lines, samples)
    pub image_size: (usize, usize),
    /// Principal point `(M[0][2], M[1][2])` of the intrinsic matrix,
    /// already multiplied by the pixel size.
    pub principal_point: (f64, f64),
    /// Perspective center, in meters.
    pub camera_center: Vector3<f64>,
    /// Camera orientation (extrinsic rotation).
    pub rotation: Matrix3<f64>,
    /// Azimuth and elevation, in degrees, bringing the PTU back
    /// from its calibration pointing to its zero position.
    /// If the calibration was done at (-90, 25), this is (90, -25).
    pub correction: (f64, f64),
    /// Radial distortion coefficients `[k0, k1, k2]`, if calibrated.
    pub radial_distortion: Option<[f64; 3]>,
}

/// Validated photogrammetric parameters.
///
/// Can only be built through `TryFrom<PhotogrammetricInput>`
/// so holding one guarantees the camera model computation is well defined.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotogrammetricParameters {
    input: PhotogrammetricInput,
}

impl TryFrom<PhotogrammetricInput> for PhotogrammetricParameters {
    type Error = ConfigurationError;
    fn try_from(input: PhotogrammetricInput) -> Result<Self, Self::Error> {
        let PhotogrammetricInput {
            focal_length_mm,
            pixel_size_mm,
            image_size: (lines, samples),
            principal_point: (px, py),
            camera_center,
            rotation,
            correction: (az, el),
            radial_distortion,
        } = &input;

        // Negated comparisons so that NaN is rejected too.
        if !(*focal_length_mm > 0.0 && focal_length_mm.is_finite()) {
            return Err(ConfigurationError::FocalLength(*focal_length_mm));
        }
        if !(*pixel_size_mm > 0.0 && pixel_size_mm.is_finite()) {
            return Err(ConfigurationError::PixelSize(*pixel_size_mm));
        }
        if *lines == 0 || *samples == 0 {
            return Err(ConfigurationError::ImageSize {
                lines: *lines,
                samples: *samples,
            });
        }
        if !(px.is_finite() && py.is_finite()) {
            return Err(ConfigurationError::NonFinite("principal point"));
        }
        if !utils::vector_is_finite(camera_center) {
            return Err(ConfigurationError::NonFinite("camera center"));
        }
        if !(az.is_finite() && el.is_finite()) {
            return Err(ConfigurationError::NonFinite("az/el correction"));
        }
        if let Some(k) = radial_distortion {
            if !k.iter().all(|x| x.is_finite()) {
                return Err(ConfigurationError::NonFinite("radial distortion"));
            }
        }

        // Check that the rotation matrix is a rotation.
        if !utils::matrix_is_finite(rotation) {
            return Err(ConfigurationError::NonFinite("rotation matrix"));
        }
        let deviation = utils::orthonormality_error(rotation);
        if deviation > ROTATION_TOLERANCE {
            return Err(ConfigurationError::NotOrthonormal(deviation));
        }
        let det = rotation.determinant();
        if det < 0.0 {
            return Err(ConfigurationError::Improper(det));
        }

        Ok(PhotogrammetricParameters { input })
    }
}

impl PhotogrammetricParameters {
    pub fn new(input: PhotogrammetricInput) -> Result<Self, ConfigurationError> {
        Self::try_from(input)
    }

    pub fn focal_length_mm(&self) -> f64 {
        self.input.focal_length_mm
    }

    pub fn pixel_size_mm(&self) -> f64 {
        self.input.pixel_size_mm
    }

    /// (lines, samples)
    pub fn image_size(&self) -> (usize, usize) {
        self.input.image_size
    }

    pub fn principal_point(&self) -> (f64, f64) {
        self.input.principal_point
    }

    pub fn camera_center(&self) -> &Vector3<f64> {
        &self.input.camera_center
    }

    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.input.rotation
    }

    /// (azimuth, elevation) in degrees.
    pub fn correction(&self) -> (f64, f64) {
        self.input.correction
    }

    pub fn radial_distortion(&self) -> Option<[f64; 3]> {
        self.input.radial_distortion
    }

    /// Give back the unchecked parameters, for example to change a field
    /// and validate again.
    pub fn into_input(self) -> PhotogrammetricInput {
        self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;

    fn input() -> PhotogrammetricInput {
        PhotogrammetricInput {
            focal_length_mm: 100.0,
            pixel_size_mm: 0.00429,
            image_size: (2048, 3072),
            principal_point: (0.01, -0.02),
            camera_center: Vector3::new(0.762, 1.4097, -3.3667),
            rotation: Rotation3::from_euler_angles(0.05, -0.02, 0.1).into_inner(),
            correction: (90.0, 0.0),
            radial_distortion: None,
        }
    }

    #[test]
    fn valid_input() {
        let params = PhotogrammetricParameters::new(input()).unwrap();
        assert_eq!(params.focal_length_mm(), 100.0);
        assert_eq!(params.image_size(), (2048, 3072));
        assert_eq!(params.correction(), (90.0, 0.0));
        assert_eq!(params.into_input(), input());
    }

    #[test]
    fn zero_pixel_size() {
        let bad = PhotogrammetricInput {
            pixel_size_mm: 0.0,
            ..input()
        };
        assert_eq!(
            PhotogrammetricParameters::try_from(bad),
            Err(ConfigurationError::PixelSize(0.0))
        );
    }

    #[test]
    fn nan_pixel_size() {
        let bad = PhotogrammetricInput {
            pixel_size_mm: f64::NAN,
            ..input()
        };
        assert!(matches!(
            PhotogrammetricParameters::try_from(bad),
            Err(ConfigurationError::PixelSize(_))
        ));
    }

    #[test]
    fn negative_focal_length() {
        let bad = PhotogrammetricInput {
            focal_length_mm: -100.0,
            ..input()
        };
        assert_eq!(
            PhotogrammetricParameters::try_from(bad),
            Err(ConfigurationError::FocalLength(-100.0))
        );
    }

    #[test]
    fn empty_image() {
        let bad = PhotogrammetricInput {
            image_size: (2048, 0),
            ..input()
        };
        assert_eq!(
            PhotogrammetricParameters::try_from(bad),
            Err(ConfigurationError::ImageSize {
                lines: 2048,
                samples: 0
            })
        );
    }

    #[test]
    fn scaled_rotation() {
        let bad = PhotogrammetricInput {
            rotation: 1.01 * input().rotation,
            ..input()
        };
        assert!(matches!(
            PhotogrammetricParameters::try_from(bad),
            Err(ConfigurationError::NotOrthonormal(_))
        ));
    }

    #[test]
    fn reflection() {
        let mut rotation = Matrix3::identity();
        rotation[(2, 2)] = -1.0;
        let bad = PhotogrammetricInput {
            rotation,
            ..input()
        };
        assert_eq!(
            PhotogrammetricParameters::try_from(bad),
            Err(ConfigurationError::Improper(-1.0))
        );
    }

    #[test]
    fn infinite_center() {
        let bad = PhotogrammetricInput {
            camera_center: Vector3::new(0.0, f64::INFINITY, 0.0),
            ..input()
        };
        assert_eq!(
            PhotogrammetricParameters::try_from(bad),
            Err(ConfigurationError::NonFinite("camera center"))
        );
    }

    #[test]
    fn nan_distortion() {
        let bad = PhotogrammetricInput {
            radial_distortion: Some([0.0, f64::NAN, 0.0]),
            ..input()
        };
        assert_eq!(
            PhotogrammetricParameters::try_from(bad),
            Err(ConfigurationError::NonFinite("radial distortion"))
        );
    }
}
