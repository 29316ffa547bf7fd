// SPDX-License-Identifier: MPL-2.0

//! Calibration model of the stereo rig and captured frame labels.
//!
//! The calibration model is the YAML file saved after the stereo calibration,
//! with one block per camera eye and the settings shared by both cameras:
//!
//! ```yaml
//! f: 100.0
//! pixelsize: 0.00429
//! image_size: [2048, 3072]
//! az_to_fix: 90.0
//! el_to_fix: 0.0
//! LEFT:
//!   intrinsic: [[23310.0, 0.0, 1535.66], [0.0, 23310.0, 1024.15], [0.0, 0.0, 1.0]]
//!   extrinsic: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
//!   center: [0.762, 1.4097, -3.3667]
//! RIGHT:
//!   intrinsic: [[23310.0, 0.0, 1535.66], [0.0, 23310.0, 1024.15], [0.0, 0.0, 1.0]]
//!   extrinsic:
//!     rodrigues: [0.0, 0.1, 0.0]
//!   relative_rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
//!   center: [0.762, -1.4097, -3.3667]
//!   K: [0.0, 0.0, 0.0]
//! ```

use log::debug;
use nalgebra::{Matrix3, Rotation3};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::cahvor::{AxisAlignment, CahvorModel};
use crate::calibration::{ConfigurationError, PhotogrammetricInput, PhotogrammetricParameters};
use crate::interop::{matrix_from_rows, vector_from_array, Array3, Rows3};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Cannot read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid YAML")]
    Yaml(#[from] serde_yaml::Error),
    #[error("No calibration for the {0} camera")]
    MissingEye(CameraEye),
    #[error("Invalid calibration for the {eye} camera")]
    Configuration {
        eye: CameraEye,
        #[source]
        source: ConfigurationError,
    },
}

/// One of the two cameras of the rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CameraEye {
    #[serde(alias = "left", alias = "Left")]
    Left,
    #[serde(alias = "right", alias = "Right")]
    Right,
}

impl CameraEye {
    pub const BOTH: [CameraEye; 2] = [CameraEye::Left, CameraEye::Right];
}

impl fmt::Display for CameraEye {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CameraEye::Left => write!(f, "LEFT"),
            CameraEye::Right => write!(f, "RIGHT"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown camera eye {0:?}: expected left or right")]
pub struct EyeError(pub String);

impl FromStr for CameraEye {
    type Err = EyeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" | "l" => Ok(CameraEye::Left),
            "right" | "r" => Ok(CameraEye::Right),
            _ => Err(EyeError(s.to_string())),
        }
    }
}

/// Extrinsic rotation of a camera, either as a matrix
/// or as a Rodrigues rotation vector (axis times angle in radians).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Extrinsic {
    Matrix(Rows3),
    Rodrigues { rodrigues: Array3 },
}

impl Extrinsic {
    pub fn rotation(&self) -> Matrix3<f64> {
        match self {
            Extrinsic::Matrix(rows) => matrix_from_rows(rows),
            Extrinsic::Rodrigues { rodrigues } => {
                Rotation3::from_scaled_axis(vector_from_array(rodrigues)).into_inner()
            }
        }
    }
}

/// Calibration of one camera eye.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeModel {
    /// Intrinsic matrix, in pixels.
    pub intrinsic: Rows3,
    pub extrinsic: Extrinsic,
    /// Rotation between the two cameras of the stereo pair,
    /// composed on the left of the extrinsic rotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_rotation: Option<Rows3>,
    /// Perspective center, manually measured, in meters.
    pub center: Array3,
    #[serde(rename = "K", default, skip_serializing_if = "Option::is_none")]
    pub radial_distortion: Option<Array3>,
}

impl EyeModel {
    /// Camera orientation, with the stereo relative rotation applied.
    pub fn rotation(&self) -> Matrix3<f64> {
        let rotation = self.extrinsic.rotation();
        match &self.relative_rotation {
            Some(relative) => matrix_from_rows(relative) * rotation,
            None => rotation,
        }
    }

    /// Principal point `(M[0][2], M[1][2])`, in pixels.
    pub fn principal_point_px(&self) -> (f64, f64) {
        (self.intrinsic[0][2], self.intrinsic[1][2])
    }
}

/// Photogrammetric model of the stereo camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StereoModel {
    #[serde(rename = "f")]
    pub focal_length_mm: f64,
    #[serde(rename = "pixelsize")]
    pub pixel_size_mm: f64,
    /// [lines, samples]
    pub image_size: [usize; 2],
    /// Azimuth bringing the PTU back to zero from its calibration pointing.
    #[serde(rename = "az_to_fix")]
    pub az_correction_deg: f64,
    /// Elevation bringing the PTU back to zero from its calibration pointing.
    #[serde(rename = "el_to_fix")]
    pub el_correction_deg: f64,
    #[serde(rename = "LEFT", default, skip_serializing_if = "Option::is_none")]
    pub left: Option<EyeModel>,
    #[serde(rename = "RIGHT", default, skip_serializing_if = "Option::is_none")]
    pub right: Option<EyeModel>,
}

impl FromStr for StereoModel {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_yaml_str(s)
    }
}

impl StereoModel {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ModelError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        debug!("Loading stereo model {}", path.display());
        let yaml = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml_string(&self) -> Result<String, ModelError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn eye(&self, eye: CameraEye) -> Result<&EyeModel, ModelError> {
        let model = match eye {
            CameraEye::Left => self.left.as_ref(),
            CameraEye::Right => self.right.as_ref(),
        };
        model.ok_or(ModelError::MissingEye(eye))
    }

    /// Photogrammetric parameters of one eye, with the model's az/el correction.
    pub fn parameters(&self, eye: CameraEye) -> Result<PhotogrammetricParameters, ModelError> {
        self.parameters_with_correction(eye, self.az_correction_deg, self.el_correction_deg)
    }

    /// Photogrammetric parameters of one eye, with another az/el correction.
    pub fn parameters_with_correction(
        &self,
        eye: CameraEye,
        az_correction_deg: f64,
        el_correction_deg: f64,
    ) -> Result<PhotogrammetricParameters, ModelError> {
        let model = self.eye(eye)?;
        let (mx, my) = model.principal_point_px();
        let input = PhotogrammetricInput {
            focal_length_mm: self.focal_length_mm,
            pixel_size_mm: self.pixel_size_mm,
            image_size: (self.image_size[0], self.image_size[1]),
            principal_point: (mx * self.pixel_size_mm, my * self.pixel_size_mm),
            camera_center: vector_from_array(&model.center),
            rotation: model.rotation(),
            correction: (az_correction_deg, el_correction_deg),
            radial_distortion: model.radial_distortion,
        };
        PhotogrammetricParameters::try_from(input)
            .map_err(|source| ModelError::Configuration { eye, source })
    }

    /// CAHVOR model of one eye, with the default axis alignment.
    pub fn cahvor(&self, eye: CameraEye) -> Result<CahvorModel, ModelError> {
        self.cahvor_with(eye, AxisAlignment::default())
    }

    pub fn cahvor_with(
        &self,
        eye: CameraEye,
        alignment: AxisAlignment,
    ) -> Result<CahvorModel, ModelError> {
        let params = self.parameters(eye)?;
        Ok(CahvorModel::compute_with(&params, alignment))
    }
}

/// The part of a captured frame label needed to point the camera model.
///
/// Labels are written next to each image by the capture session.
/// Other keys (focal length, IMU data, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FrameLabel {
    #[serde(rename = "AZIMUTH")]
    pub azimuth_deg: f64,
    #[serde(rename = "ELEVATION")]
    pub elevation_deg: f64,
    #[serde(rename = "Camera", default)]
    pub camera: Option<CameraEye>,
}

impl FrameLabel {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ModelError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Camera model as seen in this frame.
    pub fn point(&self, model: &CahvorModel) -> CahvorModel {
        model.pointed(self.azimuth_deg, self.elevation_deg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    const MODEL: &str = r#"
f: 100.0
pixelsize: 0.005
image_size: [2000, 3000]
az_to_fix: 0.0
el_to_fix: 0.0
LEFT:
  intrinsic:
  - [20000.0, 0.0, 10.0]
  - [0.0, 20000.0, -20.0]
  - [0.0, 0.0, 1.0]
  extrinsic:
  - [1.0, 0.0, 0.0]
  - [0.0, 1.0, 0.0]
  - [0.0, 0.0, 1.0]
  center: [1.0, 2.0, 3.0]
RIGHT:
  intrinsic:
  - [20000.0, 0.0, 10.0]
  - [0.0, 20000.0, -20.0]
  - [0.0, 0.0, 1.0]
  extrinsic:
    rodrigues: [0.0, 0.0, 0.0]
  relative_rotation:
  - [0.0, -1.0, 0.0]
  - [1.0, 0.0, 0.0]
  - [0.0, 0.0, 1.0]
  center: [1.0, -2.0, 3.0]
  K: [0.1, 0.0, 0.0]
"#;

    #[test]
    fn parse_model() {
        let model: StereoModel = MODEL.parse().unwrap();
        assert_eq!(model.image_size, [2000, 3000]);
        let left = model.eye(CameraEye::Left).unwrap();
        assert_eq!(left.extrinsic.rotation(), Matrix3::identity());
        assert_eq!(left.radial_distortion, None);
        let right = model.eye(CameraEye::Right).unwrap();
        assert_eq!(right.radial_distortion, Some([0.1, 0.0, 0.0]));
    }

    #[test]
    fn principal_point_in_mm() {
        let model: StereoModel = MODEL.parse().unwrap();
        let params = model.parameters(CameraEye::Left).unwrap();
        let (px, py) = params.principal_point();
        assert_relative_eq!(px, 0.05, epsilon = 1e-12);
        assert_relative_eq!(py, -0.1, epsilon = 1e-12);

        let cahvor = model.cahvor(CameraEye::Left).unwrap();
        assert_relative_eq!(cahvor.hc(), 1510.0, epsilon = 1e-9);
        assert_relative_eq!(cahvor.vc(), 1020.0, epsilon = 1e-9);
    }

    #[test]
    fn relative_rotation_is_composed() {
        let model: StereoModel = MODEL.parse().unwrap();
        let right = model.eye(CameraEye::Right).unwrap();
        let expected = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(right.rotation(), expected, epsilon = 1e-15);
    }

    #[test]
    fn rodrigues_vector() {
        let extrinsic = Extrinsic::Rodrigues {
            rodrigues: [0.0, 0.0, std::f64::consts::FRAC_PI_2],
        };
        let expected = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(extrinsic.rotation(), expected, epsilon = 1e-12);
    }

    #[test]
    fn correction_override() {
        let model: StereoModel = MODEL.parse().unwrap();
        let params = model
            .parameters_with_correction(CameraEye::Left, 90.0, -25.0)
            .unwrap();
        assert_eq!(params.correction(), (90.0, -25.0));
        assert_eq!(
            model.parameters(CameraEye::Left).unwrap().correction(),
            (0.0, 0.0)
        );
    }

    #[test]
    fn missing_eye() {
        let mut model: StereoModel = MODEL.parse().unwrap();
        model.right = None;
        assert!(matches!(
            model.parameters(CameraEye::Right),
            Err(ModelError::MissingEye(CameraEye::Right))
        ));
    }

    #[test]
    fn invalid_eye_calibration() {
        let mut model: StereoModel = MODEL.parse().unwrap();
        model.pixel_size_mm = 0.0;
        match model.cahvor(CameraEye::Left) {
            Err(ModelError::Configuration { eye, source }) => {
                assert_eq!(eye, CameraEye::Left);
                assert_eq!(source, ConfigurationError::PixelSize(0.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn malformed_yaml() {
        let truncated = "f: 100.0\npixelsize: [";
        assert!(matches!(
            StereoModel::from_yaml_str(truncated),
            Err(ModelError::Yaml(_))
        ));
        // Missing shared settings.
        assert!(matches!(
            StereoModel::from_yaml_str("LEFT: {}"),
            Err(ModelError::Yaml(_))
        ));
    }

    #[test]
    fn yaml_round_trip() {
        let model: StereoModel = MODEL.parse().unwrap();
        let yaml = model.to_yaml_string().unwrap();
        assert_eq!(StereoModel::from_yaml_str(&yaml).unwrap(), model);
    }

    #[test]
    fn eye_names() {
        assert_eq!("left".parse::<CameraEye>(), Ok(CameraEye::Left));
        assert_eq!("RIGHT".parse::<CameraEye>(), Ok(CameraEye::Right));
        assert_eq!("r".parse::<CameraEye>(), Ok(CameraEye::Right));
        assert_eq!(
            "center".parse::<CameraEye>(),
            Err(EyeError("center".to_string()))
        );
        assert_eq!(CameraEye::Left.to_string(), "LEFT");
    }

    #[test]
    fn frame_label() {
        let yaml = r#"
AZIMUTH: -90.0
ELEVATION: 25
f: 100.0
Camera: LEFT
IMU_quaternion: [1.0, 0.0, 0.0, 0.0]
'': {accel: [0.0, 0.0, 9.8]}
"#;
        let label = FrameLabel::from_yaml_str(yaml).unwrap();
        assert_eq!(label.azimuth_deg, -90.0);
        assert_eq!(label.elevation_deg, 25.0);
        assert_eq!(label.camera, Some(CameraEye::Left));

        let model: StereoModel = MODEL.parse().unwrap();
        let cahvor = model.cahvor(CameraEye::Left).unwrap();
        let pointed = label.point(&cahvor);
        assert_eq!(pointed, cahvor.pointed(-90.0, 25.0));
        assert_eq!(pointed.hs(), cahvor.hs());
    }

    #[test]
    fn frame_label_without_camera() {
        let label = FrameLabel::from_yaml_str("AZIMUTH: 0\nELEVATION: 0\n").unwrap();
        assert_eq!(label.camera, None);
        let center = Vector3::new(1.0, 2.0, 3.0);
        let model: StereoModel = MODEL.parse().unwrap();
        let cahvor = model.cahvor(CameraEye::Left).unwrap();
        assert_eq!(label.point(&cahvor).center(), &center);
    }
}
