// SPDX-License-Identifier: MPL-2.0

//! # Stereosim camera model
//!
//! CAHVOR camera models for the stereosim dual-camera rig,
//! derived from a photogrammetric (pinhole + stereo) calibration
//! and expressed at the zero position of the Pan-Tilt Unit.

// #![warn(missing_docs)]

pub mod cahvor;
pub mod calibration;
pub mod interop;
pub mod rotation;
#[cfg(feature = "yaml")]
pub mod stereo_model;
pub mod utils;

pub use cahvor::{AxisAlignment, CahvorModel, ModelComponent};
pub use calibration::{ConfigurationError, PhotogrammetricInput, PhotogrammetricParameters};
#[cfg(feature = "yaml")]
pub use stereo_model::{CameraEye, EyeError, FrameLabel, ModelError, StereoModel};
