// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! CAHVOR camera model computed from photogrammetric parameters.
//!
//! The model is expressed in the physical frame of the Pan-Tilt Unit,
//! at its zero position. Vectors:
//!
//! - C: perspective center
//! - A: axis (boresight)
//! - H: horizontal, `hs·Hn + hc·A`
//! - V: vertical, `vs·Vn + vc·A`
//! - O: optical axis, taken equal to A for this rig
//! - R: radial distortion terms, when the calibration has some

use log::{debug, trace, warn};
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::calibration::PhotogrammetricParameters;
use crate::interop::{vector_from_array, Array3, ToArray};
use crate::rotation::{permute_ptu_axes, rotate};

/// How the PTU axis permutation is applied to the model vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisAlignment {
    /// Same vectors as the models already embedded in the rig labels.
    /// The permutation is applied twice to A and O, once to H and V,
    /// and R is rotated without permutation.
    Legacy,
    /// The permutation is applied once to every vector, R included.
    Uniform,
}

impl Default for AxisAlignment {
    fn default() -> Self {
        AxisAlignment::Legacy
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(into = "CahvorRecord", from = "CahvorRecord"))]
pub struct CahvorModel {
    center: Vector3<f64>,
    axis: Vector3<f64>,
    horizontal: Vector3<f64>,
    vertical: Vector3<f64>,
    optical: Vector3<f64>,
    radial: Option<Vector3<f64>>,
    hs: f64,
    hc: f64,
    vs: f64,
    vc: f64,
}

/// One named vector of the model, as written in a geometric camera model label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelComponent {
    pub id: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub value: Vector3<f64>,
}

impl CahvorModel {
    /// Compute the model with the default (legacy) axis alignment.
    pub fn compute(params: &PhotogrammetricParameters) -> Self {
        Self::compute_with(params, AxisAlignment::default())
    }

    pub fn compute_with(params: &PhotogrammetricParameters, alignment: AxisAlignment) -> Self {
        let f = params.focal_length_mm();
        let pixel_size = params.pixel_size_mm();
        let (lines, samples) = params.image_size();
        let (px, py) = params.principal_point();

        // Scale factors and optical center, in pixels.
        let hs = f / pixel_size;
        let vs = f / pixel_size;
        let hc = samples as f64 / 2.0 + px / pixel_size;
        let vc = lines as f64 / 2.0 - py / pixel_size;
        debug!("hs = {}, vs = {}, hc = {}, vc = {}", hs, vs, hc, vc);

        // Orientation basis from the rows of the extrinsic rotation.
        let rotation = params.rotation();
        let axis: Vector3<f64> = -rotation.row(2).transpose();
        let horizontal_basis: Vector3<f64> = rotation.row(0).transpose();
        let vertical_basis: Vector3<f64> = -rotation.row(1).transpose();

        let horizontal = hs * horizontal_basis + hc * axis;
        let vertical = vs * vertical_basis + vc * axis;
        trace!("A = {:?}, H = {:?}, V = {:?}", axis, horizontal, vertical);

        // Fix axes for the PTU frame.
        let boresight = match alignment {
            AxisAlignment::Legacy => permute_ptu_axes(&permute_ptu_axes(&axis)),
            AxisAlignment::Uniform => permute_ptu_axes(&axis),
        };
        let horizontal = permute_ptu_axes(&horizontal);
        let vertical = permute_ptu_axes(&vertical);

        // Back to the zero position of the PTU.
        let (az, el) = params.correction();
        let axis = rotate(&boresight, az, el);

        let radial = params.radial_distortion().map(|k| {
            warn!("Radial distortion terms are rotated like a direction vector");
            let r = Vector3::new(k[0], k[1] * f.powi(2), k[2] * f.powi(4));
            match alignment {
                AxisAlignment::Legacy => rotate(&r, az, el),
                AxisAlignment::Uniform => rotate(&permute_ptu_axes(&r), az, el),
            }
        });

        CahvorModel {
            center: *params.camera_center(),
            axis,
            horizontal: rotate(&horizontal, az, el),
            vertical: rotate(&vertical, az, el),
            optical: axis,
            radial,
            hs,
            hc,
            vs,
            vc,
        }
    }

    /// The same model seen with the PTU pointed at the given azimuth
    /// and elevation (degrees), as recorded when a frame is captured.
    ///
    /// C, A, H, V and O are rotated.
    /// R and the scalars are kept as they are.
    pub fn pointed(&self, azimuth_deg: f64, elevation_deg: f64) -> Self {
        let turn = |v: &Vector3<f64>| rotate(v, azimuth_deg, elevation_deg);
        CahvorModel {
            center: turn(&self.center),
            axis: turn(&self.axis),
            horizontal: turn(&self.horizontal),
            vertical: turn(&self.vertical),
            optical: turn(&self.optical),
            ..*self
        }
    }

    /// C
    pub fn center(&self) -> &Vector3<f64> {
        &self.center
    }

    /// A
    pub fn axis(&self) -> &Vector3<f64> {
        &self.axis
    }

    /// H
    pub fn horizontal(&self) -> &Vector3<f64> {
        &self.horizontal
    }

    /// V
    pub fn vertical(&self) -> &Vector3<f64> {
        &self.vertical
    }

    /// O
    pub fn optical(&self) -> &Vector3<f64> {
        &self.optical
    }

    /// R
    pub fn radial(&self) -> Option<&Vector3<f64>> {
        self.radial.as_ref()
    }

    pub fn hs(&self) -> f64 {
        self.hs
    }

    pub fn hc(&self) -> f64 {
        self.hc
    }

    pub fn vs(&self) -> f64 {
        self.vs
    }

    pub fn vc(&self) -> f64 {
        self.vc
    }

    /// "CAHVOR" when radial distortion is present, "CAHV" otherwise.
    pub fn model_type(&self) -> &'static str {
        if self.radial.is_some() {
            "CAHVOR"
        } else {
            "CAHV"
        }
    }

    /// Named vectors of the model, in label order.
    pub fn components(&self) -> Vec<ModelComponent> {
        let component = |id, name, unit, value: &Vector3<f64>| ModelComponent {
            id,
            name,
            unit,
            value: *value,
        };
        let mut components = vec![
            component("C", "CENTER", "METER", &self.center),
            component("A", "AXIS", "N/A", &self.axis),
            component("H", "HORIZONTAL", "PIXEL", &self.horizontal),
            component("V", "VERTICAL", "PIXEL", &self.vertical),
            component("O", "OPTICAL_AXIS", "N/A", &self.optical),
        ];
        if let Some(r) = &self.radial {
            components.push(component("R", "DISTORTION_COEFFICIENTS", "N/A", r));
        }
        components
    }
}

// Serialization ---------------------------------------------------------------
// -----------------------------------------------------------------------------

/// Flat representation of a `CahvorModel`, with the field names
/// used by label writers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[allow(non_snake_case)]
pub struct CahvorRecord {
    pub C: Array3,
    pub A: Array3,
    pub H: Array3,
    pub V: Array3,
    pub O: Array3,
    pub R: Option<Array3>,
    pub hs: f64,
    pub hc: f64,
    pub vs: f64,
    pub vc: f64,
}

impl From<CahvorModel> for CahvorRecord {
    fn from(model: CahvorModel) -> Self {
        CahvorRecord {
            C: model.center.to_array(),
            A: model.axis.to_array(),
            H: model.horizontal.to_array(),
            V: model.vertical.to_array(),
            O: model.optical.to_array(),
            R: model.radial.map(|r| r.to_array()),
            hs: model.hs,
            hc: model.hc,
            vs: model.vs,
            vc: model.vc,
        }
    }
}

impl From<CahvorRecord> for CahvorModel {
    fn from(record: CahvorRecord) -> Self {
        CahvorModel {
            center: vector_from_array(&record.C),
            axis: vector_from_array(&record.A),
            horizontal: vector_from_array(&record.H),
            vertical: vector_from_array(&record.V),
            optical: vector_from_array(&record.O),
            radial: record.R.as_ref().map(vector_from_array),
            hs: record.hs,
            hc: record.hc,
            vs: record.vs,
            vc: record.vc,
        }
    }
}
