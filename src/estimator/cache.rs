//! Jacobian cache - the partials of one out-of-state measurement.
//!
//! `Xcn` is the landmark in the camera of the observing pose. All rotation
//! partials are with respect to right-multiplicative errors δω (see
//! [`crate::geometry::so3`]), translation and point partials with respect to
//! additive errors.

use nalgebra::{Matrix2x3, Matrix3, Vector2, Vector3};

use super::oos::ErrorChannel;

/// Partials of `Xcn` evaluated at the nominal operating point.
#[derive(Debug, Clone, PartialEq)]
pub struct JacobianCache {
    /// Landmark in the spatial frame.
    pub xs: Vector3<f64>,

    /// Landmark in the observing camera frame.
    pub xcn: Vector3<f64>,

    /// ∂Xcn/∂δω_sb (observing body rotation).
    pub dxcn_dwsb: Matrix3<f64>,

    /// ∂Xcn/∂t_sb (observing body translation).
    pub dxcn_dtsb: Matrix3<f64>,

    /// ∂Xcn/∂δω_bc (calibration rotation, both appearances).
    pub dxcn_dwbc: Matrix3<f64>,

    /// ∂Xcn/∂t_bc (calibration translation, both appearances).
    pub dxcn_dtbc: Matrix3<f64>,

    /// ∂Xcn/∂Xs (additive spatial point error).
    pub dxcn_dxs: Matrix3<f64>,

    /// Normalized-coordinate block. `None` when `Xcn` is not in front of the
    /// observing camera.
    pub projection: Option<NormalizedProjection>,
}

impl JacobianCache {
    /// The 3x3 partial for one error channel.
    pub fn partial(&self, channel: ErrorChannel) -> &Matrix3<f64> {
        match channel {
            ErrorChannel::RotationSb => &self.dxcn_dwsb,
            ErrorChannel::TranslationSb => &self.dxcn_dtsb,
            ErrorChannel::RotationBc => &self.dxcn_dwbc,
            ErrorChannel::TranslationBc => &self.dxcn_dtbc,
            ErrorChannel::SpatialPoint => &self.dxcn_dxs,
        }
    }

    /// Chain the normalized projection into every partial, giving the 2x3
    /// measurement blocks the filter stacks into its H matrix.
    pub fn measurement_blocks(&self) -> Option<MeasurementBlocks> {
        let d = self.projection.as_ref()?.dxn_dxcn;
        Some(MeasurementBlocks {
            dxn_dwsb: d * self.dxcn_dwsb,
            dxn_dtsb: d * self.dxcn_dtsb,
            dxn_dwbc: d * self.dxcn_dwbc,
            dxn_dtbc: d * self.dxcn_dtbc,
            dxn_dxs: d * self.dxcn_dxs,
        })
    }
}

/// Predicted normalized coordinate of `Xcn` and its residual against the
/// measured pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedProjection {
    /// `(Xcn.x / Xcn.z, Xcn.y / Xcn.z)`.
    pub predicted: Vector2<f64>,

    /// Unprojected measurement minus prediction.
    pub residual: Vector2<f64>,

    /// ∂(x/z, y/z)/∂Xcn.
    pub dxn_dxcn: Matrix2x3<f64>,
}

impl NormalizedProjection {
    /// `None` if `xcn` is at or behind the camera plane.
    pub fn new(xcn: &Vector3<f64>, measured: &Vector2<f64>) -> Option<Self> {
        if xcn.z.is_nan() || xcn.z <= 0.0 {
            return None;
        }
        let inv_z = 1.0 / xcn.z;
        let predicted = Vector2::new(xcn.x * inv_z, xcn.y * inv_z);

        #[rustfmt::skip]
        let dxn_dxcn = Matrix2x3::new(
            inv_z, 0.0,   -xcn.x * inv_z * inv_z,
            0.0,   inv_z, -xcn.y * inv_z * inv_z,
        );

        Some(Self {
            predicted,
            residual: measured - predicted,
            dxn_dxcn,
        })
    }
}

/// 2x3 blocks of the normalized-coordinate measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementBlocks {
    pub dxn_dwsb: Matrix2x3<f64>,
    pub dxn_dtsb: Matrix2x3<f64>,
    pub dxn_dwbc: Matrix2x3<f64>,
    pub dxn_dtbc: Matrix2x3<f64>,
    pub dxn_dxs: Matrix2x3<f64>,
}
