//! Camera projection interface.
//!
//! The estimator only needs to move between pixels and normalized image
//! coordinates. Distortion models live behind [`CameraModel`]; the
//! [`PinholeCamera`] here is the undistorted case.

use nalgebra::{Matrix3, Vector2, Vector3};

/// Pixel ↔ normalized-ray conversion.
pub trait CameraModel {
    /// Project a camera-frame point to pixels. `None` if the point is not in
    /// front of the camera.
    fn project(&self, point: &Vector3<f64>) -> Option<Vector2<f64>>;

    /// Normalized coordinates `(x/z, y/z)` of the ray through `pixel`.
    fn unproject(&self, pixel: &Vector2<f64>) -> Vector2<f64>;
}

/// Undistorted pinhole intrinsics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCamera {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl PinholeCamera {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// From a 3x3 calibration matrix K.
    pub fn from_k(k: &Matrix3<f64>) -> Self {
        Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
        }
    }
}

impl CameraModel for PinholeCamera {
    fn project(&self, point: &Vector3<f64>) -> Option<Vector2<f64>> {
        if point.z <= 0.0 {
            return None;
        }
        let inv_z = 1.0 / point.z;
        Some(Vector2::new(
            self.fx * point.x * inv_z + self.cx,
            self.fy * point.y * inv_z + self.cy,
        ))
    }

    fn unproject(&self, pixel: &Vector2<f64>) -> Vector2<f64> {
        Vector2::new(
            (pixel.x - self.cx) / self.fx,
            (pixel.y - self.cy) / self.fy,
        )
    }
}
