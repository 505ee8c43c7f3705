//! Coordinate frame chain for landmarks observed by a body-mounted camera.
//!
//! # Frames
//!
//! - **Spatial (s)**: the fixed world frame the filter estimates in.
//! - **Body (b)**: the IMU frame. Poses stored on anchors are `T_sb`.
//! - **Camera (c)**: rigidly attached to the body through the calibration
//!   `T_bc` (camera-to-body).
//!
//! # Naming
//!
//! `T_target_source` maps a point from `source` into `target`:
//!
//! ```text
//! p_body = T_bc · p_cam = R_bc · p_cam + t_bc
//! ```
//!
//! # The landmark chain
//!
//! A landmark is parameterized by inverse depth `(x, y, ρ)` in the camera of
//! its reference anchor `r`. Getting it into the camera of a new observing
//! body pose `n` walks the chain
//!
//! ```text
//! (x, y, ρ) ──► Xc = (x/ρ, y/ρ, 1/ρ)                       anchor camera
//!           ──► Xs = R_r · (R_bc · Xc + t_bc) + t_r         spatial
//!           ──► Xcn = R_bc^T · (R_sb^T · (Xs - t_sb) - t_bc) new camera
//! ```
//!
//! The functions take raw matrices, since the finite-difference harness
//! evaluates them at first-order perturbed rotations that are no longer
//! orthonormal. Landmark queries, the out-of-state Jacobian engine and the
//! validation harness all evaluate the chain through here.

use nalgebra::{Matrix3, Vector3};

/// `(x, y, ρ) → (x/ρ, y/ρ, 1/ρ)`.
///
/// Returns `None` unless `ρ` is finite and positive and every component of
/// the result is finite. A subnormal `ρ` overflows `1/ρ` and is rejected.
#[inline]
pub fn inverse_depth_to_point(x: f64, y: f64, inverse_depth: f64) -> Option<Vector3<f64>> {
    if !inverse_depth.is_finite() || inverse_depth <= 0.0 {
        return None;
    }
    let z = 1.0 / inverse_depth;
    let point = Vector3::new(x * z, y * z, z);
    if point.iter().all(|c| c.is_finite()) {
        Some(point)
    } else {
        None
    }
}

/// Anchor camera point to spatial frame: `Xs = R_r · (R_bc · Xc + t_bc) + t_r`.
#[inline]
pub fn anchor_camera_to_spatial(
    xc: &Vector3<f64>,
    r_anchor: &Matrix3<f64>,
    t_anchor: &Vector3<f64>,
    r_bc: &Matrix3<f64>,
    t_bc: &Vector3<f64>,
) -> Vector3<f64> {
    r_anchor * (r_bc * xc + t_bc) + t_anchor
}

/// Spatial point to the camera of body pose `(R_sb, t_sb)`:
/// `Xcn = R_bc^T · (R_sb^T · (Xs - t_sb) - t_bc)`.
#[inline]
pub fn spatial_to_camera(
    xs: &Vector3<f64>,
    r_sb: &Matrix3<f64>,
    t_sb: &Vector3<f64>,
    r_bc: &Matrix3<f64>,
    t_bc: &Vector3<f64>,
) -> Vector3<f64> {
    r_bc.transpose() * (r_sb.transpose() * (xs - t_sb) - t_bc)
}
