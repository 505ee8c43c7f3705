//! SO(3) utilities for error-state linearization.
//!
//! Every rotation error in this crate is a rotation vector δω composed on the
//! **right** of the nominal rotation:
//!
//! ```text
//! R_true = R_nominal · Exp(δω) ≈ R_nominal · (I + [δω]×)
//! ```
//!
//! Consequently the transpose perturbs on the left:
//!
//! ```text
//! R_true^T ≈ (I - [δω]×) · R_nominal^T
//! ```
//!
//! All analytic Jacobians with respect to a rotation are derivatives with
//! respect to δω under this convention. [`perturb_rotation`] is the first-order
//! form used to derive and validate them, [`perturb_rotation_exact`] the exact
//! form used when a pose is actually updated.

use nalgebra::{Matrix3, Vector3};

/// Small angle threshold for numerical stability.
const SMALL_ANGLE_THRESHOLD: f64 = 1e-10;

/// Constructs the skew-symmetric matrix [v]× such that [v]× u = v × u.
///
/// ```text
/// [v]× = |  0   -v_z   v_y |
///        |  v_z   0   -v_x |
///        | -v_y  v_x    0  |
/// ```
#[inline]
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y,
        v.z, 0.0, -v.x,
        -v.y, v.x, 0.0,
    )
}

/// Exponential map from a rotation vector to a rotation matrix (Rodrigues).
pub fn exp_so3(omega: &Vector3<f64>) -> Matrix3<f64> {
    let theta = omega.norm();
    let omega_hat = skew(omega);

    if theta < SMALL_ANGLE_THRESHOLD {
        return Matrix3::identity() + omega_hat;
    }

    let a = theta.sin() / theta;
    let b = (1.0 - theta.cos()) / (theta * theta);
    Matrix3::identity() + a * omega_hat + b * omega_hat * omega_hat
}

/// First-order right perturbation: `R · (I + [δω]×)`.
///
/// The result is not orthonormal; it is the linearized rotation the
/// Jacobians are derived from.
#[inline]
pub fn perturb_rotation(rotation: &Matrix3<f64>, delta: &Vector3<f64>) -> Matrix3<f64> {
    rotation * (Matrix3::identity() + skew(delta))
}

/// Exact right perturbation: `R · Exp(δω)`.
#[inline]
pub fn perturb_rotation_exact(rotation: &Matrix3<f64>, delta: &Vector3<f64>) -> Matrix3<f64> {
    rotation * exp_so3(delta)
}
