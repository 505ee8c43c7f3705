//! Rigid body transforms.
//!
//! `SE3 { R, t }` maps a point from its source frame into its target frame:
//! `p_target = R · p_source + t`. Naming follows `T_target_source`, so the
//! body-to-spatial pose is `T_sb` and the camera-to-body calibration `T_bc`.

use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion, Vector3};

use super::so3::exp_so3;

/// A rigid transform (rotation + translation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Build from a rotation matrix. Small departures from orthonormality are
    /// absorbed by normalizing the extracted quaternion.
    pub fn from_matrices(rotation: &Matrix3<f64>, translation: Vector3<f64>) -> Self {
        let q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*rotation));
        let rotation = UnitQuaternion::new_normalize(q.into_inner());
        Self {
            rotation,
            translation,
        }
    }

    /// Build from a homogeneous 4x4 matrix.
    pub fn from_matrix(m: Matrix4<f64>) -> Self {
        let r: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
        let t = Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
        Self::from_matrices(&r, t)
    }

    /// Homogeneous 4x4 matrix.
    pub fn to_matrix(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&self.rotation_matrix());
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    #[inline]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.rotation.to_rotation_matrix().into_inner()
    }

    /// `(R1, t1) ∘ (R2, t2) = (R1 R2, R1 t2 + t1)`.
    pub fn compose(&self, other: &SE3) -> SE3 {
        SE3 {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// `(R, t)^-1 = (R^T, -R^T t)`.
    pub fn inverse(&self) -> SE3 {
        let r_inv = self.rotation.inverse();
        SE3 {
            rotation: r_inv,
            translation: -(r_inv * self.translation),
        }
    }

    #[inline]
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }

    /// `R^T (p - t)`, the inverse mapping without building the inverse.
    #[inline]
    pub fn inverse_transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.inverse() * (p - self.translation)
    }

    /// Apply an error-state correction: `R ← R · Exp(δω)`, `t ← t + δt`.
    ///
    /// Same right-multiplicative convention as the Jacobians.
    pub fn retract(&self, delta_rotation: &Vector3<f64>, delta_translation: &Vector3<f64>) -> SE3 {
        let r = self.rotation_matrix() * exp_so3(delta_rotation);
        SE3::from_matrices(&r, self.translation + delta_translation)
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}
