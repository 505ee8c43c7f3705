//! Out-of-state (OOS) measurement Jacobians.
//!
//! An out-of-state update uses an observation taken at a body pose that is
//! no longer (or never was) part of the filter's active window. The landmark
//! is summarized by its spatial position `Xs`, carrying an additive error,
//! instead of being chained back through its anchor's pose error.
//!
//! # Measurement model
//!
//! ```text
//! Xc  = (x/ρ, y/ρ, 1/ρ)                                  anchor camera
//! Xs  = R_r · (R_bc · Xc + t_bc) + t_r + Xs_err          spatial
//! Xcn = R_bc^T · (R_sb^T · (Xs - t_sb) - t_bc)           observing camera
//! ```
//!
//! with the errors entering as
//!
//! ```text
//! R_sb ← R_sb · (I + [δω_sb]×)     t_sb ← t_sb + δt_sb
//! R_bc ← R_bc · (I + [δω_bc]×)     t_bc ← t_bc + δt_bc
//! ```
//!
//! # Analytic partials
//!
//! Let `Pb = R_sb^T · (Xs - t_sb)` (landmark in the observing body frame).
//! Using `(R · (I + [δω]×))^T = (I - [δω]×) · R^T` and `-[a]× b = [b]× a`:
//!
//! ```text
//! ∂Xcn/∂Xs    =  R_bc^T · R_sb^T
//! ∂Xcn/∂δω_sb =  R_bc^T · [Pb]×
//! ∂Xcn/∂t_sb  = -R_bc^T · R_sb^T
//! ```
//!
//! The calibration appears twice: inside `Xs` and in the outer transform. With
//! `∂Xs/∂δω_bc = -R_r · R_bc · [Xc]×` and `∂Xs/∂t_bc = R_r`:
//!
//! ```text
//! ∂Xcn/∂δω_bc = [Xcn]×           + ∂Xcn/∂Xs · ∂Xs/∂δω_bc
//! ∂Xcn/∂t_bc  = -R_bc^T          + ∂Xcn/∂Xs · ∂Xs/∂t_bc
//!               └ outer transform ┘  └ through Xs ┘
//! ```

use nalgebra::{Matrix3, Vector3};
use tracing::{debug, trace};

use crate::atlas::{Graph, LandmarkId};
use crate::camera::CameraModel;
use crate::error::GraphError;
use crate::geometry::frames::{anchor_camera_to_spatial, spatial_to_camera};
use crate::geometry::{perturb_rotation, skew, SE3};

use super::cache::{JacobianCache, NormalizedProjection};
use super::observation::Observation;

/// The five error channels `Xcn` is differentiated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorChannel {
    /// δω_sb
    RotationSb,
    /// δt_sb
    TranslationSb,
    /// δω_bc
    RotationBc,
    /// δt_bc
    TranslationBc,
    /// Xs_err
    SpatialPoint,
}

impl ErrorChannel {
    pub const ALL: [ErrorChannel; 5] = [
        ErrorChannel::RotationSb,
        ErrorChannel::TranslationSb,
        ErrorChannel::RotationBc,
        ErrorChannel::TranslationBc,
        ErrorChannel::SpatialPoint,
    ];

    pub fn index(self) -> usize {
        match self {
            ErrorChannel::RotationSb => 0,
            ErrorChannel::TranslationSb => 1,
            ErrorChannel::RotationBc => 2,
            ErrorChannel::TranslationBc => 3,
            ErrorChannel::SpatialPoint => 4,
        }
    }
}

impl std::fmt::Display for ErrorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorChannel::RotationSb => "dWsb",
            ErrorChannel::TranslationSb => "dTsb",
            ErrorChannel::RotationBc => "dWbc",
            ErrorChannel::TranslationBc => "dTbc",
            ErrorChannel::SpatialPoint => "dXs",
        };
        write!(f, "{}", name)
    }
}

/// A value for each error channel. Zero is the nominal operating point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ErrorState {
    pub rotation_sb: Vector3<f64>,
    pub translation_sb: Vector3<f64>,
    pub rotation_bc: Vector3<f64>,
    pub translation_bc: Vector3<f64>,
    pub spatial_point: Vector3<f64>,
}

impl ErrorState {
    pub fn zero() -> Self {
        Self::default()
    }

    /// All zero except `value` on component `axis` of `channel`.
    pub fn along(channel: ErrorChannel, axis: usize, value: f64) -> Self {
        let mut e = Self::zero();
        e.channel_mut(channel)[axis] = value;
        e
    }

    fn channel_mut(&mut self, channel: ErrorChannel) -> &mut Vector3<f64> {
        match channel {
            ErrorChannel::RotationSb => &mut self.rotation_sb,
            ErrorChannel::TranslationSb => &mut self.translation_sb,
            ErrorChannel::RotationBc => &mut self.rotation_bc,
            ErrorChannel::TranslationBc => &mut self.translation_bc,
            ErrorChannel::SpatialPoint => &mut self.spatial_point,
        }
    }
}

/// Nominal values of one out-of-state measurement, snapshotted from the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OosOperatingPoint {
    /// Landmark in its anchor camera frame.
    pub xc: Vector3<f64>,
    /// Reference anchor pose `(R_r, t_r)`.
    pub r_anchor: Matrix3<f64>,
    pub t_anchor: Vector3<f64>,
    /// Observing body pose `(R_sb, t_sb)`.
    pub r_sb: Matrix3<f64>,
    pub t_sb: Vector3<f64>,
    /// Camera-to-body calibration `(R_bc, t_bc)`.
    pub r_bc: Matrix3<f64>,
    pub t_bc: Vector3<f64>,
}

impl OosOperatingPoint {
    pub fn new(xc: Vector3<f64>, anchor: &SE3, observer: &SE3, calibration: &SE3) -> Self {
        Self {
            xc,
            r_anchor: anchor.rotation_matrix(),
            t_anchor: anchor.translation,
            r_sb: observer.rotation_matrix(),
            t_sb: observer.translation,
            r_bc: calibration.rotation_matrix(),
            t_bc: calibration.translation,
        }
    }

    /// Resolve the landmark, its anchor and the observing anchor in `graph`.
    ///
    /// Fails with `StaleReference` if any handle was released and with
    /// `DegenerateDepth` if the landmark's inverse depth is not positive.
    pub fn from_graph(
        graph: &Graph,
        landmark: LandmarkId,
        calibration: &SE3,
        observation: &Observation,
    ) -> Result<Self, GraphError> {
        let (landmark, anchor) = graph.landmark_with_anchor(landmark)?;
        let observer = graph.anchor(observation.anchor)?;
        let xc = landmark.camera_frame_coordinate()?;
        Ok(Self::new(xc, &anchor.pose, &observer.pose, calibration))
    }

    /// Nominal `Xs`.
    pub fn spatial_point(&self) -> Vector3<f64> {
        anchor_camera_to_spatial(&self.xc, &self.r_anchor, &self.t_anchor, &self.r_bc, &self.t_bc)
    }

    /// `Xcn` at the nominal point plus `error`, first-order rotation model.
    pub fn evaluate(&self, error: &ErrorState) -> Vector3<f64> {
        let r_sb = perturb_rotation(&self.r_sb, &error.rotation_sb);
        let t_sb = self.t_sb + error.translation_sb;
        let r_bc = perturb_rotation(&self.r_bc, &error.rotation_bc);
        let t_bc = self.t_bc + error.translation_bc;

        let xs = anchor_camera_to_spatial(&self.xc, &self.r_anchor, &self.t_anchor, &r_bc, &t_bc)
            + error.spatial_point;
        spatial_to_camera(&xs, &r_sb, &t_sb, &r_bc, &t_bc)
    }

    /// Analytic partials at the nominal point. The projection block is left
    /// empty; it needs the measured pixel.
    pub fn analytic_jacobians(&self) -> JacobianCache {
        let xs = self.spatial_point();

        let r_sb_t = self.r_sb.transpose();
        let r_bc_t = self.r_bc.transpose();

        let p_body = r_sb_t * (xs - self.t_sb);
        let xcn = r_bc_t * (p_body - self.t_bc);

        let dxcn_dxs = r_bc_t * r_sb_t;
        let dxcn_dwsb = r_bc_t * skew(&p_body);
        let dxcn_dtsb = -dxcn_dxs;

        let dxs_dwbc = -self.r_anchor * self.r_bc * skew(&self.xc);
        let dxs_dtbc = self.r_anchor;
        let dxcn_dwbc = skew(&xcn) + dxcn_dxs * dxs_dwbc;
        let dxcn_dtbc = -r_bc_t + dxcn_dxs * dxs_dtbc;

        JacobianCache {
            xs,
            xcn,
            dxcn_dwsb,
            dxcn_dtsb,
            dxcn_dwbc,
            dxcn_dtbc,
            dxcn_dxs,
            projection: None,
        }
    }
}

/// Compute the out-of-state Jacobians of `landmark` for `observation` and
/// store them in the landmark's cache.
///
/// `calibration` is the nominal camera-to-body transform `T_bc`. The observing
/// body pose is the pose stored on `observation.anchor`.
///
/// On error nothing is written: the landmark keeps its previous cache.
pub fn compute_oos_jacobian<C: CameraModel + ?Sized>(
    graph: &mut Graph,
    camera: &C,
    landmark: LandmarkId,
    calibration: &SE3,
    observation: &Observation,
) -> Result<JacobianCache, GraphError> {
    let point = OosOperatingPoint::from_graph(graph, landmark, calibration, observation)?;

    let mut cache = point.analytic_jacobians();
    let measured = camera.unproject(&observation.pixel);
    cache.projection = NormalizedProjection::new(&cache.xcn, &measured);

    if cache.projection.is_none() {
        debug!(
            "[OOS] landmark {:?} not in front of observing camera (z = {:.3})",
            landmark, cache.xcn.z
        );
    }
    trace!(
        "[OOS] landmark {:?}: Xs = {:?}, Xcn = {:?}",
        landmark,
        cache.xs,
        cache.xcn
    );

    graph.landmark_mut(landmark)?.store_jacobian_cache(cache.clone());
    Ok(cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PinholeCamera;
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector2};

    fn identity_point() -> OosOperatingPoint {
        OosOperatingPoint::new(
            Vector3::new(0.2, -0.1, 2.0),
            &SE3::identity(),
            &SE3::identity(),
            &SE3::identity(),
        )
    }

    fn skewed_point() -> OosOperatingPoint {
        OosOperatingPoint::new(
            Vector3::new(0.4, 0.3, 3.0),
            &SE3::new(
                UnitQuaternion::from_scaled_axis(Vector3::new(0.3, -0.2, 0.9)),
                Vector3::new(0.5, -1.0, 0.2),
            ),
            &SE3::new(
                UnitQuaternion::from_scaled_axis(Vector3::new(-0.4, 0.6, 0.1)),
                Vector3::new(-0.3, 0.8, 1.1),
            ),
            &SE3::new(
                UnitQuaternion::from_scaled_axis(Vector3::new(1.2, 0.0, -0.5)),
                Vector3::new(0.05, -0.02, 0.1),
            ),
        )
    }

    #[test]
    fn test_identity_scenario() {
        let point = identity_point();
        let cache = point.analytic_jacobians();

        assert_relative_eq!(cache.xs, Vector3::new(0.2, -0.1, 2.0), epsilon = 1e-15);
        assert_relative_eq!(cache.xcn, cache.xs, epsilon = 1e-15);
        assert_relative_eq!(cache.dxcn_dtsb, -Matrix3::identity(), epsilon = 1e-15);
        assert_relative_eq!(cache.dxcn_dxs, Matrix3::identity(), epsilon = 1e-15);
        // Both appearances of t_bc cancel when every rotation is identity
        assert_relative_eq!(cache.dxcn_dtbc, Matrix3::zeros(), epsilon = 1e-15);
    }

    #[test]
    fn test_translation_shift_is_first_order_negative() {
        let point = identity_point();
        let delta = 1e-6;

        let base = point.evaluate(&ErrorState::zero());
        let shifted = point.evaluate(&ErrorState::along(ErrorChannel::TranslationSb, 0, delta));

        assert_relative_eq!(shifted - base, Vector3::new(-delta, 0.0, 0.0), epsilon = 1e-15);
    }

    #[test]
    fn test_evaluate_zero_matches_analytic_xcn() {
        let point = skewed_point();
        let cache = point.analytic_jacobians();

        assert_relative_eq!(point.evaluate(&ErrorState::zero()), cache.xcn, epsilon = 1e-12);
        assert_relative_eq!(point.spatial_point(), cache.xs, epsilon = 1e-12);
    }

    #[test]
    fn test_spatial_point_partial_is_negated_translation_partial() {
        let cache = skewed_point().analytic_jacobians();
        assert_relative_eq!(cache.dxcn_dxs, -cache.dxcn_dtsb, epsilon = 1e-15);
    }

    #[test]
    fn test_calibration_rotation_includes_both_appearances() {
        let point = skewed_point();
        let cache = point.analytic_jacobians();

        // Dropping the contribution through Xs must visibly change the result
        let outer_only = skew(&cache.xcn);
        assert!((cache.dxcn_dwbc - outer_only).norm() > 1e-3);

        // Central difference of the full model agrees with the summed partial
        let h = 1e-6;
        for axis in 0..3 {
            let plus = point.evaluate(&ErrorState::along(ErrorChannel::RotationBc, axis, h));
            let minus = point.evaluate(&ErrorState::along(ErrorChannel::RotationBc, axis, -h));
            let numerical = (plus - minus) / (2.0 * h);
            assert_relative_eq!(
                numerical,
                cache.dxcn_dwbc.column(axis).into_owned(),
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn test_error_state_along() {
        let e = ErrorState::along(ErrorChannel::RotationBc, 2, 0.5);
        assert_eq!(e.rotation_bc, Vector3::new(0.0, 0.0, 0.5));
        assert_eq!(e.rotation_sb, Vector3::zeros());
        assert_eq!(e.spatial_point, Vector3::zeros());
    }

    #[test]
    fn test_channel_indices_are_distinct() {
        let indices: Vec<usize> = ErrorChannel::ALL.iter().map(|c| c.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_compute_writes_cache() {
        let mut graph = Graph::new(8, 4);
        let camera = PinholeCamera::new(500.0, 500.0, 320.0, 240.0);
        let anchor = graph.create_anchor(SE3::identity()).unwrap();
        let lm = graph.create_landmark(anchor, 0.1, -0.05, 0.5).unwrap();

        assert!(graph.landmark(lm).unwrap().jacobian_cache().is_none());

        let obs = Observation::new(anchor, Vector2::new(370.0, 215.0));
        let cache = compute_oos_jacobian(&mut graph, &camera, lm, &SE3::identity(), &obs).unwrap();

        assert_eq!(graph.landmark(lm).unwrap().jacobian_cache(), Some(&cache));
        let projection = cache.projection.unwrap();
        assert_relative_eq!(projection.predicted, Vector2::new(0.1, -0.05), epsilon = 1e-15);
        assert_relative_eq!(projection.residual, Vector2::zeros(), epsilon = 1e-15);
    }

    #[test]
    fn test_stale_observer_leaves_cache_untouched() {
        let mut graph = Graph::new(8, 4);
        let camera = PinholeCamera::new(500.0, 500.0, 320.0, 240.0);
        let anchor = graph.create_anchor(SE3::identity()).unwrap();
        let observer = graph.create_anchor(SE3::identity()).unwrap();
        let lm = graph.create_landmark(anchor, 0.1, -0.05, 0.5).unwrap();

        let obs = Observation::new(observer, Vector2::new(320.0, 240.0));
        let first = compute_oos_jacobian(&mut graph, &camera, lm, &SE3::identity(), &obs).unwrap();

        graph.release_anchor(observer).unwrap();
        let err = compute_oos_jacobian(&mut graph, &camera, lm, &SE3::identity(), &obs).unwrap_err();

        assert!(matches!(err, GraphError::StaleReference { .. }));
        assert_eq!(graph.landmark(lm).unwrap().jacobian_cache(), Some(&first));
    }

    #[test]
    fn test_point_behind_observer_has_no_projection() {
        let mut graph = Graph::new(8, 4);
        let camera = PinholeCamera::new(500.0, 500.0, 320.0, 240.0);
        let anchor = graph.create_anchor(SE3::identity()).unwrap();
        // Observer 5 m ahead looking back along -z
        let observer = graph
            .create_anchor(SE3::new(
                UnitQuaternion::from_scaled_axis(Vector3::new(0.0, std::f64::consts::PI, 0.0)),
                Vector3::new(0.0, 0.0, 5.0),
            ))
            .unwrap();
        let lm = graph.create_landmark(anchor, 0.0, 0.0, 0.1).unwrap();

        let obs = Observation::new(observer, Vector2::new(320.0, 240.0));
        let cache = compute_oos_jacobian(&mut graph, &camera, lm, &SE3::identity(), &obs).unwrap();

        assert!(cache.xcn.z < 0.0);
        assert!(cache.projection.is_none());
        assert!(cache.measurement_blocks().is_none());
    }
}
