//! Graph - owner of all anchors and landmarks.
//!
//! The graph holds two fixed-capacity pools and the references between them:
//! - Landmarks point at their anchor (LM → anchor via [`Landmark::anchor`])
//! - Anchors count the landmarks pointing at them
//!
//! Every handle passed in is checked against its pool, so a released anchor
//! or landmark is reported as [`GraphError::StaleReference`] instead of being
//! read. Operations either complete or leave the graph unchanged.
//!
//! The graph does no locking. Wrap it in
//! [`SharedState`](crate::system::SharedState) when tracking and filtering run
//! on different threads.

use nalgebra::{Vector2, Vector3};
use tracing::debug;

use crate::camera::CameraModel;
use crate::config::EstimatorConfig;
use crate::error::GraphError;
use crate::geometry::SE3;

use super::anchor::Anchor;
use super::landmark::Landmark;
use super::pool::Pool;
use super::types::{AnchorId, LandmarkId, RecordKind};

pub struct Graph {
    anchors: Pool<AnchorId, Anchor>,
    landmarks: Pool<LandmarkId, Landmark>,

    /// Sequence number handed to the next anchor.
    next_anchor_sequence: u64,

    /// Inverse depth for landmarks initialized from a single pixel.
    initial_inverse_depth: f64,
}

impl Graph {
    /// Create an empty graph with the given pool capacities.
    pub fn new(landmark_capacity: usize, anchor_capacity: usize) -> Self {
        Self {
            anchors: Pool::with_capacity(RecordKind::Anchor, anchor_capacity),
            landmarks: Pool::with_capacity(RecordKind::Landmark, landmark_capacity),
            next_anchor_sequence: 0,
            initial_inverse_depth: EstimatorConfig::default().initial_inverse_depth,
        }
    }

    pub fn from_config(config: &EstimatorConfig) -> Self {
        Self {
            initial_inverse_depth: config.initial_inverse_depth,
            ..Self::new(config.landmark_capacity, config.anchor_capacity)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Anchors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an anchor at body pose `T_sb`.
    pub fn create_anchor(&mut self, pose: SE3) -> Result<AnchorId, GraphError> {
        let sequence = self.next_anchor_sequence;
        let id = self
            .anchors
            .create_with_key(|id| Anchor::new(id, pose, sequence))?;
        self.next_anchor_sequence += 1;
        debug!("[Graph] created anchor #{} ({} live)", sequence, self.anchors.len());
        Ok(id)
    }

    /// Release an anchor. Fails with [`GraphError::AnchorInUse`] while
    /// landmarks still reference it.
    pub fn release_anchor(&mut self, id: AnchorId) -> Result<Anchor, GraphError> {
        let references = self.anchors.get(id)?.landmark_count();
        if references > 0 {
            return Err(GraphError::AnchorInUse { references });
        }
        let anchor = self.anchors.release(id)?;
        debug!("[Graph] released anchor #{}", anchor.sequence);
        Ok(anchor)
    }

    /// Record where (if anywhere) the anchor's pose sits in the filter window.
    pub fn set_anchor_state_slot(
        &mut self,
        id: AnchorId,
        slot: Option<usize>,
    ) -> Result<(), GraphError> {
        self.anchors.get_mut(id)?.state_slot = slot;
        Ok(())
    }

    /// Anchors currently in the filter window, ordered by state slot.
    pub fn anchors_in_window(&self) -> Vec<AnchorId> {
        let mut in_window: Vec<(usize, AnchorId)> = self
            .anchors
            .iter()
            .filter_map(|(id, a)| a.state_slot.map(|slot| (slot, id)))
            .collect();
        in_window.sort_unstable_by_key(|&(slot, _)| slot);
        in_window.into_iter().map(|(_, id)| id).collect()
    }

    /// Release every anchor that has no landmarks and has left the filter
    /// window. Returns how many were released.
    pub fn prune_unreferenced_anchors(&mut self) -> usize {
        let orphans: Vec<AnchorId> = self
            .anchors
            .iter()
            .filter(|(_, a)| a.landmark_count() == 0 && !a.is_in_window())
            .map(|(id, _)| id)
            .collect();

        let mut released = 0;
        for id in orphans {
            if self.anchors.release(id).is_ok() {
                released += 1;
            }
        }
        if released > 0 {
            debug!(
                "[Graph] pruned {} unreferenced anchors (remaining: {})",
                released,
                self.anchors.len()
            );
        }
        released
    }

    pub fn anchor(&self, id: AnchorId) -> Result<&Anchor, GraphError> {
        self.anchors.get(id)
    }

    pub fn anchor_mut(&mut self, id: AnchorId) -> Result<&mut Anchor, GraphError> {
        self.anchors.get_mut(id)
    }

    pub fn is_anchor_valid(&self, id: AnchorId) -> bool {
        self.anchors.is_valid(id)
    }

    pub fn num_anchors(&self) -> usize {
        self.anchors.len()
    }

    pub fn anchors(&self) -> impl Iterator<Item = &Anchor> + '_ {
        self.anchors.iter().map(|(_, a)| a)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Landmarks
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a landmark `(x, y, ρ)` in the camera frame of `anchor`.
    pub fn create_landmark(
        &mut self,
        anchor: AnchorId,
        x: f64,
        y: f64,
        inverse_depth: f64,
    ) -> Result<LandmarkId, GraphError> {
        if !self.anchors.is_valid(anchor) {
            return Err(GraphError::StaleReference {
                kind: RecordKind::Anchor,
            });
        }
        let mut landmark = Landmark::new(LandmarkId::default(), anchor, x, y, inverse_depth)?;
        let id = self.landmarks.create_with_key(|id| {
            landmark.id = id;
            landmark
        })?;
        self.anchors.get_mut(anchor)?.add_reference();
        Ok(id)
    }

    /// Create a landmark from a pixel detection in the anchor's image, using
    /// the configured initial inverse depth.
    pub fn create_landmark_from_pixel<C: CameraModel + ?Sized>(
        &mut self,
        anchor: AnchorId,
        pixel: &Vector2<f64>,
        camera: &C,
    ) -> Result<LandmarkId, GraphError> {
        let ray = camera.unproject(pixel);
        self.create_landmark(anchor, ray.x, ray.y, self.initial_inverse_depth)
    }

    /// Release a landmark and drop its reference on the anchor.
    pub fn release_landmark(&mut self, id: LandmarkId) -> Result<Landmark, GraphError> {
        let landmark = self.landmarks.release(id)?;
        if let Ok(anchor) = self.anchors.get_mut(landmark.anchor()) {
            anchor.remove_reference();
        }
        Ok(landmark)
    }

    pub fn landmark(&self, id: LandmarkId) -> Result<&Landmark, GraphError> {
        self.landmarks.get(id)
    }

    pub fn landmark_mut(&mut self, id: LandmarkId) -> Result<&mut Landmark, GraphError> {
        self.landmarks.get_mut(id)
    }

    pub fn is_landmark_valid(&self, id: LandmarkId) -> bool {
        self.landmarks.is_valid(id)
    }

    pub fn num_landmarks(&self) -> usize {
        self.landmarks.len()
    }

    pub fn landmarks(&self) -> impl Iterator<Item = &Landmark> + '_ {
        self.landmarks.iter().map(|(_, lm)| lm)
    }

    /// Resolve a landmark together with its anchor.
    pub fn landmark_with_anchor(
        &self,
        id: LandmarkId,
    ) -> Result<(&Landmark, &Anchor), GraphError> {
        let landmark = self.landmarks.get(id)?;
        let anchor = self.anchors.get(landmark.anchor())?;
        Ok((landmark, anchor))
    }

    /// `Xs` of a landmark through its own anchor and the calibration `T_bc`.
    pub fn landmark_spatial_coordinate(
        &self,
        id: LandmarkId,
        calibration: &SE3,
    ) -> Result<Vector3<f64>, GraphError> {
        let (landmark, anchor) = self.landmark_with_anchor(id)?;
        landmark.spatial_frame_coordinate(anchor, calibration)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::from_config(&EstimatorConfig::default())
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("anchors", &self.anchors)
            .field("landmarks", &self.landmarks)
            .field("next_anchor_sequence", &self.next_anchor_sequence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PinholeCamera;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    fn create_test_graph() -> Graph {
        Graph::new(4, 2)
    }

    #[test]
    fn test_create_anchor_and_landmark() {
        let mut graph = create_test_graph();

        let anchor = graph.create_anchor(SE3::identity()).unwrap();
        let lm = graph.create_landmark(anchor, 0.1, -0.05, 0.5).unwrap();

        assert_eq!(graph.num_anchors(), 1);
        assert_eq!(graph.num_landmarks(), 1);
        assert_eq!(graph.landmark(lm).unwrap().anchor(), anchor);
        assert_eq!(graph.landmark(lm).unwrap().id(), lm);
        assert_eq!(graph.anchor(anchor).unwrap().id(), anchor);
        assert_eq!(graph.anchor(anchor).unwrap().landmark_count(), 1);
    }

    #[test]
    fn test_anchor_sequence_is_monotonic_across_slot_reuse() {
        let mut graph = create_test_graph();

        let a = graph.create_anchor(SE3::identity()).unwrap();
        let b = graph.create_anchor(SE3::identity()).unwrap();
        graph.release_anchor(a).unwrap();
        let c = graph.create_anchor(SE3::identity()).unwrap();

        let seq_b = graph.anchor(b).unwrap().sequence;
        let seq_c = graph.anchor(c).unwrap().sequence;
        assert_eq!(seq_b, 1);
        assert_eq!(seq_c, 2);
    }

    #[test]
    fn test_landmark_pool_exhaustion_and_recovery() {
        let mut graph = create_test_graph();
        let anchor = graph.create_anchor(SE3::identity()).unwrap();

        let ids: Vec<LandmarkId> = (0..4)
            .map(|_| graph.create_landmark(anchor, 0.0, 0.0, 1.0).unwrap())
            .collect();

        let err = graph.create_landmark(anchor, 0.0, 0.0, 1.0).unwrap_err();
        assert_eq!(
            err,
            GraphError::PoolExhausted {
                kind: RecordKind::Landmark,
                capacity: 4
            }
        );
        // Failed create leaves reference count untouched
        assert_eq!(graph.anchor(anchor).unwrap().landmark_count(), 4);

        graph.release_landmark(ids[1]).unwrap();
        let fresh = graph.create_landmark(anchor, 0.0, 0.0, 1.0).unwrap();

        assert_ne!(fresh, ids[1]);
        assert!(matches!(
            graph.landmark(ids[1]),
            Err(GraphError::StaleReference {
                kind: RecordKind::Landmark
            })
        ));
    }

    #[test]
    fn test_anchor_pool_exhaustion() {
        let mut graph = create_test_graph();
        graph.create_anchor(SE3::identity()).unwrap();
        graph.create_anchor(SE3::identity()).unwrap();

        assert!(matches!(
            graph.create_anchor(SE3::identity()),
            Err(GraphError::PoolExhausted {
                kind: RecordKind::Anchor,
                capacity: 2
            })
        ));
    }

    #[test]
    fn test_landmark_on_stale_anchor_rejected() {
        let mut graph = create_test_graph();
        let anchor = graph.create_anchor(SE3::identity()).unwrap();
        graph.release_anchor(anchor).unwrap();

        let err = graph.create_landmark(anchor, 0.0, 0.0, 1.0).unwrap_err();
        assert_eq!(
            err,
            GraphError::StaleReference {
                kind: RecordKind::Anchor
            }
        );
        assert_eq!(graph.num_landmarks(), 0);
    }

    #[test]
    fn test_degenerate_depth_rejected() {
        let mut graph = create_test_graph();
        let anchor = graph.create_anchor(SE3::identity()).unwrap();

        let err = graph.create_landmark(anchor, 0.1, 0.1, 0.0).unwrap_err();
        assert_eq!(err, GraphError::DegenerateDepth { inverse_depth: 0.0 });
        assert_eq!(graph.num_landmarks(), 0);
        assert_eq!(graph.anchor(anchor).unwrap().landmark_count(), 0);
    }

    #[test]
    fn test_non_finite_landmark_state_rejected() {
        let mut graph = create_test_graph();
        let anchor = graph.create_anchor(SE3::identity()).unwrap();

        assert!(matches!(
            graph.create_landmark(anchor, 0.1, 0.1, 1e-320),
            Err(GraphError::DegenerateDepth { .. })
        ));
        assert!(matches!(
            graph.create_landmark(anchor, 0.1, 0.1, f64::INFINITY),
            Err(GraphError::DegenerateDepth { .. })
        ));
        assert!(matches!(
            graph.create_landmark(anchor, f64::NAN, 0.1, 0.5),
            Err(GraphError::NonFiniteRay { .. })
        ));
        assert_eq!(graph.num_landmarks(), 0);
        assert_eq!(graph.anchor(anchor).unwrap().landmark_count(), 0);

        let lm = graph.create_landmark(anchor, 0.1, 0.1, 0.5).unwrap();
        let landmark = graph.landmark_mut(lm).unwrap();
        assert!(landmark.set_state(&Vector3::new(0.1, 0.1, 1e-320)).is_err());
        assert!(landmark.set_state(&Vector3::new(f64::INFINITY, 0.1, 0.5)).is_err());
        assert!(landmark.camera_frame_coordinate().unwrap().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_anchor_in_use_cannot_be_released() {
        let mut graph = create_test_graph();
        let anchor = graph.create_anchor(SE3::identity()).unwrap();
        let lm = graph.create_landmark(anchor, 0.0, 0.0, 1.0).unwrap();

        assert_eq!(
            graph.release_anchor(anchor).unwrap_err(),
            GraphError::AnchorInUse { references: 1 }
        );

        graph.release_landmark(lm).unwrap();
        assert!(graph.release_anchor(anchor).is_ok());
        assert!(!graph.is_anchor_valid(anchor));
    }

    #[test]
    fn test_prune_unreferenced_anchors() {
        let mut graph = Graph::new(4, 4);
        let used = graph.create_anchor(SE3::identity()).unwrap();
        let in_window = graph.create_anchor(SE3::identity()).unwrap();
        let orphan = graph.create_anchor(SE3::identity()).unwrap();
        graph.create_landmark(used, 0.0, 0.0, 1.0).unwrap();
        graph.set_anchor_state_slot(in_window, Some(0)).unwrap();

        assert_eq!(graph.prune_unreferenced_anchors(), 1);
        assert!(graph.is_anchor_valid(used));
        assert!(graph.is_anchor_valid(in_window));
        assert!(!graph.is_anchor_valid(orphan));
    }

    #[test]
    fn test_anchors_in_window_ordered_by_slot() {
        let mut graph = Graph::new(4, 4);
        let a = graph.create_anchor(SE3::identity()).unwrap();
        let b = graph.create_anchor(SE3::identity()).unwrap();
        let c = graph.create_anchor(SE3::identity()).unwrap();
        graph.set_anchor_state_slot(a, Some(2)).unwrap();
        graph.set_anchor_state_slot(c, Some(0)).unwrap();

        assert_eq!(graph.anchors_in_window(), vec![c, a]);

        graph.set_anchor_state_slot(a, None).unwrap();
        assert_eq!(graph.anchors_in_window(), vec![c]);
        assert!(!graph.anchor(b).unwrap().is_in_window());
    }

    #[test]
    fn test_create_landmark_from_pixel() {
        let config = EstimatorConfig {
            initial_inverse_depth: 0.25,
            ..EstimatorConfig::default()
        };
        let mut graph = Graph::from_config(&config);
        let camera = PinholeCamera::new(500.0, 500.0, 320.0, 240.0);
        let anchor = graph.create_anchor(SE3::identity()).unwrap();

        let lm = graph
            .create_landmark_from_pixel(anchor, &Vector2::new(370.0, 215.0), &camera)
            .unwrap();

        let xc = graph.landmark(lm).unwrap().camera_frame_coordinate().unwrap();
        assert_relative_eq!(xc, Vector3::new(0.4, -0.2, 4.0), epsilon = 1e-12);
    }

    #[test]
    fn test_landmark_spatial_coordinate() {
        let mut graph = create_test_graph();
        let pose = SE3::new(
            UnitQuaternion::from_scaled_axis(Vector3::new(0.1, 0.2, 0.3)),
            Vector3::new(-1.0, 0.5, 2.0),
        );
        let calibration = SE3::new(
            UnitQuaternion::from_scaled_axis(Vector3::new(-0.3, 0.0, 0.2)),
            Vector3::new(0.1, 0.0, -0.05),
        );
        let anchor = graph.create_anchor(pose).unwrap();
        let lm = graph.create_landmark(anchor, 0.2, 0.1, 0.4).unwrap();

        let xs = graph.landmark_spatial_coordinate(lm, &calibration).unwrap();
        let expected = pose
            .compose(&calibration)
            .transform_point(&Vector3::new(0.5, 0.25, 2.5));
        assert_relative_eq!(xs, expected, epsilon = 1e-12);
    }
}
