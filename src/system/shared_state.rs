//! Shared state between the tracking front end and the filter update.
//!
//! Tracking creates and prunes landmarks; the filter computes Jacobians and
//! writes landmark caches. Both mutate the graph, so both take the write lock.
//! Pool mutation and handle-validity reads are therefore never concurrent.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::atlas::{Graph, LandmarkId};
use crate::camera::CameraModel;
use crate::config::EstimatorConfig;
use crate::error::GraphError;
use crate::estimator::{compute_oos_jacobian, JacobianCache, Observation};
use crate::geometry::SE3;

/// Graph shared across threads.
pub struct SharedState {
    /// Protected by RwLock: writers are tracking (create/release) and the
    /// filter (cache writes); readers are everything else.
    pub graph: RwLock<Graph>,
}

impl SharedState {
    pub fn new(config: &EstimatorConfig) -> Arc<Self> {
        Arc::new(Self {
            graph: RwLock::new(Graph::from_config(config)),
        })
    }

    /// [`compute_oos_jacobian`] under the write lock.
    pub fn compute_oos_jacobian<C: CameraModel + ?Sized>(
        &self,
        camera: &C,
        landmark: LandmarkId,
        calibration: &SE3,
        observation: &Observation,
    ) -> Result<JacobianCache, GraphError> {
        let mut graph = self.graph.write();
        compute_oos_jacobian(&mut graph, camera, landmark, calibration, observation)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            graph: RwLock::new(Graph::default()),
        }
    }
}
