//! Landmark - an inverse-depth point anchored to a keyframe.
//!
//! The state `(x, y, ρ)` lives in the camera frame of the landmark's anchor:
//! `(x, y)` is the normalized ray and `ρ` the inverse depth along it. The
//! anchor is fixed at creation.
//!
//! Each landmark also carries the [`JacobianCache`] written by the most recent
//! out-of-state Jacobian computation.

use nalgebra::Vector3;

use crate::error::GraphError;
use crate::estimator::JacobianCache;
use crate::geometry::frames::{anchor_camera_to_spatial, inverse_depth_to_point};
use crate::geometry::SE3;

use super::anchor::Anchor;
use super::types::{AnchorId, LandmarkId};

#[derive(Debug, Clone)]
pub struct Landmark {
    /// Handle of this landmark in the graph. Assigned by the pool.
    pub(crate) id: LandmarkId,

    /// Normalized ray in the anchor camera frame.
    x: f64,
    y: f64,

    /// Inverse depth ρ. Finite and strictly positive.
    inverse_depth: f64,

    /// Reference frame. Non-owning.
    anchor: AnchorId,

    cache: Option<JacobianCache>,
}

impl Landmark {
    pub(crate) fn new(
        id: LandmarkId,
        anchor: AnchorId,
        x: f64,
        y: f64,
        inverse_depth: f64,
    ) -> Result<Self, GraphError> {
        check_state(x, y, inverse_depth)?;
        Ok(Self {
            id,
            x,
            y,
            inverse_depth,
            anchor,
            cache: None,
        })
    }

    pub fn id(&self) -> LandmarkId {
        self.id
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn anchor(&self) -> AnchorId {
        self.anchor
    }

    pub fn inverse_depth(&self) -> f64 {
        self.inverse_depth
    }

    /// The filter state `(x, y, ρ)`.
    pub fn state(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.inverse_depth)
    }

    /// Overwrite `(x, y, ρ)` after a filter correction.
    ///
    /// Rejects a non-finite ray or a degenerate `ρ` and leaves the landmark
    /// untouched in that case.
    pub fn set_state(&mut self, state: &Vector3<f64>) -> Result<(), GraphError> {
        check_state(state.x, state.y, state.z)?;
        self.x = state.x;
        self.y = state.y;
        self.inverse_depth = state.z;
        Ok(())
    }

    /// `Xc = (x/ρ, y/ρ, 1/ρ)` in the anchor camera frame.
    pub fn camera_frame_coordinate(&self) -> Result<Vector3<f64>, GraphError> {
        inverse_depth_to_point(self.x, self.y, self.inverse_depth).ok_or(
            GraphError::DegenerateDepth {
                inverse_depth: self.inverse_depth,
            },
        )
    }

    /// `Xs = R_anchor · (R_bc · Xc + t_bc) + t_anchor`.
    ///
    /// `anchor` must be this landmark's own anchor, otherwise
    /// [`GraphError::ForeignAnchor`]. Use
    /// [`Graph::landmark_spatial_coordinate`](super::Graph::landmark_spatial_coordinate)
    /// to resolve it from the handle.
    pub fn spatial_frame_coordinate(
        &self,
        anchor: &Anchor,
        calibration: &SE3,
    ) -> Result<Vector3<f64>, GraphError> {
        if anchor.id() != self.anchor {
            return Err(GraphError::ForeignAnchor);
        }
        let xc = self.camera_frame_coordinate()?;
        Ok(anchor_camera_to_spatial(
            &xc,
            &anchor.rotation_matrix(),
            &anchor.translation(),
            &calibration.rotation_matrix(),
            &calibration.translation,
        ))
    }

    /// Partials from the latest out-of-state Jacobian computation.
    pub fn jacobian_cache(&self) -> Option<&JacobianCache> {
        self.cache.as_ref()
    }

    pub(crate) fn store_jacobian_cache(&mut self, cache: JacobianCache) {
        self.cache = Some(cache);
    }
}

fn check_state(x: f64, y: f64, inverse_depth: f64) -> Result<(), GraphError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(GraphError::NonFiniteRay { x, y });
    }
    if inverse_depth_to_point(x, y, inverse_depth).is_none() {
        return Err(GraphError::DegenerateDepth { inverse_depth });
    }
    Ok(())
}
