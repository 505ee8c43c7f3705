//! Anchor - the keyframe pose a landmark's inverse depth is expressed in.
//!
//! Anchors are owned by the [`Graph`](super::Graph). Landmarks refer to them
//! through an [`AnchorId`] and never own them. An anchor is reclaimed only
//! once no landmark references it.

use nalgebra::{Matrix3, Vector3};

use crate::geometry::SE3;

use super::types::AnchorId;

#[derive(Debug, Clone)]
pub struct Anchor {
    /// Handle of this anchor in the graph. Assigned by the pool.
    id: AnchorId,

    /// Body-to-spatial pose `T_sb` at the time the anchor was created.
    pub pose: SE3,

    /// Creation order. Strictly increasing across the lifetime of a graph,
    /// even when pool slots are reused.
    pub sequence: u64,

    /// Index of this pose in the filter's active state window, if any.
    /// `None` once the pose has left the window.
    pub state_slot: Option<usize>,

    /// Number of live landmarks anchored here.
    landmark_count: usize,
}

impl Anchor {
    pub(crate) fn new(id: AnchorId, pose: SE3, sequence: u64) -> Self {
        Self {
            id,
            pose,
            sequence,
            state_slot: None,
            landmark_count: 0,
        }
    }

    pub fn id(&self) -> AnchorId {
        self.id
    }

    #[inline]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.pose.rotation_matrix()
    }

    #[inline]
    pub fn translation(&self) -> Vector3<f64> {
        self.pose.translation
    }

    /// Whether the pose is still part of the filter's active window.
    pub fn is_in_window(&self) -> bool {
        self.state_slot.is_some()
    }

    pub fn landmark_count(&self) -> usize {
        self.landmark_count
    }

    pub(crate) fn add_reference(&mut self) {
        self.landmark_count += 1;
    }

    pub(crate) fn remove_reference(&mut self) {
        self.landmark_count = self.landmark_count.saturating_sub(1);
    }
}
