//! Observation - a re-detection of a landmark at some body pose.

use nalgebra::Vector2;

use crate::atlas::AnchorId;

/// A pixel measurement taken at the body pose stored on `anchor`.
///
/// Ephemeral: built by the caller for one update and never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Pose the measurement was taken at. May differ from the landmark's own
    /// anchor and may already be outside the filter window.
    pub anchor: AnchorId,

    /// Measured pixel.
    pub pixel: Vector2<f64>,
}

impl Observation {
    pub fn new(anchor: AnchorId, pixel: Vector2<f64>) -> Self {
        Self { anchor, pixel }
    }
}
