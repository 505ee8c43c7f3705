//! Landmark graph and out-of-state measurement Jacobians for a
//! visual-inertial filter.
//!
//! Leaf-first:
//! - [`geometry`] - SO(3)/SE(3) algebra and the landmark frame chain
//! - [`atlas`] - fixed-capacity pools of anchors and inverse-depth landmarks
//! - [`camera`] - pixel ↔ normalized-ray interface
//! - [`estimator`] - out-of-state Jacobian engine and its numerical check
//! - [`system`] - thread-shared graph

pub mod atlas;
pub mod camera;
pub mod config;
pub mod error;
pub mod estimator;
pub mod geometry;
pub mod system;

pub use atlas::{Anchor, AnchorId, Graph, Landmark, LandmarkId, RecordKind};
pub use camera::{CameraModel, PinholeCamera};
pub use config::{EstimatorConfig, ValidationConfig};
pub use error::GraphError;
pub use estimator::{compute_oos_jacobian, JacobianCache, Observation};
pub use geometry::SE3;
