//! Atlas module - the landmark/anchor graph.
//!
//! - [`Anchor`] - keyframe pose a landmark is parameterized in
//! - [`Landmark`] - inverse-depth point referencing one anchor
//! - [`Graph`] - owner of both, backed by fixed-capacity [`Pool`]s
//!
//! # Example
//!
//! ```
//! use rust_vio::atlas::Graph;
//! use rust_vio::geometry::SE3;
//!
//! let mut graph = Graph::new(256, 128);
//! let anchor = graph.create_anchor(SE3::identity()).unwrap();
//! let lm = graph.create_landmark(anchor, 0.1, -0.05, 0.5).unwrap();
//!
//! let xs = graph.landmark_spatial_coordinate(lm, &SE3::identity()).unwrap();
//! assert!((xs.z - 2.0).abs() < 1e-12);
//! ```

pub mod anchor;
pub mod graph;
pub mod landmark;
pub mod pool;
pub mod types;

pub use anchor::Anchor;
pub use graph::Graph;
pub use landmark::Landmark;
pub use pool::Pool;
pub use types::{AnchorId, LandmarkId, RecordKind};
