//! Estimator-side measurement machinery.
//!
//! - [`oos`] - out-of-state Jacobians of a landmark re-observed from a new pose
//! - [`cache`] - the per-landmark bundle of partials those produce
//! - [`numerical`] - finite-difference cross-check of the analytic partials
//!
//! The filter's covariance update that consumes these partials is not part
//! of this crate.

pub mod cache;
pub mod numerical;
pub mod observation;
pub mod oos;

pub use cache::{JacobianCache, MeasurementBlocks, NormalizedProjection};
pub use numerical::{check_oos_jacobians, numerical_oos_jacobians, JacobianCheckReport};
pub use observation::Observation;
pub use oos::{compute_oos_jacobian, ErrorChannel, ErrorState, OosOperatingPoint};
