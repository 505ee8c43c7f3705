//! Finite-difference cross-check of the out-of-state Jacobians.
//!
//! Each column of each partial is recovered by perturbing one error-state
//! component by ±step and differencing `Xcn`. The forward model is at most
//! quadratic in the first-order rotation errors, so the central difference
//! reproduces the analytic partial up to rounding.

use nalgebra::Matrix3;
use tracing::warn;

use crate::config::ValidationConfig;

use super::cache::JacobianCache;
use super::oos::{ErrorChannel, ErrorState, OosOperatingPoint};

/// Numerically estimated partials, indexed by [`ErrorChannel::index`].
#[derive(Debug, Clone, PartialEq)]
pub struct NumericalJacobians {
    partials: [Matrix3<f64>; 5],
}

impl NumericalJacobians {
    pub fn partial(&self, channel: ErrorChannel) -> &Matrix3<f64> {
        &self.partials[channel.index()]
    }
}

/// Central-difference Jacobians of `Xcn` at `point`.
pub fn numerical_oos_jacobians(point: &OosOperatingPoint, step: f64) -> NumericalJacobians {
    let mut partials = [Matrix3::zeros(); 5];

    for channel in ErrorChannel::ALL {
        let jac = &mut partials[channel.index()];
        for axis in 0..3 {
            let plus = point.evaluate(&ErrorState::along(channel, axis, step));
            let minus = point.evaluate(&ErrorState::along(channel, axis, -step));
            jac.set_column(axis, &((plus - minus) / (2.0 * step)));
        }
    }

    NumericalJacobians { partials }
}

/// Largest per-entry discrepancy between analytic and numerical partials.
#[derive(Debug, Clone, PartialEq)]
pub struct JacobianCheckReport {
    /// Max absolute error per channel, indexed by [`ErrorChannel::index`].
    max_abs_error: [f64; 5],
    tolerance: f64,
}

impl JacobianCheckReport {
    pub fn max_abs_error(&self, channel: ErrorChannel) -> f64 {
        self.max_abs_error[channel.index()]
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn passed(&self) -> bool {
        self.max_abs_error.iter().all(|&e| e < self.tolerance)
    }

    /// Channels whose error reached the tolerance.
    pub fn failures(&self) -> Vec<ErrorChannel> {
        ErrorChannel::ALL
            .into_iter()
            .filter(|c| self.max_abs_error(*c) >= self.tolerance)
            .collect()
    }
}

/// Compare `cache` against finite differences of the model at `point`.
pub fn check_oos_jacobians(
    point: &OosOperatingPoint,
    cache: &JacobianCache,
    config: &ValidationConfig,
) -> JacobianCheckReport {
    let numerical = numerical_oos_jacobians(point, config.step);

    let mut max_abs_error = [0.0; 5];
    for channel in ErrorChannel::ALL {
        let diff = cache.partial(channel) - numerical.partial(channel);
        max_abs_error[channel.index()] = diff.amax();
    }

    let report = JacobianCheckReport {
        max_abs_error,
        tolerance: config.tolerance,
    };
    for channel in report.failures() {
        warn!(
            "[JacobianCheck] {} mismatch: max error {:.3e} (tolerance {:.1e})",
            channel,
            report.max_abs_error(channel),
            config.tolerance
        );
    }
    report
}
