//! Estimator configuration.
//!
//! Plain scalars consumed by the graph and the validation harness. Loaded
//! from YAML; every field has a default so partial files are accepted.
//!
//! ```yaml
//! landmark_capacity: 256
//! anchor_capacity: 128
//! initial_inverse_depth: 0.5
//! validation:
//!   step: 1.0e-6
//!   tolerance: 1.0e-6
//! ```

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Configuration for the landmark graph.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Maximum number of live landmarks.
    pub landmark_capacity: usize,

    /// Maximum number of live anchors.
    pub anchor_capacity: usize,

    /// Inverse depth assigned to landmarks initialized from a single pixel.
    pub initial_inverse_depth: f64,

    /// Finite-difference cross-check settings.
    pub validation: ValidationConfig,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            landmark_capacity: 256,
            anchor_capacity: 128,
            initial_inverse_depth: 0.5,
            validation: ValidationConfig::default(),
        }
    }
}

/// Step and tolerance for comparing analytic against numerical Jacobians.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Perturbation applied to each error-state component.
    pub step: f64,

    /// Largest accepted absolute difference per Jacobian entry.
    pub tolerance: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            step: 1e-6,
            tolerance: 1e-6,
        }
    }
}

impl EstimatorConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse estimator config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: Self = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.landmark_capacity == 0 {
            bail!("landmark_capacity must be > 0");
        }
        if self.anchor_capacity == 0 {
            bail!("anchor_capacity must be > 0");
        }
        if !(self.initial_inverse_depth.is_finite() && self.initial_inverse_depth > 0.0) {
            bail!(
                "initial_inverse_depth must be finite and > 0, got {}",
                self.initial_inverse_depth
            );
        }
        if !(self.validation.step.is_finite() && self.validation.step > 0.0) {
            bail!("validation.step must be finite and > 0, got {}", self.validation.step);
        }
        if !(self.validation.tolerance.is_finite() && self.validation.tolerance > 0.0) {
            bail!(
                "validation.tolerance must be finite and > 0, got {}",
                self.validation.tolerance
            );
        }
        Ok(())
    }
}
