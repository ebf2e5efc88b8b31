//! Analysis settings loaded from a TOML file.
//!
//! ```toml
//! [fit]
//! max_iterations = 50
//! tolerance = 1e-10
//!
//! [report]
//! confidence = 0.9
//! histogram_bins = 12
//! ```
//!
//! Every field is optional; missing values take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GlmError;
use crate::glm::FitConfig;

/// Presentation settings for reports and plots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Confidence level for coefficient and mean intervals.
    pub confidence: f64,
    pub histogram_bins: usize,
    /// Character canvas size for text plots.
    pub plot_width: usize,
    pub plot_height: usize,
    /// Number of covariate quantile bins for the mean-variance check.
    pub mean_variance_bins: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            confidence: 0.95,
            histogram_bins: 10,
            plot_width: 60,
            plot_height: 16,
            mean_variance_bins: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub fit: FitConfig,
    pub report: ReportConfig,
}

impl AnalysisConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, GlmError> {
        let config: AnalysisConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, GlmError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GlmError> {
        let r = &self.report;
        if !(r.confidence > 0.0 && r.confidence < 1.0) {
            return Err(GlmError::ValidationError(format!(
                "report.confidence must be in (0, 1), got {}",
                r.confidence
            )));
        }
        if r.histogram_bins == 0 || r.mean_variance_bins == 0 {
            return Err(GlmError::ValidationError(
                "bin counts must be positive".to_string(),
            ));
        }
        if r.plot_width < 10 || r.plot_height < 4 {
            return Err(GlmError::ValidationError(format!(
                "plot size {}x{} is too small (minimum 10x4)",
                r.plot_width, r.plot_height
            )));
        }
        let f = &self.fit;
        if f.max_iterations == 0 {
            return Err(GlmError::ValidationError(
                "fit.max_iterations must be positive".to_string(),
            ));
        }
        if !(f.tolerance > 0.0 && f.tolerance.is_finite()) {
            return Err(GlmError::ValidationError(format!(
                "fit.tolerance must be positive, got {}",
                f.tolerance
            )));
        }
        Ok(())
    }
}
