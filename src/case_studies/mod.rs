//! End-to-end analyses of the two datasets, each returning a serializable
//! report that the visualization layer renders.

mod comparison;
mod foliage;
mod permeability;

use serde::{Deserialize, Serialize};

use crate::glm::{DispersionMethod, GlmFit};

pub use comparison::{
    best_by_aic, compare_families, compare_links, compare_models, comparison_notes,
    interpretation_notes, ModelComparisonRow,
};
pub use foliage::{FoliageReport, FoliageStudy};
pub use permeability::{PermeabilityReport, PermeabilityStudy};

/// Per-observation values behind the diagnostic plots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidualData {
    pub fitted: Vec<f64>,
    pub quantile_residuals: Vec<f64>,
    pub standardized_residuals: Vec<f64>,
    pub cooks_distance: Vec<f64>,
}

impl ResidualData {
    pub fn from_fit(fit: &GlmFit) -> Self {
        let phi = fit.dispersion(DispersionMethod::Pearson);
        Self {
            fitted: fit.fitted_values.to_vec(),
            quantile_residuals: fit.quantile_residuals(phi).to_vec(),
            standardized_residuals: fit.standardized_deviance_residuals(phi).to_vec(),
            cooks_distance: fit.cooks_distance(phi).to_vec(),
        }
    }
}
