// =============================================================================
// Sheet permeability
// =============================================================================
//
// Permeability of building sheets, measured on three machines over nine
// days. The response is right-skewed with variance rising steeply in the
// mean, which points toward an inverse Gaussian model:
//
//     Perm ~ Mach + Day,   Inverse Gaussian family, log link
//
// The gamma fit with the same predictors is kept for an AIC comparison.
//
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::info;

use super::comparison::{compare_families, comparison_notes, interpretation_notes, ModelComparisonRow};
use super::foliage::mean_variance_note;
use super::ResidualData;
use crate::analysis::{Analyzer, DescriptiveSummary, GroupSummary, MeanVarianceFit};
use crate::config::AnalysisConfig;
use crate::error::GlmError;
use crate::glm::{
    analysis_of_deviance, DevianceTable, FamilyKind, FitSummary, GlmFit, LinkKind, ModelSpec,
};
use crate::models::PermeabilityDataset;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermeabilityReport {
    pub dataset: String,
    pub num_sheets: usize,
    pub summary: DescriptiveSummary,
    pub by_machine: Vec<GroupSummary>,
    pub by_day: Vec<GroupSummary>,
    /// Variance against mean over machine × day cells.
    pub mean_variance: Option<MeanVarianceFit>,
    pub family_comparison: Vec<ModelComparisonRow>,
    pub model: FitSummary,
    pub analysis_of_deviance: Option<DevianceTable>,
    pub residuals: Option<ResidualData>,
    pub notes: Vec<String>,
}

/// Inverse Gaussian GLM analysis of the permeability data.
pub struct PermeabilityStudy<'a> {
    data: &'a PermeabilityDataset,
    config: &'a AnalysisConfig,
}

impl<'a> PermeabilityStudy<'a> {
    pub const FORMULA: &'static str = "Perm ~ Mach + Day";

    pub fn new(data: &'a PermeabilityDataset, config: &'a AnalysisConfig) -> Self {
        Self { data, config }
    }

    pub fn model_spec() -> Result<ModelSpec, GlmError> {
        ModelSpec::new(Self::FORMULA, FamilyKind::InverseGaussian, LinkKind::Log)
    }

    pub fn fit_main_model(&self) -> Result<GlmFit, GlmError> {
        Self::model_spec()?.fit(self.data, &self.config.fit)
    }

    pub fn run(&self) -> Result<PermeabilityReport, GlmError> {
        if self.data.is_empty() {
            return Err(GlmError::InsufficientData(format!(
                "dataset '{}' has no measurements",
                self.data.name
            )));
        }
        info!(dataset = %self.data.name, sheets = self.data.len(), "running permeability study");

        let analyzer = Analyzer::new(self.data);
        let mut notes = Vec::new();

        let summary = analyzer.summary("Perm")?;
        let by_machine = analyzer.summary_by("Perm", "Mach")?;
        let by_day = analyzer.summary_by("Perm", "Day")?;

        let mean_variance = match analyzer.mean_variance_by_cells("Perm", &["Mach", "Day"]) {
            Ok(fit) => {
                notes.push(mean_variance_note(&fit));
                Some(fit)
            }
            Err(e) => {
                notes.push(format!("Mean-variance check skipped: {e}"));
                None
            }
        };

        let spec = Self::model_spec()?;
        let family_comparison = compare_families(
            &spec,
            &[FamilyKind::Gamma, FamilyKind::InverseGaussian],
            self.data,
            &self.config.fit,
        );
        notes.extend(comparison_notes(&family_comparison));

        let fit = spec.fit(self.data, &self.config.fit)?;
        let model = FitSummary::from_fit(&fit, self.config.report.confidence)?;

        let (analysis_of_deviance, residuals) = if fit.converged {
            let table = match analysis_of_deviance(
                &spec.formula,
                self.data,
                spec.family,
                spec.link,
                &self.config.fit,
            ) {
                Ok(table) => Some(table),
                Err(e) => {
                    notes.push(format!("Analysis of deviance unavailable: {e}"));
                    None
                }
            };
            (table, Some(ResidualData::from_fit(&fit)))
        } else {
            notes.push(format!(
                "The main model did not converge: {}",
                fit.convergence_issue
                    .as_ref()
                    .map(|i| i.to_string())
                    .unwrap_or_default()
            ));
            (None, None)
        };

        if let Some(diag) = &model.diagnostics {
            notes.push(format!(
                "Dispersion estimates: Pearson {:.5}, deviance {:.5}.",
                diag.dispersion_pearson, diag.dispersion_deviance
            ));
            notes.push(format!(
                "Largest Cook's distance {:.3} (sheet {}); {} sheets have |standardized residual| > 2.",
                diag.max_cooks_distance.1,
                diag.max_cooks_distance.0 + 1,
                diag.large_residuals
            ));
        }
        notes.extend(interpretation_notes(&model, "permeability"));

        Ok(PermeabilityReport {
            dataset: self.data.name.clone(),
            num_sheets: self.data.len(),
            summary,
            by_machine,
            by_day,
            mean_variance,
            family_comparison,
            model,
            analysis_of_deviance,
            residuals,
            notes,
        })
    }
}
