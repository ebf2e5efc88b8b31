use serde::{Deserialize, Serialize};
use tracing::info;

use super::design::{response_vector, DesignMatrix};
use super::diagnostics::{DiagnosticSummary, DispersionMethod};
use super::family::FamilyKind;
use super::formula::Formula;
use super::inference::{coefficient_table, CoefficientTable};
use super::irls::{fit_glm, ConvergenceIssue, FitConfig, GlmFit};
use super::link::LinkKind;
use crate::error::GlmError;
use crate::models::ModelFrame;

/// Formula, family and link: everything needed to fit a model to a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub formula: Formula,
    pub family: FamilyKind,
    pub link: LinkKind,
}

impl ModelSpec {
    pub fn new(formula: &str, family: FamilyKind, link: LinkKind) -> Result<Self, GlmError> {
        Ok(Self {
            formula: Formula::parse(formula)?,
            family,
            link,
        })
    }

    /// Same formula and family with a different link.
    pub fn with_link(&self, link: LinkKind) -> Self {
        Self {
            link,
            ..self.clone()
        }
    }

    pub fn with_family(&self, family: FamilyKind) -> Self {
        Self {
            family,
            ..self.clone()
        }
    }

    pub fn fit(&self, frame: &dyn ModelFrame, config: &FitConfig) -> Result<GlmFit, GlmError> {
        let y = response_vector(&self.formula, frame)?;
        let design = DesignMatrix::build(&self.formula, frame)?;
        let fit = fit_glm(
            &y,
            &design,
            self.family,
            self.link,
            config,
            &self.formula.to_string(),
        )?;
        info!(
            formula = %self.formula,
            family = %self.family,
            link = %self.link,
            iterations = fit.iterations,
            converged = fit.converged,
            "fitted model"
        );
        Ok(fit)
    }
}

impl std::fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}, {} link]", self.formula, self.family, self.link)
    }
}

/// Serializable overview of a fitted model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSummary {
    pub formula: String,
    pub family: FamilyKind,
    pub link: LinkKind,
    pub num_obs: usize,
    pub df_residual: usize,
    pub df_null: usize,
    pub deviance: f64,
    pub null_deviance: f64,
    pub iterations: usize,
    pub converged: bool,
    pub convergence_issue: Option<ConvergenceIssue>,
    /// Only for converged fits; the numbers are meaningless otherwise.
    pub coefficients: Option<CoefficientTable>,
    pub diagnostics: Option<DiagnosticSummary>,
}

impl FitSummary {
    pub fn from_fit(fit: &GlmFit, confidence: f64) -> Result<Self, GlmError> {
        let (coefficients, diagnostics) = if fit.converged && fit.df_residual > 0 {
            let phi = fit.dispersion(DispersionMethod::Pearson);
            (
                Some(coefficient_table(fit, phi, confidence)?),
                Some(fit.diagnostic_summary()),
            )
        } else {
            (None, None)
        };
        Ok(Self {
            formula: fit.formula.clone(),
            family: fit.family,
            link: fit.link,
            num_obs: fit.num_obs(),
            df_residual: fit.df_residual,
            df_null: fit.df_null,
            deviance: fit.deviance,
            null_deviance: fit.null_deviance,
            iterations: fit.iterations,
            converged: fit.converged,
            convergence_issue: fit.convergence_issue.clone(),
            coefficients,
            diagnostics,
        })
    }

    pub fn aic(&self) -> Option<f64> {
        self.diagnostics.as_ref().map(|d| d.aic)
    }
}
