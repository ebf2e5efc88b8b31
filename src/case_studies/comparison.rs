use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GlmError;
use crate::glm::{FamilyKind, FitConfig, FitSummary, GlmFit, LinkKind, ModelSpec};
use crate::models::ModelFrame;

/// One candidate model in a link or family comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparisonRow {
    pub family: FamilyKind,
    pub link: LinkKind,
    pub converged: bool,
    pub iterations: usize,
    /// Only reported for converged fits.
    pub deviance: Option<f64>,
    pub aic: Option<f64>,
    /// Why the fit failed or did not converge.
    pub issue: Option<String>,
}

impl ModelComparisonRow {
    fn from_fit(fit: &GlmFit) -> Self {
        Self {
            family: fit.family,
            link: fit.link,
            converged: fit.converged,
            iterations: fit.iterations,
            deviance: fit.converged.then_some(fit.deviance),
            aic: fit.converged.then(|| fit.aic()),
            issue: fit.convergence_issue.as_ref().map(|i| i.to_string()),
        }
    }

    fn from_error(spec: &ModelSpec, error: &GlmError) -> Self {
        Self {
            family: spec.family,
            link: spec.link,
            converged: false,
            iterations: 0,
            deviance: None,
            aic: None,
            issue: Some(error.to_string()),
        }
    }
}

/// Fit every candidate; a failed fit becomes a row describing the failure.
pub fn compare_models(
    candidates: &[ModelSpec],
    frame: &dyn ModelFrame,
    config: &FitConfig,
) -> Vec<ModelComparisonRow> {
    candidates
        .iter()
        .map(|spec| match spec.fit(frame, config) {
            Ok(fit) => ModelComparisonRow::from_fit(&fit),
            Err(e) => {
                warn!(model = %spec, error = %e, "candidate model could not be fitted");
                ModelComparisonRow::from_error(spec, &e)
            }
        })
        .collect()
}

/// Refit `base` with each link in `links`.
pub fn compare_links(
    base: &ModelSpec,
    links: &[LinkKind],
    frame: &dyn ModelFrame,
    config: &FitConfig,
) -> Vec<ModelComparisonRow> {
    let candidates: Vec<ModelSpec> = links.iter().map(|&l| base.with_link(l)).collect();
    compare_models(&candidates, frame, config)
}

/// Refit `base` with each family in `families`.
pub fn compare_families(
    base: &ModelSpec,
    families: &[FamilyKind],
    frame: &dyn ModelFrame,
    config: &FitConfig,
) -> Vec<ModelComparisonRow> {
    let candidates: Vec<ModelSpec> = families.iter().map(|&f| base.with_family(f)).collect();
    compare_models(&candidates, frame, config)
}

/// Converged row with the smallest AIC.
pub fn best_by_aic(rows: &[ModelComparisonRow]) -> Option<&ModelComparisonRow> {
    rows.iter()
        .filter(|r| r.aic.is_some_and(f64::is_finite))
        .min_by(|a, b| {
            a.aic
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.aic.unwrap_or(f64::INFINITY))
        })
}

/// Narrative for a comparison: one line per failed fit plus the AIC winner.
pub fn comparison_notes(rows: &[ModelComparisonRow]) -> Vec<String> {
    let mut notes: Vec<String> = rows
        .iter()
        .filter(|r| !r.converged)
        .map(|r| {
            format!(
                "The {} model with the {} link did not converge ({}); its deviance and AIC are not reported.",
                r.family,
                r.link,
                r.issue.as_deref().unwrap_or("unknown reason")
            )
        })
        .collect();
    match best_by_aic(rows) {
        Some(best) => notes.push(format!(
            "Among converged fits, {} with the {} link has the smallest AIC ({:.2}).",
            best.family,
            best.link,
            best.aic.unwrap_or(f64::NAN)
        )),
        None => notes.push("None of the candidate models converged.".to_string()),
    }
    notes
}

/// Plain-language reading of log-link coefficients.
pub fn interpretation_notes(summary: &FitSummary, response: &str) -> Vec<String> {
    let Some(table) = &summary.coefficients else {
        return Vec::new();
    };
    if !summary.link.is_log() {
        return Vec::new();
    }
    table
        .rows
        .iter()
        .filter(|row| row.name != "(Intercept)")
        .filter_map(|row| {
            let factor = row.exp_estimate?;
            let note = if row.name.contains(':') {
                format!(
                    "{}: interaction term; changes the {} slope by {:+.3} on the log scale.",
                    row.name, response, row.estimate
                )
            } else if row.name.starts_with("log(") {
                let interacts = table.rows.iter().any(|other| {
                    other.name.contains(':') && other.name.split(':').any(|part| part == row.name)
                });
                let scope = if interacts {
                    " at the baseline level of the interacting factor"
                } else {
                    ""
                };
                format!(
                    "{}: a 1% increase in the covariate changes mean {} by about {:+.2}%{}.",
                    row.name, response, row.estimate, scope
                )
            } else if row.name.contains('[') {
                format!(
                    "{}: mean {} is {:.3} times the baseline level ({:+.1}%).",
                    row.name,
                    response,
                    factor,
                    (factor - 1.0) * 100.0
                )
            } else {
                format!(
                    "{}: each unit increase multiplies mean {} by {:.3} ({:+.1}%).",
                    row.name,
                    response,
                    factor,
                    (factor - 1.0) * 100.0
                )
            };
            Some(note)
        })
        .collect()
}
