// =============================================================================
// Analysis of Deviance
// =============================================================================
//
// Terms are added one at a time in formula order. For each term the drop in
// deviance is tested with
//
//     F = (ΔD / Δdf) / φ̂
//
// where φ̂ is the Pearson dispersion of the full model, against an
// F(Δdf, n - p) reference distribution. The table is sequential, so the
// result for a term depends on the terms before it.
//
// =============================================================================

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use tracing::debug;

use super::design::{response_vector, DesignMatrix};
use super::diagnostics::DispersionMethod;
use super::family::FamilyKind;
use super::formula::Formula;
use super::irls::{fit_glm, FitConfig};
use super::link::LinkKind;
use crate::error::GlmError;
use crate::models::ModelFrame;

/// One line of the sequential deviance table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevianceRow {
    /// Term added on this line; `NULL` for the first line.
    pub term: String,
    /// Degrees of freedom used by the term (`None` on the NULL line).
    pub df: Option<usize>,
    /// Reduction in deviance from adding the term.
    pub deviance: Option<f64>,
    pub residual_df: usize,
    pub residual_deviance: f64,
    pub f_value: Option<f64>,
    pub p_value: Option<f64>,
    /// Whether the model ending with this term converged.
    pub converged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevianceTable {
    pub formula: String,
    pub family: FamilyKind,
    pub link: LinkKind,
    pub dispersion: f64,
    pub rows: Vec<DevianceRow>,
}

impl DevianceTable {
    pub fn row(&self, term: &str) -> Option<&DevianceRow> {
        self.rows.iter().find(|r| r.term == term)
    }
}

fn f_pvalue(f: f64, df1: f64, df2: f64) -> Option<f64> {
    if !f.is_finite() || f < 0.0 {
        return None;
    }
    FisherSnedecor::new(df1, df2)
        .ok()
        .map(|dist| 1.0 - dist.cdf(f))
}

/// Sequential analysis of deviance for `formula` fitted to `frame`.
pub fn analysis_of_deviance(
    formula: &Formula,
    frame: &dyn ModelFrame,
    family: FamilyKind,
    link: LinkKind,
    config: &FitConfig,
) -> Result<DevianceTable, GlmError> {
    let y = response_vector(formula, frame)?;
    let full_design = DesignMatrix::build(formula, frame)?;
    let label = formula.to_string();

    let full = fit_glm(&y, &full_design, family, link, config, &label)?;
    let dispersion = full.dispersion(DispersionMethod::Pearson);
    let df_full = full.df_residual as f64;

    let mut rows = vec![DevianceRow {
        term: "NULL".to_string(),
        df: None,
        deviance: None,
        residual_df: full.df_null,
        residual_deviance: full.null_deviance,
        f_value: None,
        p_value: None,
        converged: true,
    }];

    let mut previous_df = full.df_null;
    let mut previous_deviance = full.null_deviance;

    for (k, term_label) in full_design.term_labels.iter().enumerate() {
        let num_terms = k + 1;
        let (residual_df, residual_deviance, converged) = if num_terms == formula.terms.len() {
            (full.df_residual, full.deviance, full.converged)
        } else {
            let design = full_design.leading_terms(num_terms);
            let sub = fit_glm(
                &y,
                &design,
                family,
                link,
                config,
                &formula.truncated(num_terms).to_string(),
            )?;
            (sub.df_residual, sub.deviance, sub.converged)
        };

        let df = previous_df.saturating_sub(residual_df);
        let drop = previous_deviance - residual_deviance;
        let (f_value, p_value) = if df > 0 && dispersion.is_finite() && dispersion > 0.0 {
            let f = (drop / df as f64) / dispersion;
            (Some(f), f_pvalue(f, df as f64, df_full))
        } else {
            (None, None)
        };
        debug!(term = %term_label, df, drop, "analysis of deviance");

        rows.push(DevianceRow {
            term: term_label.clone(),
            df: Some(df),
            deviance: Some(drop),
            residual_df,
            residual_deviance,
            f_value,
            p_value,
            converged,
        });

        previous_df = residual_df;
        previous_deviance = residual_deviance;
    }

    Ok(DevianceTable {
        formula: label,
        family,
        link,
        dispersion,
        rows,
    })
}
