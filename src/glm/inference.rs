// =============================================================================
// Statistical Inference
// =============================================================================
//
// With an estimated dispersion φ̂ the Wald statistic β̂/SE(β̂) follows a
// Student t distribution on n - p degrees of freedom rather than a standard
// normal, so p-values and intervals use t quantiles.
//
//     SE(β̂_j) = √(φ̂ · [(X'WX)⁻¹]_jj)
//
// Under the log link a coefficient acts multiplicatively on the mean:
// a unit increase in x_j multiplies μ by exp(β_j).
//
// =============================================================================

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use super::irls::GlmFit;
use crate::error::GlmError;

fn students_t(df: f64) -> Result<StudentsT, GlmError> {
    StudentsT::new(0.0, 1.0, df).map_err(|e| GlmError::Numerical(e.to_string()))
}

/// Two-sided p-value for a t statistic.
pub fn pvalue_t(t: f64, df: f64) -> f64 {
    if !t.is_finite() {
        return if t.is_nan() { f64::NAN } else { 0.0 };
    }
    match students_t(df) {
        Ok(dist) => 2.0 * (1.0 - dist.cdf(t.abs())),
        Err(_) => f64::NAN,
    }
}

/// Critical value t such that P(|T| < t) = confidence.
pub fn t_critical(confidence: f64, df: f64) -> Result<f64, GlmError> {
    if !(0.0 < confidence && confidence < 1.0) {
        return Err(GlmError::ValidationError(format!(
            "confidence must be in (0, 1), got {confidence}"
        )));
    }
    let dist = students_t(df)?;
    Ok(dist.inverse_cdf(1.0 - (1.0 - confidence) / 2.0))
}

/// R-style significance codes.
pub fn significance_stars(p: f64) -> &'static str {
    if p.is_nan() {
        ""
    } else if p < 0.001 {
        "***"
    } else if p < 0.01 {
        "**"
    } else if p < 0.05 {
        "*"
    } else if p < 0.1 {
        "."
    } else {
        ""
    }
}

/// One row of a coefficient table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoefficientRow {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
    pub lower: f64,
    pub upper: f64,
    /// exp(estimate), only for log-link models.
    pub exp_estimate: Option<f64>,
    pub exp_lower: Option<f64>,
    pub exp_upper: Option<f64>,
    pub stars: String,
}

impl CoefficientRow {
    /// Percentage change in the mean for a unit increase, log link only.
    pub fn percent_change(&self) -> Option<f64> {
        self.exp_estimate.map(|e| (e - 1.0) * 100.0)
    }
}

/// Coefficient estimates with standard errors, t tests and intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoefficientTable {
    pub rows: Vec<CoefficientRow>,
    pub dispersion: f64,
    pub df_residual: usize,
    pub confidence: f64,
}

impl CoefficientTable {
    pub fn row(&self, name: &str) -> Option<&CoefficientRow> {
        self.rows.iter().find(|r| r.name == name)
    }
}

/// Build the coefficient table for `fit` using dispersion `dispersion`.
pub fn coefficient_table(
    fit: &GlmFit,
    dispersion: f64,
    confidence: f64,
) -> Result<CoefficientTable, GlmError> {
    if !(dispersion.is_finite() && dispersion > 0.0) {
        return Err(GlmError::Numerical(format!(
            "dispersion must be positive and finite, got {dispersion}"
        )));
    }
    if fit.df_residual == 0 {
        return Err(GlmError::InsufficientData(
            "no residual degrees of freedom for inference".to_string(),
        ));
    }
    let df = fit.df_residual as f64;
    let t_crit = t_critical(confidence, df)?;
    let log_link = fit.link.is_log();

    let rows = fit
        .column_names()
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let estimate = fit.coefficients[j];
            let std_error = (dispersion * fit.covariance_unscaled[[j, j]]).sqrt();
            let t_value = estimate / std_error;
            let p_value = pvalue_t(t_value, df);
            let lower = estimate - t_crit * std_error;
            let upper = estimate + t_crit * std_error;
            CoefficientRow {
                name: name.clone(),
                estimate,
                std_error,
                t_value,
                p_value,
                lower,
                upper,
                exp_estimate: log_link.then(|| estimate.exp()),
                exp_lower: log_link.then(|| lower.exp()),
                exp_upper: log_link.then(|| upper.exp()),
                stars: significance_stars(p_value).to_string(),
            }
        })
        .collect();

    Ok(CoefficientTable {
        rows,
        dispersion,
        df_residual: fit.df_residual,
        confidence,
    })
}
