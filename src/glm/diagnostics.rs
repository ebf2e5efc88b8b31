// =============================================================================
// Model Diagnostics
// =============================================================================
//
// - RESIDUALS: response, working, Pearson, deviance, quantile, standardized
// - INFLUENCE: leverages (hat values) and Cook's distance
// - DISPERSION: Pearson and mean-deviance estimators of φ
// - MODEL FIT: log-likelihood, AIC, BIC
//
// Quantile residuals are exactly standard normal when the model is right,
// which makes them the preferred choice for Q-Q plots with continuous
// responses.
//
// =============================================================================

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use super::irls::GlmFit;

/// Which dispersion estimator to use for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispersionMethod {
    /// Pearson X² / (n - p)
    #[default]
    Pearson,
    /// D / (n - p)
    Deviance,
}

impl std::fmt::Display for DispersionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispersionMethod::Pearson => write!(f, "Pearson"),
            DispersionMethod::Deviance => write!(f, "deviance"),
        }
    }
}

/// Counts and extremes used to summarize diagnostic plots in a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticSummary {
    pub dispersion_pearson: f64,
    pub dispersion_deviance: f64,
    pub max_leverage: f64,
    /// Observation index (0-based) and value of the largest Cook's distance.
    pub max_cooks_distance: (usize, f64),
    /// Observations whose |standardized deviance residual| exceeds 2.
    pub large_residuals: usize,
    /// Observations with leverage above 2p/n.
    pub high_leverage: usize,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
}

impl GlmFit {
    /// y - μ
    pub fn response_residuals(&self) -> Array1<f64> {
        &self.y - &self.fitted_values
    }

    /// (y - μ) g'(μ), the residuals of the final weighted regression.
    pub fn working_residuals(&self) -> Array1<f64> {
        let link = self.link.link();
        self.y
            .iter()
            .zip(self.fitted_values.iter())
            .map(|(&y, &mu)| (y - mu) * link.derivative(mu))
            .collect()
    }

    /// (y - μ) / √V(μ)
    pub fn pearson_residuals(&self) -> Array1<f64> {
        let family = self.family.family();
        self.y
            .iter()
            .zip(self.fitted_values.iter())
            .map(|(&y, &mu)| (y - mu) / family.variance(mu).sqrt())
            .collect()
    }

    /// sign(y - μ) √d(y, μ)
    pub fn deviance_residuals(&self) -> Array1<f64> {
        let family = self.family.family();
        self.y
            .iter()
            .zip(self.fitted_values.iter())
            .map(|(&y, &mu)| {
                let d = family.unit_deviance(y, mu).max(0.0).sqrt();
                if y >= mu {
                    d
                } else {
                    -d
                }
            })
            .collect()
    }

    /// Φ⁻¹(F(y; μ, φ)) using the fitted distribution.
    pub fn quantile_residuals(&self, dispersion: f64) -> Array1<f64> {
        let family = self.family.family();
        let Ok(normal) = Normal::new(0.0, 1.0) else {
            return Array1::from_elem(self.num_obs(), f64::NAN);
        };
        self.y
            .iter()
            .zip(self.fitted_values.iter())
            .map(|(&y, &mu)| {
                let p = family.cdf(y, mu, dispersion);
                // keep the tails finite
                normal.inverse_cdf(p.clamp(1e-15, 1.0 - 1e-15))
            })
            .collect()
    }

    /// Diagonal of the weighted hat matrix W^½ X (X'WX)⁻¹ X' W^½.
    pub fn leverages(&self) -> Array1<f64> {
        let x = &self.design.x;
        let cov = &self.covariance_unscaled;
        (0..x.nrows())
            .map(|i| {
                let row = x.row(i);
                self.weights[i] * row.dot(&cov.dot(&row))
            })
            .collect()
    }

    /// r_D / √(φ (1 - h))
    pub fn standardized_deviance_residuals(&self, dispersion: f64) -> Array1<f64> {
        let h = self.leverages();
        self.deviance_residuals()
            .iter()
            .zip(h.iter())
            .map(|(&r, &hi)| r / (dispersion * (1.0 - hi)).sqrt())
            .collect()
    }

    /// (r_P / (1 - h))² h / (φ p)
    pub fn cooks_distance(&self, dispersion: f64) -> Array1<f64> {
        let h = self.leverages();
        let p = self.rank() as f64;
        self.pearson_residuals()
            .iter()
            .zip(h.iter())
            .map(|(&r, &hi)| (r / (1.0 - hi)).powi(2) * hi / (dispersion * p))
            .collect()
    }

    /// Pearson's X² statistic.
    pub fn pearson_chi2(&self) -> f64 {
        self.pearson_residuals().iter().map(|r| r * r).sum()
    }

    pub fn dispersion(&self, method: DispersionMethod) -> f64 {
        let df = self.df_residual as f64;
        if df <= 0.0 {
            return f64::NAN;
        }
        match method {
            DispersionMethod::Pearson => self.pearson_chi2() / df,
            DispersionMethod::Deviance => self.deviance / df,
        }
    }

    /// Log-likelihood with the dispersion at its deviance-based MLE-style value D/n.
    pub fn log_likelihood(&self) -> f64 {
        let family = self.family.family();
        let phi = self.deviance / self.num_obs() as f64;
        self.y
            .iter()
            .zip(self.fitted_values.iter())
            .map(|(&y, &mu)| family.ln_pdf(y, mu, phi))
            .sum()
    }

    /// Number of estimated parameters including the dispersion.
    fn num_parameters(&self) -> f64 {
        self.rank() as f64 + 1.0
    }

    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.num_parameters()
    }

    pub fn bic(&self) -> f64 {
        -2.0 * self.log_likelihood() + (self.num_obs() as f64).ln() * self.num_parameters()
    }

    pub fn diagnostic_summary(&self) -> DiagnosticSummary {
        let phi = self.dispersion(DispersionMethod::Pearson);
        let h = self.leverages();
        let cooks = self.cooks_distance(phi);
        let std_resid = self.standardized_deviance_residuals(phi);
        let leverage_cut = 2.0 * self.rank() as f64 / self.num_obs() as f64;

        let max_cooks_distance = cooks
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, c)| c.is_finite())
            .fold((0, f64::NAN), |best, (i, c)| {
                if best.1.is_nan() || c > best.1 {
                    (i, c)
                } else {
                    best
                }
            });

        DiagnosticSummary {
            dispersion_pearson: phi,
            dispersion_deviance: self.dispersion(DispersionMethod::Deviance),
            max_leverage: h.iter().copied().fold(f64::NAN, f64::max),
            max_cooks_distance,
            large_residuals: std_resid.iter().filter(|r| r.abs() > 2.0).count(),
            high_leverage: h.iter().filter(|&&hi| hi > leverage_cut).count(),
            log_likelihood: self.log_likelihood(),
            aic: self.aic(),
            bic: self.bic(),
        }
    }
}
