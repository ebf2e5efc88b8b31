//! Densities of the two positive-response families, parameterized the way a
//! GLM sees them: by mean μ and dispersion φ, with Var(y) = φ V(μ).

use serde::{Deserialize, Serialize};

use crate::error::GlmError;
use crate::glm::FamilyKind;

fn check_parameters(mu: f64, dispersion: f64) -> Result<(), GlmError> {
    if !(mu.is_finite() && mu > 0.0) {
        return Err(GlmError::ValidationError(format!(
            "mean must be positive, got {mu}"
        )));
    }
    if !(dispersion.is_finite() && dispersion > 0.0) {
        return Err(GlmError::ValidationError(format!(
            "dispersion must be positive, got {dispersion}"
        )));
    }
    Ok(())
}

pub fn gamma_pdf(y: f64, mu: f64, dispersion: f64) -> f64 {
    FamilyKind::Gamma.family().pdf(y, mu, dispersion)
}

pub fn gamma_cdf(y: f64, mu: f64, dispersion: f64) -> f64 {
    FamilyKind::Gamma.family().cdf(y, mu, dispersion)
}

pub fn inverse_gaussian_pdf(y: f64, mu: f64, dispersion: f64) -> f64 {
    FamilyKind::InverseGaussian.family().pdf(y, mu, dispersion)
}

pub fn inverse_gaussian_cdf(y: f64, mu: f64, dispersion: f64) -> f64 {
    FamilyKind::InverseGaussian.family().cdf(y, mu, dispersion)
}

/// Density evaluated over a grid, ready for plotting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityCurve {
    pub family: FamilyKind,
    pub mean: f64,
    pub dispersion: f64,
    pub points: Vec<(f64, f64)>,
}

impl DensityCurve {
    pub fn max_density(&self) -> f64 {
        self.points.iter().map(|p| p.1).fold(0.0, f64::max)
    }
}

/// Evaluate the density of `family` with mean `mu` and dispersion `dispersion` at each grid point.
pub fn density_curve(
    family: FamilyKind,
    mu: f64,
    dispersion: f64,
    grid: &[f64],
) -> Result<DensityCurve, GlmError> {
    check_parameters(mu, dispersion)?;
    let f = family.family();
    let points = grid
        .iter()
        .map(|&y| {
            let d = if y > 0.0 { f.pdf(y, mu, dispersion) } else { 0.0 };
            (y, if d.is_finite() { d } else { 0.0 })
        })
        .collect();
    Ok(DensityCurve {
        family,
        mean: mu,
        dispersion,
        points,
    })
}

/// `points` evenly spaced values on (0, upper].
pub fn positive_grid(upper: f64, points: usize) -> Vec<f64> {
    if points == 0 || !(upper > 0.0) {
        return Vec::new();
    }
    (1..=points)
        .map(|i| upper * i as f64 / points as f64)
        .collect()
}
