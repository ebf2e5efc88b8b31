//! Response distributions for strictly positive continuous data.
//!
//! Both families are exponential dispersion models with mean μ and
//! dispersion φ, and differ only in their variance function:
//!
//!   Gamma:            Var(Y) = φ μ²
//!   Inverse Gaussian: Var(Y) = φ μ³

use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Gamma, Normal};

use super::link::LinkKind;
use crate::error::GlmError;

/// A GLM response family.
pub trait Family {
    fn name(&self) -> &'static str;

    /// Exponent ξ in V(μ) = μ^ξ.
    fn variance_power(&self) -> f64;

    fn variance(&self, mu: f64) -> f64 {
        mu.powf(self.variance_power())
    }

    /// Contribution of one observation to the deviance.
    fn unit_deviance(&self, y: f64, mu: f64) -> f64;

    fn deviance(&self, y: &[f64], mu: &[f64]) -> f64 {
        y.iter()
            .zip(mu.iter())
            .map(|(&yi, &mi)| self.unit_deviance(yi, mi))
            .sum()
    }

    fn valid_mu(&self, mu: f64) -> bool {
        mu.is_finite() && mu > 0.0
    }

    fn valid_response(&self, y: f64) -> bool {
        y.is_finite() && y > 0.0
    }

    fn ln_pdf(&self, y: f64, mu: f64, dispersion: f64) -> f64;

    fn pdf(&self, y: f64, mu: f64, dispersion: f64) -> f64 {
        self.ln_pdf(y, mu, dispersion).exp()
    }

    fn cdf(&self, y: f64, mu: f64, dispersion: f64) -> f64;

    /// Canonical link of the family.
    fn canonical_link(&self) -> LinkKind;
}

/// Gamma family.
#[derive(Debug, Clone, Copy, Default)]
pub struct GammaFamily;

impl GammaFamily {
    fn distribution(mu: f64, dispersion: f64) -> Option<Gamma> {
        // shape 1/φ, rate 1/(μφ)
        Gamma::new(1.0 / dispersion, 1.0 / (mu * dispersion)).ok()
    }
}

impl Family for GammaFamily {
    fn name(&self) -> &'static str {
        "Gamma"
    }

    fn variance_power(&self) -> f64 {
        2.0
    }

    fn variance(&self, mu: f64) -> f64 {
        mu * mu
    }

    fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        2.0 * (-(y / mu).ln() + (y - mu) / mu)
    }

    fn ln_pdf(&self, y: f64, mu: f64, dispersion: f64) -> f64 {
        match Self::distribution(mu, dispersion) {
            Some(d) if y > 0.0 => d.ln_pdf(y),
            Some(_) => f64::NEG_INFINITY,
            None => f64::NAN,
        }
    }

    fn cdf(&self, y: f64, mu: f64, dispersion: f64) -> f64 {
        match Self::distribution(mu, dispersion) {
            Some(d) => d.cdf(y).clamp(0.0, 1.0),
            None => f64::NAN,
        }
    }

    fn canonical_link(&self) -> LinkKind {
        LinkKind::Inverse
    }
}

/// Inverse Gaussian family.
#[derive(Debug, Clone, Copy, Default)]
pub struct InverseGaussianFamily;

impl Family for InverseGaussianFamily {
    fn name(&self) -> &'static str {
        "Inverse Gaussian"
    }

    fn variance_power(&self) -> f64 {
        3.0
    }

    fn variance(&self, mu: f64) -> f64 {
        mu * mu * mu
    }

    fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        (y - mu).powi(2) / (y * mu * mu)
    }

    fn ln_pdf(&self, y: f64, mu: f64, dispersion: f64) -> f64 {
        if !(mu > 0.0 && dispersion > 0.0) {
            return f64::NAN;
        }
        if y <= 0.0 {
            return f64::NEG_INFINITY;
        }
        -0.5 * (2.0 * std::f64::consts::PI * dispersion * y.powi(3)).ln()
            - self.unit_deviance(y, mu) / (2.0 * dispersion)
    }

    fn cdf(&self, y: f64, mu: f64, dispersion: f64) -> f64 {
        if !(mu > 0.0 && dispersion > 0.0) {
            return f64::NAN;
        }
        if y <= 0.0 {
            return 0.0;
        }
        let Ok(normal) = Normal::new(0.0, 1.0) else {
            return f64::NAN;
        };
        let lambda = 1.0 / dispersion;
        let root = (lambda / y).sqrt();
        let first = normal.cdf(root * (y / mu - 1.0));
        // exp(2λ/μ) overflows long before the tail probability underflows
        let tail = normal.cdf(-root * (y / mu + 1.0));
        let second = if tail > 0.0 {
            (2.0 * lambda / mu + tail.ln()).exp()
        } else {
            0.0
        };
        (first + second).clamp(0.0, 1.0)
    }

    fn canonical_link(&self) -> LinkKind {
        LinkKind::InverseSquare
    }
}

/// Selector for the supported families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FamilyKind {
    Gamma,
    InverseGaussian,
}

impl FamilyKind {
    pub const ALL: [FamilyKind; 2] = [FamilyKind::Gamma, FamilyKind::InverseGaussian];

    pub fn family(self) -> &'static dyn Family {
        match self {
            FamilyKind::Gamma => &GammaFamily,
            FamilyKind::InverseGaussian => &InverseGaussianFamily,
        }
    }
}

impl std::fmt::Display for FamilyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.family().name())
    }
}

impl std::str::FromStr for FamilyKind {
    type Err = GlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gamma" => Ok(FamilyKind::Gamma),
            "inverse-gaussian" | "inverse_gaussian" | "inverse.gaussian" | "inversegaussian"
            | "ig" => Ok(FamilyKind::InverseGaussian),
            _ => Err(GlmError::ParseError(format!(
                "Unknown family '{s}'. Use 'gamma' or 'inverse-gaussian'"
            ))),
        }
    }
}
