//! Link functions g relating the mean μ to the linear predictor η = g(μ).

use serde::{Deserialize, Serialize};

use crate::error::GlmError;

/// A GLM link function.
pub trait Link {
    fn name(&self) -> &'static str;

    /// η = g(μ)
    fn link(&self, mu: f64) -> f64;

    /// μ = g⁻¹(η)
    fn inverse(&self, eta: f64) -> f64;

    /// dη/dμ
    fn derivative(&self, mu: f64) -> f64;

    /// Whether η maps to a usable mean. Family-specific range checks on μ happen separately.
    fn valid_eta(&self, eta: f64) -> bool {
        eta.is_finite()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityLink;

impl Link for IdentityLink {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn link(&self, mu: f64) -> f64 {
        mu
    }

    fn inverse(&self, eta: f64) -> f64 {
        eta
    }

    fn derivative(&self, _mu: f64) -> f64 {
        1.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogLink;

impl Link for LogLink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn link(&self, mu: f64) -> f64 {
        mu.ln()
    }

    fn inverse(&self, eta: f64) -> f64 {
        eta.exp()
    }

    fn derivative(&self, mu: f64) -> f64 {
        1.0 / mu
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InverseLink;

impl Link for InverseLink {
    fn name(&self) -> &'static str {
        "inverse"
    }

    fn link(&self, mu: f64) -> f64 {
        1.0 / mu
    }

    fn inverse(&self, eta: f64) -> f64 {
        1.0 / eta
    }

    fn derivative(&self, mu: f64) -> f64 {
        -1.0 / (mu * mu)
    }

    fn valid_eta(&self, eta: f64) -> bool {
        eta.is_finite() && eta != 0.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InverseSquareLink;

impl Link for InverseSquareLink {
    fn name(&self) -> &'static str {
        "1/mu^2"
    }

    fn link(&self, mu: f64) -> f64 {
        1.0 / (mu * mu)
    }

    fn inverse(&self, eta: f64) -> f64 {
        1.0 / eta.sqrt()
    }

    fn derivative(&self, mu: f64) -> f64 {
        -2.0 / (mu * mu * mu)
    }

    fn valid_eta(&self, eta: f64) -> bool {
        eta.is_finite() && eta > 0.0
    }
}

/// Selector for the supported links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    Identity,
    Log,
    Inverse,
    InverseSquare,
}

impl LinkKind {
    pub const ALL: [LinkKind; 4] = [
        LinkKind::Log,
        LinkKind::Inverse,
        LinkKind::Identity,
        LinkKind::InverseSquare,
    ];

    pub fn link(self) -> &'static dyn Link {
        match self {
            LinkKind::Identity => &IdentityLink,
            LinkKind::Log => &LogLink,
            LinkKind::Inverse => &InverseLink,
            LinkKind::InverseSquare => &InverseSquareLink,
        }
    }

    /// Coefficients act multiplicatively on the mean.
    pub fn is_log(self) -> bool {
        self == LinkKind::Log
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.link().name())
    }
}

impl std::str::FromStr for LinkKind {
    type Err = GlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "identity" | "id" => Ok(LinkKind::Identity),
            "log" => Ok(LinkKind::Log),
            "inverse" | "reciprocal" => Ok(LinkKind::Inverse),
            "inverse-square" | "inverse_square" | "1/mu^2" => Ok(LinkKind::InverseSquare),
            _ => Err(GlmError::ParseError(format!(
                "Unknown link '{s}'. Use 'log', 'inverse', 'identity' or 'inverse-square'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use proptest::prelude::*;

    #[test]
    fn test_log_link_values() {
        assert_approx_eq!(LogLink.link(1.0), 0.0);
        assert_approx_eq!(LogLink.inverse(0.0), 1.0);
        assert_approx_eq!(LogLink.derivative(4.0), 0.25);
    }

    #[test]
    fn test_inverse_link_values() {
        assert_approx_eq!(InverseLink.link(4.0), 0.25);
        assert_approx_eq!(InverseLink.derivative(2.0), -0.25);
        assert!(!InverseLink.valid_eta(0.0));
        assert!(InverseLink.valid_eta(-0.5));
    }

    #[test]
    fn test_inverse_square_link_values() {
        assert_approx_eq!(InverseSquareLink.link(2.0), 0.25);
        assert_approx_eq!(InverseSquareLink.inverse(0.25), 2.0);
        assert_approx_eq!(InverseSquareLink.derivative(1.0), -2.0);
        assert!(!InverseSquareLink.valid_eta(-1.0));
    }

    #[test]
    fn test_identity_link_values() {
        assert_approx_eq!(IdentityLink.link(3.5), 3.5);
        assert_approx_eq!(IdentityLink.derivative(100.0), 1.0);
        assert!(!IdentityLink.valid_eta(f64::NAN));
    }

    #[test]
    fn test_link_kind_parse_and_display() {
        for kind in LinkKind::ALL {
            let name = kind.to_string();
            assert_eq!(name.parse::<LinkKind>().unwrap(), kind);
        }
        assert!("logit".parse::<LinkKind>().is_err());
    }

    #[test]
    fn test_only_log_is_multiplicative() {
        assert!(LinkKind::Log.is_log());
        assert!(!LinkKind::Inverse.is_log());
    }

    proptest! {
        #[test]
        fn prop_inverse_roundtrip(mu in 0.001f64..1000.0) {
            for kind in LinkKind::ALL {
                let link = kind.link();
                let back = link.inverse(link.link(mu));
                prop_assert!((back - mu).abs() <= 1e-9 * mu.max(1.0));
            }
        }

        #[test]
        fn prop_derivative_matches_finite_difference(mu in 0.5f64..50.0) {
            let h = 1e-6 * mu;
            for kind in LinkKind::ALL {
                let link = kind.link();
                let numeric = (link.link(mu + h) - link.link(mu - h)) / (2.0 * h);
                let analytic = link.derivative(mu);
                prop_assert!((numeric - analytic).abs() <= 1e-4 * analytic.abs().max(1e-6));
            }
        }
    }
}
