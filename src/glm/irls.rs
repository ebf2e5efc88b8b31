// =============================================================================
// IRLS: Iteratively Reweighted Least Squares
// =============================================================================
//
// Maximum likelihood for a GLM solves the score equations, which for an
// exponential dispersion family reduce to a weighted least squares problem
// whose weights depend on the current fit:
//
//     Start with μ⁰ = y, η⁰ = g(μ⁰)
//     Repeat:
//         1. w = 1 / (V(μ) g'(μ)²)
//         2. z = η + (y - μ) g'(μ)
//         3. Solve (X'WX)β = X'Wz
//         4. η = Xβ, μ = g⁻¹(η)
//         5. Stop when |D - D_old| / (|D| + 0.1) < tolerance
//
// STEP-HALVING
// ------------
// With a non-canonical or range-restricted link (identity, inverse) an update
// can produce a negative or infinite mean. The step is then halved back
// toward the last valid coefficients. If no valid step exists the fit stops
// and reports a convergence issue; it is up to the reader of the report to
// decide what to do with a non-converged model.
//
// =============================================================================

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::design::DesignMatrix;
use super::family::FamilyKind;
use super::link::LinkKind;
use crate::error::GlmError;

// =============================================================================
// Configuration
// =============================================================================

/// Controls for the IRLS algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Maximum number of IRLS iterations.
    pub max_iterations: usize,
    /// Relative deviance change below which the fit has converged.
    pub tolerance: f64,
    /// How many times an invalid step may be halved before giving up.
    pub max_step_halvings: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            tolerance: 1e-8,
            max_step_halvings: 20,
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Why a fit did not converge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConvergenceIssue {
    /// The iteration limit was reached before the deviance settled.
    IterationLimit { iterations: usize, relative_change: f64 },
    /// Every candidate step gave a mean outside the family's range.
    InvalidStep { iteration: usize, reason: String },
}

impl std::fmt::Display for ConvergenceIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvergenceIssue::IterationLimit {
                iterations,
                relative_change,
            } => write!(
                f,
                "did not converge in {iterations} iterations (last relative deviance change {relative_change:.2e})"
            ),
            ConvergenceIssue::InvalidStep { iteration, reason } => write!(
                f,
                "no valid set of coefficients at iteration {iteration}: {reason}"
            ),
        }
    }
}

/// A fitted generalized linear model.
#[derive(Debug, Clone)]
pub struct GlmFit {
    pub family: FamilyKind,
    pub link: LinkKind,
    pub formula: String,
    pub design: DesignMatrix,
    pub y: Array1<f64>,
    pub coefficients: Array1<f64>,
    /// μ = g⁻¹(Xβ)
    pub fitted_values: Array1<f64>,
    /// η = Xβ
    pub linear_predictor: Array1<f64>,
    /// Working weights from the final iteration.
    pub weights: Array1<f64>,
    /// (X'WX)⁻¹ from the final iteration.
    pub covariance_unscaled: Array2<f64>,
    pub deviance: f64,
    pub null_deviance: f64,
    pub df_residual: usize,
    pub df_null: usize,
    pub iterations: usize,
    pub converged: bool,
    pub convergence_issue: Option<ConvergenceIssue>,
}

impl GlmFit {
    pub fn num_obs(&self) -> usize {
        self.y.len()
    }

    /// Number of estimated coefficients.
    pub fn rank(&self) -> usize {
        self.coefficients.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.design.column_names
    }

    /// Coefficient by column name.
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.design
            .column_names
            .iter()
            .position(|c| c == name)
            .map(|j| self.coefficients[j])
    }
}

// =============================================================================
// Fitting
// =============================================================================

/// Current iterate of the IRLS loop.
struct State {
    beta: Array1<f64>,
    eta: Array1<f64>,
    mu: Array1<f64>,
    deviance: f64,
}

/// Fit a GLM to response `y` with model matrix `design`.
///
/// Returns `Err` only for problems with the inputs (shape, response range,
/// a singular first system). Failure to converge is recorded in the result.
pub fn fit_glm(
    y: &Array1<f64>,
    design: &DesignMatrix,
    family_kind: FamilyKind,
    link_kind: LinkKind,
    config: &FitConfig,
    formula: &str,
) -> Result<GlmFit, GlmError> {
    let family = family_kind.family();
    let link = link_kind.link();
    let x = &design.x;
    let n = y.len();
    let p = x.ncols();

    if x.nrows() != n {
        return Err(GlmError::InvalidModel(format!(
            "X has {} rows but y has {} elements",
            x.nrows(),
            n
        )));
    }
    if n == 0 || p == 0 {
        return Err(GlmError::InsufficientData("empty model".to_string()));
    }
    if n < p {
        return Err(GlmError::InsufficientData(format!(
            "{n} observations cannot identify {p} coefficients"
        )));
    }
    if let Some(bad) = y.iter().find(|&&v| !family.valid_response(v)) {
        return Err(GlmError::InvalidModel(format!(
            "{} family requires strictly positive responses, found {bad}",
            family.name()
        )));
    }

    // μ⁰ = y is always valid for a positive family
    let mu0 = y.clone();
    let mut current = State {
        beta: Array1::from_elem(p, f64::NAN),
        eta: mu0.mapv(|m| link.link(m)),
        deviance: y
            .iter()
            .zip(mu0.iter())
            .map(|(&yi, &m)| family.unit_deviance(yi, m))
            .sum(),
        mu: mu0,
    };
    let mut has_coefficients = false;

    let mut covariance = Array2::from_elem((p, p), f64::NAN);
    let mut weights = Array1::zeros(n);
    let mut converged = false;
    let mut issue = None;
    let mut iterations = 0;
    let mut relative_change = f64::INFINITY;

    while iterations < config.max_iterations {
        iterations += 1;

        let link_deriv = current.mu.mapv(|m| link.derivative(m));
        let w: Array1<f64> = current
            .mu
            .iter()
            .zip(link_deriv.iter())
            .map(|(&m, &d)| 1.0 / (family.variance(m) * d * d))
            .collect();
        let z: Array1<f64> = current
            .eta
            .iter()
            .zip(y.iter())
            .zip(current.mu.iter())
            .zip(link_deriv.iter())
            .map(|(((&e, &yi), &m), &d)| e + (yi - m) * d)
            .collect();

        let (beta, cov) = match solve_weighted_least_squares(x, &z, &w) {
            Ok(solution) => solution,
            Err(e) if !has_coefficients => return Err(e),
            Err(e) => {
                issue = Some(ConvergenceIssue::InvalidStep {
                    iteration: iterations,
                    reason: e.to_string(),
                });
                break;
            }
        };

        let candidate = match evaluate(&beta, x, y, family_kind, link_kind) {
            Some(state) => state,
            None if !has_coefficients => {
                issue = Some(ConvergenceIssue::InvalidStep {
                    iteration: iterations,
                    reason: format!(
                        "the {} link gives means outside the range of the {} family",
                        link.name(),
                        family.name()
                    ),
                });
                // No valid coefficients exist, so nothing fitted is reported
                current.eta.fill(f64::NAN);
                current.mu.fill(f64::NAN);
                current.deviance = f64::NAN;
                weights = w;
                break;
            }
            None => match halve_step(&current.beta, &beta, x, y, family_kind, link_kind, config) {
                Some(state) => state,
                None => {
                    issue = Some(ConvergenceIssue::InvalidStep {
                        iteration: iterations,
                        reason: format!(
                            "step could not be corrected after {} halvings",
                            config.max_step_halvings
                        ),
                    });
                    break;
                }
            },
        };

        relative_change =
            (candidate.deviance - current.deviance).abs() / (candidate.deviance.abs() + 0.1);
        debug!(
            iteration = iterations,
            deviance = candidate.deviance,
            relative_change,
            "IRLS step"
        );

        current = candidate;
        has_coefficients = true;
        covariance = cov;
        weights = w;

        if relative_change < config.tolerance {
            converged = true;
            break;
        }
    }

    if !converged && issue.is_none() {
        issue = Some(ConvergenceIssue::IterationLimit {
            iterations,
            relative_change,
        });
    }
    if let Some(problem) = &issue {
        warn!(%formula, family = %family_kind, link = %link_kind, "fit {problem}");
    }

    let null_deviance = null_deviance(y, design.intercept, family_kind, link_kind);

    Ok(GlmFit {
        family: family_kind,
        link: link_kind,
        formula: formula.to_string(),
        design: design.clone(),
        y: y.clone(),
        coefficients: current.beta,
        fitted_values: current.mu,
        linear_predictor: current.eta,
        weights,
        covariance_unscaled: covariance,
        deviance: current.deviance,
        null_deviance,
        df_residual: n - p,
        df_null: n - usize::from(design.intercept),
        iterations,
        converged,
        convergence_issue: issue,
    })
}

/// Evaluate coefficients: returns `None` if η or μ leaves the valid range.
fn evaluate(
    beta: &Array1<f64>,
    x: &Array2<f64>,
    y: &Array1<f64>,
    family_kind: FamilyKind,
    link_kind: LinkKind,
) -> Option<State> {
    let family = family_kind.family();
    let link = link_kind.link();
    let eta = x.dot(beta);
    if !eta.iter().all(|&e| link.valid_eta(e)) {
        return None;
    }
    let mu = eta.mapv(|e| link.inverse(e));
    if !mu.iter().all(|&m| family.valid_mu(m)) {
        return None;
    }
    let deviance: f64 = y
        .iter()
        .zip(mu.iter())
        .map(|(&yi, &m)| family.unit_deviance(yi, m))
        .sum();
    if !deviance.is_finite() {
        return None;
    }
    Some(State {
        beta: beta.clone(),
        eta,
        mu,
        deviance,
    })
}

/// Halve the step from `previous` toward `proposed` until the fit is valid.
fn halve_step(
    previous: &Array1<f64>,
    proposed: &Array1<f64>,
    x: &Array2<f64>,
    y: &Array1<f64>,
    family_kind: FamilyKind,
    link_kind: LinkKind,
    config: &FitConfig,
) -> Option<State> {
    let mut beta = proposed.clone();
    for halving in 1..=config.max_step_halvings {
        beta = (&beta + previous) / 2.0;
        if let Some(state) = evaluate(&beta, x, y, family_kind, link_kind) {
            debug!(halving, "step-halving recovered a valid fit");
            return Some(state);
        }
    }
    None
}

/// Deviance of the model with only an intercept (or nothing at all).
fn null_deviance(y: &Array1<f64>, intercept: bool, family_kind: FamilyKind, link_kind: LinkKind) -> f64 {
    let family = family_kind.family();
    // The intercept-only MLE is the sample mean whatever the link.
    let mu0 = if intercept {
        y.mean().unwrap_or(f64::NAN)
    } else {
        link_kind.link().inverse(0.0)
    };
    if !family.valid_mu(mu0) {
        return f64::NAN;
    }
    y.iter().map(|&yi| family.unit_deviance(yi, mu0)).sum()
}

const RANK_TOLERANCE: f64 = 1e-10;

/// Solve weighted least squares: minimize Σ w_i (z_i - x_i'β)²
///
/// Returns (coefficients, (X'WX)⁻¹)
pub(crate) fn solve_weighted_least_squares(
    x: &Array2<f64>,
    z: &Array1<f64>,
    w: &Array1<f64>,
) -> Result<(Array1<f64>, Array2<f64>), GlmError> {
    let n = x.nrows();
    let p = x.ncols();

    if w.iter().any(|wi| !wi.is_finite() || *wi < 0.0) {
        return Err(GlmError::Numerical(
            "non-finite working weights".to_string(),
        ));
    }

    // X_w = W^(1/2) X, z_w = W^(1/2) z
    let sqrt_w: Vec<f64> = w.iter().map(|&wi| wi.sqrt()).collect();
    let x_weighted = DMatrix::from_fn(n, p, |i, j| x[[i, j]] * sqrt_w[i]);
    let z_weighted = DVector::from_iterator(
        n,
        z.iter().zip(sqrt_w.iter()).map(|(&zi, &swi)| zi * swi),
    );

    let xtx = x_weighted.transpose() * &x_weighted;
    let xtz = x_weighted.transpose() * z_weighted;

    // X'WX is positive semi-definite; a Cholesky pivot that vanishes relative
    // to its diagonal entry means a column is (numerically) aliased.
    let chol = xtx
        .clone()
        .cholesky()
        .filter(|c| {
            let l = c.l_dirty();
            (0..p).all(|i| l[(i, i)] * l[(i, i)] > RANK_TOLERANCE * xtx[(i, i)].abs())
        })
        .ok_or_else(|| {
            GlmError::Numerical(
                "X'WX is singular; the predictors may be collinear".to_string(),
            )
        })?;
    let coefficients = chol.solve(&xtz);
    let xtx_inv = chol.inverse();

    if coefficients.iter().any(|b| !b.is_finite()) {
        return Err(GlmError::Numerical(
            "weighted least squares produced non-finite coefficients".to_string(),
        ));
    }

    let coef_array: Array1<f64> = coefficients.iter().copied().collect();
    let cov_array = Array2::from_shape_fn((p, p), |(i, j)| xtx_inv[(i, j)]);
    Ok((coef_array, cov_array))
}

// =============================================================================
// Tests
// =============================================================================
