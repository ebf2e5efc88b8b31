//! Generalized linear models for positive continuous responses.
//!
//! The pieces mirror the usual workflow: parse a [`Formula`], build a
//! [`DesignMatrix`] over a [`crate::models::ModelFrame`], fit by IRLS with
//! [`fit_glm`], then inspect residuals, dispersion, coefficients and the
//! analysis of deviance.

mod anova;
mod design;
mod diagnostics;
mod family;
mod formula;
mod inference;
mod irls;
mod link;
mod model;

pub use anova::{analysis_of_deviance, DevianceRow, DevianceTable};
pub use design::{response_vector, DesignMatrix};
pub use diagnostics::{DiagnosticSummary, DispersionMethod};
pub use family::{Family, FamilyKind, GammaFamily, InverseGaussianFamily};
pub use formula::{Formula, Predictor, Term};
pub use inference::{
    coefficient_table, pvalue_t, significance_stars, t_critical, CoefficientRow, CoefficientTable,
};
pub use irls::{fit_glm, ConvergenceIssue, FitConfig, GlmFit};
pub use link::{IdentityLink, InverseLink, InverseSquareLink, Link, LinkKind, LogLink};
pub use model::{FitSummary, ModelSpec};
