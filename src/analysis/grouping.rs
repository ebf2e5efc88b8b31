use serde::{Deserialize, Serialize};

use super::statistics::quantile_sorted;
use crate::error::GlmError;
use crate::glm::FamilyKind;
use crate::models::FactorColumn;

/// Mean and spread of the response within one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    pub label: String,
    pub n: usize,
    pub mean: f64,
    /// Sample variance; NaN for a single observation.
    pub variance: f64,
    pub std_dev: f64,
}

impl GroupSummary {
    fn from_values(label: impl Into<String>, values: &[f64]) -> Self {
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            f64::NAN
        };
        Self {
            label: label.into(),
            n,
            mean,
            variance,
            std_dev: variance.sqrt(),
        }
    }
}

/// Summaries of `values` for each level of `factor`, in level order.
/// Levels with no observations are skipped.
pub fn group_by_factor(values: &[f64], factor: &FactorColumn) -> Result<Vec<GroupSummary>, GlmError> {
    if values.len() != factor.codes.len() {
        return Err(GlmError::ValidationError(format!(
            "{} values but {} factor codes",
            values.len(),
            factor.codes.len()
        )));
    }
    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); factor.num_levels()];
    for (&v, &code) in values.iter().zip(&factor.codes) {
        buckets[code].push(v);
    }
    Ok(factor
        .levels
        .iter()
        .zip(buckets)
        .filter(|(_, bucket)| !bucket.is_empty())
        .map(|(level, bucket)| GroupSummary::from_values(level.as_str(), &bucket))
        .collect())
}

/// Split observations into `bins` groups of near-equal size by the quantiles
/// of `x`, and summarize `y` within each group.
pub fn group_by_quantile_bins(
    x: &[f64],
    y: &[f64],
    bins: usize,
) -> Result<Vec<GroupSummary>, GlmError> {
    if x.len() != y.len() {
        return Err(GlmError::ValidationError(format!(
            "{} covariate values but {} responses",
            x.len(),
            y.len()
        )));
    }
    if bins == 0 {
        return Err(GlmError::ValidationError(
            "number of bins must be positive".to_string(),
        ));
    }
    if x.len() < bins {
        return Err(GlmError::InsufficientData(format!(
            "{} observations cannot fill {bins} bins",
            x.len()
        )));
    }

    let mut order: Vec<usize> = (0..x.len()).collect();
    order.sort_by(|&a, &b| x[a].total_cmp(&x[b]));
    let n = order.len();

    let groups = (0..bins)
        .map(|k| {
            let chunk = &order[k * n / bins..(k + 1) * n / bins];
            let xs: Vec<f64> = chunk.iter().map(|&i| x[i]).collect();
            let ys: Vec<f64> = chunk.iter().map(|&i| y[i]).collect();
            let label = format!(
                "{:.1}-{:.1}",
                quantile_sorted(&xs, 0.0),
                quantile_sorted(&xs, 1.0)
            );
            GroupSummary::from_values(label, &ys)
        })
        .collect();
    Ok(groups)
}

/// Least-squares line through (log mean, log variance) of the groups.
///
/// If V(μ) ∝ μ^ξ the slope estimates ξ: about 2 for gamma data and about 3
/// for inverse-Gaussian data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanVarianceFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub num_groups: usize,
    /// (ln mean, ln variance) for each usable group.
    pub points: Vec<(f64, f64)>,
}

impl MeanVarianceFit {
    /// Groups need at least two observations and a positive mean and variance.
    pub fn from_groups(groups: &[GroupSummary]) -> Result<Self, GlmError> {
        let points: Vec<(f64, f64)> = groups
            .iter()
            .filter(|g| g.n >= 2 && g.mean > 0.0 && g.variance > 0.0)
            .map(|g| (g.mean.ln(), g.variance.ln()))
            .collect();
        if points.len() < 2 {
            return Err(GlmError::InsufficientData(format!(
                "need at least 2 groups with positive variance, found {}",
                points.len()
            )));
        }

        let n = points.len() as f64;
        let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
        let my = points.iter().map(|p| p.1).sum::<f64>() / n;
        let sxx: f64 = points.iter().map(|p| (p.0 - mx).powi(2)).sum();
        let sxy: f64 = points.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum();
        let syy: f64 = points.iter().map(|p| (p.1 - my).powi(2)).sum();
        if sxx <= f64::EPSILON {
            return Err(GlmError::Numerical(
                "group means are identical; the variance power is not identifiable".to_string(),
            ));
        }

        let slope = sxy / sxx;
        let r_squared = if syy > 0.0 { sxy * sxy / (sxx * syy) } else { 1.0 };
        Ok(Self {
            slope,
            intercept: my - slope * mx,
            r_squared,
            num_groups: points.len(),
            points,
        })
    }

    /// Family whose variance power is nearest the slope. Needs three groups.
    pub fn suggested_family(&self) -> Option<FamilyKind> {
        if self.num_groups < 3 || !self.slope.is_finite() {
            return None;
        }
        let gamma = FamilyKind::Gamma.family().variance_power();
        let ig = FamilyKind::InverseGaussian.family().variance_power();
        if (self.slope - gamma).abs() <= (self.slope - ig).abs() {
            Some(FamilyKind::Gamma)
        } else {
            Some(FamilyKind::InverseGaussian)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn group(label: &str, mean: f64, variance: f64) -> GroupSummary {
        GroupSummary {
            label: label.to_string(),
            n: 5,
            mean,
            variance,
            std_dev: variance.sqrt(),
        }
    }

    #[test]
    fn test_group_by_factor() {
        let factor = FactorColumn::from_labels(&["b", "a", "b", "a", "c"]);
        let groups = group_by_factor(&[1.0, 2.0, 3.0, 4.0, 5.0], &factor).unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].label, "a");
        assert_eq!(groups[0].n, 2);
        assert_approx_eq!(groups[0].mean, 3.0);
        assert_approx_eq!(groups[0].variance, 2.0);
        assert_approx_eq!(groups[1].mean, 2.0);
        assert!(groups[2].variance.is_nan());
    }

    #[test]
    fn test_group_by_factor_length_mismatch() {
        let factor = FactorColumn::from_labels(&["a", "b"]);
        assert!(group_by_factor(&[1.0], &factor).is_err());
    }

    #[test]
    fn test_quantile_bins_partition() {
        let x: Vec<f64> = (1..=10).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| v * 2.0).collect();
        let groups = group_by_quantile_bins(&x, &y, 3).unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups.iter().map(|g| g.n).sum::<usize>(), 10);
        assert_eq!(groups[0].label, "1.0-3.0");
        assert_approx_eq!(groups[0].mean, 4.0);
        assert!(groups[0].mean < groups[1].mean && groups[1].mean < groups[2].mean);
    }

    #[test]
    fn test_quantile_bins_unsorted_input() {
        let x = [5.0, 1.0, 4.0, 2.0];
        let y = [50.0, 10.0, 40.0, 20.0];
        let groups = group_by_quantile_bins(&x, &y, 2).unwrap();
        assert_approx_eq!(groups[0].mean, 15.0);
        assert_approx_eq!(groups[1].mean, 45.0);
    }

    #[test]
    fn test_quantile_bins_errors() {
        assert!(group_by_quantile_bins(&[1.0], &[1.0, 2.0], 1).is_err());
        assert!(group_by_quantile_bins(&[1.0, 2.0], &[1.0, 2.0], 0).is_err());
        assert!(group_by_quantile_bins(&[1.0, 2.0], &[1.0, 2.0], 3).is_err());
    }

    #[test]
    fn test_mean_variance_gamma_like() {
        // variance = 0.1 * mean^2
        let groups: Vec<GroupSummary> = [1.0, 2.0, 4.0, 8.0]
            .iter()
            .map(|&m| group("g", m, 0.1 * m * m))
            .collect();
        let fit = MeanVarianceFit::from_groups(&groups).unwrap();
        assert_approx_eq!(fit.slope, 2.0, 1e-10);
        assert_approx_eq!(fit.intercept, 0.1f64.ln(), 1e-10);
        assert_approx_eq!(fit.r_squared, 1.0, 1e-10);
        assert_eq!(fit.suggested_family(), Some(FamilyKind::Gamma));
    }

    #[test]
    fn test_mean_variance_inverse_gaussian_like() {
        let groups: Vec<GroupSummary> = [10.0, 20.0, 30.0]
            .iter()
            .map(|&m| group("g", m, 0.01 * m.powi(3)))
            .collect();
        let fit = MeanVarianceFit::from_groups(&groups).unwrap();
        assert_approx_eq!(fit.slope, 3.0, 1e-10);
        assert_eq!(fit.suggested_family(), Some(FamilyKind::InverseGaussian));
    }

    #[test]
    fn test_mean_variance_needs_three_groups_to_suggest() {
        let groups = vec![group("a", 1.0, 1.0), group("b", 2.0, 4.0)];
        let fit = MeanVarianceFit::from_groups(&groups).unwrap();
        assert_eq!(fit.num_groups, 2);
        assert!(fit.suggested_family().is_none());
    }

    #[test]
    fn test_mean_variance_skips_unusable_groups() {
        let mut single = group("s", 3.0, f64::NAN);
        single.n = 1;
        let groups = vec![group("a", 1.0, 1.0), single, group("c", 0.0, 2.0)];
        assert!(MeanVarianceFit::from_groups(&groups).is_err());
    }

    #[test]
    fn test_mean_variance_identical_means() {
        let groups = vec![group("a", 2.0, 1.0), group("b", 2.0, 3.0)];
        assert!(MeanVarianceFit::from_groups(&groups).is_err());
    }
}
