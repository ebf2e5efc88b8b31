use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::GlmError;

/// Confidence interval for a mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub std_error: f64,
    pub lower: f64,
    pub upper: f64,
    pub confidence_level: f64,
    pub sample_size: usize,
}

impl ConfidenceInterval {
    /// Student t interval for the mean of `values` at `confidence` (e.g. 0.95).
    pub fn for_mean(values: &[f64], confidence: f64) -> Result<Self, GlmError> {
        let n = values.len();
        if n < 2 {
            return Err(GlmError::InsufficientData(
                "Need at least 2 observations".to_string(),
            ));
        }
        if !(0.0 < confidence && confidence < 1.0) {
            return Err(GlmError::ValidationError(format!(
                "confidence must be in (0, 1), got {confidence}"
            )));
        }

        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        let std_error = variance.sqrt() / (n as f64).sqrt();

        let df = (n - 1) as f64;
        let alpha = 1.0 - confidence;
        let t_dist =
            StudentsT::new(0.0, 1.0, df).map_err(|e| GlmError::Numerical(e.to_string()))?;
        let t_value = t_dist.inverse_cdf(1.0 - alpha / 2.0);
        let margin = t_value * std_error;

        Ok(ConfidenceInterval {
            mean,
            std_error,
            lower: mean - margin,
            upper: mean + margin,
            confidence_level: confidence,
            sample_size: n,
        })
    }
}

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptiveSummary {
    pub n: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub mean: f64,
    pub q3: f64,
    pub max: f64,
    /// Sample variance (n - 1 denominator); NaN when n = 1.
    pub variance: f64,
    pub std_dev: f64,
    /// std_dev / mean
    pub cv: f64,
    /// Moment coefficient of skewness m3 / m2^(3/2).
    pub skewness: f64,
}

impl DescriptiveSummary {
    pub fn compute(values: &[f64]) -> Result<Self, GlmError> {
        if values.is_empty() {
            return Err(GlmError::InsufficientData(
                "cannot summarize an empty column".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GlmError::ValidationError(
                "column contains non-finite values".to_string(),
            ));
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = values.len();
        let nf = n as f64;
        let mean = values.iter().sum::<f64>() / nf;
        let m2 = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / nf;
        let m3 = values.iter().map(|x| (x - mean).powi(3)).sum::<f64>() / nf;
        let variance = if n > 1 { m2 * nf / (nf - 1.0) } else { f64::NAN };
        let std_dev = variance.sqrt();

        Ok(DescriptiveSummary {
            n,
            min: sorted[0],
            q1: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            mean,
            q3: quantile_sorted(&sorted, 0.75),
            max: sorted[n - 1],
            variance,
            std_dev,
            cv: if mean.abs() > f64::EPSILON {
                std_dev / mean
            } else {
                f64::NAN
            },
            skewness: if m2 > 0.0 { m3 / m2.powf(1.5) } else { 0.0 },
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Quantile of already sorted data, interpolating between order statistics
/// at position (n - 1)p.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}

/// Quantile of unsorted data.
pub fn quantile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, p)
}

/// Pearson product-moment correlation.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Result<f64, GlmError> {
    if x.len() != y.len() {
        return Err(GlmError::ValidationError(format!(
            "columns have different lengths ({} and {})",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(GlmError::InsufficientData(
            "Need at least 2 observations".to_string(),
        ));
    }
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return Err(GlmError::Numerical(
            "correlation is undefined for a constant column".to_string(),
        ));
    }
    Ok(sxy / (sxx * syy).sqrt())
}
