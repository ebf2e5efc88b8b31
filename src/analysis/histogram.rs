use serde::{Deserialize, Serialize};

use crate::error::GlmError;

/// A single histogram bin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Lower bound of the bin (inclusive)
    pub lower: f64,
    /// Upper bound of the bin (exclusive, except for the last bin)
    pub upper: f64,
    pub count: usize,
}

impl HistogramBin {
    pub fn midpoint(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }
}

/// Equal-width histogram of a numeric column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histogram {
    pub bin_width: f64,
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    /// Build `num_bins` equal-width bins spanning the range of `values`.
    pub fn from_values(values: &[f64], num_bins: usize) -> Result<Self, GlmError> {
        if num_bins == 0 {
            return Err(GlmError::ValidationError(
                "histogram needs at least one bin".to_string(),
            ));
        }
        if values.is_empty() {
            return Ok(Histogram {
                bin_width: 0.0,
                bins: Vec::new(),
            });
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() || !max.is_finite() {
            return Err(GlmError::ValidationError(
                "histogram values must be finite".to_string(),
            ));
        }

        // A constant column gets a single unit-width bin
        let (num_bins, bin_width) = if max > min {
            (num_bins, (max - min) / num_bins as f64)
        } else {
            (1, 1.0)
        };

        let mut bins: Vec<HistogramBin> = (0..num_bins)
            .map(|i| HistogramBin {
                lower: min + i as f64 * bin_width,
                upper: min + (i + 1) as f64 * bin_width,
                count: 0,
            })
            .collect();

        for &v in values {
            let index = (((v - min) / bin_width).floor() as usize).min(num_bins - 1);
            bins[index].count += 1;
        }

        Ok(Histogram { bin_width, bins })
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }

    pub fn max_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values() {
        let h = Histogram::from_values(&[], 5).unwrap();
        assert!(h.bins.is_empty());
        assert_eq!(h.max_count(), 0);
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(Histogram::from_values(&[1.0], 0).is_err());
    }

    #[test]
    fn test_counts_cover_all_values() {
        let values = [0.1, 0.2, 0.25, 0.5, 0.9, 1.0, 1.0];
        let h = Histogram::from_values(&values, 4).unwrap();
        assert_eq!(h.bins.len(), 4);
        assert_eq!(h.total(), values.len());
        // Max lands in the last bin
        assert_eq!(h.bins[3].count, 3);
        assert!((h.bin_width - 0.225).abs() < 1e-12);
    }

    #[test]
    fn test_bins_are_contiguous() {
        let h = Histogram::from_values(&[1.0, 5.0, 3.0], 2).unwrap();
        assert_eq!(h.bins[0].lower, 1.0);
        assert_eq!(h.bins[0].upper, h.bins[1].lower);
        assert_eq!(h.bins[1].upper, 5.0);
        assert_eq!(h.bins[0].midpoint(), 2.0);
    }

    #[test]
    fn test_constant_values_single_bin() {
        let h = Histogram::from_values(&[2.0, 2.0, 2.0], 10).unwrap();
        assert_eq!(h.bins.len(), 1);
        assert_eq!(h.bins[0].count, 3);
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(Histogram::from_values(&[1.0, f64::INFINITY], 3).is_err());
    }
}
