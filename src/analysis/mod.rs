mod analyzer;
mod density;
mod grouping;
mod histogram;
mod statistics;

pub use analyzer::Analyzer;
pub use density::{
    density_curve, gamma_cdf, gamma_pdf, inverse_gaussian_cdf, inverse_gaussian_pdf,
    positive_grid, DensityCurve,
};
pub use grouping::{group_by_factor, group_by_quantile_bins, GroupSummary, MeanVarianceFit};
pub use histogram::{Histogram, HistogramBin};
pub use statistics::{
    pearson_correlation, quantile, quantile_sorted, ConfidenceInterval, DescriptiveSummary,
};
