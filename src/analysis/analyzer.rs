use crate::analysis::{
    group_by_factor, group_by_quantile_bins, pearson_correlation, ConfidenceInterval,
    DescriptiveSummary, GroupSummary, Histogram, MeanVarianceFit,
};
use crate::error::GlmError;
use crate::models::{FactorColumn, ModelFrame};

/// Unified analysis API that groups exploratory operations on a dataset.
pub struct Analyzer<'a> {
    frame: &'a dyn ModelFrame,
}

impl<'a> Analyzer<'a> {
    pub fn new(frame: &'a dyn ModelFrame) -> Self {
        Self { frame }
    }

    fn numeric(&self, name: &str) -> Result<Vec<f64>, GlmError> {
        self.frame.numeric(name).ok_or_else(|| {
            GlmError::ValidationError(format!(
                "'{name}' is not a numeric column of '{}' (columns: {})",
                self.frame.name(),
                self.frame.column_names().join(", ")
            ))
        })
    }

    fn factor(&self, name: &str) -> Result<FactorColumn, GlmError> {
        self.frame.factor(name).ok_or_else(|| {
            GlmError::ValidationError(format!(
                "'{name}' is not a categorical column of '{}' (columns: {})",
                self.frame.name(),
                self.frame.column_names().join(", ")
            ))
        })
    }

    /// Cross of several factors, labelled `a:b`.
    fn crossed(&self, factors: &[&str]) -> Result<FactorColumn, GlmError> {
        let columns = factors
            .iter()
            .map(|f| self.factor(f))
            .collect::<Result<Vec<_>, _>>()?;
        let labels: Vec<String> = (0..self.frame.num_rows())
            .map(|i| {
                columns
                    .iter()
                    .map(|c| c.levels[c.codes[i]].as_str())
                    .collect::<Vec<_>>()
                    .join(":")
            })
            .collect();
        Ok(FactorColumn::from_labels(&labels))
    }

    pub fn summary(&self, column: &str) -> Result<DescriptiveSummary, GlmError> {
        DescriptiveSummary::compute(&self.numeric(column)?)
    }

    /// Summaries for every numeric column, in column order.
    pub fn numeric_summaries(&self) -> Result<Vec<(String, DescriptiveSummary)>, GlmError> {
        self.frame
            .column_names()
            .into_iter()
            .filter_map(|name| self.frame.numeric(name).map(|v| (name, v)))
            .map(|(name, values)| Ok((name.to_string(), DescriptiveSummary::compute(&values)?)))
            .collect()
    }

    pub fn confidence_interval(
        &self,
        column: &str,
        confidence: f64,
    ) -> Result<ConfidenceInterval, GlmError> {
        ConfidenceInterval::for_mean(&self.numeric(column)?, confidence)
    }

    /// Response summaries per level of one factor.
    pub fn summary_by(&self, response: &str, factor: &str) -> Result<Vec<GroupSummary>, GlmError> {
        group_by_factor(&self.numeric(response)?, &self.factor(factor)?)
    }

    /// Response summaries per cell of several crossed factors.
    pub fn summary_by_cells(
        &self,
        response: &str,
        factors: &[&str],
    ) -> Result<Vec<GroupSummary>, GlmError> {
        group_by_factor(&self.numeric(response)?, &self.crossed(factors)?)
    }

    /// Response summaries in `bins` quantile bins of a numeric covariate.
    pub fn summary_by_bins(
        &self,
        response: &str,
        covariate: &str,
        bins: usize,
    ) -> Result<Vec<GroupSummary>, GlmError> {
        group_by_quantile_bins(&self.numeric(covariate)?, &self.numeric(response)?, bins)
    }

    pub fn mean_variance_by_cells(
        &self,
        response: &str,
        factors: &[&str],
    ) -> Result<MeanVarianceFit, GlmError> {
        MeanVarianceFit::from_groups(&self.summary_by_cells(response, factors)?)
    }

    pub fn mean_variance_by_bins(
        &self,
        response: &str,
        covariate: &str,
        bins: usize,
    ) -> Result<MeanVarianceFit, GlmError> {
        MeanVarianceFit::from_groups(&self.summary_by_bins(response, covariate, bins)?)
    }

    pub fn histogram(&self, column: &str, bins: usize) -> Result<Histogram, GlmError> {
        Histogram::from_values(&self.numeric(column)?, bins)
    }

    pub fn correlation(&self, a: &str, b: &str) -> Result<f64, GlmError> {
        pearson_correlation(&self.numeric(a)?, &self.numeric(b)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Machine, Origin, PermeabilityDataset, PermeabilityRecord, TreeDataset, TreeRecord};
    use assert_approx_eq::assert_approx_eq;

    fn trees() -> TreeDataset {
        let mut ds = TreeDataset::new("lime");
        let origins = [Origin::Coppice, Origin::Natural, Origin::Planted];
        for i in 0..12 {
            let dbh = 5.0 + i as f64;
            ds.records.push(TreeRecord {
                foliage: 0.01 * dbh * dbh,
                dbh,
                age: 10.0 + 2.0 * i as f64,
                origin: origins[i % 3],
            });
        }
        ds
    }

    fn perm() -> PermeabilityDataset {
        let mut ds = PermeabilityDataset::new("perm");
        for day in 1..=2u8 {
            for (machine, base) in [(Machine::A, 20.0), (Machine::B, 30.0), (Machine::C, 40.0)] {
                for j in 0..3 {
                    ds.records.push(PermeabilityRecord {
                        day,
                        machine,
                        perm: base + day as f64 + j as f64,
                    });
                }
            }
        }
        ds
    }

    #[test]
    fn test_summary_matches_standalone() {
        let ds = trees();
        let analyzer = Analyzer::new(&ds);
        let from_analyzer = analyzer.summary("Foliage").unwrap();
        let standalone = DescriptiveSummary::compute(&ds.numeric("Foliage").unwrap()).unwrap();
        assert_approx_eq!(from_analyzer.mean, standalone.mean);
        assert_eq!(from_analyzer.n, 12);
    }

    #[test]
    fn test_numeric_summaries_skip_factors() {
        let ds = trees();
        let summaries = Analyzer::new(&ds).numeric_summaries().unwrap();
        let names: Vec<&str> = summaries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Foliage", "DBH", "Age"]);
    }

    #[test]
    fn test_summary_by_origin() {
        let ds = trees();
        let groups = Analyzer::new(&ds).summary_by("Foliage", "Origin").unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].label, "Coppice");
        assert_eq!(groups[0].n, 4);
    }

    #[test]
    fn test_summary_by_cells() {
        let ds = perm();
        let cells = Analyzer::new(&ds).summary_by_cells("Perm", &["Mach", "Day"]).unwrap();
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0].label, "A:1");
        assert_approx_eq!(cells[0].mean, 22.0);
        assert_eq!(cells[5].label, "C:2");
    }

    #[test]
    fn test_mean_variance_by_bins() {
        let ds = trees();
        let fit = Analyzer::new(&ds)
            .mean_variance_by_bins("Foliage", "DBH", 3)
            .unwrap();
        assert_eq!(fit.num_groups, 3);
        assert!(fit.slope > 0.0);
    }

    #[test]
    fn test_histogram_and_correlation() {
        let ds = trees();
        let analyzer = Analyzer::new(&ds);
        assert_eq!(analyzer.histogram("DBH", 4).unwrap().total(), 12);
        assert!(analyzer.correlation("Foliage", "DBH").unwrap() > 0.9);
        assert!(analyzer.confidence_interval("Age", 0.95).unwrap().lower > 0.0);
    }

    #[test]
    fn test_wrong_column_kinds() {
        let ds = trees();
        let analyzer = Analyzer::new(&ds);
        assert!(analyzer.summary("Origin").is_err());
        assert!(analyzer.summary_by("Foliage", "DBH").is_err());
        let err = analyzer.summary("Height").unwrap_err();
        assert!(err.to_string().contains("Foliage"));
    }
}
