//! Design matrix construction from a [`Formula`] and a [`ModelFrame`].
//!
//! Factors use treatment contrasts: one indicator column per non-baseline
//! level, with the first (sorted) level absorbed into the intercept. Without
//! an intercept the first factor main effect gets one column per level.

use ndarray::{Array1, Array2};

use super::formula::{Formula, Predictor, Term};
use crate::error::GlmError;
use crate::models::{Column, ModelFrame};

/// Named columns contributed by one predictor or term.
struct ColumnBlock {
    names: Vec<String>,
    values: Vec<Vec<f64>>,
}

/// Model matrix X together with column metadata.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub x: Array2<f64>,
    pub column_names: Vec<String>,
    /// Labels of the formula terms, in order.
    pub term_labels: Vec<String>,
    /// For each column, 0 for the intercept or the 1-based index of its term.
    pub assign: Vec<usize>,
    pub intercept: bool,
}

impl DesignMatrix {
    /// Build the model matrix for `formula` over `frame`.
    pub fn build(formula: &Formula, frame: &dyn ModelFrame) -> Result<Self, GlmError> {
        let n = frame.num_rows();
        if n == 0 {
            return Err(GlmError::InsufficientData(format!(
                "dataset '{}' has no rows",
                frame.name()
            )));
        }

        let mut column_names = Vec::new();
        let mut columns: Vec<Vec<f64>> = Vec::new();
        let mut assign = Vec::new();

        if formula.intercept {
            column_names.push("(Intercept)".to_string());
            columns.push(vec![1.0; n]);
            assign.push(0);
        }

        let mut baseline_free = !formula.intercept;
        for (index, term) in formula.terms.iter().enumerate() {
            let all_levels = baseline_free && is_factor_main_effect(term, frame);
            if all_levels {
                baseline_free = false;
            }
            let block = term_block(term, frame, all_levels)?;
            for (name, values) in block.names.into_iter().zip(block.values) {
                column_names.push(name);
                columns.push(values);
                assign.push(index + 1);
            }
        }

        if columns.is_empty() {
            return Err(GlmError::InvalidModel(format!(
                "formula '{formula}' has no columns"
            )));
        }

        let p = columns.len();
        let x = Array2::from_shape_fn((n, p), |(i, j)| columns[j][i]);

        Ok(Self {
            x,
            column_names,
            term_labels: formula.terms.iter().map(|t| t.to_string()).collect(),
            assign,
            intercept: formula.intercept,
        })
    }

    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.x.ncols()
    }

    /// Keep the intercept and the columns of the first `num_terms` terms.
    pub fn leading_terms(&self, num_terms: usize) -> Self {
        let keep: Vec<usize> = (0..self.ncols())
            .filter(|&j| self.assign[j] <= num_terms)
            .collect();
        let x = Array2::from_shape_fn((self.nrows(), keep.len()), |(i, k)| {
            self.x[[i, keep[k]]]
        });
        Self {
            x,
            column_names: keep.iter().map(|&j| self.column_names[j].clone()).collect(),
            term_labels: self.term_labels.iter().take(num_terms).cloned().collect(),
            assign: keep.iter().map(|&j| self.assign[j]).collect(),
            intercept: self.intercept,
        }
    }
}

/// Pull the response column out of the frame.
pub fn response_vector(formula: &Formula, frame: &dyn ModelFrame) -> Result<Array1<f64>, GlmError> {
    match frame.column(&formula.response) {
        Some(Column::Numeric(values)) => Ok(Array1::from(values)),
        Some(Column::Factor(_)) => Err(GlmError::InvalidModel(format!(
            "response '{}' is categorical; a positive numeric response is required",
            formula.response
        ))),
        None => Err(unknown_column(&formula.response, frame)),
    }
}

fn unknown_column(name: &str, frame: &dyn ModelFrame) -> GlmError {
    GlmError::InvalidModel(format!(
        "unknown column '{name}'; '{}' has columns {}",
        frame.name(),
        frame.column_names().join(", ")
    ))
}

fn is_factor_main_effect(term: &Term, frame: &dyn ModelFrame) -> bool {
    match term.predictors.as_slice() {
        [Predictor::Variable(name)] => matches!(frame.column(name), Some(Column::Factor(_))),
        _ => false,
    }
}

/// Columns for one predictor; `all_levels` keeps the baseline level of a factor.
fn predictor_block(
    predictor: &Predictor,
    frame: &dyn ModelFrame,
    all_levels: bool,
) -> Result<ColumnBlock, GlmError> {
    let column = frame
        .column(predictor.column())
        .ok_or_else(|| unknown_column(predictor.column(), frame))?;

    match (predictor, column) {
        (Predictor::Variable(_), Column::Numeric(values)) => Ok(ColumnBlock {
            names: vec![predictor.to_string()],
            values: vec![values],
        }),
        (Predictor::Log(name), Column::Numeric(values)) => {
            if values.iter().any(|&v| v <= 0.0) {
                return Err(GlmError::InvalidModel(format!(
                    "log({name}) requires strictly positive values"
                )));
            }
            Ok(ColumnBlock {
                names: vec![predictor.to_string()],
                values: vec![values.iter().map(|v| v.ln()).collect()],
            })
        }
        (Predictor::Variable(name), Column::Factor(factor)) => {
            let mut names = Vec::new();
            let mut values = Vec::new();
            let first = usize::from(!all_levels);
            for (level_index, level) in factor.levels.iter().enumerate().skip(first) {
                names.push(format!("{name}[{level}]"));
                values.push(
                    factor
                        .codes
                        .iter()
                        .map(|&c| if c == level_index { 1.0 } else { 0.0 })
                        .collect(),
                );
            }
            Ok(ColumnBlock { names, values })
        }
        (Predictor::Log(name), Column::Factor(_)) => Err(GlmError::InvalidModel(format!(
            "cannot take log of categorical column '{name}'"
        ))),
    }
}

fn term_block(
    term: &Term,
    frame: &dyn ModelFrame,
    all_levels: bool,
) -> Result<ColumnBlock, GlmError> {
    let mut blocks = term
        .predictors
        .iter()
        .map(|p| predictor_block(p, frame, all_levels));

    let mut acc = match blocks.next() {
        Some(block) => block?,
        None => {
            return Err(GlmError::InvalidModel("empty term".to_string()));
        }
    };

    for block in blocks {
        let block = block?;
        let mut names = Vec::new();
        let mut values = Vec::new();
        for (left_name, left) in acc.names.iter().zip(&acc.values) {
            for (right_name, right) in block.names.iter().zip(&block.values) {
                names.push(format!("{left_name}:{right_name}"));
                values.push(left.iter().zip(right).map(|(a, b)| a * b).collect());
            }
        }
        acc = ColumnBlock { names, values };
    }

    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Machine, Origin, PermeabilityDataset, PermeabilityRecord, TreeDataset, TreeRecord};
    use assert_approx_eq::assert_approx_eq;

    fn trees() -> TreeDataset {
        let mut ds = TreeDataset::new("lime");
        let rows = [
            (0.10, 4.0, Origin::Coppice),
            (0.40, 8.0, Origin::Natural),
            (0.90, 12.0, Origin::Planted),
            (0.30, 6.0, Origin::Natural),
        ];
        for (foliage, dbh, origin) in rows {
            ds.records.push(TreeRecord {
                foliage,
                dbh,
                age: 20.0,
                origin,
            });
        }
        ds
    }

    #[test]
    fn test_intercept_and_numeric() {
        let f = Formula::parse("Foliage ~ DBH").unwrap();
        let d = DesignMatrix::build(&f, &trees()).unwrap();
        assert_eq!(d.column_names, vec!["(Intercept)", "DBH"]);
        assert_eq!(d.x.dim(), (4, 2));
        assert_eq!(d.x[[2, 1]], 12.0);
        assert_eq!(d.assign, vec![0, 1]);
    }

    #[test]
    fn test_log_transform() {
        let f = Formula::parse("Foliage ~ log(DBH)").unwrap();
        let d = DesignMatrix::build(&f, &trees()).unwrap();
        assert_eq!(d.column_names[1], "log(DBH)");
        assert_approx_eq!(d.x[[1, 1]], 8f64.ln());
    }

    #[test]
    fn test_factor_treatment_contrasts() {
        let f = Formula::parse("Foliage ~ Origin").unwrap();
        let d = DesignMatrix::build(&f, &trees()).unwrap();
        assert_eq!(
            d.column_names,
            vec!["(Intercept)", "Origin[Natural]", "Origin[Planted]"]
        );
        // Coppice row is all baseline
        assert_eq!(d.x.row(0).to_vec(), vec![1.0, 0.0, 0.0]);
        assert_eq!(d.x.row(1).to_vec(), vec![1.0, 1.0, 0.0]);
        assert_eq!(d.x.row(2).to_vec(), vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_interaction_columns() {
        let f = Formula::parse("Foliage ~ Origin * log(DBH)").unwrap();
        let d = DesignMatrix::build(&f, &trees()).unwrap();
        assert_eq!(d.ncols(), 6);
        assert_eq!(d.column_names[4], "Origin[Natural]:log(DBH)");
        assert_eq!(d.assign, vec![0, 1, 1, 2, 3, 3]);
        assert_approx_eq!(d.x[[1, 4]], 8f64.ln());
        assert_approx_eq!(d.x[[2, 4]], 0.0);
        assert_eq!(d.term_labels, vec!["Origin", "log(DBH)", "Origin:log(DBH)"]);
    }

    #[test]
    fn test_no_intercept() {
        let f = Formula::parse("Foliage ~ DBH - 1").unwrap();
        let d = DesignMatrix::build(&f, &trees()).unwrap();
        assert_eq!(d.column_names, vec!["DBH"]);
        assert!(!d.intercept);
    }

    #[test]
    fn test_no_intercept_keeps_every_factor_level() {
        let mut ds = PermeabilityDataset::new("perm");
        for machine in Machine::ALL {
            ds.records.push(PermeabilityRecord {
                day: 1,
                machine,
                perm: 25.0,
            });
        }
        let f = Formula::parse("Perm ~ Mach - 1").unwrap();
        let d = DesignMatrix::build(&f, &ds).unwrap();
        assert_eq!(d.column_names, vec!["Mach[A]", "Mach[B]", "Mach[C]"]);
        assert_eq!(d.x.row(0).to_vec(), vec![1.0, 0.0, 0.0]);

        // Only the first factor absorbs the missing intercept
        let f = Formula::parse("Foliage ~ DBH + Origin - 1").unwrap();
        let d = DesignMatrix::build(&f, &trees()).unwrap();
        assert_eq!(
            d.column_names,
            vec!["DBH", "Origin[Coppice]", "Origin[Natural]", "Origin[Planted]"]
        );
    }

    #[test]
    fn test_leading_terms() {
        let f = Formula::parse("Foliage ~ Origin * log(DBH)").unwrap();
        let d = DesignMatrix::build(&f, &trees()).unwrap();
        let sub = d.leading_terms(1);
        assert_eq!(sub.column_names, vec!["(Intercept)", "Origin[Natural]", "Origin[Planted]"]);
        assert_eq!(sub.term_labels, vec!["Origin"]);
        let null = d.leading_terms(0);
        assert_eq!(null.ncols(), 1);
    }

    #[test]
    fn test_unknown_column() {
        let f = Formula::parse("Foliage ~ Height").unwrap();
        let err = DesignMatrix::build(&f, &trees()).unwrap_err();
        assert!(err.to_string().contains("Height"));
        assert!(err.to_string().contains("DBH"));
    }

    #[test]
    fn test_log_of_factor_rejected() {
        let f = Formula::parse("Foliage ~ log(Origin)").unwrap();
        assert!(DesignMatrix::build(&f, &trees()).is_err());
    }

    #[test]
    fn test_empty_frame() {
        let f = Formula::parse("Foliage ~ DBH").unwrap();
        assert!(matches!(
            DesignMatrix::build(&f, &TreeDataset::new("empty")),
            Err(GlmError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_response_vector() {
        let f = Formula::parse("Foliage ~ DBH").unwrap();
        let y = response_vector(&f, &trees()).unwrap();
        assert_eq!(y.len(), 4);
        let f = Formula::parse("Origin ~ DBH").unwrap();
        assert!(response_vector(&f, &trees()).is_err());
    }

    #[test]
    fn test_permeability_day_dummies() {
        let mut ds = PermeabilityDataset::new("perm");
        for day in 1..=3u8 {
            for machine in Machine::ALL {
                ds.records.push(PermeabilityRecord {
                    day,
                    machine,
                    perm: 20.0 + day as f64,
                });
            }
        }
        let f = Formula::parse("Perm ~ Mach + Day").unwrap();
        let d = DesignMatrix::build(&f, &ds).unwrap();
        assert_eq!(
            d.column_names,
            vec!["(Intercept)", "Mach[B]", "Mach[C]", "Day[2]", "Day[3]"]
        );
    }
}
