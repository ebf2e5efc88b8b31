use serde::{Deserialize, Serialize};

use super::{PermeabilityRecord, TreeRecord};

/// A categorical column: sorted level labels plus a level index per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorColumn {
    pub levels: Vec<String>,
    pub codes: Vec<usize>,
}

impl FactorColumn {
    /// Build a factor from row labels. Levels are the distinct labels in sorted order,
    /// so the first level acts as the baseline under treatment contrasts.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut levels: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        levels.sort();
        levels.dedup();
        let codes = labels
            .iter()
            .map(|l| {
                levels
                    .binary_search_by(|probe| probe.as_str().cmp(l.as_ref()))
                    .unwrap_or(0)
            })
            .collect();
        Self { levels, codes }
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Label for each row.
    pub fn labels(&self) -> Vec<&str> {
        self.codes.iter().map(|&c| self.levels[c].as_str()).collect()
    }
}

/// A column looked up from a [`ModelFrame`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Factor(FactorColumn),
}

/// Read-only tabular access used by formulas, design matrices and summaries.
pub trait ModelFrame {
    /// Dataset name, usually the file stem.
    fn name(&self) -> &str;

    fn num_rows(&self) -> usize;

    /// Canonical column names in file order.
    fn column_names(&self) -> Vec<&'static str>;

    /// Look up a column by case-insensitive name or alias.
    fn column(&self, name: &str) -> Option<Column>;

    fn numeric(&self, name: &str) -> Option<Vec<f64>> {
        match self.column(name)? {
            Column::Numeric(v) => Some(v),
            Column::Factor(_) => None,
        }
    }

    fn factor(&self, name: &str) -> Option<FactorColumn> {
        match self.column(name)? {
            Column::Factor(f) => Some(f),
            Column::Numeric(_) => None,
        }
    }
}

/// Tree foliage biomass dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeDataset {
    pub name: String,
    pub records: Vec<TreeRecord>,
}

impl TreeDataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ModelFrame for TreeDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_rows(&self) -> usize {
        self.records.len()
    }

    fn column_names(&self) -> Vec<&'static str> {
        vec!["Foliage", "DBH", "Age", "Origin"]
    }

    fn column(&self, name: &str) -> Option<Column> {
        match name.trim().to_lowercase().as_str() {
            "foliage" => Some(Column::Numeric(
                self.records.iter().map(|r| r.foliage).collect(),
            )),
            "dbh" => Some(Column::Numeric(self.records.iter().map(|r| r.dbh).collect())),
            "age" => Some(Column::Numeric(self.records.iter().map(|r| r.age).collect())),
            "origin" => {
                let labels: Vec<String> =
                    self.records.iter().map(|r| r.origin.to_string()).collect();
                Some(Column::Factor(FactorColumn::from_labels(&labels)))
            }
            _ => None,
        }
    }
}

/// Sheet permeability dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermeabilityDataset {
    pub name: String,
    pub records: Vec<PermeabilityRecord>,
}

impl PermeabilityDataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ModelFrame for PermeabilityDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_rows(&self) -> usize {
        self.records.len()
    }

    fn column_names(&self) -> Vec<&'static str> {
        vec!["Day", "Mach", "Perm"]
    }

    fn column(&self, name: &str) -> Option<Column> {
        match name.trim().to_lowercase().as_str() {
            "perm" | "permeability" => Some(Column::Numeric(
                self.records.iter().map(|r| r.perm).collect(),
            )),
            "day" => {
                let labels: Vec<String> = self.records.iter().map(|r| r.day.to_string()).collect();
                Some(Column::Factor(FactorColumn::from_labels(&labels)))
            }
            "mach" | "machine" => {
                let labels: Vec<String> =
                    self.records.iter().map(|r| r.machine.to_string()).collect();
                Some(Column::Factor(FactorColumn::from_labels(&labels)))
            }
            _ => None,
        }
    }
}
