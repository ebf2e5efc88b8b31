mod csv_io;
mod json_io;

use std::path::Path;

use crate::error::GlmError;
use crate::models::{PermeabilityDataset, TreeDataset};

pub use csv_io::{
    detect_dataset_kind, read_permeability_csv, read_permeability_from_bytes, read_trees_csv,
    read_trees_from_bytes, write_permeability_csv, write_trees_csv, DatasetKind,
};
pub use json_io::{report_to_json, write_report_json};

/// Trait for reading a dataset of type `D` from a file.
pub trait DatasetReader<D> {
    fn read(&self, path: &Path) -> Result<D, GlmError>;
}

/// CSV format reader.
pub struct CsvFormat;

impl DatasetReader<TreeDataset> for CsvFormat {
    fn read(&self, path: &Path) -> Result<TreeDataset, GlmError> {
        read_trees_csv(path)
    }
}

impl DatasetReader<PermeabilityDataset> for CsvFormat {
    fn read(&self, path: &Path) -> Result<PermeabilityDataset, GlmError> {
        read_permeability_csv(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Machine, Origin, PermeabilityRecord, TreeRecord};

    #[test]
    fn test_csv_trait_reads_trees() {
        let mut ds = TreeDataset::new("t");
        ds.records.push(TreeRecord {
            foliage: 0.4,
            dbh: 8.0,
            age: 25.0,
            origin: Origin::Natural,
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trees.csv");
        write_trees_csv(&ds, &path).unwrap();

        let reader = CsvFormat;
        let loaded: TreeDataset = reader.read(&path).unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_csv_trait_reads_permeability() {
        let mut ds = PermeabilityDataset::new("p");
        ds.records.push(PermeabilityRecord {
            day: 3,
            machine: Machine::B,
            perm: 19.5,
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perm.csv");
        write_permeability_csv(&ds, &path).unwrap();

        let reader: &dyn DatasetReader<PermeabilityDataset> = &CsvFormat;
        let loaded = reader.read(&path).unwrap();
        assert_eq!(loaded.records[0].day, 3);
    }
}
