use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::error::GlmError;
use crate::models::{PermeabilityDataset, PermeabilityRecord, TreeDataset, TreeRecord};

/// CSV row structure for tree foliage data.
#[derive(Debug, serde::Deserialize, serde::Serialize)]
struct TreeRow {
    #[serde(rename = "Foliage", alias = "foliage")]
    foliage: f64,
    #[serde(rename = "DBH", alias = "dbh")]
    dbh: f64,
    #[serde(rename = "Age", alias = "age")]
    age: f64,
    #[serde(rename = "Origin", alias = "origin")]
    origin: String,
}

/// CSV row structure for permeability data.
#[derive(Debug, serde::Deserialize, serde::Serialize)]
struct PermeabilityRow {
    #[serde(rename = "Day", alias = "day")]
    day: u8,
    #[serde(rename = "Mach", alias = "mach", alias = "Machine", alias = "machine")]
    machine: String,
    #[serde(rename = "Perm", alias = "perm")]
    perm: f64,
}

/// Which of the two supported datasets a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Trees,
    Permeability,
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All);
    builder
}

fn parse_tree_records<R: Read>(rdr: &mut csv::Reader<R>) -> Result<Vec<TreeRecord>, GlmError> {
    let mut records = Vec::new();
    for (row_index, result) in rdr.deserialize().enumerate() {
        let row: TreeRow = result?;
        let record = TreeRecord {
            foliage: row.foliage,
            dbh: row.dbh,
            age: row.age,
            origin: row.origin.parse()?,
        };
        record.validate().map_err(|e| row_error(row_index, e))?;
        records.push(record);
    }
    Ok(records)
}

fn parse_permeability_records<R: Read>(
    rdr: &mut csv::Reader<R>,
) -> Result<Vec<PermeabilityRecord>, GlmError> {
    let mut records = Vec::new();
    for (row_index, result) in rdr.deserialize().enumerate() {
        let row: PermeabilityRow = result?;
        let record = PermeabilityRecord {
            day: row.day,
            machine: row.machine.parse()?,
            perm: row.perm,
        };
        record.validate().map_err(|e| row_error(row_index, e))?;
        records.push(record);
    }
    Ok(records)
}

fn row_error(row_index: usize, err: GlmError) -> GlmError {
    match err {
        GlmError::ValidationError(msg) => {
            GlmError::ValidationError(format!("row {}: {msg}", row_index + 1))
        }
        other => other,
    }
}

fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Read tree foliage records from a CSV file.
pub fn read_trees_csv(path: impl AsRef<Path>) -> Result<TreeDataset, GlmError> {
    let path = path.as_ref();
    let mut rdr = reader_builder().from_path(path)?;
    let mut dataset = TreeDataset::new(dataset_name(path));
    dataset.records = parse_tree_records(&mut rdr)?;
    info!(rows = dataset.len(), file = %path.display(), "loaded tree dataset");
    Ok(dataset)
}

/// Read tree foliage records from CSV bytes.
pub fn read_trees_from_bytes(data: &[u8], name: &str) -> Result<TreeDataset, GlmError> {
    let mut rdr = reader_builder().from_reader(data);
    let mut dataset = TreeDataset::new(name);
    dataset.records = parse_tree_records(&mut rdr)?;
    Ok(dataset)
}

/// Read permeability records from a CSV file.
pub fn read_permeability_csv(path: impl AsRef<Path>) -> Result<PermeabilityDataset, GlmError> {
    let path = path.as_ref();
    let mut rdr = reader_builder().from_path(path)?;
    let mut dataset = PermeabilityDataset::new(dataset_name(path));
    dataset.records = parse_permeability_records(&mut rdr)?;
    info!(rows = dataset.len(), file = %path.display(), "loaded permeability dataset");
    Ok(dataset)
}

/// Read permeability records from CSV bytes.
pub fn read_permeability_from_bytes(
    data: &[u8],
    name: &str,
) -> Result<PermeabilityDataset, GlmError> {
    let mut rdr = reader_builder().from_reader(data);
    let mut dataset = PermeabilityDataset::new(name);
    dataset.records = parse_permeability_records(&mut rdr)?;
    Ok(dataset)
}

/// Write tree records to a CSV file using the published column names.
pub fn write_trees_csv(dataset: &TreeDataset, path: impl AsRef<Path>) -> Result<(), GlmError> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    for record in &dataset.records {
        wtr.serialize(TreeRow {
            foliage: record.foliage,
            dbh: record.dbh,
            age: record.age,
            origin: record.origin.to_string(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write permeability records to a CSV file using the published column names.
pub fn write_permeability_csv(
    dataset: &PermeabilityDataset,
    path: impl AsRef<Path>,
) -> Result<(), GlmError> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    for record in &dataset.records {
        wtr.serialize(PermeabilityRow {
            day: record.day,
            machine: record.machine.to_string(),
            perm: record.perm,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Work out which dataset a CSV file holds from its header row.
pub fn detect_dataset_kind(path: impl AsRef<Path>) -> Result<DatasetKind, GlmError> {
    let mut rdr = reader_builder().from_path(path.as_ref())?;
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_lowercase()).collect();
    debug!(?headers, "detecting dataset kind");
    kind_from_headers(&headers)
}

fn kind_from_headers(headers: &[String]) -> Result<DatasetKind, GlmError> {
    let has = |name: &str| headers.iter().any(|h| h == name);
    if has("foliage") && has("dbh") {
        Ok(DatasetKind::Trees)
    } else if has("perm") {
        Ok(DatasetKind::Permeability)
    } else {
        Err(GlmError::ParseError(format!(
            "Unrecognized columns [{}]; expected Foliage,DBH,Age,Origin or Day,Mach,Perm",
            headers.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Machine, Origin};

    const TREES_CSV: &str = "Foliage,DBH,Age,Origin\n\
        0.10,4.0,10,Natural\n\
        0.52, 9.5 ,31,Coppice\n\
        0.25,6.1,18,Planted\n";

    const PERM_CSV: &str = "Day,Mach,Perm\n1,A,25.35\n1,B,22.18\n2,C,31.02\n";

    #[test]
    fn test_read_trees_from_bytes() {
        let ds = read_trees_from_bytes(TREES_CSV.as_bytes(), "lime").unwrap();
        assert_eq!(ds.name, "lime");
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.records[1].origin, Origin::Coppice);
        assert!((ds.records[1].dbh - 9.5).abs() < 1e-12);
    }

    #[test]
    fn test_read_trees_lowercase_headers() {
        let csv = "foliage,dbh,age,origin\n0.1,4,10,natural\n";
        let ds = read_trees_from_bytes(csv.as_bytes(), "t").unwrap();
        assert_eq!(ds.records[0].origin, Origin::Natural);
    }

    #[test]
    fn test_read_trees_rejects_nonpositive_foliage() {
        let csv = "Foliage,DBH,Age,Origin\n0.1,4,10,Natural\n0,5,10,Natural\n";
        let err = read_trees_from_bytes(csv.as_bytes(), "t").unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_read_trees_rejects_unknown_origin() {
        let csv = "Foliage,DBH,Age,Origin\n0.1,4,10,Wild\n";
        assert!(matches!(
            read_trees_from_bytes(csv.as_bytes(), "t"),
            Err(GlmError::ParseError(_))
        ));
    }

    #[test]
    fn test_read_trees_missing_column_is_csv_error() {
        let csv = "Foliage,DBH\n0.1,4\n";
        assert!(matches!(
            read_trees_from_bytes(csv.as_bytes(), "t"),
            Err(GlmError::Csv(_))
        ));
    }

    #[test]
    fn test_read_permeability_from_bytes() {
        let ds = read_permeability_from_bytes(PERM_CSV.as_bytes(), "perm").unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.records[2].machine, Machine::C);
        assert_eq!(ds.records[2].day, 2);
    }

    #[test]
    fn test_read_permeability_rejects_bad_day() {
        let csv = "Day,Mach,Perm\n12,A,25.0\n";
        assert!(read_permeability_from_bytes(csv.as_bytes(), "p").is_err());
    }

    #[test]
    fn test_trees_csv_file_roundtrip() {
        let ds = read_trees_from_bytes(TREES_CSV.as_bytes(), "lime").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lime.csv");
        write_trees_csv(&ds, &path).unwrap();

        let loaded = read_trees_csv(&path).unwrap();
        assert_eq!(loaded.name, "lime");
        assert_eq!(loaded.records, ds.records);
        assert_eq!(detect_dataset_kind(&path).unwrap(), DatasetKind::Trees);
    }

    #[test]
    fn test_permeability_csv_file_roundtrip() {
        let ds = read_permeability_from_bytes(PERM_CSV.as_bytes(), "perm").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perm.csv");
        write_permeability_csv(&ds, &path).unwrap();

        let loaded = read_permeability_csv(&path).unwrap();
        assert_eq!(loaded.records, ds.records);
        assert_eq!(detect_dataset_kind(&path).unwrap(), DatasetKind::Permeability);
    }

    #[test]
    fn test_kind_from_headers_unknown() {
        let headers = vec!["x".to_string(), "y".to_string()];
        assert!(kind_from_headers(&headers).is_err());
    }

    #[test]
    fn test_read_missing_file() {
        assert!(matches!(
            read_trees_csv("/nonexistent/lime.csv"),
            Err(GlmError::Csv(_))
        ));
    }
}
