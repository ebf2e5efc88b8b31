pub mod analysis;
pub mod case_studies;
pub mod config;
pub mod error;
pub mod glm;
pub mod io;
pub mod models;
pub mod visualization;

pub use analysis::Analyzer;
pub use config::AnalysisConfig;
pub use error::GlmError;
pub use glm::{fit_glm, FamilyKind, FitConfig, Formula, GlmFit, LinkKind, ModelSpec};
pub use io::{CsvFormat, DatasetReader};
pub use models::{ModelFrame, PermeabilityDataset, PermeabilityRecord, TreeDataset, TreeRecord};
