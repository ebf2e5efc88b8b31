mod tree;
mod permeability;
mod dataset;

pub use tree::{Origin, TreeRecord};
pub use permeability::{Machine, PermeabilityRecord, NUM_DAYS};
pub use dataset::{Column, FactorColumn, ModelFrame, PermeabilityDataset, TreeDataset};
