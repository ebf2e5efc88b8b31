use serde::{Deserialize, Serialize};

use crate::error::GlmError;

/// How a tree stand was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Origin {
    Coppice,
    Natural,
    Planted,
}

impl Origin {
    pub const ALL: [Origin; 3] = [Origin::Coppice, Origin::Natural, Origin::Planted];
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Coppice => write!(f, "Coppice"),
            Origin::Natural => write!(f, "Natural"),
            Origin::Planted => write!(f, "Planted"),
        }
    }
}

impl std::str::FromStr for Origin {
    type Err = GlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coppice" | "c" => Ok(Origin::Coppice),
            "natural" | "n" => Ok(Origin::Natural),
            "planted" | "p" => Ok(Origin::Planted),
            _ => Err(GlmError::ParseError(format!("Unknown tree origin: '{s}'"))),
        }
    }
}

/// A single tree measurement: foliage biomass with its size, age and origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRecord {
    /// Foliage biomass in kg
    pub foliage: f64,
    /// Diameter at breast height in cm
    pub dbh: f64,
    /// Age in years
    pub age: f64,
    /// Stand origin
    pub origin: Origin,
}

impl TreeRecord {
    /// Validate measurements. Returns `GlmError::ValidationError` on failure.
    pub fn validate(&self) -> Result<(), GlmError> {
        if !self.foliage.is_finite() || self.foliage <= 0.0 {
            return Err(GlmError::ValidationError(format!(
                "foliage must be positive, got {}",
                self.foliage
            )));
        }
        if !self.dbh.is_finite() || self.dbh <= 0.0 {
            return Err(GlmError::ValidationError(format!(
                "DBH must be positive, got {}",
                self.dbh
            )));
        }
        if !self.age.is_finite() || self.age < 0.0 {
            return Err(GlmError::ValidationError(format!(
                "age must be non-negative, got {}",
                self.age
            )));
        }
        Ok(())
    }
}
