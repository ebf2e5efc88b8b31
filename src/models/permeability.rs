use serde::{Deserialize, Serialize};

use crate::error::GlmError;

/// Number of production days in the permeability study.
pub const NUM_DAYS: u8 = 9;

/// Machine that produced a building-material sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Machine {
    A,
    B,
    C,
}

impl Machine {
    pub const ALL: [Machine; 3] = [Machine::A, Machine::B, Machine::C];
}

impl std::fmt::Display for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Machine::A => write!(f, "A"),
            Machine::B => write!(f, "B"),
            Machine::C => write!(f, "C"),
        }
    }
}

impl std::str::FromStr for Machine {
    type Err = GlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Machine::A),
            "B" => Ok(Machine::B),
            "C" => Ok(Machine::C),
            _ => Err(GlmError::ParseError(format!("Unknown machine: '{s}'"))),
        }
    }
}

/// A single permeability measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermeabilityRecord {
    /// Production day (1-9), treated as a factor
    pub day: u8,
    /// Producing machine
    pub machine: Machine,
    /// Permeability in seconds
    pub perm: f64,
}

impl PermeabilityRecord {
    pub fn validate(&self) -> Result<(), GlmError> {
        if !(1..=NUM_DAYS).contains(&self.day) {
            return Err(GlmError::ValidationError(format!(
                "day must be in 1..={NUM_DAYS}, got {}",
                self.day
            )));
        }
        if !self.perm.is_finite() || self.perm <= 0.0 {
            return Err(GlmError::ValidationError(format!(
                "permeability must be positive, got {}",
                self.perm
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_roundtrip_display_parse() {
        for m in Machine::ALL {
            assert_eq!(m.to_string().parse::<Machine>().unwrap(), m);
        }
    }

    #[test]
    fn test_machine_parse_lowercase() {
        assert_eq!("b".parse::<Machine>().unwrap(), Machine::B);
    }

    #[test]
    fn test_machine_parse_invalid() {
        assert!("D".parse::<Machine>().is_err());
    }

    #[test]
    fn test_validate_ok() {
        let rec = PermeabilityRecord {
            day: 9,
            machine: Machine::C,
            perm: 25.3,
        };
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn test_validate_day_out_of_range() {
        let rec = PermeabilityRecord {
            day: 0,
            machine: Machine::A,
            perm: 25.3,
        };
        assert!(rec.validate().is_err());
        let rec = PermeabilityRecord { day: 10, ..rec };
        assert!(rec.validate().is_err());
    }

    #[test]
    fn test_validate_nonpositive_perm() {
        let rec = PermeabilityRecord {
            day: 1,
            machine: Machine::A,
            perm: 0.0,
        };
        let err = rec.validate().unwrap_err();
        assert!(err.to_string().contains("permeability"));
    }
}
