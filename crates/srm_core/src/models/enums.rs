//! Core enums used throughout the crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FieldError;

/// Engine variant that processes a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineType {
    /// Single-process engine.
    #[default]
    Single,
    /// Multi-process engine.
    Multi,
}

impl EngineType {
    /// All known variants.
    pub const ALL: [EngineType; 2] = [EngineType::Single, EngineType::Multi];

    /// Wire name of the variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multi => "multi",
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineType {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "multi" => Ok(Self::Multi),
            other => Err(FieldError::new(
                "engineType",
                format!("expected one of 'single', 'multi', got '{}'", other),
            )),
        }
    }
}

/// Schema generation of a file record.
///
/// Generation 1 tracks outcome with a done flag and an output pointer;
/// generation 2 tracks iteration counters and a terminal error message.
/// Both remain valid; records are never upgraded between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RecordGeneration {
    /// Legacy done-flag tracking.
    V1,
    /// Iteration counter tracking.
    #[default]
    V2,
}

impl RecordGeneration {
    pub fn number(&self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }
}

impl TryFrom<u8> for RecordGeneration {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(format!("unknown record generation {}", other)),
        }
    }
}

impl From<RecordGeneration> for u8 {
    fn from(value: RecordGeneration) -> Self {
        value.number()
    }
}

impl fmt::Display for RecordGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "generation {}", self.number())
    }
}

/// Lifecycle state of a file record, derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    /// No engine assigned yet.
    Unassigned,
    /// Engine assigned, no progress reported.
    Assigned,
    /// Progress reported, not finished.
    Processing,
    /// Finished without error.
    Completed,
    /// Finished with an error.
    Failed,
}

impl RecordState {
    /// Get display string for UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unassigned => "Unassigned",
            Self::Assigned => "Assigned",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    /// Terminal states accept no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_type_parses_wire_names() {
        assert_eq!("single".parse::<EngineType>().unwrap(), EngineType::Single);
        assert_eq!("multi".parse::<EngineType>().unwrap(), EngineType::Multi);

        let err = "dual".parse::<EngineType>().unwrap_err();
        assert_eq!(err.path, "engineType");
        assert!(err.reason.contains("dual"));
    }

    #[test]
    fn engine_type_serializes_lowercase() {
        let json = serde_json::to_string(&EngineType::Multi).unwrap();
        assert_eq!(json, "\"multi\"");
    }

    #[test]
    fn generation_serializes_as_number() {
        assert_eq!(serde_json::to_string(&RecordGeneration::V1).unwrap(), "1");
        let parsed: RecordGeneration = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, RecordGeneration::V2);
        assert!(serde_json::from_str::<RecordGeneration>("3").is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(RecordState::Completed.is_terminal());
        assert!(RecordState::Failed.is_terminal());
        assert!(!RecordState::Processing.is_terminal());
        assert_eq!(RecordState::Unassigned.as_str(), "Unassigned");
    }
}
