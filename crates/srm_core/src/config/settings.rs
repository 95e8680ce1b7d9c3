//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;
use crate::logging::LogLevel;
use crate::models::{EngineType, RecordGeneration};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Global run settings applied to every queued file.
    #[serde(default)]
    pub run: RunSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Global run settings shared by every file in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Drop records with non-computable results from downstream consumption.
    #[serde(default)]
    pub remove_na_results: bool,

    /// Acceptable numerical deviation scale for the engine. Never negative.
    #[serde(default = "default_tolerance_multiplier")]
    pub tolerance_multiplier: f64,

    /// Engine variant used when a file has none assigned.
    #[serde(default)]
    pub default_engine_type: EngineType,

    /// Schema generation for newly added records.
    #[serde(default)]
    pub record_generation: RecordGeneration,
}

pub(crate) fn default_tolerance_multiplier() -> f64 {
    2.0
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            remove_na_results: false,
            tolerance_multiplier: default_tolerance_multiplier(),
            default_engine_type: EngineType::default(),
            record_generation: RecordGeneration::default(),
        }
    }
}

impl RunSettings {
    /// Check the value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(reason) = check_tolerance(self.tolerance_multiplier) {
            errors.push("toleranceMultiplier", reason);
        }
        errors.into_result(())
    }
}

/// Range check shared by the registry setter and config loading.
pub(crate) fn check_tolerance(value: f64) -> Result<f64, String> {
    if !value.is_finite() {
        Err(format!("expected a finite number, got {}", value))
    } else if value < 0.0 {
        Err(format!("must be greater than or equal to 0, got {}", value))
    } else {
        Ok(value)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is not set.
    #[serde(default)]
    pub level: LogLevel,

    /// Folder for log files. Empty disables file output.
    #[serde(default)]
    pub logs_folder: String,

    /// Include event targets in output.
    #[serde(default = "default_true")]
    pub show_target: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            logs_folder: String::new(),
            show_target: true,
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Run,
    Logging,
}

impl ConfigSection {
    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Run => "run",
            ConfigSection::Logging => "logging",
        }
    }
}
