//! Configuration for the run queue.
//!
//! This module provides:
//! - `SettingsRegistry`: the shared, observable run settings for a session
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use srm_core::config::{ConfigManager, ConfigSection, SettingsRegistry};
//!
//! // Load (or create default) config
//! let mut config = ConfigManager::new(".config/settings.toml");
//! config.load_or_create().unwrap();
//!
//! // Hand the run section to a registry shared with the queue
//! let registry = Arc::new(SettingsRegistry::from_settings(config.settings().run.clone()).unwrap());
//! registry.set_tolerance_multiplier("1.5").unwrap();
//!
//! // Persist the run section atomically
//! config.settings_mut().run = registry.snapshot();
//! config.update_section(ConfigSection::Run).unwrap();
//! ```

mod manager;
mod registry;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use registry::{NumericInput, SettingsObserver, SettingsRegistry, SubscriptionId};
pub use settings::{ConfigSection, LoggingSettings, RunSettings, Settings};

pub(crate) use settings::check_tolerance;
