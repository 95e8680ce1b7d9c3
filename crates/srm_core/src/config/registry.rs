//! Process-wide run settings shared by the queue and the validator.
//!
//! The registry is created once at startup (from defaults or the config
//! file), handed around as `Arc<SettingsRegistry>`, and mutated through one
//! setter per field. Every successful change is announced to subscribed
//! observers with a snapshot of the new settings.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::settings::{check_tolerance, RunSettings};
use crate::error::ValidationErrors;
use crate::models::{EngineType, RecordGeneration};

/// Callback invoked after each settings change.
pub type SettingsObserver = Box<dyn Fn(&RunSettings) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A number as entered: either already numeric or text to be coerced.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl NumericInput {
    /// Coerce to `f64`. Text is trimmed before parsing.
    pub fn coerce(&self) -> Result<f64, String> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<f64>()
                    .map_err(|_| format!("expected a number, got '{}'", trimmed))
            }
        }
    }
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for NumericInput {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i32> for NumericInput {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for NumericInput {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for NumericInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Shared, observable run settings.
pub struct SettingsRegistry {
    settings: RwLock<RunSettings>,
    observers: Mutex<Vec<(SubscriptionId, Arc<dyn Fn(&RunSettings) + Send + Sync>)>>,
    next_id: AtomicU64,
}

impl SettingsRegistry {
    /// Create a registry holding the default settings.
    pub fn new() -> Self {
        Self::with_valid_settings(RunSettings::default())
    }

    /// Create a registry from loaded settings, rejecting invalid values.
    pub fn from_settings(settings: RunSettings) -> Result<Self, ValidationErrors> {
        settings.validate()?;
        Ok(Self::with_valid_settings(settings))
    }

    /// Convenience for the common `Arc` wrapping.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn with_valid_settings(settings: RunSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Copy of the current settings.
    pub fn snapshot(&self) -> RunSettings {
        self.settings.read().clone()
    }

    pub fn remove_na_results(&self) -> bool {
        self.settings.read().remove_na_results
    }

    pub fn tolerance_multiplier(&self) -> f64 {
        self.settings.read().tolerance_multiplier
    }

    pub fn default_engine_type(&self) -> EngineType {
        self.settings.read().default_engine_type
    }

    pub fn record_generation(&self) -> RecordGeneration {
        self.settings.read().record_generation
    }

    /// Whether the settings allow the record set to be submitted.
    pub fn is_valid_for_submission(&self) -> bool {
        check_tolerance(self.tolerance_multiplier()).is_ok()
    }

    pub fn set_remove_na_results(&self, value: bool) {
        self.update(|s| s.remove_na_results = value);
        tracing::debug!("remove_na_results set to {}", value);
    }

    /// Set the tolerance multiplier from a number or numeric-looking text.
    ///
    /// Negative, non-numeric and non-finite values are rejected and the
    /// stored value is left as it was.
    pub fn set_tolerance_multiplier(
        &self,
        value: impl Into<NumericInput>,
    ) -> Result<(), ValidationErrors> {
        let input = value.into();
        let value = input.coerce().and_then(check_tolerance).map_err(|reason| {
            tracing::warn!("Rejected tolerance multiplier {:?}: {}", input, reason);
            ValidationErrors::single("toleranceMultiplier", reason)
        })?;

        self.update(|s| s.tolerance_multiplier = value);
        tracing::debug!("tolerance_multiplier set to {}", value);
        Ok(())
    }

    pub fn set_default_engine_type(&self, engine: EngineType) {
        self.update(|s| s.default_engine_type = engine);
        tracing::debug!("default_engine_type set to {}", engine);
    }

    /// Set the default engine type from its wire name.
    pub fn set_default_engine_type_from_str(&self, value: &str) -> Result<(), ValidationErrors> {
        let engine = value.parse::<EngineType>().map_err(|e| {
            tracing::warn!("Rejected default engine type: {}", e);
            ValidationErrors::single(e.path, e.reason)
        })?;
        self.set_default_engine_type(engine);
        Ok(())
    }

    pub fn set_record_generation(&self, generation: RecordGeneration) {
        self.update(|s| s.record_generation = generation);
        tracing::debug!("record_generation set to {}", generation);
    }

    /// Set the record generation from its number (1 or 2).
    pub fn set_record_generation_number(&self, number: u8) -> Result<(), ValidationErrors> {
        let generation = RecordGeneration::try_from(number)
            .map_err(|reason| ValidationErrors::single("recordGeneration", reason))?;
        self.set_record_generation(generation);
        Ok(())
    }

    /// Replace every value at once, e.g. after reloading the config file.
    pub fn replace(&self, settings: RunSettings) -> Result<(), ValidationErrors> {
        settings.validate()?;
        self.update(|s| *s = settings);
        Ok(())
    }

    /// Explicit user reset back to defaults.
    pub fn reset(&self) {
        self.update(|s| *s = RunSettings::default());
        tracing::info!("Run settings reset to defaults");
    }

    /// Register an observer called after every change.
    pub fn subscribe(&self, observer: SettingsObserver) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::from(observer)));
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(other, _)| *other != id);
        observers.len() != before
    }

    /// Apply a change, then notify observers outside of every lock so an
    /// observer may read the registry or subscribe again.
    fn update(&self, change: impl FnOnce(&mut RunSettings)) {
        let snapshot = {
            let mut settings = self.settings.write();
            change(&mut settings);
            settings.clone()
        };

        let observers: Vec<_> = self
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(&snapshot);
        }
    }
}

impl Default for SettingsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SettingsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsRegistry")
            .field("settings", &*self.settings.read())
            .field("observers", &self.observers.lock().len())
            .finish()
    }
}
