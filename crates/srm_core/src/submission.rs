//! Submission payload handed to the submission collaborator.
//!
//! The payload is the validated record set plus the run settings, in the
//! generation-2 shape:
//!
//! ```json
//! {
//!   "engineType": "single",
//!   "removeNaResults": false,
//!   "toleranceMultiplier": 2.0,
//!   "inputFiles": [{ "uuid": "...", "path": {...}, "engineType": null,
//!                    "iterations": 0, "totalIterations": 0, "errors": null }]
//! }
//! ```

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{check_tolerance, NumericInput};
use crate::error::{QueueError, QueueResult, ValidationErrors};
use crate::models::{EngineType, FileRecord, RecordGeneration};
use crate::queue::FileQueue;
use crate::schema::{self, kind};

/// Legacy name of the NA toggle, still accepted on input.
const LEGACY_NA_KEY: &str = "shouldRemoveNACalculations";

/// Settings plus generation-2 records, ready for serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub engine_type: EngineType,
    pub remove_na_results: bool,
    pub tolerance_multiplier: f64,
    pub input_files: Vec<FileRecord>,
}

impl SubmissionPayload {
    /// Build the payload from the queue and its registry.
    ///
    /// Uses `downstream_records`, so failed records are left out when
    /// `remove_na_results` is set. Generation-1 records cannot be submitted.
    pub fn build(queue: &FileQueue) -> QueueResult<Self> {
        let settings = queue.registry().snapshot();
        let mut errors = ValidationErrors::new();

        if let Err(reason) = check_tolerance(settings.tolerance_multiplier) {
            errors.push("toleranceMultiplier", reason);
        }

        let mut input_files = Vec::new();
        for (index, record) in queue.downstream_records().into_iter().enumerate() {
            if record.generation() == RecordGeneration::V1 {
                errors.push(
                    format!("inputFiles[{}]", index),
                    format!(
                        "record '{}' uses generation 1 tracking and cannot be submitted",
                        record.uuid()
                    ),
                );
            } else {
                input_files.push(record.clone());
            }
        }

        let payload = errors
            .into_result(Self {
                engine_type: settings.default_engine_type,
                remove_na_results: settings.remove_na_results,
                tolerance_multiplier: settings.tolerance_multiplier,
                input_files,
            })
            .map_err(QueueError::from)?;
        tracing::info!(
            "Built submission with {} file(s)",
            payload.input_files.len()
        );
        Ok(payload)
    }

    /// Payload as a JSON value.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Validate a form-level bundle into a payload.
///
/// `toleranceMultiplier` may be numeric text and is coerced before the
/// range check. Every record in `inputFiles` is checked as generation 2 and
/// all problems are reported with their nested path.
pub fn validate_form(input: &Value) -> Result<SubmissionPayload, ValidationErrors> {
    let Some(map) = input.as_object() else {
        return Err(ValidationErrors::single(
            "",
            format!("expected an object, got {}", kind(input)),
        ));
    };
    let mut errors = ValidationErrors::new();

    let engine_type = form_engine_type(map, &mut errors);
    let remove_na_results = form_remove_na(map, &mut errors);
    let tolerance_multiplier = form_tolerance(map, &mut errors);
    let input_files = form_input_files(map, &mut errors);

    match (engine_type, remove_na_results, tolerance_multiplier, input_files) {
        (Some(engine_type), Some(remove_na_results), Some(tolerance_multiplier), Some(input_files))
            if errors.is_empty() =>
        {
            Ok(SubmissionPayload {
                engine_type,
                remove_na_results,
                tolerance_multiplier,
                input_files,
            })
        }
        _ => Err(errors),
    }
}

fn form_engine_type(map: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<EngineType> {
    match map.get("engineType") {
        None => {
            errors.push("engineType", "is required");
            None
        }
        Some(Value::String(s)) => match s.parse::<EngineType>() {
            Ok(engine) => Some(engine),
            Err(e) => {
                errors.push(e.path, e.reason);
                None
            }
        },
        Some(other) => {
            errors.push(
                "engineType",
                format!("expected 'single' or 'multi', got {}", kind(other)),
            );
            None
        }
    }
}

fn form_remove_na(map: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<bool> {
    let (key, value) = match (map.get("removeNaResults"), map.get(LEGACY_NA_KEY)) {
        (Some(value), _) => ("removeNaResults", value),
        (None, Some(value)) => (LEGACY_NA_KEY, value),
        (None, None) => {
            errors.push("removeNaResults", "is required");
            return None;
        }
    };
    match value {
        Value::Bool(b) => Some(*b),
        other => {
            errors.push(key, format!("expected a boolean, got {}", kind(other)));
            None
        }
    }
}

fn form_tolerance(map: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<f64> {
    let input = match map.get("toleranceMultiplier") {
        None => {
            errors.push("toleranceMultiplier", "is required");
            return None;
        }
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) => NumericInput::Number(v),
            None => {
                errors.push("toleranceMultiplier", format!("expected a number, got {}", n));
                return None;
            }
        },
        Some(Value::String(s)) => NumericInput::Text(s.clone()),
        Some(other) => {
            errors.push(
                "toleranceMultiplier",
                format!("expected a number or numeric text, got {}", kind(other)),
            );
            return None;
        }
    };
    match input.coerce().and_then(check_tolerance) {
        Ok(value) => Some(value),
        Err(reason) => {
            errors.push("toleranceMultiplier", reason);
            None
        }
    }
}

fn form_input_files(
    map: &Map<String, Value>,
    errors: &mut ValidationErrors,
) -> Option<Vec<FileRecord>> {
    let bundles = match map.get("inputFiles") {
        None => {
            errors.push("inputFiles", "is required");
            return None;
        }
        Some(Value::Array(items)) => items,
        Some(other) => {
            errors.push(
                "inputFiles",
                format!("expected an array, got {}", kind(other)),
            );
            return None;
        }
    };

    let mut records = Vec::with_capacity(bundles.len());
    let mut seen = HashSet::new();
    let before = errors.len();
    for (index, bundle) in bundles.iter().enumerate() {
        let parent = format!("inputFiles[{}]", index);
        match schema::validate_record(bundle, RecordGeneration::V2) {
            Ok(record) => {
                if seen.insert(record.uuid().to_string()) {
                    records.push(record);
                } else {
                    errors.push(
                        format!("{}.uuid", parent),
                        format!("duplicate uuid '{}'", record.uuid()),
                    );
                }
            }
            Err(e) => errors.extend_nested(&parent, e),
        }
    }
    (errors.len() == before).then_some(records)
}
