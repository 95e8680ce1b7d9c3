//! Record schema validation.
//!
//! Turns loosely-typed bundles (a parsed form submission, a file-drop
//! event, a persisted snapshot) into typed `FileRecord`s. Every field is
//! checked and every problem collected before reporting; cross-field rules
//! run once the individual fields parse.
//!
//! Generation 2 fields: `uuid`, `path`, `engineType`, `iterations`,
//! `totalIterations`, `errors`.
//! Generation 1 fields: `uuid`, `path`, `engineType`, `isProcessed`,
//! `outputUuid` (may be omitted, meaning null).

mod fields;

pub(crate) use fields::kind;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::SettingsRegistry;
use crate::error::ValidationErrors;
use crate::models::{FileRecord, RecordGeneration};

const PROGRESS_KEYS: [&str; 3] = ["iterations", "totalIterations", "errors"];
const LEGACY_KEYS: [&str; 2] = ["isProcessed", "outputUuid"];

/// Validator bound to the session's settings registry.
#[derive(Debug, Clone)]
pub struct RecordValidator {
    registry: Arc<SettingsRegistry>,
}

impl RecordValidator {
    pub fn new(registry: Arc<SettingsRegistry>) -> Self {
        Self { registry }
    }

    /// Validate against the currently active schema generation.
    pub fn validate(&self, input: &Value) -> Result<FileRecord, ValidationErrors> {
        validate_record(input, self.registry.record_generation())
    }

    /// Validate a bundle of either generation, as on load.
    pub fn validate_any(&self, input: &Value) -> Result<FileRecord, ValidationErrors> {
        validate_any(input)
    }
}

/// Guess a bundle's generation from the fields it carries.
///
/// Legacy fields without any progress field mean generation 1; anything
/// else is checked as generation 2.
pub fn detect_generation(input: &Map<String, Value>) -> RecordGeneration {
    let has_legacy = LEGACY_KEYS.iter().any(|k| input.contains_key(*k));
    let has_progress = PROGRESS_KEYS.iter().any(|k| input.contains_key(*k));
    if has_legacy && !has_progress {
        RecordGeneration::V1
    } else {
        RecordGeneration::V2
    }
}

/// Validate a bundle of whichever generation it appears to be.
pub fn validate_any(input: &Value) -> Result<FileRecord, ValidationErrors> {
    let map = as_object(input)?;
    validate_map(map, detect_generation(map))
}

/// Validate a bundle against a specific generation.
pub fn validate_record(
    input: &Value,
    generation: RecordGeneration,
) -> Result<FileRecord, ValidationErrors> {
    validate_map(as_object(input)?, generation)
}

fn as_object(input: &Value) -> Result<&Map<String, Value>, ValidationErrors> {
    input.as_object().ok_or_else(|| {
        ValidationErrors::single("", format!("expected an object, got {}", kind(input)))
    })
}

fn validate_map(
    map: &Map<String, Value>,
    generation: RecordGeneration,
) -> Result<FileRecord, ValidationErrors> {
    match generation {
        RecordGeneration::V2 => validate_progress_record(map),
        RecordGeneration::V1 => validate_legacy_record(map),
    }
}

fn validate_progress_record(map: &Map<String, Value>) -> Result<FileRecord, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let uuid = fields::string(map, "uuid", &mut errors);
    let path = fields::path(map, "path", &mut errors);
    let engine_type = fields::engine_type(map, "engineType", &mut errors);
    let iterations = fields::count(map, "iterations", &mut errors);
    let total_iterations = fields::count(map, "totalIterations", &mut errors);
    let record_errors = fields::nullable_string(map, "errors", false, &mut errors);
    fields::forbid(
        map,
        &LEGACY_KEYS,
        "generation 1 field is not allowed in a generation 2 record",
        &mut errors,
    );

    let (
        Some(uuid),
        Some(path),
        Some(engine_type),
        Some(iterations),
        Some(total_iterations),
        Some(record_errors),
    ) = (
        uuid,
        path,
        engine_type,
        iterations,
        total_iterations,
        record_errors,
    )
    else {
        return Err(errors);
    };

    if iterations > total_iterations {
        errors.push(
            "iterations",
            format!(
                "must not exceed totalIterations ({} > {})",
                iterations, total_iterations
            ),
        );
    }
    if engine_type.is_none()
        && (iterations > 0 || total_iterations > 0 || record_errors.is_some())
    {
        errors.push(
            "engineType",
            "record without an engine type must not carry progress",
        );
    }

    errors.into_result(FileRecord::progress_record(
        uuid,
        path,
        engine_type,
        iterations,
        total_iterations,
        record_errors,
    ))
}

fn validate_legacy_record(map: &Map<String, Value>) -> Result<FileRecord, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let uuid = fields::string(map, "uuid", &mut errors);
    let path = fields::path(map, "path", &mut errors);
    let engine_type = fields::engine_type(map, "engineType", &mut errors);
    let is_processed = fields::boolean(map, "isProcessed", &mut errors);
    let output_uuid = fields::nullable_string(map, "outputUuid", true, &mut errors);
    fields::forbid(
        map,
        &PROGRESS_KEYS,
        "generation 2 field is not allowed in a generation 1 record",
        &mut errors,
    );

    let (Some(uuid), Some(path), Some(engine_type), Some(is_processed), Some(output_uuid)) =
        (uuid, path, engine_type, is_processed, output_uuid)
    else {
        return Err(errors);
    };

    if engine_type.is_none() && is_processed {
        errors.push(
            "engineType",
            "record without an engine type cannot be processed",
        );
    }
    if output_uuid.is_some() && !is_processed {
        errors.push("outputUuid", "only processed records carry an output");
    }

    errors.into_result(FileRecord::legacy_record(
        uuid,
        path,
        engine_type,
        is_processed,
        output_uuid,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EngineType, FilePath};
    use serde_json::json;

    fn progress_bundle() -> Value {
        json!({
            "uuid": "3f1c2a9e-0000-4000-8000-000000000001",
            "path": "/data/a.csv",
            "engineType": "multi",
            "iterations": 5,
            "totalIterations": 10,
            "errors": null
        })
    }

    #[test]
    fn valid_progress_bundle() {
        let record = validate_record(&progress_bundle(), RecordGeneration::V2).unwrap();
        assert_eq!(record.engine_type(), Some(EngineType::Multi));
        assert_eq!(record.iterations(), Some(5));
        assert_eq!(record.total_iterations(), Some(10));
        assert_eq!(record.path().to_string(), "/data/a.csv");
    }

    #[test]
    fn collects_every_field_error() {
        let input = json!({
            "uuid": 17,
            "path": true,
            "engineType": "dual",
            "iterations": "5",
            "totalIterations": -1,
            "errors": 3
        });
        let errors = validate_record(&input, RecordGeneration::V2).unwrap_err();
        for field in [
            "uuid",
            "path",
            "engineType",
            "iterations",
            "totalIterations",
            "errors",
        ] {
            assert!(errors.has_field(field), "missing error for {}", field);
        }
        assert_eq!(errors.len(), 6);
    }

    #[test]
    fn missing_fields_are_reported() {
        let errors = validate_record(&json!({}), RecordGeneration::V2).unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(errors.errors().iter().all(|e| e.reason == "is required"));
    }

    #[test]
    fn counts_do_not_coerce() {
        let mut input = progress_bundle();
        input["iterations"] = json!(2.5);
        let errors = validate_record(&input, RecordGeneration::V2).unwrap_err();
        assert!(errors.has_field("iterations"));
    }

    #[test]
    fn cross_field_rules() {
        let mut input = progress_bundle();
        input["iterations"] = json!(11);
        let errors = validate_record(&input, RecordGeneration::V2).unwrap_err();
        assert!(errors.has_field("iterations"));

        let mut input = progress_bundle();
        input["engineType"] = Value::Null;
        let errors = validate_record(&input, RecordGeneration::V2).unwrap_err();
        assert!(errors.has_field("engineType"));
    }

    #[test]
    fn path_shapes_are_accepted_then_normalized() {
        let mut input = progress_bundle();
        input["path"] = json!({ "dir": "C:\\runs", "base": "b.csv" });
        let record = validate_record(&input, RecordGeneration::V2).unwrap();
        assert_eq!(record.path(), &FilePath::parse("C:/runs/b.csv").unwrap());

        input["path"] = json!("/../escape.csv");
        let errors = validate_record(&input, RecordGeneration::V2).unwrap_err();
        assert!(errors.has_field("path"));
    }

    #[test]
    fn generations_do_not_mix() {
        let mut input = progress_bundle();
        input["isProcessed"] = json!(true);
        let errors = validate_record(&input, RecordGeneration::V2).unwrap_err();
        assert!(errors.has_field("isProcessed"));

        let errors = validate_record(&progress_bundle(), RecordGeneration::V1).unwrap_err();
        assert!(errors.has_field("isProcessed"));
        assert!(errors.has_field("iterations"));
    }

    #[test]
    fn legacy_bundle_validates_and_is_detected() {
        let input = json!({
            "uuid": "legacy-1",
            "path": ["data", "old.csv"],
            "engineType": "single",
            "isProcessed": true,
            "outputUuid": "out-9"
        });
        let record = validate_any(&input).unwrap();
        assert_eq!(record.generation(), RecordGeneration::V1);
        assert_eq!(record.output_uuid(), Some("out-9"));

        let minimal = json!({
            "uuid": "legacy-2",
            "path": "old.csv",
            "engineType": null,
            "isProcessed": false
        });
        let record = validate_any(&minimal).unwrap();
        assert_eq!(record.output_uuid(), None);
    }

    #[test]
    fn legacy_cross_field_rules() {
        let input = json!({
            "uuid": "legacy-3",
            "path": "old.csv",
            "engineType": null,
            "isProcessed": false,
            "outputUuid": "out"
        });
        let errors = validate_any(&input).unwrap_err();
        assert!(errors.has_field("outputUuid"));
    }

    #[test]
    fn non_object_input() {
        let errors = validate_any(&json!([1, 2])).unwrap_err();
        assert!(errors.has_field(""));
    }

    #[test]
    fn serialized_record_validates_to_same_record() {
        let record = validate_record(
            &json!({
                "uuid": "r-1",
                "path": "C:\\runs\\x.csv",
                "engineType": "single",
                "iterations": 7,
                "totalIterations": 7,
                "errors": "divergence"
            }),
            RecordGeneration::V2,
        )
        .unwrap();

        let bundle = serde_json::to_value(&record).unwrap();
        let again = validate_record(&bundle, RecordGeneration::V2).unwrap();
        assert_eq!(again, record);
    }

    #[test]
    fn validator_follows_registry_generation() {
        let registry = Arc::new(SettingsRegistry::new());
        let validator = RecordValidator::new(Arc::clone(&registry));
        assert!(validator.validate(&progress_bundle()).is_ok());

        registry.set_record_generation(RecordGeneration::V1);
        assert!(validator.validate(&progress_bundle()).is_err());
        assert!(validator.validate_any(&progress_bundle()).is_ok());
    }
}
