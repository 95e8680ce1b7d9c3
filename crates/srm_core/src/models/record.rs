//! File record types and state transitions.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use uuid::Uuid;

use super::enums::{EngineType, RecordGeneration, RecordState};
use super::path::FilePath;

/// One queued input file.
///
/// Both schema generations share this superset type. `uuid`, `path` and
/// `engine_type` are common. The generation-2 group (`iterations`,
/// `total_iterations`, `errors`) and the legacy generation-1 group
/// (`is_processed`, `output_uuid`) are mutually exclusive: a record carries
/// exactly one of them, and that choice is its generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    uuid: String,
    path: FilePath,
    engine_type: Option<EngineType>,

    // === Generation 2 ===
    iterations: Option<u64>,
    total_iterations: Option<u64>,
    errors: Option<String>,

    // === Generation 1 (legacy only) ===
    is_processed: Option<bool>,
    output_uuid: Option<String>,
}

impl FileRecord {
    /// Create a fresh, unassigned record with a generated uuid.
    pub fn new(path: FilePath, generation: RecordGeneration) -> Self {
        Self::with_uuid(Uuid::new_v4().to_string(), path, generation)
    }

    /// Create a fresh, unassigned record with a known uuid.
    pub fn with_uuid(uuid: String, path: FilePath, generation: RecordGeneration) -> Self {
        match generation {
            RecordGeneration::V2 => Self::progress_record(uuid, path, None, 0, 0, None),
            RecordGeneration::V1 => Self::legacy_record(uuid, path, None, false, None),
        }
    }

    /// Build a generation-2 record from already-validated parts.
    pub(crate) fn progress_record(
        uuid: String,
        path: FilePath,
        engine_type: Option<EngineType>,
        iterations: u64,
        total_iterations: u64,
        errors: Option<String>,
    ) -> Self {
        Self {
            uuid,
            path,
            engine_type,
            iterations: Some(iterations),
            total_iterations: Some(total_iterations),
            errors,
            is_processed: None,
            output_uuid: None,
        }
    }

    /// Build a generation-1 record from already-validated parts.
    pub(crate) fn legacy_record(
        uuid: String,
        path: FilePath,
        engine_type: Option<EngineType>,
        is_processed: bool,
        output_uuid: Option<String>,
    ) -> Self {
        Self {
            uuid,
            path,
            engine_type,
            iterations: None,
            total_iterations: None,
            errors: None,
            is_processed: Some(is_processed),
            output_uuid,
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn path(&self) -> &FilePath {
        &self.path
    }

    pub fn engine_type(&self) -> Option<EngineType> {
        self.engine_type
    }

    /// Which schema generation this record follows.
    pub fn generation(&self) -> RecordGeneration {
        if self.is_processed.is_some() {
            RecordGeneration::V1
        } else {
            RecordGeneration::V2
        }
    }

    /// Completed iterations (generation 2 only).
    pub fn iterations(&self) -> Option<u64> {
        self.iterations
    }

    /// Expected iterations (generation 2 only).
    pub fn total_iterations(&self) -> Option<u64> {
        self.total_iterations
    }

    /// Terminal error message (generation 2 only).
    pub fn errors(&self) -> Option<&str> {
        self.errors.as_deref()
    }

    /// Legacy done flag (generation 1 only).
    pub fn is_processed(&self) -> Option<bool> {
        self.is_processed
    }

    /// Legacy output artifact pointer (generation 1 only).
    pub fn output_uuid(&self) -> Option<&str> {
        self.output_uuid.as_deref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RecordState {
        if self.errors.is_some() {
            return RecordState::Failed;
        }
        if self.engine_type.is_none() {
            return RecordState::Unassigned;
        }
        match self.generation() {
            RecordGeneration::V1 => {
                if self.is_processed == Some(true) {
                    RecordState::Completed
                } else {
                    RecordState::Assigned
                }
            }
            RecordGeneration::V2 => {
                let done = self.iterations.unwrap_or(0);
                let total = self.total_iterations.unwrap_or(0);
                if total > 0 && done == total {
                    RecordState::Completed
                } else if done > 0 || total > 0 {
                    RecordState::Processing
                } else {
                    RecordState::Assigned
                }
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Bundle in this record's own generation shape (camelCase keys).
    pub fn to_bundle(&self) -> Value {
        match self.generation() {
            RecordGeneration::V2 => json!({
                "uuid": self.uuid,
                "path": self.path,
                "engineType": self.engine_type,
                "iterations": self.iterations.unwrap_or(0),
                "totalIterations": self.total_iterations.unwrap_or(0),
                "errors": self.errors,
            }),
            RecordGeneration::V1 => json!({
                "uuid": self.uuid,
                "path": self.path,
                "engineType": self.engine_type,
                "isProcessed": self.is_processed.unwrap_or(false),
                "outputUuid": self.output_uuid,
            }),
        }
    }

    // === Transitions ===
    //
    // Each check runs before any field is touched, so a rejected change
    // leaves the record as it was. The `Err` carries the reason only; the
    // queue attaches the uuid.

    pub(crate) fn assign_engine(&mut self, engine: EngineType) -> Result<(), String> {
        let state = self.state();
        if state.is_terminal() {
            return Err(format!(
                "record is {} and cannot be reassigned",
                state.as_str()
            ));
        }
        self.engine_type = Some(engine);
        Ok(())
    }

    pub(crate) fn record_progress(&mut self, iterations: u64, total: u64) -> Result<(), String> {
        self.require_generation(RecordGeneration::V2)?;
        let state = self.state();
        match state {
            RecordState::Unassigned => {
                return Err("no engine type assigned".to_string());
            }
            RecordState::Completed | RecordState::Failed => {
                return Err(format!(
                    "record is {} and accepts no further progress",
                    state.as_str()
                ));
            }
            RecordState::Assigned | RecordState::Processing => {}
        }
        if iterations > total {
            return Err(format!(
                "iterations {} exceed totalIterations {}",
                iterations, total
            ));
        }
        if state == RecordState::Processing && iterations == 0 && total == 0 {
            return Err("record is Processing and cannot return to Assigned".to_string());
        }
        self.iterations = Some(iterations);
        self.total_iterations = Some(total);
        Ok(())
    }

    pub(crate) fn record_error(&mut self, message: String) -> Result<(), String> {
        self.require_generation(RecordGeneration::V2)?;
        match self.state() {
            RecordState::Unassigned => Err("no engine type assigned".to_string()),
            RecordState::Completed => {
                Err("record is Completed and cannot be marked failed".to_string())
            }
            RecordState::Assigned | RecordState::Processing | RecordState::Failed => {
                self.errors = Some(message);
                Ok(())
            }
        }
    }

    pub(crate) fn record_completion(&mut self, output_uuid: String) -> Result<(), String> {
        self.require_generation(RecordGeneration::V1)?;
        match self.state() {
            RecordState::Unassigned => Err("no engine type assigned".to_string()),
            RecordState::Completed => Err("record is already processed".to_string()),
            _ => {
                self.is_processed = Some(true);
                self.output_uuid = Some(output_uuid);
                Ok(())
            }
        }
    }

    fn require_generation(&self, expected: RecordGeneration) -> Result<(), String> {
        let actual = self.generation();
        if actual == expected {
            Ok(())
        } else {
            Err(format!(
                "record uses {} tracking, this change needs {}",
                actual, expected
            ))
        }
    }
}

impl Serialize for FileRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_bundle().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(generation: RecordGeneration) -> FileRecord {
        FileRecord::new(FilePath::parse("/data/a.csv").unwrap(), generation)
    }

    #[test]
    fn new_record_is_unassigned_and_zeroed() {
        let rec = record(RecordGeneration::V2);
        assert_eq!(rec.state(), RecordState::Unassigned);
        assert_eq!(rec.iterations(), Some(0));
        assert_eq!(rec.total_iterations(), Some(0));
        assert_eq!(rec.errors(), None);
        assert_eq!(rec.is_processed(), None);
        assert_eq!(rec.uuid().len(), 36);
    }

    #[test]
    fn state_follows_progress() {
        let mut rec = record(RecordGeneration::V2);
        rec.assign_engine(EngineType::Single).unwrap();
        assert_eq!(rec.state(), RecordState::Assigned);

        rec.record_progress(3, 10).unwrap();
        assert_eq!(rec.state(), RecordState::Processing);

        rec.record_progress(10, 10).unwrap();
        assert_eq!(rec.state(), RecordState::Completed);
        assert!(rec.record_progress(10, 10).is_err());
        assert!(rec.assign_engine(EngineType::Multi).is_err());
    }

    #[test]
    fn rejected_progress_leaves_record_unchanged() {
        let mut rec = record(RecordGeneration::V2);
        rec.assign_engine(EngineType::Multi).unwrap();
        rec.record_progress(2, 4).unwrap();
        let before = rec.clone();

        let err = rec.record_progress(5, 4).unwrap_err();
        assert!(err.contains("exceed"));
        assert_eq!(rec, before);
    }

    #[test]
    fn processing_record_cannot_reset_to_assigned() {
        let mut rec = record(RecordGeneration::V2);
        rec.assign_engine(EngineType::Multi).unwrap();
        rec.record_progress(3, 10).unwrap();
        let before = rec.clone();

        assert!(rec.record_progress(0, 0).is_err());
        assert_eq!(rec, before);
        assert_eq!(rec.state(), RecordState::Processing);

        // A restart with a known total stays Processing
        rec.record_progress(0, 10).unwrap();
        assert_eq!(rec.state(), RecordState::Processing);
    }

    #[test]
    fn assigned_record_accepts_empty_report() {
        let mut rec = record(RecordGeneration::V2);
        rec.assign_engine(EngineType::Single).unwrap();
        rec.record_progress(0, 0).unwrap();
        assert_eq!(rec.state(), RecordState::Assigned);
    }

    #[test]
    fn error_is_terminal_and_overwritable() {
        let mut rec = record(RecordGeneration::V2);
        rec.assign_engine(EngineType::Single).unwrap();
        rec.record_error("divergence".to_string()).unwrap();
        assert_eq!(rec.state(), RecordState::Failed);

        rec.record_error("nan in output".to_string()).unwrap();
        assert_eq!(rec.errors(), Some("nan in output"));
        assert!(rec.record_progress(1, 2).is_err());
    }

    #[test]
    fn unassigned_record_rejects_progress_and_errors() {
        let mut rec = record(RecordGeneration::V2);
        assert!(rec.record_progress(1, 2).is_err());
        assert!(rec.record_error("x".to_string()).is_err());
        assert_eq!(rec.state(), RecordState::Unassigned);
    }

    #[test]
    fn legacy_record_completes_with_output() {
        let mut rec = record(RecordGeneration::V1);
        assert_eq!(rec.generation(), RecordGeneration::V1);
        assert!(rec.record_progress(1, 2).is_err());

        rec.assign_engine(EngineType::Single).unwrap();
        rec.record_completion("out-1".to_string()).unwrap();
        assert_eq!(rec.state(), RecordState::Completed);
        assert_eq!(rec.output_uuid(), Some("out-1"));
        assert!(rec.record_completion("out-2".to_string()).is_err());
    }

    #[test]
    fn bundle_uses_generation_shape() {
        let v2 = record(RecordGeneration::V2).to_bundle();
        assert!(v2.get("totalIterations").is_some());
        assert!(v2.get("errors").unwrap().is_null());
        assert!(v2.get("isProcessed").is_none());

        let v1 = record(RecordGeneration::V1).to_bundle();
        assert_eq!(v1.get("isProcessed"), Some(&Value::Bool(false)));
        assert!(v1.get("outputUuid").unwrap().is_null());
        assert!(v1.get("iterations").is_none());
    }
}
