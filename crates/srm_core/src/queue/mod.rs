//! File queue state for the session.
//!
//! `FileQueue` owns the ordered records and is the only mutation surface:
//! - `add_file` / `remove_file` / `clear` for user actions
//! - `assign_engine_type` for configuration
//! - `report_progress` / `report_error` / `report_completion` for engine reports
//!
//! A failed mutation leaves the queue exactly as it was. Engine reports
//! naming a uuid that was removed are ignored; a uuid the queue never held
//! is a `NotFound` error.

mod events;
mod shared;

pub use events::ProgressEvent;
pub use shared::{ProgressCallback, SharedFileQueue};

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::config::SettingsRegistry;
use crate::error::{QueueError, QueueResult, ValidationErrors};
use crate::models::{EngineType, FilePath, FileRecord, PathInput, RecordState};
use crate::schema;

/// In-memory queue of input files in insertion order.
#[derive(Debug)]
pub struct FileQueue {
    /// Records in queue order.
    records: Vec<FileRecord>,
    /// Uuids that were removed or cleared; late engine reports for them are no-ops.
    /// Kept for the queue's lifetime, so it grows with every removal.
    retired: HashSet<String>,
    /// Session settings.
    registry: Arc<SettingsRegistry>,
}

impl FileQueue {
    /// Create an empty queue bound to the session's settings.
    pub fn new(registry: Arc<SettingsRegistry>) -> Self {
        Self {
            records: Vec::new(),
            retired: HashSet::new(),
            registry,
        }
    }

    /// Settings this queue consults.
    pub fn registry(&self) -> &Arc<SettingsRegistry> {
        &self.registry
    }

    /// Get all records.
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Get a record by uuid.
    pub fn get(&self, uuid: &str) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.uuid() == uuid)
    }

    /// Get a record by index.
    pub fn get_at(&self, index: usize) -> Option<&FileRecord> {
        self.records.get(index)
    }

    /// Index of a record in queue order.
    pub fn position(&self, uuid: &str) -> Option<usize> {
        self.records.iter().position(|r| r.uuid() == uuid)
    }

    /// Number of records in queue.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if queue is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add a file at the end of the queue and return its uuid.
    ///
    /// The record follows the registry's active generation, has no engine
    /// type and zeroed progress.
    pub fn add_file(&mut self, path: impl Into<PathInput>) -> QueueResult<String> {
        let path = normalize_path(&path.into()).map_err(QueueError::from)?;
        Ok(self.push_new(path))
    }

    /// Add several files. Nothing is added unless every path normalizes.
    pub fn add_files<I, P>(&mut self, paths: I) -> QueueResult<Vec<String>>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathInput>,
    {
        let mut errors = ValidationErrors::new();
        let mut normalized = Vec::new();
        for (index, path) in paths.into_iter().enumerate() {
            match normalize_path(&path.into()) {
                Ok(path) => normalized.push(path),
                Err(e) => errors.extend_nested(&format!("[{}]", index), e),
            }
        }
        let normalized = errors.into_result(normalized)?;
        Ok(normalized.into_iter().map(|p| self.push_new(p)).collect())
    }

    fn push_new(&mut self, path: FilePath) -> String {
        let uuid = self.fresh_uuid();
        let record = FileRecord::with_uuid(uuid.clone(), path, self.registry.record_generation());
        tracing::info!(
            "Queued {} as {} ({})",
            record.path(),
            uuid,
            record.generation()
        );
        self.records.push(record);
        uuid
    }

    fn fresh_uuid(&self) -> String {
        loop {
            let candidate = Uuid::new_v4().to_string();
            if self.position(&candidate).is_none() && !self.retired.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Remove a record. Absent uuids are a no-op.
    pub fn remove_file(&mut self, uuid: &str) -> Option<FileRecord> {
        let index = self.position(uuid)?;
        let record = self.records.remove(index);
        self.retired.insert(record.uuid().to_string());
        tracing::info!("Removed {} from queue", uuid);
        Some(record)
    }

    /// Empty the queue unconditionally.
    pub fn clear(&mut self) {
        let count = self.records.len();
        self.retired
            .extend(self.records.drain(..).map(|r| r.uuid().to_string()));
        tracing::info!("Cleared {} record(s) from queue", count);
    }

    /// Set the engine type of a record. Progress fields are left as they are.
    pub fn assign_engine_type(&mut self, uuid: &str, engine: EngineType) -> QueueResult<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.uuid() == uuid)
            .ok_or_else(|| QueueError::not_found(uuid))?;
        record
            .assign_engine(engine)
            .map_err(|reason| rejected(uuid, reason))?;
        tracing::debug!("Assigned {} engine to {}", engine, uuid);
        Ok(())
    }

    /// Assign the registry's default engine type. Returns the type used.
    pub fn assign_default_engine_type(&mut self, uuid: &str) -> QueueResult<EngineType> {
        let engine = self.registry.default_engine_type();
        self.assign_engine_type(uuid, engine)?;
        Ok(engine)
    }

    /// Update iteration counters from an engine report.
    ///
    /// Rejected with `State` when the record is unassigned, terminal, legacy,
    /// or when `iterations > total_iterations`; counters are never clamped.
    pub fn report_progress(
        &mut self,
        uuid: &str,
        iterations: u64,
        total_iterations: u64,
    ) -> QueueResult<()> {
        let Some(record) = self.engine_target(uuid)? else {
            return Ok(());
        };
        record
            .record_progress(iterations, total_iterations)
            .map_err(|reason| rejected(uuid, reason))?;
        if record.state() == RecordState::Completed {
            tracing::info!("{} completed after {} iterations", uuid, iterations);
        } else {
            tracing::debug!("{} at {}/{}", uuid, iterations, total_iterations);
        }
        Ok(())
    }

    /// Mark a record failed. Repeated calls replace the message.
    pub fn report_error(&mut self, uuid: &str, message: impl Into<String>) -> QueueResult<()> {
        let message = message.into();
        let Some(record) = self.engine_target(uuid)? else {
            return Ok(());
        };
        record
            .record_error(message.clone())
            .map_err(|reason| rejected(uuid, reason))?;
        tracing::info!("{} failed: {}", uuid, message);
        Ok(())
    }

    /// Legacy completion: flag the record processed and point at its output.
    pub fn report_completion(
        &mut self,
        uuid: &str,
        output_uuid: impl Into<String>,
    ) -> QueueResult<()> {
        let output_uuid = output_uuid.into();
        let Some(record) = self.engine_target(uuid)? else {
            return Ok(());
        };
        record
            .record_completion(output_uuid.clone())
            .map_err(|reason| rejected(uuid, reason))?;
        tracing::info!("{} processed, output {}", uuid, output_uuid);
        Ok(())
    }

    /// Dispatch an engine event to the matching report method.
    pub fn apply_event(&mut self, event: ProgressEvent) -> QueueResult<()> {
        match event {
            ProgressEvent::Progress {
                uuid,
                iterations,
                total_iterations,
            } => self.report_progress(&uuid, iterations, total_iterations),
            ProgressEvent::Error { uuid, message } => self.report_error(&uuid, message),
            ProgressEvent::Completed { uuid, output_uuid } => {
                self.report_completion(&uuid, output_uuid)
            }
        }
    }

    /// Record addressed by an engine report: `None` when it was removed.
    fn engine_target(&mut self, uuid: &str) -> QueueResult<Option<&mut FileRecord>> {
        match self.records.iter().position(|r| r.uuid() == uuid) {
            Some(index) => Ok(Some(&mut self.records[index])),
            None if self.retired.contains(uuid) => {
                tracing::debug!("Ignoring report for removed record {}", uuid);
                Ok(None)
            }
            None => Err(QueueError::not_found(uuid)),
        }
    }

    /// Records currently in the given state, in queue order.
    pub fn records_in_state(&self, state: RecordState) -> Vec<&FileRecord> {
        self.records.iter().filter(|r| r.state() == state).collect()
    }

    /// Records handed to downstream consumers.
    ///
    /// With `remove_na_results` set, failed records (no computable result)
    /// are left out.
    pub fn downstream_records(&self) -> Vec<&FileRecord> {
        let drop_failed = self.registry.remove_na_results();
        self.records
            .iter()
            .filter(|r| !(drop_failed && r.state() == RecordState::Failed))
            .collect()
    }

    /// Every record as a bundle in its own generation's shape.
    pub fn snapshot(&self) -> Vec<Value> {
        self.records.iter().map(FileRecord::to_bundle).collect()
    }

    /// Validate bundles of either generation and append them in order.
    ///
    /// All-or-nothing: any invalid bundle or duplicate uuid rejects the batch.
    pub fn load_records(&mut self, bundles: &[Value]) -> Result<usize, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut loaded: Vec<FileRecord> = Vec::with_capacity(bundles.len());

        for (index, bundle) in bundles.iter().enumerate() {
            let parent = format!("[{}]", index);
            match schema::validate_any(bundle) {
                Ok(record) => {
                    let duplicate = self.position(record.uuid()).is_some()
                        || loaded.iter().any(|r| r.uuid() == record.uuid());
                    if duplicate {
                        errors.push(
                            format!("{}.uuid", parent),
                            format!("duplicate uuid '{}'", record.uuid()),
                        );
                    } else {
                        loaded.push(record);
                    }
                }
                Err(e) => errors.extend_nested(&parent, e),
            }
        }

        let loaded = errors.into_result(loaded).map_err(|e| {
            tracing::warn!("Rejected queue load: {}", e);
            e
        })?;
        let count = loaded.len();
        for record in loaded {
            self.retired.remove(record.uuid());
            self.records.push(record);
        }
        tracing::info!("Loaded {} record(s) into queue", count);
        Ok(count)
    }
}

fn normalize_path(input: &PathInput) -> Result<FilePath, ValidationErrors> {
    input
        .normalize()
        .map_err(|e| ValidationErrors::single("path", e.to_string()))
}

fn rejected(uuid: &str, reason: String) -> QueueError {
    tracing::warn!("Rejected change to {}: {}", uuid, reason);
    QueueError::state(uuid, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_tracing;
    use crate::models::RecordGeneration;
    use serde_json::json;

    fn queue() -> FileQueue {
        init_test_tracing();
        FileQueue::new(SettingsRegistry::shared())
    }

    #[test]
    fn add_file_creates_unassigned_record() {
        let mut queue = queue();
        let uuid = queue.add_file("/data/a.csv").unwrap();

        assert_eq!(queue.len(), 1);
        let record = queue.get(&uuid).unwrap();
        assert_eq!(record.engine_type(), None);
        assert_eq!(record.iterations(), Some(0));
        assert_eq!(record.state(), RecordState::Unassigned);
    }

    #[test]
    fn add_file_rejects_bad_path() {
        let mut queue = queue();
        let err = queue.add_file("").unwrap_err();
        assert!(matches!(err, QueueError::Validation(ref e) if e.has_field("path")));
        assert!(queue.is_empty());
    }

    #[test]
    fn add_files_is_all_or_nothing() {
        let mut queue = queue();
        let err = queue.add_files(["/a.csv", "/", "/b.csv"]).unwrap_err();
        assert!(matches!(err, QueueError::Validation(ref e) if e.has_field("[1].path")));
        assert!(queue.is_empty());

        let uuids = queue.add_files(["/a.csv", "/b.csv"]).unwrap();
        assert_eq!(uuids.len(), 2);
        assert_eq!(queue.position(&uuids[1]), Some(1));
    }

    #[test]
    fn add_file_follows_active_generation() {
        let mut queue = queue();
        queue.registry().set_record_generation(RecordGeneration::V1);
        let uuid = queue.add_file("/data/old.csv").unwrap();
        assert_eq!(queue.get(&uuid).unwrap().generation(), RecordGeneration::V1);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut queue = queue();
        queue.add_file("/a.csv").unwrap();
        assert!(queue.remove_file("nope").is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn assign_unknown_is_not_found() {
        let mut queue = queue();
        let err = queue.assign_engine_type("nope", EngineType::Multi).unwrap_err();
        assert_eq!(err, QueueError::not_found("nope"));
    }

    #[test]
    fn assign_keeps_progress() {
        let mut queue = queue();
        let uuid = queue.add_file("/a.csv").unwrap();
        queue.assign_engine_type(&uuid, EngineType::Single).unwrap();
        queue.report_progress(&uuid, 4, 8).unwrap();

        queue.assign_engine_type(&uuid, EngineType::Multi).unwrap();
        let record = queue.get(&uuid).unwrap();
        assert_eq!(record.engine_type(), Some(EngineType::Multi));
        assert_eq!(record.iterations(), Some(4));
        assert_eq!(record.total_iterations(), Some(8));
    }

    #[test]
    fn assign_default_uses_registry() {
        let mut queue = queue();
        queue.registry().set_default_engine_type(EngineType::Multi);
        let uuid = queue.add_file("/a.csv").unwrap();
        assert_eq!(
            queue.assign_default_engine_type(&uuid).unwrap(),
            EngineType::Multi
        );
        assert_eq!(
            queue.get(&uuid).unwrap().engine_type(),
            Some(EngineType::Multi)
        );
    }

    #[test]
    fn progress_past_total_is_state_error() {
        let mut queue = queue();
        let uuid = queue.add_file("/a.csv").unwrap();
        queue.assign_engine_type(&uuid, EngineType::Single).unwrap();
        queue.report_progress(&uuid, 2, 10).unwrap();

        let err = queue.report_progress(&uuid, 11, 10).unwrap_err();
        assert!(matches!(err, QueueError::State { .. }));
        assert_eq!(queue.get(&uuid).unwrap().iterations(), Some(2));
    }

    #[test]
    fn reports_for_removed_records_are_ignored() {
        let mut queue = queue();
        let uuid = queue.add_file("/a.csv").unwrap();
        queue.assign_engine_type(&uuid, EngineType::Single).unwrap();
        queue.remove_file(&uuid);

        assert!(queue.report_progress(&uuid, 1, 2).is_ok());
        assert!(queue.report_error(&uuid, "late").is_ok());
        assert!(queue.is_empty());

        // A user action on the removed uuid still reports it missing
        assert!(matches!(
            queue.assign_engine_type(&uuid, EngineType::Multi),
            Err(QueueError::NotFound { .. })
        ));
    }

    #[test]
    fn reports_for_unknown_records_are_not_found() {
        let mut queue = queue();
        assert!(matches!(
            queue.report_progress("ghost", 1, 2),
            Err(QueueError::NotFound { .. })
        ));
    }

    #[test]
    fn clear_retires_everything() {
        let mut queue = queue();
        let a = queue.add_file("/a.csv").unwrap();
        queue.add_file("/b.csv").unwrap();
        queue.clear();

        assert!(queue.is_empty());
        assert!(queue.report_progress(&a, 1, 1).is_ok());
    }

    #[test]
    fn legacy_completion() {
        let mut queue = queue();
        queue.registry().set_record_generation(RecordGeneration::V1);
        let uuid = queue.add_file("/old.csv").unwrap();

        assert!(matches!(
            queue.report_completion(&uuid, "out"),
            Err(QueueError::State { .. })
        ));
        queue.assign_engine_type(&uuid, EngineType::Single).unwrap();
        queue
            .apply_event(ProgressEvent::completed(uuid.as_str(), "out"))
            .unwrap();

        let record = queue.get(&uuid).unwrap();
        assert_eq!(record.is_processed(), Some(true));
        assert_eq!(record.output_uuid(), Some("out"));
        assert!(queue.report_progress(&uuid, 1, 1).is_err());
    }

    #[test]
    fn downstream_drops_failed_when_requested() {
        let mut queue = queue();
        let ok = queue.add_file("/ok.csv").unwrap();
        let bad = queue.add_file("/bad.csv").unwrap();
        for uuid in [&ok, &bad] {
            queue.assign_engine_type(uuid, EngineType::Single).unwrap();
        }
        queue.report_error(&bad, "NA").unwrap();

        assert_eq!(queue.downstream_records().len(), 2);
        queue.registry().set_remove_na_results(true);
        let kept = queue.downstream_records();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].uuid(), ok);
        assert_eq!(queue.records_in_state(RecordState::Failed).len(), 1);
    }

    #[test]
    fn snapshot_loads_back_into_fresh_queue() {
        let mut queue = queue();
        let a = queue.add_file("/data/a.csv").unwrap();
        queue.assign_engine_type(&a, EngineType::Multi).unwrap();
        queue.report_progress(&a, 3, 6).unwrap();
        queue.registry().set_record_generation(RecordGeneration::V1);
        queue.add_file("C:\\old\\b.csv").unwrap();

        let snapshot = queue.snapshot();
        let mut restored = FileQueue::new(SettingsRegistry::shared());
        assert_eq!(restored.load_records(&snapshot).unwrap(), 2);
        assert_eq!(restored.records(), queue.records());
    }

    #[test]
    fn load_rejects_duplicates_and_bad_bundles_atomically() {
        let mut queue = queue();
        let existing = queue.add_file("/a.csv").unwrap();

        let bundles = vec![
            json!({
                "uuid": "fresh",
                "path": "/fresh.csv",
                "engineType": null,
                "iterations": 0,
                "totalIterations": 0,
                "errors": null
            }),
            json!({
                "uuid": existing,
                "path": "/dup.csv",
                "engineType": null,
                "iterations": 0,
                "totalIterations": 0,
                "errors": null
            }),
            json!({ "uuid": "broken" }),
        ];
        let errors = queue.load_records(&bundles).unwrap_err();
        assert!(errors.has_field("[1].uuid"));
        assert!(errors.has_field("[2].path"));
        assert_eq!(queue.len(), 1);
    }
}
