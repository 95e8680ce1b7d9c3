//! SRM Core - run queue state for the SRM rate-constant engine.
//!
//! This crate owns the session state that sits in front of the engine:
//! the global run settings, the record schema (both generations), and the
//! ordered queue of input files with their progress. Rendering, submission
//! transport and the engine itself live elsewhere.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod queue;
pub mod schema;
pub mod submission;

pub use config::{RunSettings, SettingsRegistry};
pub use error::{FieldError, QueueError, QueueResult, ValidationErrors};
pub use models::{EngineType, FilePath, FileRecord, RecordGeneration, RecordState};
pub use queue::{FileQueue, ProgressEvent, SharedFileQueue};
pub use submission::SubmissionPayload;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
