//! Data models for the run queue.
//!
//! - Enums for engine type, schema generation and record state
//! - Structured file paths (intake + normalization)
//! - The superset file record shared by both schema generations

mod enums;
mod path;
mod record;

pub use enums::{EngineType, RecordGeneration, RecordState};
pub use path::{FilePath, PathError, PathInput, PathRoot};
pub use record::FileRecord;
