//! Events reported by the engine collaborator.

use serde::{Deserialize, Serialize};

/// One report from the engine about a queued file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ProgressEvent {
    /// Iteration counters advanced.
    Progress {
        uuid: String,
        iterations: u64,
        total_iterations: u64,
    },
    /// The run failed; the record becomes terminal.
    Error { uuid: String, message: String },
    /// Legacy completion with a pointer to the stored output.
    Completed { uuid: String, output_uuid: String },
}

impl ProgressEvent {
    pub fn progress(uuid: impl Into<String>, iterations: u64, total_iterations: u64) -> Self {
        Self::Progress {
            uuid: uuid.into(),
            iterations,
            total_iterations,
        }
    }

    pub fn error(uuid: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            uuid: uuid.into(),
            message: message.into(),
        }
    }

    pub fn completed(uuid: impl Into<String>, output_uuid: impl Into<String>) -> Self {
        Self::Completed {
            uuid: uuid.into(),
            output_uuid: output_uuid.into(),
        }
    }

    /// Record the event refers to.
    pub fn uuid(&self) -> &str {
        match self {
            Self::Progress { uuid, .. } | Self::Error { uuid, .. } | Self::Completed { uuid, .. } => {
                uuid
            }
        }
    }
}
