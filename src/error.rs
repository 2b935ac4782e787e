use std::path::PathBuf;
use thiserror::Error;

/// Every way a register operation can be refused.
///
/// Storage corruption is not listed here: unreadable slots are logged and read
/// back as empty collections by the store itself.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("{unmarked} student(s) have no status for this day")]
    IncompleteRoster { unmarked: usize },

    #[error("students not on the class roster: {}", ids.join(", "))]
    NotOnRoster { ids: Vec<String> },

    #[error("student id {id} already exists")]
    DuplicateIdentifier { id: String },

    #[error("backup document is malformed: {0}")]
    MalformedBackup(String),

    #[error("confirmation code does not match")]
    ConfirmationMismatch,

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{0}")]
    InvalidInput(String),

    #[error("date must be YYYY-MM-DD: {0}")]
    InvalidDate(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("storage write failed: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RegisterError {
    pub fn code(&self) -> &'static str {
        match self {
            RegisterError::IncompleteRoster { .. } => "incomplete_roster",
            RegisterError::NotOnRoster { .. } => "not_on_roster",
            RegisterError::DuplicateIdentifier { .. } => "duplicate_id",
            RegisterError::MalformedBackup(_) => "malformed_backup",
            RegisterError::ConfirmationMismatch => "confirmation_mismatch",
            RegisterError::NotFound { .. } => "not_found",
            RegisterError::InvalidInput(_) | RegisterError::InvalidDate(_) => "bad_params",
            RegisterError::Io { .. } => "io_failed",
            RegisterError::Storage(_) => "storage_failed",
            RegisterError::Serialization(_) => "serialization_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            RegisterError::IncompleteRoster { unmarked } => {
                Some(serde_json::json!({ "unmarked": unmarked }))
            }
            RegisterError::NotOnRoster { ids } => Some(serde_json::json!({ "studentIds": ids })),
            RegisterError::DuplicateIdentifier { id } => Some(serde_json::json!({ "id": id })),
            RegisterError::NotFound { kind, id } => {
                Some(serde_json::json!({ "kind": kind, "id": id }))
            }
            RegisterError::Io { path, .. } => {
                Some(serde_json::json!({ "path": path.display().to_string() }))
            }
            _ => None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        RegisterError::InvalidInput(message.into())
    }
}

pub type Result<T, E = RegisterError> = std::result::Result<T, E>;
