use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("field not audited: {0}")]
    InvalidField(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("version conflict: {record_type}/{record_id} already has version {version}")]
    VersionConflict {
        record_type: String,
        record_id: Uuid,
        version: i64,
    },

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
