//! Error types for model persistence.

use rusqlite::ErrorCode;

/// Errors that can occur while reading or writing domain records.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// No row matched the requested key.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// The record type that was looked up.
        entity: &'static str,
        /// The key that was not found.
        key: String,
    },

    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    /// The record failed validation before or during the write.
    #[error("invalid {0}")]
    Invalid(String),

    /// A database operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The metadata payload could not be (de)serialised.
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Classifies a failed write. Unique and primary key violations become
    /// `Conflict` with `conflict_msg`, NOT NULL violations become `Invalid`,
    /// everything else stays a `Database` error.
    pub(crate) fn from_write(err: rusqlite::Error, conflict_msg: impl FnOnce() -> String) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
            if failure.code == ErrorCode::ConstraintViolation {
                match failure.extended_code {
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        return Self::Conflict(conflict_msg());
                    }
                    rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL => {
                        return Self::Invalid(format!("record: {err}"));
                    }
                    _ => {}
                }
            }
        }
        Self::Database(err)
    }
}
