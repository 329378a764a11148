use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("configuration file not found in '{0}'")]
    NotFound(PathBuf),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Store(#[from] StoreError),

    // External errors
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error(transparent)]
    Cors(#[from] rocket_cors::Error),
}

/// Persistence failures, independent of the backing engine.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a document with the same {field} already exists")]
    Duplicate { field: String },
    #[error("document kept changing concurrently, gave up after {attempts} attempts")]
    Contention { attempts: u32 },

    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error(transparent)]
    BsonSerialize(#[from] bson::ser::Error),
    #[error(transparent)]
    BsonDeserialize(#[from] bson::de::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Stable classification of [`CoordError`]s exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    Authorization,
    NotFound,
    State,
    PartialFailure,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Authorization => "authorization",
            ErrorKind::NotFound => "not_found",
            ErrorKind::State => "state",
            ErrorKind::PartialFailure => "partial_failure",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by coordinator operations.
#[derive(Debug, Error)]
pub enum CoordError {
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    Authorization { message: String },

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("{message}")]
    State { message: String },

    /// A composite operation failed after some of its steps were already
    /// committed. The committed steps are not rolled back.
    #[error("{operation} failed at step '{step}' after committing {completed:?}: {source}")]
    PartialFailure {
        operation: &'static str,
        step: &'static str,
        completed: Vec<&'static str>,
        #[source]
        source: Box<CoordError>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoordError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordError::Validation { .. } => ErrorKind::Validation,
            CoordError::Conflict { .. } => ErrorKind::Conflict,
            CoordError::Authorization { .. } => ErrorKind::Authorization,
            CoordError::NotFound { .. } => ErrorKind::NotFound,
            CoordError::State { .. } => ErrorKind::State,
            CoordError::PartialFailure { .. } => ErrorKind::PartialFailure,
            CoordError::Store(StoreError::Duplicate { .. }) => ErrorKind::Conflict,
            CoordError::Store(_) => ErrorKind::Internal,
        }
    }
}
