//! Error types for volume storage operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeStorageError {
    #[error("manifest not found: {path}")]
    ManifestNotFound { path: String },

    #[error("invalid manifest: {message}")]
    InvalidManifest {
        message: String,
        #[source]
        source: Option<eyre::Report>,
    },

    #[error("chapter source not found: {path}")]
    SourceNotFound { path: String },

    #[error("storage operation failed: {operation}")]
    OperationFailed {
        operation: String,
        #[source]
        source: Option<eyre::Report>,
    },
}

impl VolumeStorageError {
    pub fn operation(operation: impl Into<String>, err: impl Into<eyre::Report>) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            source: Some(err.into()),
        }
    }
}

pub type Result<T> = std::result::Result<T, VolumeStorageError>;
