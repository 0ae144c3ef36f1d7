//! Error types for the bible subsystem.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BibleError {
    #[error("bible file not found: {path}")]
    NotFound { path: String },

    #[error("series not registered: {series_id}")]
    SeriesNotFound { series_id: String },

    #[error("bible already exists: {path}")]
    AlreadyExists { path: String },

    #[error("invalid category path: {path}")]
    InvalidCategory { path: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, BibleError>;
