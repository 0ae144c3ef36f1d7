//! Error types for the pattern store subsystem.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("RAG source file not found: {path}")]
    RagSourceNotFound { path: String },

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

    #[error("embedding call failed: {0}")]
    Embedding(String),

    #[error("embedding batch size mismatch: sent {sent}, received {received}")]
    EmbeddingMismatch { sent: usize, received: usize },
}

pub type Result<T> = std::result::Result<T, PatternError>;
