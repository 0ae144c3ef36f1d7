//! Error types for the translation engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslatorError {
    #[error("invalid volume: {0}")]
    InvalidVolume(String),

    #[error(transparent)]
    Storage(#[from] honyaku_storage::VolumeStorageError),

    #[error(transparent)]
    Manifest(#[from] honyaku_types::manifest::ManifestError),

    #[error(transparent)]
    Client(#[from] honyaku_client::ClientError),

    #[error(transparent)]
    Bible(#[from] honyaku_bible::BibleError),

    #[error(transparent)]
    Patterns(#[from] honyaku_patterns::PatternError),
}

pub type Result<T> = std::result::Result<T, TranslatorError>;
