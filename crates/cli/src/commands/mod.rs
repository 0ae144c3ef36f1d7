pub mod bible;
pub mod patterns;
pub mod translate;

use std::sync::Arc;

use async_trait::async_trait;
use honyaku_client::{GeminiBackend, GenerativeBackend};
use honyaku_patterns::{Embedder, PatternError};

/// Embedder adapter over the provider backend, for the pattern stores.
pub struct BackendEmbedder(pub Arc<GeminiBackend>);

#[async_trait]
impl Embedder for BackendEmbedder {
    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, PatternError> {
        self.0
            .embed(texts)
            .await
            .map_err(|e| PatternError::Embedding(e.to_string()))
    }
}
