//! The provider seam.
//!
//! Everything the pipeline needs from an LLM vendor fits in four calls:
//! generate, create cache, delete cache, embed. Production uses
//! [`crate::GeminiBackend`]; tests use scripted stubs.

use async_trait::async_trait;

use crate::error::Result;

/// One generation request, fully resolved (model and cache already chosen
/// by [`crate::LlmClient`]).
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    /// Mutually exclusive with `cached_content`: when a cache is used the
    /// system instruction is already baked into it.
    pub system_instruction: Option<String>,
    pub cached_content: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub tools: Option<Vec<serde_json::Value>>,
    pub include_thoughts: bool,
}

/// What came back from the provider, before any policy is applied.
///
/// A safety block is NOT an error at this level: it arrives as empty
/// `content` with a blocking `finish_reason`, and the orchestrator decides
/// what to do with it (model fallback).
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub content: String,
    pub thinking_content: Option<String>,
    pub finish_reason: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
}

impl RawResponse {
    pub fn is_safety_blocked(&self) -> bool {
        self.content.is_empty()
            && matches!(
                self.finish_reason.as_str(),
                "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST"
            )
    }
}

/// Cached-content creation parameters.
#[derive(Debug, Clone)]
pub struct CacheSpec {
    pub model: String,
    pub system_instruction: Option<String>,
    pub contents: Vec<String>,
    pub ttl_seconds: u64,
    pub display_name: Option<String>,
    pub tools: Option<Vec<serde_json::Value>>,
}

#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<RawResponse>;

    /// Returns the provider-issued cache resource name.
    async fn create_cache(&self, spec: &CacheSpec) -> Result<String>;

    async fn delete_cache(&self, name: &str) -> Result<()>;

    /// Batch embedding: one call, one vector per input text.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
