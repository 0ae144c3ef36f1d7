//! Gemini REST backend.
//!
//! Talks to the `generateContent`, `cachedContents`, and
//! `batchEmbedContents` endpoints of the Generative Language API. All
//! safety categories are set to BLOCK_NONE; blocking decisions surface as
//! finish reasons and are handled upstream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backend::{CacheSpec, GenerateRequest, GenerativeBackend, RawResponse};
use crate::error::{ClientError, Result};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const EMBEDDING_MODEL: &str = "gemini-embedding-001";

const SAFETY_CATEGORIES: [&str; 5] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_CIVIC_INTEGRITY",
];

pub struct GeminiBackend {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    embedding_model: String,
}

impl GeminiBackend {
    pub fn new(api_key: String, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            base_url: API_BASE.to_string(),
            embedding_model: EMBEDDING_MODEL.to_string(),
        })
    }

    /// Point at a different endpoint (mock servers in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<R>()
            .await
            .map_err(|e| ClientError::BadResponse(e.to_string()))
    }

    fn safety_settings() -> Vec<SafetySetting> {
        SAFETY_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: category.to_string(),
                threshold: "BLOCK_NONE".to_string(),
            })
            .collect()
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<RawResponse> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, request.model
        );
        let body = GenerateContentBody {
            contents: vec![Content::user(&request.prompt)],
            system_instruction: request
                .system_instruction
                .as_deref()
                .map(Content::system),
            cached_content: request.cached_content.clone(),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_p: request.top_p,
                top_k: request.top_k,
                max_output_tokens: request.max_output_tokens,
                thinking_config: request.include_thoughts.then(|| ThinkingConfig {
                    include_thoughts: true,
                }),
            },
            safety_settings: Self::safety_settings(),
            tools: request.tools.clone(),
        };
        let response: GenerateContentResponse = self.post_json(&url, &body).await?;
        Ok(response.into_raw())
    }

    async fn create_cache(&self, spec: &CacheSpec) -> Result<String> {
        let url = format!("{}/cachedContents", self.base_url);
        let body = CreateCachedContentBody {
            model: format!("models/{}", spec.model),
            display_name: spec.display_name.clone(),
            system_instruction: spec
                .system_instruction
                .as_deref()
                .map(Content::system),
            contents: if spec.contents.is_empty() {
                None
            } else {
                Some(
                    spec.contents
                        .iter()
                        .map(|text| Content::user(text))
                        .collect(),
                )
            },
            ttl: format!("{}s", spec.ttl_seconds),
            tools: spec.tools.clone(),
        };
        let response: CachedContentResponse = self.post_json(&url, &body).await?;
        Ok(response.name)
    }

    async fn delete_cache(&self, name: &str) -> Result<()> {
        let url = format!("{}/{}", self.base_url, name);
        let response = self
            .http
            .delete(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}/models/{}:batchEmbedContents",
            self.base_url, self.embedding_model
        );
        let body = BatchEmbedBody {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: format!("models/{}", self.embedding_model),
                    content: Content::user(text),
                })
                .collect(),
        };
        let response: BatchEmbedResponse = self.post_json(&url, &body).await?;
        if response.embeddings.len() != texts.len() {
            return Err(ClientError::BadResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Default)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(text.to_string()),
                thought: None,
            }],
        }
    }

    fn system(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part {
                text: Some(text.to_string()),
                thought: None,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    include_thoughts: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cached_content: Option<String>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    cached_content_token_count: u64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    fn into_raw(self) -> RawResponse {
        let usage = self.usage_metadata.unwrap_or_default();
        let mut text_parts: Vec<String> = Vec::new();
        let mut thinking_parts: Vec<String> = Vec::new();
        let mut finish_reason = String::from("UNKNOWN");
        if let Some(candidate) = self.candidates.into_iter().next() {
            if let Some(reason) = candidate.finish_reason {
                finish_reason = reason;
            }
            if let Some(content) = candidate.content {
                for part in content.parts {
                    let Some(text) = part.text else { continue };
                    if part.thought.unwrap_or(false) {
                        thinking_parts.push(text);
                    } else {
                        text_parts.push(text);
                    }
                }
            }
        }
        RawResponse {
            content: text_parts.join(""),
            thinking_content: if thinking_parts.is_empty() {
                None
            } else {
                Some(thinking_parts.join("\n\n"))
            },
            finish_reason,
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
            cached_tokens: usage.cached_content_token_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCachedContentBody {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contents: Option<Vec<Content>>,
    ttl: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct CachedContentResponse {
    name: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Debug, Serialize)]
struct BatchEmbedBody {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_separates_thought_parts() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [
                    {"text": "planning the scene", "thought": true},
                    {"text": "Translated text."}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 120,
                "candidatesTokenCount": 40,
                "cachedContentTokenCount": 100
            }
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let raw = parsed.into_raw();
        assert_eq!(raw.content, "Translated text.");
        assert_eq!(raw.thinking_content.as_deref(), Some("planning the scene"));
        assert_eq!(raw.finish_reason, "STOP");
        assert_eq!(raw.cached_tokens, 100);
    }

    #[test]
    fn empty_candidate_with_safety_reason_reads_as_blocked() {
        let json = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let raw = parsed.into_raw();
        assert!(raw.is_safety_blocked());
    }
}
