//! Policy layer over a [`GenerativeBackend`]: rate limiting, retries,
//! and cached-content tracking.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::backend::{CacheSpec, GenerateRequest, GenerativeBackend, RawResponse};
use crate::error::{ClientError, Result};
use crate::retry::{RetryPolicy, classify_provider_error, retry};

const CACHE_DISPLAY_NAME_MAX_BYTES: usize = 128;
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(120 * 60);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub model: String,
    pub enable_caching: bool,
    pub requests_per_minute: u32,
    pub cache_ttl: Duration,
    pub retry: RetryPolicy,
    pub include_thoughts: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-pro".to_string(),
            enable_caching: true,
            requests_per_minute: 10,
            cache_ttl: DEFAULT_CACHE_TTL,
            retry: RetryPolicy::default(),
            include_thoughts: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub model: Option<String>,
    /// External cache name (the volume cache). Overrides the internal one.
    pub cached_content: Option<String>,
    /// Bypass every internal cache and start a fresh session.
    pub force_new_session: bool,
    pub tools: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
    pub finish_reason: String,
    pub model: String,
    pub thinking_content: Option<String>,
}

impl Response {
    pub fn is_safety_blocked(&self) -> bool {
        self.content.is_empty()
            && matches!(
                self.finish_reason.as_str(),
                "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST"
            )
    }
}

#[derive(Debug)]
struct TrackedCache {
    name: String,
    created_at: Instant,
    ttl: Duration,
    model: String,
}

impl TrackedCache {
    /// Valid iff unexpired AND created for the requested model. A model
    /// mismatch always invalidates.
    fn valid_for(&self, model: &str) -> bool {
        self.model == model && self.created_at.elapsed() < self.ttl
    }
}

pub struct LlmClient {
    backend: Arc<dyn GenerativeBackend>,
    config: ClientConfig,
    rate_delay: Duration,
    caching_enabled: AtomicBool,
    last_request: Mutex<Option<Instant>>,
    cache: Mutex<Option<TrackedCache>>,
}

impl LlmClient {
    pub fn new(backend: Arc<dyn GenerativeBackend>, config: ClientConfig) -> Self {
        let rate_delay = if config.requests_per_minute > 0 {
            Duration::from_secs_f64(60.0 / config.requests_per_minute as f64)
        } else {
            Duration::ZERO
        };
        let caching_enabled = AtomicBool::new(config.enable_caching);
        Self {
            backend,
            rate_delay,
            caching_enabled,
            config,
            last_request: Mutex::new(None),
            cache: Mutex::new(None),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn caching_enabled(&self) -> bool {
        self.caching_enabled.load(Ordering::Relaxed)
    }

    /// Block until the configured request spacing has elapsed. The lock is
    /// held across the sleep, giving one sequential emission stream per
    /// client instance.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.rate_delay {
                tokio::time::sleep(self.rate_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Generate content. Cache selection:
    /// 1. `force_new_session` uses only the external cache, if any.
    /// 2. An external `cached_content` always wins; `system_instruction`
    ///    and `tools` are dropped (they live inside the cache).
    /// 3. Otherwise a valid internal cache for the target model is
    ///    reused; failing that, one is created from the system
    ///    instruction.
    pub async fn generate(&self, prompt: &str, opts: GenerateOptions) -> Result<Response> {
        let target_model = opts
            .model
            .clone()
            .unwrap_or_else(|| self.config.model.clone());

        let mut cached_content = opts.cached_content.clone();
        let mut system_instruction = opts.system_instruction.clone();
        let mut tools = opts.tools.clone();

        if opts.force_new_session {
            tracing::info!("forcing new session, internal cache bypassed");
        } else if cached_content.is_none() && self.caching_enabled() {
            cached_content = self
                .internal_cache_for(&target_model, system_instruction.as_deref())
                .await;
        }

        if cached_content.is_some() {
            system_instruction = None;
            if tools.take().is_some() {
                tracing::debug!(
                    "ignoring tools: cached content is set and tools must be baked into the cache"
                );
            }
        }

        let request = GenerateRequest {
            model: target_model.clone(),
            prompt: prompt.to_string(),
            system_instruction,
            cached_content,
            temperature: opts.temperature.unwrap_or(0.7),
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: opts.max_output_tokens.unwrap_or(65536),
            tools,
            include_thoughts: self.config.include_thoughts,
        };

        let raw: RawResponse = retry(self.config.retry, classify_provider_error, |_attempt| {
            let request = &request;
            async move {
                self.pace().await;
                tracing::info!(model = %request.model, cached = request.cached_content.is_some(), "calling provider");
                self.backend.generate(request).await
            }
        })
        .await?;

        if raw.cached_tokens > 0 {
            tracing::info!(
                cached_tokens = raw.cached_tokens,
                input_tokens = raw.input_tokens,
                "cache hit"
            );
        }
        if raw.content.is_empty() {
            tracing::warn!(finish_reason = %raw.finish_reason, "empty response from provider");
        }

        Ok(Response {
            content: raw.content,
            input_tokens: raw.input_tokens,
            output_tokens: raw.output_tokens,
            cached_tokens: raw.cached_tokens,
            finish_reason: raw.finish_reason,
            model: target_model,
            thinking_content: raw.thinking_content,
        })
    }

    /// Reuse or create the internal prompt-only cache for `model`.
    async fn internal_cache_for(
        &self,
        model: &str,
        system_instruction: Option<&str>,
    ) -> Option<String> {
        let mut tracked = self.cache.lock().await;
        if let Some(cache) = tracked.as_ref() {
            if cache.valid_for(model) {
                tracing::debug!(cache = %cache.name, "reusing internal cache");
                return Some(cache.name.clone());
            }
            if cache.model != model {
                tracing::info!(
                    old_model = %cache.model,
                    new_model = %model,
                    "model changed, dropping internal cache"
                );
                let stale = tracked.take();
                drop(tracked);
                if let Some(stale) = stale {
                    let _ = self.backend.delete_cache(&stale.name).await;
                }
                tracked = self.cache.lock().await;
            } else {
                // Expired for the same model; recreate below.
                *tracked = None;
            }
        }

        let system_instruction = system_instruction?;
        match self
            .backend
            .create_cache(&CacheSpec {
                model: model.to_string(),
                system_instruction: Some(system_instruction.to_string()),
                contents: Vec::new(),
                ttl_seconds: self.config.cache_ttl.as_secs(),
                display_name: None,
                tools: None,
            })
            .await
        {
            Ok(name) => {
                tracing::info!(cache = %name, %model, "internal cache created");
                *tracked = Some(TrackedCache {
                    name: name.clone(),
                    created_at: Instant::now(),
                    ttl: self.config.cache_ttl,
                    model: model.to_string(),
                });
                Some(name)
            }
            Err(err) => {
                tracing::warn!("failed to create internal cache, disabling caching: {err}");
                self.caching_enabled.store(false, Ordering::Relaxed);
                None
            }
        }
    }

    /// Pre-warm the internal cache before the first chapter.
    pub async fn warm_cache(&self, system_instruction: &str, model: Option<&str>) -> bool {
        if !self.caching_enabled() {
            return false;
        }
        let model = model.unwrap_or(&self.config.model).to_string();
        self.internal_cache_for(&model, Some(system_instruction))
            .await
            .is_some()
    }

    /// Whether the internal cache is currently valid for `model`.
    pub async fn is_cache_valid(&self, model: &str) -> bool {
        self.cache
            .lock()
            .await
            .as_ref()
            .is_some_and(|c| c.valid_for(model))
    }

    /// Create an external cache (the volume cache). Not tracked
    /// internally; the caller owns its lifetime.
    pub async fn create_cache(&self, mut spec: CacheSpec) -> Result<String> {
        if !self.caching_enabled() {
            return Err(ClientError::CachingDisabled);
        }
        if let Some(name) = spec.display_name.take() {
            spec.display_name = sanitize_display_name(&name);
        }
        self.backend.create_cache(&spec).await
    }

    /// Delete a cache by name. Returns false (and logs) on failure.
    pub async fn delete_cache(&self, name: &str) -> bool {
        match self.backend.delete_cache(name).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(cache = %name, "failed to delete cache: {err}");
                false
            }
        }
    }

    /// Drop and delete the internal cache, if any.
    pub async fn clear_cache(&self) {
        let stale = self.cache.lock().await.take();
        if let Some(stale) = stale {
            tracing::info!(cache = %stale.name, "clearing internal cache");
            let _ = self.backend.delete_cache(&stale.name).await;
        }
    }

    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .ok_or_else(|| ClientError::BadResponse("empty embedding batch".into()))
    }

    /// One provider call for the whole batch.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let policy = RetryPolicy {
            max_attempts: 3,
            ..self.config.retry
        };
        retry(policy, classify_provider_error, |_attempt| async {
            self.backend.embed(texts).await
        })
        .await
    }
}

/// Normalize a cache display name to satisfy provider constraints:
/// ASCII letters/digits plus `.`/`-`/`_`, at most 128 bytes. Non-ASCII
/// input gains a deterministic 8-char hash suffix so heavily-normalized
/// names stay traceable; overlong names are truncated with a 10-char
/// suffix.
pub fn sanitize_display_name(display_name: &str) -> Option<String> {
    let raw = display_name.trim();
    if raw.is_empty() {
        return None;
    }
    let has_non_ascii = raw.chars().any(|c| !c.is_ascii());

    let mut normalized = String::with_capacity(raw.len());
    let mut last_was_filler = false;
    for c in raw.chars() {
        let keep = c.is_ascii_alphanumeric() || c == '.' || c == '-';
        if keep {
            normalized.push(c);
            last_was_filler = false;
        } else if !last_was_filler {
            normalized.push('_');
            last_was_filler = true;
        }
    }
    let mut normalized = normalized.trim_matches(['.', '_', '-']).to_string();
    if normalized.is_empty() {
        normalized = "cache".to_string();
    }

    let digest = hex_digest(raw);
    if has_non_ascii {
        let suffix = &digest[..8];
        let candidate = format!("{normalized}-{suffix}");
        normalized = if candidate.len() <= CACHE_DISPLAY_NAME_MAX_BYTES {
            candidate
        } else {
            let head_len = CACHE_DISPLAY_NAME_MAX_BYTES - suffix.len() - 1;
            let head = normalized[..head_len].trim_end_matches(['.', '_', '-']);
            let head = if head.is_empty() { "cache" } else { head };
            format!("{head}-{suffix}")
        };
    }

    if normalized.len() <= CACHE_DISPLAY_NAME_MAX_BYTES {
        return Some(normalized);
    }

    let suffix = &digest[..10];
    let head_len = CACHE_DISPLAY_NAME_MAX_BYTES - suffix.len() - 1;
    let head = normalized[..head_len].trim_end_matches(['.', '_', '-']);
    let head = if head.is_empty() { "cache" } else { head };
    let mut candidate = format!("{head}-{suffix}");
    candidate.truncate(CACHE_DISPLAY_NAME_MAX_BYTES);
    Some(candidate)
}

fn hex_digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct LedgerBackend {
        calls: StdMutex<Vec<String>>,
        request_times: StdMutex<Vec<Instant>>,
    }

    #[async_trait]
    impl GenerativeBackend for LedgerBackend {
        async fn generate(&self, request: &GenerateRequest) -> Result<RawResponse> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("generate:{}", request.model));
            self.request_times.lock().unwrap().push(Instant::now());
            Ok(RawResponse {
                content: "ok".into(),
                finish_reason: "STOP".into(),
                input_tokens: 1,
                output_tokens: 1,
                ..Default::default()
            })
        }

        async fn create_cache(&self, spec: &CacheSpec) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("create_cache:{}", spec.model));
            Ok(format!("cachedContents/{}", spec.model))
        }

        async fn delete_cache(&self, name: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("delete:{name}"));
            Ok(())
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0, 1.0]).collect())
        }
    }

    fn client_with(backend: Arc<LedgerBackend>, config: ClientConfig) -> LlmClient {
        LlmClient::new(backend, config)
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_spaces_consecutive_requests() {
        let backend = Arc::new(LedgerBackend::default());
        let client = client_with(
            backend.clone(),
            ClientConfig {
                requests_per_minute: 30,
                enable_caching: false,
                ..Default::default()
            },
        );
        for _ in 0..3 {
            client
                .generate("hello", GenerateOptions::default())
                .await
                .unwrap();
        }
        let times = backend.request_times.lock().unwrap();
        let min_gap = Duration::from_secs(2) - Duration::from_millis(50);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= min_gap, "requests spaced too closely");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn model_mismatch_invalidates_internal_cache() {
        let backend = Arc::new(LedgerBackend::default());
        let client = client_with(backend.clone(), ClientConfig::default());

        client
            .generate(
                "one",
                GenerateOptions {
                    system_instruction: Some("be literary".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(client.is_cache_valid("gemini-2.5-pro").await);
        assert!(!client.is_cache_valid("gemini-2.5-flash").await);

        client
            .generate(
                "two",
                GenerateOptions {
                    system_instruction: Some("be literary".into()),
                    model: Some("gemini-2.5-flash".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let calls = backend.calls.lock().unwrap();
        assert!(calls.contains(&"create_cache:gemini-2.5-pro".to_string()));
        assert!(calls.contains(&"delete:cachedContents/gemini-2.5-pro".to_string()));
        assert!(calls.contains(&"create_cache:gemini-2.5-flash".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn external_cache_suppresses_system_instruction() {
        let backend = Arc::new(LedgerBackend::default());
        let client = client_with(backend.clone(), ClientConfig::default());
        client
            .generate(
                "prompt",
                GenerateOptions {
                    system_instruction: Some("ignored".into()),
                    cached_content: Some("cachedContents/volume".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        // No internal cache creation when an external cache is supplied.
        let calls = backend.calls.lock().unwrap();
        assert!(!calls.iter().any(|c| c.starts_with("create_cache")));
    }

    #[test]
    fn display_name_ascii_passthrough() {
        assert_eq!(
            sanitize_display_name("my volume cache").as_deref(),
            Some("my_volume_cache")
        );
        assert_eq!(sanitize_display_name("  "), None);
    }

    #[test]
    fn display_name_non_ascii_gets_hash_suffix() {
        let name = sanitize_display_name("魔弾の王と戦姫_full").unwrap();
        assert!(name.is_ascii());
        assert!(name.len() <= 128);
        // Deterministic: same input, same suffix.
        assert_eq!(sanitize_display_name("魔弾の王と戦姫_full").unwrap(), name);
        assert!(name.contains('-'));
    }

    #[test]
    fn display_name_overlong_is_truncated_with_suffix() {
        let long = "a".repeat(300);
        let name = sanitize_display_name(&long).unwrap();
        assert!(name.len() <= 128);
        assert!(name.contains('-'));
    }
}
