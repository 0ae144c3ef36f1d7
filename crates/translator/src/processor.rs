//! Per-chapter translation.
//!
//! One call in, one Markdown file out. Every failure path returns a
//! structured [`TranslationResult`] with `success = false`; the
//! orchestrator decides about fallback models and retries.

use std::path::PathBuf;
use std::sync::Arc;

use regex::Regex;

use honyaku_client::{GenerateOptions, LlmClient};
use honyaku_patterns::{
    BulkGuidance, GuidanceQuery, PatternStore, detect_patterns, detect_prose_flags,
    extract_unique_compounds,
};
use honyaku_prompt::{PromptLoader, UserPromptArgs, VisualGuidance, visual};
use honyaku_storage::VolumeStorage;
use honyaku_types::{TargetLanguage, TranslationResult, VisualCache};

use crate::{audit, cjk, dialect, gap, leak, scene_breaks};

const KANJI_TOP_N: usize = 30;
const GRAMMAR_TOP_N: usize = 15;
const SINO_MIN_CONFIDENCE: f32 = 0.68;
const EN_MIN_CONFIDENCE: f32 = 0.75;
const VN_MIN_CONFIDENCE: f32 = 0.70;
const MAX_MATCHES_PER_QUERY: usize = 2;
const AI_ISM_MAX_FLAGS: usize = 20;
const AI_ISM_MIN_CONFIDENCE: f32 = 0.70;

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub target: TargetLanguage,
    pub genre: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub enable_gap_analysis: bool,
    pub enable_multimodal: bool,
    pub save_thinking: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            target: TargetLanguage::En,
            genre: None,
            temperature: 0.7,
            max_output_tokens: 65536,
            enable_gap_analysis: false,
            enable_multimodal: false,
            save_thinking: false,
        }
    }
}

/// One chapter's work order from the orchestrator.
#[derive(Debug, Clone)]
pub struct ChapterRequest {
    pub chapter_id: String,
    pub source_file: String,
    pub output_path: PathBuf,
    pub title: Option<String>,
    /// Per-chapter model override (or fallback model on retry).
    pub model: Option<String>,
    /// The volume cache name, when usable for this chapter's model.
    pub cached_content: Option<String>,
    pub previous_context: Option<String>,
}

pub struct ChapterProcessor {
    client: Arc<LlmClient>,
    loader: Arc<PromptLoader>,
    storage: VolumeStorage,
    config: ProcessorConfig,
    sino_store: Option<Arc<PatternStore>>,
    pattern_store: Option<Arc<PatternStore>>,
    ai_ism_store: Option<Arc<PatternStore>>,
    visual_cache: Option<Arc<VisualCache>>,
}

impl ChapterProcessor {
    pub fn new(
        client: Arc<LlmClient>,
        loader: Arc<PromptLoader>,
        storage: VolumeStorage,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            client,
            loader,
            storage,
            config,
            sino_store: None,
            pattern_store: None,
            ai_ism_store: None,
            visual_cache: None,
        }
    }

    /// Attach the Sino-Vietnamese disambiguation store (vi targets).
    pub fn with_sino_store(mut self, store: Arc<PatternStore>) -> Self {
        self.sino_store = Some(store);
        self
    }

    /// Attach the grammar pattern store for the target language.
    pub fn with_pattern_store(mut self, store: Arc<PatternStore>) -> Self {
        self.pattern_store = Some(store);
        self
    }

    /// Attach the AI-ism bad-prose index, checked against output.
    pub fn with_ai_ism_store(mut self, store: Arc<PatternStore>) -> Self {
        self.ai_ism_store = Some(store);
        self
    }

    pub fn with_visual_cache(mut self, cache: Arc<VisualCache>) -> Self {
        self.visual_cache = Some(cache);
        self
    }

    /// Translate one chapter end to end.
    pub async fn translate_chapter(&self, req: &ChapterRequest) -> TranslationResult {
        let chapter_id = req.chapter_id.as_str();

        // 1. Load source and strip the JP H1 title (kept for audit only).
        let source_text = match self.storage.read_source(&req.source_file).await {
            Ok(text) => text,
            Err(err) => return TranslationResult::failure(req.output_path.clone(), err.to_string()),
        };
        let (jp_title, body) = strip_h1_title(&source_text);
        if let Some(title) = jp_title {
            tracing::debug!(chapter = chapter_id, title, "stripped JP title");
        }

        // 2. Gap detection (optional, never fatal).
        let gap_guidance = if self.config.enable_gap_analysis {
            let flags = gap::detect_gaps(body);
            if !flags.is_empty() {
                tracing::info!(chapter = chapter_id, gaps = flags.total(), "semantic gaps detected");
            }
            gap::format_gap_guidance(&flags)
        } else {
            None
        };

        // 3. Dialect detection.
        let dialect_guidance = dialect::detect_dialects(body);
        if dialect_guidance.is_some() {
            tracing::info!(chapter = chapter_id, "regional dialect detected");
        }

        // 4. RAG lookups, target-conditional.
        let context_hint = leading_context(body);
        let sino_guidance = if self.config.target.is_vietnamese() {
            self.sino_lookup(chapter_id, body, &context_hint).await
        } else {
            None
        };
        let pattern_guidance = self.grammar_lookup(chapter_id, body, &context_hint).await;

        // 5. Visual context with canon-name enforcement.
        let visual_guidance = self.visual_guidance(chapter_id, body);

        // 6. System instruction unless a cache carries it already.
        let model = req.model.clone();
        let cache_is_valid = match &model {
            Some(m) => self.client.is_cache_valid(m).await,
            None => self.client.is_cache_valid(self.client.model()).await,
        };
        let system_instruction = if req.cached_content.is_some() || cache_is_valid {
            None
        } else {
            Some(self.loader.build_system_instruction())
        };

        // 7. Assemble prompt and call the model.
        let user_prompt = self.loader.build_user_prompt(&UserPromptArgs {
            chapter_id,
            chapter_title: req.title.as_deref(),
            source_text: body,
            previous_context: req.previous_context.as_deref(),
            sino_guidance: sino_guidance.as_ref(),
            gap_guidance: gap_guidance.as_deref(),
            dialect_guidance: dialect_guidance.as_deref(),
            pattern_guidance: pattern_guidance.as_ref(),
            visual_guidance: visual_guidance.as_ref(),
        });

        let response = match self
            .client
            .generate(
                &user_prompt,
                GenerateOptions {
                    system_instruction,
                    temperature: Some(self.config.temperature),
                    max_output_tokens: Some(self.config.max_output_tokens),
                    model: model.clone(),
                    cached_content: req.cached_content.clone(),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(response) => response,
            Err(err) => return TranslationResult::failure(req.output_path.clone(), err.to_string()),
        };

        if let Some(thinking) = &response.thinking_content
            && self.config.save_thinking
            && let Err(err) = self.storage.write_thinking(chapter_id, thinking).await
        {
            tracing::warn!(chapter = chapter_id, "failed to save thinking transcript: {err}");
        }

        if response.content.is_empty() {
            return TranslationResult {
                success: false,
                output_path: req.output_path.clone(),
                input_tokens: response.input_tokens,
                output_tokens: response.output_tokens,
                audit: None,
                warnings: Vec::new(),
                error: Some(format!(
                    "provider returned empty content (finish_reason: {})",
                    response.finish_reason
                )),
            };
        }

        let mut warnings: Vec<String> = Vec::new();

        // 8. Post-checks on the raw output.
        if visual_guidance.is_some() {
            let issues = leak::detect_analysis_leak(&response.content);
            if !issues.is_empty() {
                tracing::warn!(chapter = chapter_id, count = issues.len(), "analysis leak suspected");
                warnings.extend(issues);
            }
        }

        // 9-10. Clean, title, scene breaks.
        let mut final_content = clean_output(&response.content);
        if let Some(title) = &req.title {
            final_content = format!("# {title}\n\n{final_content}");
        }
        let (mut final_content, break_count) = scene_breaks::format_scene_breaks(&final_content);
        if break_count > 0 {
            tracing::info!(chapter = chapter_id, breaks = break_count, "scene breaks formatted");
        }

        // Canon spot check: spoilers from the visual layer must not
        // appear ahead of the source.
        if let Some(vg) = &visual_guidance {
            for phrase in &vg.do_not_reveal {
                if final_content.contains(phrase.as_str()) {
                    warnings.push(format!("spoiler phrase surfaced ahead of source: \"{phrase}\""));
                }
            }
        }

        // AI-ism check: cue-prescreened output sentences scored against
        // the bad-prose index. Flags are warnings, never fatal.
        warnings.extend(self.ai_ism_check(chapter_id, &final_content).await);

        // 12. Target-specific CJK scrub (Vietnamese only).
        if self.config.target.is_vietnamese() {
            let (scrubbed, report) = cjk::scrub(&final_content);
            if report.substitutions > 0 {
                tracing::info!(
                    chapter = chapter_id,
                    substitutions = report.substitutions,
                    "CJK hard substitutions applied"
                );
                final_content = scrubbed;
            }
            if report.remaining_leaks > 0 {
                tracing::warn!(
                    chapter = chapter_id,
                    leaks = report.remaining_leaks,
                    "CJK leaks remain, manual review needed"
                );
                warnings.push(format!("{} CJK leak(s) remain", report.remaining_leaks));
            }
        }

        // 11. Write output atomically.
        if let Err(err) = self.storage.write_output(&req.output_path, &final_content).await {
            return TranslationResult::failure(req.output_path.clone(), err.to_string());
        }

        // 13. Audit.
        let audit_report = audit::quick_audit(&final_content, &source_text);
        warnings.extend(audit_report.warnings.clone());

        TranslationResult {
            success: true,
            output_path: req.output_path.clone(),
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            audit: Some(audit_report),
            warnings,
            error: None,
        }
    }

    async fn sino_lookup(
        &self,
        chapter_id: &str,
        body: &str,
        context_hint: &str,
    ) -> Option<BulkGuidance> {
        let store = self.sino_store.as_ref()?;
        let terms = extract_unique_compounds(body, 2, 4, KANJI_TOP_N);
        if terms.is_empty() {
            return None;
        }
        let queries: Vec<GuidanceQuery> = terms
            .into_iter()
            .map(|term| GuidanceQuery {
                term,
                category: None,
                context: String::new(),
            })
            .collect();
        match store
            .get_bulk_guidance(
                &queries,
                self.config.genre.as_deref(),
                Some(context_hint),
                SINO_MIN_CONFIDENCE,
                MAX_MATCHES_PER_QUERY,
            )
            .await
        {
            Ok(guidance) => {
                tracing::info!(
                    chapter = chapter_id,
                    high = guidance.stats.high_confidence,
                    medium = guidance.stats.medium_confidence,
                    direct = guidance.stats.direct_hits,
                    "Sino-Vietnamese guidance"
                );
                Some(guidance)
            }
            Err(err) => {
                tracing::warn!(chapter = chapter_id, "Sino-Vietnamese lookup failed: {err}");
                None
            }
        }
    }

    async fn grammar_lookup(
        &self,
        chapter_id: &str,
        body: &str,
        context_hint: &str,
    ) -> Option<BulkGuidance> {
        let store = self.pattern_store.as_ref()?;
        let detected = detect_patterns(body, GRAMMAR_TOP_N);
        if detected.is_empty() {
            return None;
        }
        let queries: Vec<GuidanceQuery> = detected
            .into_iter()
            .map(|pattern| GuidanceQuery {
                term: pattern.indicator,
                category: Some(pattern.category),
                context: pattern.context,
            })
            .collect();
        let min_confidence = if self.config.target.is_vietnamese() {
            VN_MIN_CONFIDENCE
        } else {
            EN_MIN_CONFIDENCE
        };
        match store
            .get_bulk_guidance(
                &queries,
                self.config.genre.as_deref(),
                Some(context_hint),
                min_confidence,
                MAX_MATCHES_PER_QUERY,
            )
            .await
        {
            Ok(guidance) => {
                tracing::info!(
                    chapter = chapter_id,
                    high = guidance.stats.high_confidence,
                    medium = guidance.stats.medium_confidence,
                    "grammar pattern guidance"
                );
                Some(guidance)
            }
            Err(err) => {
                tracing::warn!(chapter = chapter_id, "grammar pattern lookup failed: {err}");
                None
            }
        }
    }

    /// Run the translated output through the AI-ism bad-prose index.
    /// Matches at or above the store's inject threshold become warnings
    /// carrying the offending sentence and the fix guidance; weaker
    /// matches land in the store's uncertain-match log only.
    async fn ai_ism_check(&self, chapter_id: &str, output: &str) -> Vec<String> {
        let Some(store) = self.ai_ism_store.as_ref() else {
            return Vec::new();
        };
        let flags = detect_prose_flags(output, AI_ISM_MAX_FLAGS);
        if flags.is_empty() {
            return Vec::new();
        }
        let queries: Vec<GuidanceQuery> = flags
            .into_iter()
            .map(|flag| GuidanceQuery {
                term: flag.sentence,
                category: Some(flag.category),
                context: String::new(),
            })
            .collect();
        match store
            .get_bulk_guidance(&queries, None, None, AI_ISM_MIN_CONFIDENCE, 1)
            .await
        {
            Ok(guidance) => {
                if guidance.stats.high_confidence > 0 {
                    tracing::warn!(
                        chapter = chapter_id,
                        flagged = guidance.stats.high_confidence,
                        logged = guidance.stats.medium_confidence,
                        "AI-ism prose flagged"
                    );
                }
                guidance
                    .high_confidence
                    .into_iter()
                    .map(|hit| {
                        let sentence: String = hit.queried_term.chars().take(60).collect();
                        if hit.metadata.target.is_empty() {
                            format!("AI-ism ({}): \"{sentence}\"", hit.metadata.category)
                        } else {
                            format!(
                                "AI-ism ({}): \"{sentence}\" — prefer: {}",
                                hit.metadata.category, hit.metadata.target
                            )
                        }
                    })
                    .collect()
            }
            Err(err) => {
                tracing::warn!(chapter = chapter_id, "AI-ism check failed: {err}");
                Vec::new()
            }
        }
    }

    fn visual_guidance(&self, chapter_id: &str, body: &str) -> Option<VisualGuidance> {
        if !self.config.enable_multimodal {
            return None;
        }
        let cache = self.visual_cache.as_ref()?;
        let ids = visual::extract_illustration_ids(body);
        if ids.is_empty() {
            return None;
        }
        let guidance = visual::build_chapter_visual_guidance(&ids, cache, self.loader.glossary());
        match &guidance {
            Some(g) => tracing::info!(
                chapter = chapter_id,
                illustrations = g.illustration_ids.len(),
                "visual context injected"
            ),
            None => tracing::debug!(
                chapter = chapter_id,
                "illustration markers present but no cached analysis"
            ),
        }
        guidance
    }
}

/// Split off a leading `# Title` line. The title is preserved for audit;
/// the body goes to the model.
fn strip_h1_title(source: &str) -> (Option<&str>, &str) {
    let trimmed = source.trim_start_matches('\u{feff}').trim_start();
    if let Some(rest) = trimmed.strip_prefix("# ") {
        if let Some(newline) = rest.find('\n') {
            let title = rest[..newline].trim();
            let body = rest[newline..].trim_start_matches(['\n', '\r']);
            return (Some(title), body);
        }
        return (Some(rest.trim()), "");
    }
    (None, trimmed)
}

/// First sentences of the chapter, used as the RAG context hint.
fn leading_context(body: &str) -> String {
    let sentences: Vec<&str> = body
        .split(['。', '！', '？', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(3)
        .collect();
    sentences.join("。")
}

/// Strip a model's wrapping code fence, if the whole output is fenced.
fn clean_output(text: &str) -> String {
    static FENCE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = FENCE.get_or_init(|| {
        Regex::new(r"(?s)^```(?:markdown)?\s*(.*?)\s*```$").expect("fence regex compiles")
    });
    let trimmed = text.trim();
    match re.captures(trimmed) {
        Some(captures) => captures[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}
