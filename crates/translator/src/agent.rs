//! The volume orchestrator.
//!
//! Owns the whole lifecycle: manifest, bible and continuity resolution,
//! prompt loader state, the shared volume cache, the sequential
//! per-chapter loop with resumability and model fallback, continuity
//! snapshots, and finalization. Chapters run strictly one at a time;
//! chapter *i*'s manifest checkpoint is durable before *i+1* starts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;

use honyaku_bible::BibleRegistry;
use honyaku_client::{CacheSpec, ClientConfig, GenerativeBackend, LlmClient};
use honyaku_patterns::PatternStore;
use honyaku_prompt::PromptLoader;
use honyaku_storage::VolumeStorage;
use honyaku_types::{
    ChapterSnapshot, LogEntry, Manifest, Relationship, TargetLanguage, TranslationLog,
    TranslationReport, TranslationStatus, TranslatorStatus,
};

use crate::continuity;
use crate::error::{Result, TranslatorError};
use crate::processor::{ChapterProcessor, ChapterRequest, ProcessorConfig};
use crate::titles;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub target: TargetLanguage,
    pub model: String,
    pub fallback_model: String,
    pub enable_caching: bool,
    pub enable_continuity: bool,
    pub enable_gap_analysis: bool,
    pub enable_multimodal: bool,
    pub save_thinking: bool,
    pub requests_per_minute: u32,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub volume_cache_ttl_seconds: u64,
    /// Inter-chapter pause with an active cache (TPM headroom).
    pub chapter_delay_cached: Duration,
    /// Inter-chapter pause without a cache.
    pub chapter_delay_uncached: Duration,
    /// Root holding the `bibles/` registry.
    pub pipeline_root: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            target: TargetLanguage::En,
            model: "gemini-2.5-pro".to_string(),
            fallback_model: "gemini-2.5-flash".to_string(),
            enable_caching: true,
            enable_continuity: false,
            enable_gap_analysis: false,
            enable_multimodal: false,
            save_thinking: false,
            requests_per_minute: 10,
            temperature: 0.7,
            max_output_tokens: 65536,
            volume_cache_ttl_seconds: 7200,
            chapter_delay_cached: Duration::from_secs(5),
            chapter_delay_uncached: Duration::from_secs(60),
            pipeline_root: PathBuf::from("WORK"),
        }
    }
}

/// Optional RAG stores, opened by the caller (they need an embedder).
#[derive(Default)]
pub struct RagStores {
    pub sino: Option<Arc<PatternStore>>,
    pub patterns: Option<Arc<PatternStore>>,
    /// Bad-prose index, checked against the translated output.
    pub ai_ism: Option<Arc<PatternStore>>,
}

pub struct TranslatorAgent {
    storage: VolumeStorage,
    client: Arc<LlmClient>,
    config: AgentConfig,
    manifest: Manifest,
    loader: Arc<PromptLoader>,
    processor: ChapterProcessor,
    log: TranslationLog,
    volume_cache: Option<String>,
    carried_relationships: Vec<Relationship>,
    snapshots: Vec<ChapterSnapshot>,
    interrupted: Arc<AtomicBool>,
}

impl TranslatorAgent {
    /// Initialization order is load-bearing: manifest → bible →
    /// continuity → prompt loader → client → processor.
    pub async fn new(
        volume_dir: &Path,
        backend: Arc<dyn GenerativeBackend>,
        config: AgentConfig,
        stores: RagStores,
    ) -> Result<Self> {
        let storage = VolumeStorage::new(volume_dir);

        // 1. Manifest, with the structural pre-flight check.
        let manifest = storage.load_manifest().await?;
        manifest.validate()?;
        if manifest.schema_version.starts_with("v3.6") {
            tracing::info!("v3.6 manifest passed structural pre-flight check");
        }
        let librarian_done = manifest
            .pipeline_state
            .librarian
            .as_ref()
            .is_some_and(|l| l.status == "completed");
        if !librarian_done {
            tracing::warn!("librarian phase not marked completed, proceeding anyway");
        }

        // 2. Bible resolution. Failure is non-fatal: standalone volume.
        let mut bible_glossary: BTreeMap<String, String> = BTreeMap::new();
        let mut bible_prompt = String::new();
        let mut world_directive = String::new();
        match BibleRegistry::open(&config.pipeline_root) {
            Ok(mut registry) => {
                if let Some(bible) = registry.resolve(&manifest) {
                    bible_glossary = bible.flat_glossary();
                    bible_prompt = bible.format_for_prompt();
                    world_directive = bible.format_world_setting_directive();
                    tracing::info!(
                        series = bible.series_id(),
                        terms = bible_glossary.len(),
                        "series bible loaded"
                    );
                }
            }
            Err(err) => {
                tracing::warn!("bible registry unavailable (non-fatal): {err}");
            }
        }

        // 3. Continuity pack from the prior volume, if present.
        let continuity_pack = storage.load_continuity_pack().await?;
        let carried_relationships = continuity_pack
            .as_ref()
            .map(|p| p.relationships.clone())
            .unwrap_or_default();

        // 4. Prompt loader state: roster and glossary merges, semantic
        //    metadata, formatted continuity.
        let mut loader = PromptLoader::new(config.target);
        loader.set_genre(manifest.metadata.genre.as_deref());
        if !bible_prompt.is_empty() {
            loader.set_bible_prompt(bible_prompt, world_directive);
        }

        let lang_meta = manifest.language_metadata(config.target);
        let manifest_names = lang_meta
            .map(|m| m.character_names.clone())
            .unwrap_or_default();
        let locked_glossary = lang_meta
            .map(|m| m.locked_glossary.clone())
            .unwrap_or_default();

        let continuity_roster = continuity_pack
            .as_ref()
            .map(|p| p.roster.clone())
            .unwrap_or_default();
        let continuity_glossary = continuity_pack
            .as_ref()
            .map(|p| p.glossary.clone())
            .unwrap_or_default();

        let mut roster = continuity_roster;
        roster.extend(manifest_names);
        loader.set_roster(roster);
        loader.set_glossary(merge_glossary(
            &bible_glossary,
            &continuity_glossary,
            &locked_glossary,
        ));

        if let Some(semantic) = lang_meta.and_then(|m| m.semantic_metadata.clone()) {
            loader.set_semantic_metadata(semantic);
        }
        if let Some(pack) = &continuity_pack {
            loader.set_continuity_text(continuity::format_continuity_for_prompt(pack));
        }
        let loader = Arc::new(loader);

        // 5. Client.
        let client = Arc::new(LlmClient::new(
            backend,
            ClientConfig {
                model: config.model.clone(),
                enable_caching: config.enable_caching,
                requests_per_minute: config.requests_per_minute,
                include_thoughts: config.save_thinking,
                ..Default::default()
            },
        ));

        // Processor, with whatever RAG stores and visual cache exist.
        let mut processor = ChapterProcessor::new(
            client.clone(),
            loader.clone(),
            storage.clone(),
            ProcessorConfig {
                target: config.target,
                genre: manifest.metadata.genre.clone(),
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
                enable_gap_analysis: config.enable_gap_analysis,
                enable_multimodal: config.enable_multimodal,
                save_thinking: config.save_thinking,
            },
        );
        if let Some(sino) = stores.sino {
            processor = processor.with_sino_store(sino);
        }
        if let Some(patterns) = stores.patterns {
            processor = processor.with_pattern_store(patterns);
        }
        if let Some(ai_ism) = stores.ai_ism {
            processor = processor.with_ai_ism_store(ai_ism);
        }
        if config.enable_multimodal {
            match storage.load_visual_cache().await? {
                Some(cache) => {
                    tracing::info!(entries = cache.len(), "visual cache loaded");
                    processor = processor.with_visual_cache(Arc::new(cache));
                }
                None => {
                    tracing::warn!(
                        "multimodal enabled but no visual_cache.json found, continuing text-only"
                    );
                }
            }
        }

        let log = storage.load_log().await?;

        Ok(Self {
            storage,
            client,
            config,
            manifest,
            loader,
            processor,
            log,
            volume_cache: None,
            carried_relationships,
            snapshots: Vec::new(),
            interrupted: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag checked between chapters: the in-flight chapter completes,
    /// state persists, then the loop exits.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Translate the volume (or a chapter selection). Completed chapters
    /// are skipped unless `force`.
    pub async fn translate_volume(
        &mut self,
        selection: Option<&[String]>,
        force: bool,
    ) -> Result<TranslationReport> {
        let target_ids = self.resolve_selection(selection)?;
        let total = target_ids.len();
        tracing::info!(chapters = total, volume = %self.manifest.volume_id, "starting translation run");

        let resolved_titles = titles::resolve_titles(&self.manifest.chapters, self.config.target);

        {
            let state = self.manifest.translator_state_mut();
            state.status = TranslatorStatus::InProgress;
            state.target_language = Some(self.config.target.code().to_string());
            state.started_at = Some(Utc::now());
            state.model = Some(self.config.model.clone());
        }
        self.storage.save_manifest(&self.manifest).await?;

        // Volume cache: system instruction + the whole JP corpus, shared
        // by every chapter request of this run.
        if self.config.enable_caching {
            self.volume_cache = self.create_volume_cache(&target_ids).await;
            if self.volume_cache.is_none() {
                tracing::info!("volume cache unavailable, pre-warming prompt-only cache");
                let instruction = self.loader.build_system_instruction();
                if !self.client.warm_cache(&instruction, None).await {
                    tracing::warn!("cache pre-warm failed, running uncached");
                }
            }
        }

        let mut success_count = 0usize;
        let mut previous_snapshot: Option<ChapterSnapshot> = None;

        for (i, chapter_id) in target_ids.iter().enumerate() {
            let Some(chapter) = self.manifest.chapter(chapter_id) else {
                continue;
            };
            let source_file = chapter.source_file.clone();
            let status = chapter.translation_status;
            let existing_output = chapter
                .output_file_for(self.config.target)
                .map(str::to_string)
                .unwrap_or_else(|| chapter.default_output_file(self.config.target));
            let override_model = chapter.model.clone();
            let title = resolved_titles.get(chapter_id).cloned().flatten();
            let output_path = self.storage.output_path(self.config.target, &existing_output);

            if !force && status == TranslationStatus::Completed && output_path.exists() {
                tracing::info!("Skipping completed chapter {chapter_id}");
                success_count += 1;
                // The finished output still feeds continuity.
                if let Some(snapshot) = self.extract_snapshot(chapter_id, &output_path).await {
                    previous_snapshot = Some(snapshot.clone());
                    self.snapshots.push(snapshot);
                }
                continue;
            }
            if force && let Some(chapter) = self.manifest.chapter_mut(chapter_id) {
                // A schema cache from a pre-force translation is stale.
                chapter.schema_cache = None;
            }

            // The volume cache is model-specific: any override bypasses it.
            let effective_cache = match &override_model {
                Some(model) if model != &self.config.model => {
                    tracing::info!(
                        chapter = %chapter_id,
                        model = %model,
                        "model override, skipping volume cache"
                    );
                    None
                }
                _ => self.volume_cache.clone(),
            };

            tracing::info!(
                "Translating [{}/{}] {} to {}",
                i + 1,
                total,
                chapter_id,
                self.config.target.display_name()
            );

            let request = ChapterRequest {
                chapter_id: chapter_id.clone(),
                source_file: source_file.clone(),
                output_path: output_path.clone(),
                title: title.clone(),
                model: override_model.clone(),
                cached_content: effective_cache,
                previous_context: previous_snapshot.as_ref().map(format_previous_context),
            };
            let mut result = self.processor.translate_chapter(&request).await;

            // Fallback model path: only when no explicit override.
            if !result.success && override_model.is_none() {
                tracing::warn!(
                    chapter = %chapter_id,
                    fallback = %self.config.fallback_model,
                    "translation failed, retrying with fallback model"
                );
                // The internal cache is model-specific; drop it first.
                self.client.clear_cache().await;
                let fallback_request = ChapterRequest {
                    model: Some(self.config.fallback_model.clone()),
                    cached_content: None,
                    ..request
                };
                result = self.processor.translate_chapter(&fallback_request).await;
                if result.success {
                    tracing::info!(chapter = %chapter_id, "fallback model succeeded");
                    if let Some(chapter) = self.manifest.chapter_mut(chapter_id) {
                        chapter.model = Some(self.config.fallback_model.clone());
                    }
                }
            }

            self.log.record(LogEntry {
                chapter_id: chapter_id.clone(),
                input_tokens: result.input_tokens,
                output_tokens: result.output_tokens,
                success: result.success,
                error: result.error.clone(),
                quality: result.audit.clone(),
            });
            self.storage.save_log(&self.log).await?;

            if result.success {
                success_count += 1;
                let output_name = result
                    .output_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or(existing_output);
                if let Some(chapter) = self.manifest.chapter_mut(chapter_id) {
                    chapter.translation_status = TranslationStatus::Completed;
                    chapter.set_output_file(self.config.target, output_name);
                }
                let snapshot = self.extract_snapshot(chapter_id, &result.output_path).await;
                if let Some(snapshot) = snapshot {
                    previous_snapshot = Some(snapshot.clone());
                    self.snapshots.push(snapshot);
                }
                if !result.warnings.is_empty() {
                    tracing::warn!(
                        chapter = %chapter_id,
                        warnings = result.warnings.len(),
                        first = %result.warnings[0],
                        "completed with warnings"
                    );
                }
            } else {
                if let Some(chapter) = self.manifest.chapter_mut(chapter_id) {
                    chapter.translation_status = TranslationStatus::Failed;
                }
                let state = self.manifest.translator_state_mut();
                if !state.failed_chapters.contains(chapter_id) {
                    state.failed_chapters.push(chapter_id.clone());
                }
                tracing::error!(chapter = %chapter_id, error = ?result.error, "chapter failed");
            }

            // Durable checkpoint before the next chapter starts.
            self.storage.save_manifest(&self.manifest).await?;

            if self.interrupted.load(Ordering::Relaxed) {
                tracing::warn!("interrupt requested, stopping after in-flight chapter");
                break;
            }

            if i < total - 1 {
                let delay = if self.volume_cache.is_some() || self.client.caching_enabled() {
                    self.config.chapter_delay_cached
                } else {
                    self.config.chapter_delay_uncached
                };
                if !delay.is_zero() {
                    tracing::info!(seconds = delay.as_secs(), "inter-chapter delay");
                    tokio::time::sleep(delay).await;
                }
            }
        }

        let covered_whole_volume = total == self.manifest.chapters.len();
        self.finalize(success_count, total, covered_whole_volume).await
    }

    fn resolve_selection(&self, selection: Option<&[String]>) -> Result<Vec<String>> {
        match selection {
            None => Ok(self.manifest.chapters.iter().map(|c| c.id.clone()).collect()),
            Some(ids) => {
                let mut resolved = Vec::with_capacity(ids.len());
                for id in ids {
                    if self.manifest.chapter(id).is_none() {
                        return Err(TranslatorError::InvalidVolume(format!(
                            "unknown chapter id: {id}"
                        )));
                    }
                    resolved.push(id.clone());
                }
                Ok(resolved)
            }
        }
    }

    /// Create the shared volume cache: system instruction plus every
    /// target chapter's JP text in `<CHAPTER>` wrappers.
    async fn create_volume_cache(&self, target_ids: &[String]) -> Option<String> {
        let mut blocks: Vec<String> = Vec::new();
        let mut missing: Vec<String> = Vec::new();
        for chapter_id in target_ids {
            let Some(chapter) = self.manifest.chapter(chapter_id) else { continue };
            match self.storage.read_source(&chapter.source_file).await {
                Ok(jp_text) => {
                    let canonical = titles::canonical_title_from_id(chapter_id)
                        .unwrap_or_else(|| chapter_id.clone());
                    blocks.push(format!(
                        "<CHAPTER id='{id}' canonical_title='{canonical}' source_file='{file}'>\n\
                         <!-- TARGET_CHAPTER: {id} | {canonical} -->\n\
                         {jp_text}\n\
                         </CHAPTER>",
                        id = chapter_id,
                        file = chapter.source_file,
                    ));
                }
                Err(err) => {
                    tracing::warn!(chapter = %chapter_id, "source missing from cache payload: {err}");
                    missing.push(chapter_id.clone());
                }
            }
        }
        if blocks.is_empty() {
            tracing::warn!("volume cache skipped: no JP chapter text available");
            return None;
        }

        let full_volume_text = blocks.join("\n\n---\n\n");
        let system_instruction = self.loader.build_system_instruction();
        let spec = CacheSpec {
            model: self.config.model.clone(),
            system_instruction: Some(system_instruction),
            contents: vec![full_volume_text.clone()],
            ttl_seconds: self.config.volume_cache_ttl_seconds,
            display_name: Some(format!("{}_full", self.manifest.volume_id)),
            tools: None,
        };
        match self.client.create_cache(spec).await {
            Ok(name) => {
                tracing::info!(
                    cache = %name,
                    chapters = blocks.len(),
                    chars = full_volume_text.len(),
                    missing = missing.len(),
                    "volume cache created"
                );
                Some(name)
            }
            Err(err) => {
                tracing::warn!("failed to create volume cache: {err}");
                None
            }
        }
    }

    async fn extract_snapshot(
        &self,
        chapter_id: &str,
        output_path: &Path,
    ) -> Option<ChapterSnapshot> {
        let translation = match tokio::fs::read_to_string(output_path).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(chapter = %chapter_id, "cannot read output for snapshot: {err}");
                return None;
            }
        };
        Some(continuity::extract_snapshot(
            chapter_id,
            &translation,
            self.loader.roster(),
            self.loader.glossary(),
            Vec::new(),
        ))
    }

    async fn finalize(
        &mut self,
        success_count: usize,
        total: usize,
        covered_whole_volume: bool,
    ) -> Result<TranslationReport> {
        let all_succeeded = success_count == total;
        {
            let state = self.manifest.translator_state_mut();
            state.status = if all_succeeded {
                TranslatorStatus::Completed
            } else {
                TranslatorStatus::Partial
            };
            state.completed_at = Some(Utc::now());
            if all_succeeded {
                state.failed_chapters.clear();
            }
        }

        if all_succeeded {
            tracing::info!("volume translation completed");
            // A chapter-selection rerun must not clobber the pack built
            // from the full volume.
            if covered_whole_volume {
                let pack = continuity::finalize_pack(
                    std::mem::take(&mut self.snapshots),
                    std::mem::take(&mut self.carried_relationships),
                );
                if let Err(err) = self.storage.save_continuity_pack(&pack).await {
                    tracing::warn!("failed to save continuity pack: {err}");
                } else {
                    tracing::info!(
                        snapshots = pack.chapter_snapshots.len(),
                        names = pack.roster.len(),
                        "continuity pack saved"
                    );
                }
            }
        } else {
            tracing::warn!(success_count, total, "volume translation partial");
        }

        // The volume cache dies with the run, success or not.
        if let Some(name) = self.volume_cache.take() {
            tracing::info!(cache = %name, "deleting volume cache");
            self.client.delete_cache(&name).await;
        }
        self.client.clear_cache().await;

        self.storage.save_manifest(&self.manifest).await?;
        Ok(TranslationReport::from_log(&self.log))
    }
}

/// The glossary layering law: bible ⊕ continuity ⊕ locked, later wins.
pub fn merge_glossary(
    bible: &BTreeMap<String, String>,
    continuity: &BTreeMap<String, String>,
    locked: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = bible.clone();
    merged.extend(continuity.clone());
    merged.extend(locked.clone());
    merged
}

fn format_previous_context(snapshot: &ChapterSnapshot) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !snapshot.roster.is_empty() {
        let names: Vec<&str> = snapshot
            .roster
            .values()
            .map(String::as_str)
            .take(12)
            .collect();
        parts.push(format!("Characters on stage: {}", names.join(", ")));
    }
    if !snapshot.narrative_flags.is_empty() {
        parts.push(format!("Open threads: {}", snapshot.narrative_flags.join("; ")));
    }
    if parts.is_empty() {
        format!("Previous chapter {} completed.", snapshot.chapter_id)
    } else {
        parts.join("\n")
    }
}
