//! The pattern store: persistent embedding index + guidance queries.
//!
//! Construction loads (or rebuilds) a JSON-persisted index of embedded
//! pattern units. Queries are served from memory: exact JP strings hit
//! the direct-lookup map at confidence 1.0 with no embedding call;
//! everything else goes through one batched embedding call and a cosine
//! scan with category filters, genre re-scoring, and the negative-anchor
//! penalty.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::error::{PatternError, Result};
use crate::kind::{NEGATIVE_ANCHOR_PENALTY, NEGATIVE_ANCHOR_THRESHOLD, KindConfig, StoreKind};
use crate::math;
use crate::pinyin;
use crate::rag::RagSource;

const EMBED_BATCH_SIZE: usize = 100;
const UNCERTAIN_LOG_CAP: usize = 1000;
const UNCERTAIN_LOG_KEEP: usize = 500;
const GENRE_MISMATCH_FACTOR: f32 = 0.85;

/// Narrow embedding seam; implemented over the LLM client in production
/// and by deterministic stubs in tests.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PatternMetadata {
    pub category: String,
    pub pattern_id_base: String,
    /// JP or ZH source text of the indexed example.
    pub source: String,
    /// Natural target-language rendering.
    pub target: String,
    #[serde(default)]
    pub structure: String,
    #[serde(default)]
    pub indicators: Vec<String>,
    /// Target-language pattern template ("X is one thing, but Y...").
    #[serde(default)]
    pub target_pattern: String,
    #[serde(default)]
    pub register: String,
    pub priority: u8,
    #[serde(default)]
    pub genre_context: String,
    #[serde(default)]
    pub usage_rules: Vec<String>,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub avoid: Vec<String>,
    #[serde(default)]
    pub sino_vietnamese: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedPattern {
    pub pattern_id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: PatternMetadata,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct PersistedIndex {
    built_at: Option<DateTime<Utc>>,
    embedding_dim: usize,
    entries: Vec<IndexedPattern>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub category: Option<String>,
    pub register: Option<String>,
    pub min_priority: Option<u8>,
    pub sino_only: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SearchMatch {
    pub pattern_id: String,
    pub similarity: f32,
    pub document: String,
    pub metadata: PatternMetadata,
}

/// One guidance lookup: a term or detected indicator plus local context.
#[derive(Debug, Clone, Default)]
pub struct GuidanceQuery {
    pub term: String,
    pub category: Option<String>,
    pub context: String,
}

#[derive(Debug, Clone)]
pub struct GuidanceMatch {
    pub pattern_id: String,
    pub similarity: f32,
    pub raw_similarity: f32,
    pub neg_penalty: f32,
    pub queried_term: String,
    pub metadata: PatternMetadata,
    /// Served from the direct-lookup map, no embedding involved.
    pub direct: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LookupStats {
    pub queried: usize,
    pub direct_hits: usize,
    pub vector_hits: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub neg_penalties_applied: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BulkGuidance {
    pub high_confidence: Vec<GuidanceMatch>,
    pub medium_confidence: Vec<GuidanceMatch>,
    pub stats: LookupStats,
}

#[derive(Debug, Clone)]
struct UncertainMatch {
    term: String,
    pattern_id: String,
    similarity: f32,
}

pub struct PatternStore {
    kind: StoreKind,
    config: KindConfig,
    index_path: PathBuf,
    rag: Option<RagSource>,
    entries: Vec<IndexedPattern>,
    embedder: Arc<dyn Embedder>,
    direct: HashMap<String, GuidanceMatch>,
    negatives: OnceCell<HashMap<String, Vec<Vec<f32>>>>,
    uncertain: std::sync::Mutex<Vec<UncertainMatch>>,
}

impl PatternStore {
    /// Open a store, auto-rebuilding the index when it is empty and the
    /// RAG source exists (first run, or an embedding-dimension change
    /// deleted the index). A rebuild failure leaves an empty store:
    /// guidance is unavailable but the run continues.
    pub async fn open(
        kind: StoreKind,
        store_dir: &Path,
        rag_path: &Path,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        std::fs::create_dir_all(store_dir).map_err(|source| PatternError::Io {
            path: store_dir.display().to_string(),
            source,
        })?;
        let index_path = store_dir.join(kind.index_file_name());
        let entries = load_index(&index_path);
        let rag = match RagSource::load(rag_path) {
            Ok(source) => Some(source),
            Err(PatternError::RagSourceNotFound { .. }) => None,
            Err(err) => {
                tracing::warn!(store = kind.label(), "failed to load RAG source: {err}");
                None
            }
        };

        let mut store = Self {
            config: kind.config(),
            kind,
            index_path,
            rag,
            entries,
            embedder,
            direct: HashMap::new(),
            negatives: OnceCell::new(),
            uncertain: std::sync::Mutex::new(Vec::new()),
        };

        if store.entries.is_empty() && store.rag.is_some() {
            tracing::warn!(
                store = kind.label(),
                "vector index is empty, auto-rebuilding from RAG source"
            );
            match store.build_index(false).await {
                Ok(counts) => {
                    let total: usize = counts.values().sum();
                    tracing::info!(
                        store = kind.label(),
                        patterns = total,
                        categories = counts.len(),
                        "auto-rebuild complete"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        store = kind.label(),
                        "auto-rebuild failed, guidance unavailable this session: {err}"
                    );
                }
            }
        } else if !store.entries.is_empty() {
            tracing::info!(
                store = kind.label(),
                patterns = store.entries.len(),
                "vector index loaded"
            );
        }

        store.direct = store.build_direct_lookup();
        Ok(store)
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (Re)build the index from the RAG source. Returns indexed counts
    /// per category.
    pub async fn build_index(
        &mut self,
        force_rebuild: bool,
    ) -> Result<std::collections::BTreeMap<String, usize>> {
        if force_rebuild {
            tracing::warn!(store = self.kind.label(), "force rebuild, clearing index");
            self.entries.clear();
        }
        let Some(rag) = self.rag.clone() else {
            return Err(PatternError::RagSourceNotFound {
                path: "(no RAG source configured)".to_string(),
            });
        };

        let mut drafts: Vec<(String, IndexedPattern)> = Vec::new();
        let mut counts = std::collections::BTreeMap::new();

        for (category_name, category) in rag.categories() {
            let mut category_count = 0usize;
            for pattern in &category.patterns {
                let id_base = pattern.id_base();
                let priority = self.kind.priority_for(&category_name);

                // Context-nested layout (Sino-Vietnamese style).
                for (ctx_idx, context) in pattern.contexts.iter().enumerate() {
                    for (ex_idx, example) in context.examples.iter().enumerate() {
                        let Some(source) = example.source_text() else { continue };
                        let Some(target) = example.target_text() else { continue };
                        let pattern_id = format!("{id_base}_ctx{ctx_idx}_ex{ex_idx}");
                        let metadata = PatternMetadata {
                            category: category_name.clone(),
                            pattern_id_base: id_base.clone(),
                            source: source.to_string(),
                            target: target.to_string(),
                            structure: pattern.japanese_structure.clone().unwrap_or_default(),
                            indicators: if context.zh_indicators.is_empty() {
                                pattern.japanese_indicators.clone()
                            } else {
                                context.zh_indicators.clone()
                            },
                            target_pattern: pattern.target_pattern().unwrap_or_default().to_string(),
                            register: context
                                .register
                                .clone()
                                .or_else(|| pattern.register.clone())
                                .unwrap_or_else(|| "neutral".to_string()),
                            priority,
                            genre_context: example.context.clone().unwrap_or_default(),
                            usage_rules: pattern.usage_rules.clone(),
                            meaning: context.meaning.clone().unwrap_or_default(),
                            avoid: context.avoid.clone(),
                            sino_vietnamese: pattern.sino_vietnamese.unwrap_or(false),
                        };
                        let document = self.index_text(&metadata);
                        drafts.push((
                            document.clone(),
                            IndexedPattern {
                                pattern_id,
                                embedding: Vec::new(),
                                document,
                                metadata,
                            },
                        ));
                        category_count += 1;
                    }
                }

                // Flat example layout (grammar style).
                for (ex_idx, example) in pattern.examples.iter().enumerate() {
                    let Some(source) = example.source_text() else { continue };
                    let Some(target) = example.target_text() else { continue };
                    let pattern_id = format!("{id_base}_ex{ex_idx}");
                    let metadata = PatternMetadata {
                        category: category_name.clone(),
                        pattern_id_base: id_base.clone(),
                        source: source.to_string(),
                        target: target.to_string(),
                        structure: pattern.japanese_structure.clone().unwrap_or_default(),
                        indicators: pattern.japanese_indicators.clone(),
                        target_pattern: pattern.target_pattern().unwrap_or_default().to_string(),
                        register: pattern
                            .register
                            .clone()
                            .unwrap_or_else(|| "neutral".to_string()),
                        priority,
                        genre_context: example.context.clone().unwrap_or_default(),
                        usage_rules: pattern.usage_rules.clone(),
                        meaning: String::new(),
                        avoid: example
                            .vn_wrong
                            .clone()
                            .or_else(|| example.literal.clone())
                            .map(|s| vec![s])
                            .unwrap_or_default(),
                        sino_vietnamese: pattern.sino_vietnamese.unwrap_or(false),
                    };
                    let document = self.index_text(&metadata);
                    drafts.push((
                        document.clone(),
                        IndexedPattern {
                            pattern_id,
                            embedding: Vec::new(),
                            document,
                            metadata,
                        },
                    ));
                    category_count += 1;
                }
            }
            if category_count > 0 {
                counts.insert(category_name, category_count);
            }
        }

        let texts: Vec<String> = drafts.iter().map(|(text, _)| text.clone()).collect();
        let embeddings = self.embed_all(&texts).await?;

        self.entries = drafts
            .into_iter()
            .zip(embeddings)
            .map(|((_, mut entry), mut embedding)| {
                math::normalize(&mut embedding);
                entry.embedding = embedding;
                entry
            })
            .collect();

        self.save_index()?;
        Ok(counts)
    }

    /// Indexed text: structured concatenation of the pattern unit. Short
    /// Chinese sources additionally carry a pinyin hint so the embedding
    /// model can tell trivially-similar strings apart. AI-ism entries
    /// index the offending sentence alone, so output sentences score
    /// directly against it.
    fn index_text(&self, metadata: &PatternMetadata) -> String {
        if self.kind == StoreKind::AiIsm {
            return metadata.source.clone();
        }
        let mut parts = Vec::new();
        if !metadata.structure.is_empty() {
            parts.push(format!("Structure: {}", metadata.structure));
        }
        if !metadata.indicators.is_empty() {
            parts.push(format!("Indicators: {}", metadata.indicators.join(", ")));
        }
        let source = if self.kind == StoreKind::SinoVietnamese {
            pinyin::enhance_query(&metadata.source)
        } else {
            metadata.source.clone()
        };
        parts.push(format!("Example: {source}"));
        if !metadata.target.is_empty() {
            parts.push(format!("Natural: {}", metadata.target));
        }
        parts.join(" | ")
    }

    /// Batch embed with a sequential fallback when a whole batch fails.
    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut result = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(EMBED_BATCH_SIZE) {
            match self.embedder.embed_batch(chunk).await {
                Ok(vectors) => {
                    if vectors.len() != chunk.len() {
                        return Err(PatternError::EmbeddingMismatch {
                            sent: chunk.len(),
                            received: vectors.len(),
                        });
                    }
                    result.extend(vectors);
                }
                Err(err) if chunk.len() > 1 => {
                    tracing::warn!(
                        store = self.kind.label(),
                        "batch embedding failed, falling back to sequential: {err}"
                    );
                    for text in chunk {
                        let mut single = self
                            .embedder
                            .embed_batch(std::slice::from_ref(text))
                            .await?;
                        result.push(single.pop().ok_or(PatternError::EmbeddingMismatch {
                            sent: 1,
                            received: 0,
                        })?);
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Ok(result)
    }

    fn save_index(&self) -> Result<()> {
        let persisted = PersistedIndex {
            built_at: Some(Utc::now()),
            embedding_dim: self
                .entries
                .first()
                .map(|e| e.embedding.len())
                .unwrap_or(0),
            entries: self.entries.clone(),
        };
        let tmp = self.index_path.with_extension("json.tmp");
        let io_err = |source| PatternError::Io {
            path: self.index_path.display().to_string(),
            source,
        };
        let text = serde_json::to_string(&persisted).map_err(|source| PatternError::Parse {
            path: self.index_path.display().to_string(),
            source,
        })?;
        std::fs::write(&tmp, text).map_err(io_err)?;
        std::fs::rename(&tmp, &self.index_path).map_err(io_err)?;
        Ok(())
    }

    /// Exact-JP lookup map: term -> best entry, served at confidence 1.0.
    fn build_direct_lookup(&self) -> HashMap<String, GuidanceMatch> {
        let Some(rag) = &self.rag else {
            return HashMap::new();
        };
        let mut map = HashMap::new();
        for (category_name, category) in rag.categories() {
            for pattern in &category.patterns {
                let Some(hanzi) = pattern.hanzi.clone() else { continue };
                if map.contains_key(&hanzi) {
                    continue;
                }
                // Best entry: first context's first example, or first flat example.
                let (target, meaning, avoid) = if let Some(context) = pattern.contexts.first() {
                    (
                        context
                            .examples
                            .first()
                            .and_then(|e| e.target_text())
                            .unwrap_or_default()
                            .to_string(),
                        context.meaning.clone().unwrap_or_default(),
                        context.avoid.clone(),
                    )
                } else if let Some(example) = pattern.examples.first() {
                    (
                        example.target_text().unwrap_or_default().to_string(),
                        String::new(),
                        Vec::new(),
                    )
                } else {
                    continue;
                };
                if target.is_empty() {
                    continue;
                }
                let metadata = PatternMetadata {
                    category: category_name.clone(),
                    pattern_id_base: pattern.id_base(),
                    source: hanzi.clone(),
                    target,
                    priority: self.kind.priority_for(&category_name),
                    register: pattern
                        .register
                        .clone()
                        .unwrap_or_else(|| "neutral".to_string()),
                    meaning,
                    avoid,
                    sino_vietnamese: pattern.sino_vietnamese.unwrap_or(true),
                    ..Default::default()
                };
                map.insert(
                    hanzi.clone(),
                    GuidanceMatch {
                        pattern_id: format!("{}_direct", metadata.pattern_id_base),
                        similarity: 1.0,
                        raw_similarity: 1.0,
                        neg_penalty: 0.0,
                        queried_term: hanzi,
                        metadata,
                        direct: true,
                    },
                );
            }
        }
        map
    }

    /// Lazily embed the negative anchors, one batch call for everything.
    async fn negative_cache(&self) -> &HashMap<String, Vec<Vec<f32>>> {
        self.negatives
            .get_or_init(|| async {
                let Some(rag) = &self.rag else {
                    return HashMap::new();
                };
                let by_category = rag.negative_texts();
                if by_category.is_empty() {
                    return HashMap::new();
                }
                let mut texts = Vec::new();
                let mut owners = Vec::new();
                for (category, category_texts) in &by_category {
                    for text in category_texts {
                        texts.push(text.clone());
                        owners.push(category.clone());
                    }
                }
                tracing::info!(
                    store = self.kind.label(),
                    anchors = texts.len(),
                    categories = by_category.len(),
                    "embedding negative anchors"
                );
                let embeddings = match self.embedder.embed_batch(&texts).await {
                    Ok(vectors) => vectors,
                    Err(err) => {
                        tracing::warn!(
                            store = self.kind.label(),
                            "failed to embed negative anchors: {err}"
                        );
                        return HashMap::new();
                    }
                };
                let mut cache: HashMap<String, Vec<Vec<f32>>> = HashMap::new();
                for (owner, mut embedding) in owners.into_iter().zip(embeddings) {
                    math::normalize(&mut embedding);
                    cache.entry(owner).or_default().push(embedding);
                }
                cache
            })
            .await
    }

    /// Context-weighted semantic search: the current term is duplicated
    /// around the context so it outweighs the surroundings.
    pub async fn search_with_context(
        &self,
        current: &str,
        prev: Option<&str>,
        next: Option<&str>,
        filters: &SearchFilters,
        top_k: usize,
    ) -> Result<Vec<SearchMatch>> {
        let current = if self.kind == StoreKind::SinoVietnamese {
            pinyin::enhance_query(current)
        } else {
            current.to_string()
        };
        let mut parts = vec![current.clone()];
        if let Some(prev) = prev {
            parts.push(prev.to_string());
        }
        if let Some(next) = next {
            parts.push(next.to_string());
        }
        parts.push(current);
        let query = parts.join(" ");

        let mut embedding = self
            .embedder
            .embed_batch(std::slice::from_ref(&query))
            .await?
            .pop()
            .ok_or(PatternError::EmbeddingMismatch {
                sent: 1,
                received: 0,
            })?;
        math::normalize(&mut embedding);
        Ok(self.search_embedded(&embedding, filters, top_k))
    }

    /// Cosine scan over the in-memory index with metadata filters.
    fn search_embedded(
        &self,
        query: &[f32],
        filters: &SearchFilters,
        top_k: usize,
    ) -> Vec<SearchMatch> {
        let mut matches: Vec<SearchMatch> = self
            .entries
            .iter()
            .filter(|entry| {
                let m = &entry.metadata;
                filters
                    .category
                    .as_deref()
                    .is_none_or(|c| m.category == c)
                    && filters.register.as_deref().is_none_or(|r| m.register == r)
                    && filters.min_priority.is_none_or(|p| m.priority >= p)
                    && filters
                        .sino_only
                        .is_none_or(|sino| m.sino_vietnamese == sino)
            })
            .map(|entry| SearchMatch {
                pattern_id: entry.pattern_id.clone(),
                similarity: math::dot(query, &entry.embedding),
                document: entry.document.clone(),
                metadata: entry.metadata.clone(),
            })
            .collect();
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(top_k);
        matches
    }

    /// Bulk guidance for a chapter's detected terms/patterns.
    ///
    /// Per term: direct lookup, then batched vector search with the
    /// negative-anchor penalty and genre re-scoring. Matches land in
    /// `high_confidence` (injected) or `medium_confidence` (logged only).
    pub async fn get_bulk_guidance(
        &self,
        queries: &[GuidanceQuery],
        genre: Option<&str>,
        chapter_context: Option<&str>,
        min_confidence: f32,
        max_per_query: usize,
    ) -> Result<BulkGuidance> {
        let mut guidance = BulkGuidance {
            stats: LookupStats {
                queried: queries.len(),
                ..Default::default()
            },
            ..Default::default()
        };
        if queries.is_empty() {
            return Ok(guidance);
        }

        let mut vector_queries: Vec<&GuidanceQuery> = Vec::new();
        for query in queries {
            if let Some(hit) = self.direct.get(&query.term) {
                guidance.stats.direct_hits += 1;
                guidance.high_confidence.push(hit.clone());
            } else {
                vector_queries.push(query);
            }
        }

        if !vector_queries.is_empty() && !self.entries.is_empty() {
            let texts: Vec<String> = vector_queries
                .iter()
                .map(|q| self.compose_query(q, chapter_context))
                .collect();
            let embeddings = self.embed_all(&texts).await?;
            let negatives = self.negative_cache().await;

            for (query, mut embedding) in vector_queries.into_iter().zip(embeddings) {
                math::normalize(&mut embedding);
                let filters = SearchFilters {
                    category: query.category.clone(),
                    ..Default::default()
                };
                for found in self.search_embedded(&embedding, &filters, max_per_query) {
                    let neg_penalty =
                        negative_penalty(&embedding, &found.metadata.category, negatives);
                    if neg_penalty > 0.0 {
                        guidance.stats.neg_penalties_applied += 1;
                    }
                    let mut score = (found.similarity - neg_penalty).max(0.0);
                    if let Some(genre) = genre {
                        let ctx = found.metadata.genre_context.as_str();
                        if !ctx.is_empty() && ctx != "general" && ctx != genre {
                            score *= GENRE_MISMATCH_FACTOR;
                        }
                    }
                    if score < self.config.log_threshold {
                        continue;
                    }
                    let entry = GuidanceMatch {
                        pattern_id: found.pattern_id,
                        similarity: score,
                        raw_similarity: found.similarity,
                        neg_penalty,
                        queried_term: query.term.clone(),
                        metadata: found.metadata,
                        direct: false,
                    };
                    if score >= self.config.inject_threshold && score >= min_confidence {
                        guidance.stats.vector_hits += 1;
                        guidance.high_confidence.push(entry);
                    } else {
                        // Logged, never injected: a low-confidence match
                        // is worse than no match.
                        self.log_uncertain(&entry);
                        guidance.medium_confidence.push(entry);
                    }
                }
            }
        }

        guidance
            .high_confidence
            .sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        guidance
            .medium_confidence
            .sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        guidance.stats.high_confidence = guidance.high_confidence.len();
        guidance.stats.medium_confidence = guidance.medium_confidence.len();
        Ok(guidance)
    }

    fn compose_query(&self, query: &GuidanceQuery, chapter_context: Option<&str>) -> String {
        // AI-ism queries are whole output sentences; no emphasis
        // duplication or context padding wanted.
        if self.kind == StoreKind::AiIsm {
            return query.term.clone();
        }
        let term = if self.kind == StoreKind::SinoVietnamese {
            pinyin::enhance_query(&query.term)
        } else {
            query.term.clone()
        };
        let mut parts = vec![term.clone()];
        if !query.context.is_empty() {
            parts.push(query.context.clone());
        }
        if let Some(ctx) = chapter_context
            && !ctx.is_empty()
        {
            parts.push(ctx.to_string());
        }
        parts.push(term);
        parts.join(" ")
    }

    fn log_uncertain(&self, entry: &GuidanceMatch) {
        tracing::debug!(
            store = self.kind.label(),
            term = %entry.queried_term,
            pattern = %entry.pattern_id,
            similarity = entry.similarity,
            "uncertain match logged, not injected"
        );
        let mut log = self.uncertain.lock().unwrap();
        log.push(UncertainMatch {
            term: entry.queried_term.clone(),
            pattern_id: entry.pattern_id.clone(),
            similarity: entry.similarity,
        });
        if log.len() > UNCERTAIN_LOG_CAP {
            let drop_count = log.len() - UNCERTAIN_LOG_KEEP;
            log.drain(..drop_count);
        }
    }

    pub fn uncertain_match_count(&self) -> usize {
        self.uncertain.lock().unwrap().len()
    }
}

/// Proportional penalty above the negative-anchor threshold:
/// `((neg_sim - T) / (1 - T)) * P`, zero below T.
pub fn penalty_for_similarity(neg_similarity: f32) -> f32 {
    if neg_similarity >= NEGATIVE_ANCHOR_THRESHOLD {
        let overshoot =
            (neg_similarity - NEGATIVE_ANCHOR_THRESHOLD) / (1.0 - NEGATIVE_ANCHOR_THRESHOLD);
        overshoot * NEGATIVE_ANCHOR_PENALTY
    } else {
        0.0
    }
}

fn negative_penalty(
    query: &[f32],
    category: &str,
    cache: &HashMap<String, Vec<Vec<f32>>>,
) -> f32 {
    let Some(anchors) = cache.get(category) else {
        return 0.0;
    };
    let max_neg = anchors
        .iter()
        .map(|anchor| math::dot(query, anchor))
        .fold(0.0f32, f32::max);
    penalty_for_similarity(max_neg)
}

fn load_index(path: &Path) -> Vec<IndexedPattern> {
    if !path.exists() {
        return Vec::new();
    }
    match std::fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str::<PersistedIndex>(&text) {
            Ok(persisted) => persisted.entries,
            Err(err) => {
                tracing::warn!(path = %path.display(), "corrupt index file, starting empty: {err}");
                Vec::new()
            }
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), "unreadable index file, starting empty: {err}");
            Vec::new()
        }
    }
}
