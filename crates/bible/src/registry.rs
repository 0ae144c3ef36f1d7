//! The bible registry: one index for every series.
//!
//! Resolution order for a volume manifest:
//! 1. explicit `bible_id`
//! 2. volume short-hash listed in a series' `volumes[]`
//! 3. substring match of `metadata.series`/`metadata.title` against
//!    `match_patterns`
//! 4. fuzzy title similarity above 0.70
//!
//! No match means a standalone volume; the pipeline proceeds bible-less.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use honyaku_types::{CharacterVoice, Manifest, TargetLanguage};

use crate::error::{BibleError, Result};
use crate::series::{BibleData, BibleEntry, SeriesBible};

pub const INDEX_SCHEMA_VERSION: &str = "1.0";
const FUZZY_MATCH_THRESHOLD: f64 = 0.70;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexEntry {
    pub bible_file: String,
    #[serde(default)]
    pub match_patterns: Vec<String>,
    /// Volume short-hashes linked to this series.
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub entry_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BibleIndex {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub series: BTreeMap<String, IndexEntry>,
}

/// Extract the trailing 4-hex-char short-id from a volume id, e.g.
/// `魔弾の王と戦姫 第1章_20260208_25d9` → `25d9`.
pub fn extract_short_id(volume_id: &str) -> Option<&str> {
    let (_, suffix) = volume_id.rsplit_once('_')?;
    if suffix.len() == 4
        && suffix
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    {
        Some(suffix)
    } else {
        None
    }
}

pub struct BibleRegistry {
    bibles_dir: PathBuf,
    index_path: PathBuf,
    pub index: BibleIndex,
    cache: HashMap<String, SeriesBible>,
}

impl BibleRegistry {
    /// Open the registry under `<pipeline_root>/bibles/`.
    pub fn open(pipeline_root: &Path) -> Result<Self> {
        let bibles_dir = pipeline_root.join("bibles");
        let index_path = bibles_dir.join("index.json");
        let index = if index_path.exists() {
            let text = std::fs::read_to_string(&index_path).map_err(|source| BibleError::Io {
                path: index_path.display().to_string(),
                source,
            })?;
            serde_json::from_str(&text).map_err(|source| BibleError::Parse {
                path: index_path.display().to_string(),
                source,
            })?
        } else {
            BibleIndex {
                version: INDEX_SCHEMA_VERSION.to_string(),
                ..Default::default()
            }
        };
        Ok(Self {
            bibles_dir,
            index_path,
            index,
            cache: HashMap::new(),
        })
    }

    fn save_index(&mut self) -> Result<()> {
        self.index.last_updated = Some(Utc::now().to_rfc3339());
        std::fs::create_dir_all(&self.bibles_dir).map_err(|source| BibleError::Io {
            path: self.bibles_dir.display().to_string(),
            source,
        })?;
        let io_err = |source| BibleError::Io {
            path: self.index_path.display().to_string(),
            source,
        };
        let text =
            serde_json::to_string_pretty(&self.index).map_err(|source| BibleError::Parse {
                path: self.index_path.display().to_string(),
                source,
            })?;
        let tmp = self.index_path.with_extension("json.tmp");
        std::fs::write(&tmp, text).map_err(io_err)?;
        std::fs::rename(&tmp, &self.index_path).map_err(io_err)?;
        Ok(())
    }

    // ── Resolution ──────────────────────────────────────────────────

    /// Resolve the bible for a volume. `None` means standalone volume.
    pub fn resolve(&mut self, manifest: &Manifest) -> Option<SeriesBible> {
        if let Some(bible_id) = &manifest.bible_id
            && self.index.series.contains_key(bible_id)
        {
            tracing::info!(series = %bible_id, "bible resolved via bible_id");
            return self.load_series(&bible_id.clone());
        }

        if let Some(short_id) = extract_short_id(&manifest.volume_id) {
            let owner = self
                .index
                .series
                .iter()
                .find(|(_, entry)| entry.volumes.iter().any(|v| v == short_id))
                .map(|(sid, _)| sid.clone());
            if let Some(series_id) = owner {
                tracing::info!(series = %series_id, short_id, "bible resolved via volume id");
                return self.load_series(&series_id);
            }
        }

        if let Some(series_id) = self.detect_series(manifest) {
            tracing::info!(series = %series_id, "bible resolved via series detection");
            // Remember the link so future runs resolve via the short-id.
            if extract_short_id(&manifest.volume_id).is_some()
                && let Err(err) = self.link_volume(&manifest.volume_id, &series_id)
            {
                tracing::warn!("failed to link volume to series: {err}");
            }
            return self.load_series(&series_id);
        }

        tracing::debug!("no bible found for this volume");
        None
    }

    /// Match `metadata.series`/`metadata.title` against every series'
    /// patterns. Substring wins immediately; otherwise the best fuzzy
    /// score above threshold wins.
    pub fn detect_series(&self, manifest: &Manifest) -> Option<String> {
        let series_str = manifest.metadata.series.as_deref().unwrap_or("");
        let title_str = manifest.metadata.title.as_deref().unwrap_or("");

        let mut best_match: Option<String> = None;
        let mut best_score = 0.0f64;

        for (series_id, entry) in &self.index.series {
            for pattern in &entry.match_patterns {
                let pattern_lower = pattern.to_lowercase();
                for candidate in [series_str, title_str] {
                    if candidate.is_empty() {
                        continue;
                    }
                    let candidate_lower = candidate.to_lowercase();
                    if candidate_lower.contains(&pattern_lower) {
                        return Some(series_id.clone());
                    }
                    let score =
                        strsim::normalized_damerau_levenshtein(&pattern_lower, &candidate_lower);
                    if score > best_score {
                        best_score = score;
                        best_match = Some(series_id.clone());
                    }
                }
            }
        }

        if best_score >= FUZZY_MATCH_THRESHOLD {
            tracing::debug!(series = ?best_match, score = best_score, "fuzzy series match");
            best_match
        } else {
            None
        }
    }

    fn load_series(&mut self, series_id: &str) -> Option<SeriesBible> {
        if let Some(bible) = self.cache.get(series_id) {
            return Some(bible.clone());
        }
        let entry = self.index.series.get(series_id)?;
        let bible_file = if entry.bible_file.is_empty() {
            format!("{series_id}.json")
        } else {
            entry.bible_file.clone()
        };
        let path = self.bibles_dir.join(bible_file);
        match SeriesBible::load(&path) {
            Ok(bible) => {
                self.cache.insert(series_id.to_string(), bible.clone());
                Some(bible)
            }
            Err(err) => {
                tracing::warn!(series = %series_id, "failed to load bible: {err}");
                None
            }
        }
    }

    pub fn get(&mut self, series_id: &str) -> Result<SeriesBible> {
        self.load_series(series_id)
            .ok_or_else(|| BibleError::SeriesNotFound {
                series_id: series_id.to_string(),
            })
    }

    // ── CRUD ────────────────────────────────────────────────────────

    pub fn create_bible(
        &mut self,
        series_id: &str,
        series_title: BTreeMap<String, String>,
        match_patterns: Vec<String>,
    ) -> Result<SeriesBible> {
        let bible_file = format!("{series_id}.json");
        let path = self.bibles_dir.join(&bible_file);
        std::fs::create_dir_all(&self.bibles_dir).map_err(|source| BibleError::Io {
            path: self.bibles_dir.display().to_string(),
            source,
        })?;
        let bible = SeriesBible::create(
            &path,
            BibleData {
                series_id: series_id.to_string(),
                series_title,
                ..Default::default()
            },
        )?;
        self.index.series.insert(
            series_id.to_string(),
            IndexEntry {
                bible_file,
                match_patterns,
                volumes: Vec::new(),
                entry_count: 0,
                last_updated: Some(Utc::now().to_rfc3339()),
            },
        );
        self.save_index()?;
        self.cache.insert(series_id.to_string(), bible.clone());
        tracing::info!(series = %series_id, "bible created");
        Ok(bible)
    }

    pub fn list(&self) -> Vec<(String, IndexEntry)> {
        self.index
            .series
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect()
    }

    /// Link a volume short-hash to a series (idempotent).
    pub fn link_volume(&mut self, volume_id: &str, series_id: &str) -> Result<()> {
        let short_id = extract_short_id(volume_id)
            .unwrap_or(volume_id)
            .to_string();
        let entry =
            self.index
                .series
                .get_mut(series_id)
                .ok_or_else(|| BibleError::SeriesNotFound {
                    series_id: series_id.to_string(),
                })?;
        if !entry.volumes.contains(&short_id) {
            entry.volumes.push(short_id.clone());
            self.save_index()?;
            tracing::info!(short_id = %short_id, series = %series_id, "volume linked");
        }
        Ok(())
    }

    /// Unlink a volume from whichever series holds it.
    pub fn unlink_volume(&mut self, volume_id: &str) -> Result<Option<String>> {
        let short_id = extract_short_id(volume_id).unwrap_or(volume_id).to_string();
        let owner = self
            .index
            .series
            .iter()
            .find(|(_, entry)| entry.volumes.contains(&short_id))
            .map(|(sid, _)| sid.clone());
        if let Some(series_id) = &owner {
            if let Some(entry) = self.index.series.get_mut(series_id) {
                entry.volumes.retain(|v| v != &short_id);
            }
            self.save_index()?;
            tracing::info!(short_id = %short_id, series = %series_id, "volume unlinked");
        }
        Ok(owner)
    }

    /// Invariant check: a volume short-hash belongs to at most one series.
    pub fn validate_index(&self) -> Vec<String> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        let mut problems = Vec::new();
        for (series_id, entry) in &self.index.series {
            for volume in &entry.volumes {
                if let Some(previous) = seen.insert(volume, series_id) {
                    problems.push(format!(
                        "volume {volume} linked to both {previous} and {series_id}"
                    ));
                }
            }
        }
        problems
    }

    // ── Import from manifest ────────────────────────────────────────

    /// Pull character data out of a manifest into the series bible and
    /// link the volume. Returns the number of entries added or enriched.
    pub fn import_from_manifest(
        &mut self,
        manifest: &Manifest,
        series_id: &str,
        lang: TargetLanguage,
    ) -> Result<usize> {
        let mut bible = self.get(series_id)?;
        let mut touched = 0usize;

        if let Some(meta) = manifest.language_metadata(lang) {
            for (jp_name, en_name) in &meta.character_names {
                if bible.get_character(jp_name).is_none() {
                    bible.add_entry("characters", jp_name, BibleEntry::named(en_name.clone()))?;
                    touched += 1;
                }
            }
            if let Some(semantic) = &meta.semantic_metadata {
                for voice in &semantic.characters {
                    touched += usize::from(enrich_character(&mut bible, voice)?);
                }
            }
        }

        let title = manifest.metadata.title.clone().unwrap_or_default();
        let index = bible.data.volumes_registered.len() as u32 + 1;
        bible.register_volume(&manifest.volume_id, &title, index);
        bible.save()?;

        if let Some(entry) = self.index.series.get_mut(series_id) {
            entry.entry_count = bible.entry_count();
            entry.last_updated = Some(Utc::now().to_rfc3339());
        }
        self.cache.insert(series_id.to_string(), bible);
        self.link_volume(&manifest.volume_id, series_id)?;
        tracing::info!(series = %series_id, entries = touched, "manifest imported into bible");
        Ok(touched)
    }
}

fn enrich_character(bible: &mut SeriesBible, voice: &CharacterVoice) -> Result<bool> {
    if voice.en_name.is_empty() {
        return Ok(false);
    }
    let entry = BibleEntry {
        canonical_en: voice.en_name.clone(),
        short_name: voice
            .nickname
            .as_deref()
            .and_then(|n| n.split(',').next())
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        notes: voice.speech_fingerprint.clone(),
        ..Default::default()
    };
    bible.add_entry("characters", &voice.jp_name, entry)?;
    Ok(true)
}
