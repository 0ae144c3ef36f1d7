//! Volume manifest: the contract between the Librarian and the translator.
//!
//! Three manifest generations coexist on disk (v1, v2, enhanced v2.1 and
//! the v3.x structural variants). [`Manifest::normalize`] folds them into
//! one in-memory shape so downstream components never branch on schema
//! version. Unknown fields are preserved through a flattened `extra` map;
//! the translator only ever mutates chapter status/output fields and
//! `pipeline_state.translator`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lang::TargetLanguage;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest has no chapters (checked root and structure.chapters)")]
    NoChapters,
    #[error("manifest missing required field: {0}")]
    MissingField(&'static str),
    #[error("chapter {id} missing source file")]
    ChapterMissingSource { id: String },
}

/// Per-chapter translation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterEntry {
    pub id: String,
    /// Source filename under `JP/`. Older manifests call this `jp_file`.
    #[serde(alias = "jp_file")]
    pub source_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_vn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vn_file: Option<String>,
    #[serde(default)]
    pub translation_status: TranslationStatus,
    /// Per-chapter model override; also records the fallback model after use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Continuity schema cache name from a previous run. Preserved, never
    /// consumed after a restart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_cache: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ChapterEntry {
    pub fn title_for(&self, lang: TargetLanguage) -> Option<&str> {
        match lang {
            TargetLanguage::En => self.title_en.as_deref(),
            TargetLanguage::Vn => self.title_vn.as_deref(),
        }
    }

    pub fn output_file_for(&self, lang: TargetLanguage) -> Option<&str> {
        match lang {
            TargetLanguage::En => self.en_file.as_deref(),
            TargetLanguage::Vn => self.vn_file.as_deref(),
        }
    }

    pub fn set_output_file(&mut self, lang: TargetLanguage, name: String) {
        match lang {
            TargetLanguage::En => self.en_file = Some(name),
            TargetLanguage::Vn => self.vn_file = Some(name),
        }
    }

    /// Default output filename derived from the source filename, e.g.
    /// `CHAPTER_01_JP.md` -> `CHAPTER_01_EN.md`.
    pub fn default_output_file(&self, lang: TargetLanguage) -> String {
        let upper = lang.output_dir();
        let replaced = self.source_file.replace("_JP.md", &format!("_{upper}.md"));
        if replaced != self.source_file {
            replaced
        } else if let Some(stem) = self.source_file.strip_suffix(".md") {
            format!("{stem}_{upper}.md")
        } else {
            format!("{}_{upper}.md", self.source_file)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VolumeMetadata {
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A character's typed relationship with a contraction-rate override
/// (the RTAS array of enhanced v2.1 profiles).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtasRelationship {
    pub target: String,
    pub relation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contraction_rate_override: Option<f32>,
}

/// One character's voice profile in the enhanced (v2.1) shape.
///
/// Legacy v2 profiles are lifted into this shape by
/// [`Manifest::normalize`]; the rich fields (rtas, keigo_switch,
/// contraction_rate, how_refers_to_others) survive the lift.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CharacterVoice {
    pub jp_name: String,
    pub en_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contraction_rate: Option<f32>,
    /// conversation partner -> politeness register
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub keigo_switch: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rtas: Vec<RtasRelationship>,
    /// other character -> how this character addresses them
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub how_refers_to_others: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SemanticMetadata {
    #[serde(default)]
    pub characters: Vec<CharacterVoice>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dialogue_patterns: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scene_contexts: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub translation_guidelines: Vec<String>,
}

impl SemanticMetadata {
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
            && self.dialogue_patterns.is_empty()
            && self.scene_contexts.is_empty()
            && self.translation_guidelines.is_empty()
    }
}

/// Per-target-language metadata block (`metadata_en`, `metadata_vn`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LanguageMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub character_names: BTreeMap<String, String>,
    /// Raw profiles as written by the Librarian; shape varies by schema
    /// version. Normalized into `semantic_metadata.characters`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_profiles: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_metadata: Option<SemanticMetadata>,
    /// Name mappings locked by the operator. Highest-priority glossary layer.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub locked_glossary: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TranslatorStatus {
    #[default]
    Idle,
    InProgress,
    Completed,
    Partial,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TranslatorState {
    #[serde(default)]
    pub status: TranslatorStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_chapters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Generic stage record for phases this crate does not own (librarian,
/// art director). Only `status` is relied on.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StageState {
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub librarian: Option<StageState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translator: Option<TranslatorState>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// v3.x manifests nest chapters under `structure`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct Structure {
    #[serde(default)]
    chapters: Vec<ChapterEntry>,
    #[serde(flatten)]
    extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub schema_version: String,
    pub volume_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bible_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_id: Option<String>,
    #[serde(default)]
    pub metadata: VolumeMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_en: Option<LanguageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_vn: Option<LanguageMetadata>,
    #[serde(default)]
    pub chapters: Vec<ChapterEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    structure: Option<Structure>,
    #[serde(default)]
    pub pipeline_state: PipelineState,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Manifest {
    /// Parse and normalize a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut manifest: Manifest = serde_json::from_str(text)?;
        manifest.normalize();
        Ok(manifest)
    }

    /// Fold schema variants into the single in-memory shape.
    ///
    /// - v3.x `structure.chapters` move to the root chapter list
    /// - legacy v2 `character_profiles` maps are lifted into
    ///   `semantic_metadata.characters`, preserving rtas, keigo_switch,
    ///   contraction_rate and how_refers_to_others
    pub fn normalize(&mut self) {
        if self.chapters.is_empty()
            && let Some(structure) = self.structure.as_mut()
        {
            self.chapters = std::mem::take(&mut structure.chapters);
        }
        for meta in [&mut self.metadata_en, &mut self.metadata_vn]
            .into_iter()
            .flatten()
        {
            normalize_language_metadata(meta);
        }
    }

    pub fn language_metadata(&self, lang: TargetLanguage) -> Option<&LanguageMetadata> {
        match lang {
            TargetLanguage::En => self.metadata_en.as_ref(),
            TargetLanguage::Vn => self.metadata_vn.as_ref(),
        }
    }

    pub fn chapter(&self, id: &str) -> Option<&ChapterEntry> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn chapter_mut(&mut self, id: &str) -> Option<&mut ChapterEntry> {
        self.chapters.iter_mut().find(|c| c.id == id)
    }

    pub fn translator_state_mut(&mut self) -> &mut TranslatorState {
        self.pipeline_state
            .translator
            .get_or_insert_with(TranslatorState::default)
    }

    /// Structural pre-flight check. v3.6 manifests get the strict variant.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.volume_id.is_empty() {
            return Err(ManifestError::MissingField("volume_id"));
        }
        if self.chapters.is_empty() {
            return Err(ManifestError::NoChapters);
        }
        if self.schema_version.starts_with("v3.6") {
            for chapter in &self.chapters {
                if chapter.source_file.is_empty() {
                    return Err(ManifestError::ChapterMissingSource {
                        id: chapter.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Lift legacy v2 `character_profiles` into the enhanced shape.
///
/// The v2 layout is a JP-name-keyed object; the enhanced layout is already
/// a list of [`CharacterVoice`]. Both end up in
/// `semantic_metadata.characters`; profiles already present there win.
fn normalize_language_metadata(meta: &mut LanguageMetadata) {
    let Some(profiles) = meta.character_profiles.take() else {
        return;
    };
    let semantic = meta.semantic_metadata.get_or_insert_with(Default::default);
    let lifted: Vec<CharacterVoice> = match &profiles {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(jp_name, profile)| lift_v2_profile(jp_name, profile))
            .collect(),
        _ => Vec::new(),
    };
    for voice in lifted {
        if !semantic.characters.iter().any(|c| c.jp_name == voice.jp_name) {
            semantic.characters.push(voice);
        }
    }
    // Keep the raw block around for round-tripping.
    meta.character_profiles = Some(profiles);
}

fn lift_v2_profile(jp_name: &str, profile: &Value) -> Option<CharacterVoice> {
    let obj = profile.as_object()?;
    let en_name = obj
        .get("full_name")
        .or_else(|| obj.get("en_name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if en_name.is_empty() {
        return None;
    }
    let string_map = |key: &str| -> BTreeMap<String, String> {
        obj.get(key)
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    };
    let rtas = obj
        .get("rtas")
        .or_else(|| obj.get("relationships"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default();
    Some(CharacterVoice {
        jp_name: jp_name.to_string(),
        en_name,
        nickname: obj
            .get("nickname")
            .and_then(Value::as_str)
            .map(str::to_string),
        speech_fingerprint: obj
            .get("speech_fingerprint")
            .or_else(|| obj.get("speech_style"))
            .and_then(Value::as_str)
            .map(str::to_string),
        contraction_rate: obj
            .get("contraction_rate")
            .and_then(Value::as_f64)
            .map(|v| v as f32),
        keigo_switch: string_map("keigo_switch"),
        rtas,
        how_refers_to_others: string_map("how_refers_to_others"),
        notes: obj.get("notes").and_then(Value::as_str).map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_manifest(extra: &str) -> String {
        format!(
            r#"{{
                "schema_version": "v2",
                "volume_id": "vol_test_20260101_ab12",
                "metadata": {{"series": "Test Series", "title": "Test Vol 1"}},
                "chapters": [
                    {{"id": "chapter_01", "source_file": "CHAPTER_01_JP.md"}}
                ]
                {extra}
            }}"#
        )
    }

    #[test]
    fn chapters_default_to_pending() {
        let manifest = Manifest::from_json(&minimal_manifest("")).unwrap();
        assert_eq!(
            manifest.chapters[0].translation_status,
            TranslationStatus::Pending
        );
    }

    #[test]
    fn structure_chapters_move_to_root() {
        let json = r#"{
            "schema_version": "v3.5",
            "volume_id": "vol_x",
            "structure": {
                "chapters": [{"id": "chapter_01", "jp_file": "CHAPTER_01_JP.md"}]
            }
        }"#;
        let manifest = Manifest::from_json(json).unwrap();
        assert_eq!(manifest.chapters.len(), 1);
        assert_eq!(manifest.chapters[0].source_file, "CHAPTER_01_JP.md");
    }

    #[test]
    fn v2_profiles_keep_rich_fields() {
        let json = minimal_manifest(
            r#", "metadata_en": {
                "character_names": {"アコ": "Ako"},
                "character_profiles": {
                    "アコ": {
                        "full_name": "Ako Tamaki",
                        "contraction_rate": 0.8,
                        "keigo_switch": {"先生": "formal"},
                        "how_refers_to_others": {"ルシアン": "Rusian"},
                        "rtas": [{"target": "Rusian", "relation": "spouse_in_game", "score": 0.95}]
                    }
                }
            }"#,
        );
        let manifest = Manifest::from_json(&json).unwrap();
        let semantic = manifest
            .metadata_en
            .as_ref()
            .and_then(|m| m.semantic_metadata.as_ref())
            .unwrap();
        let ako = &semantic.characters[0];
        assert_eq!(ako.en_name, "Ako Tamaki");
        assert_eq!(ako.contraction_rate, Some(0.8));
        assert_eq!(ako.keigo_switch.get("先生").unwrap(), "formal");
        assert_eq!(ako.how_refers_to_others.get("ルシアン").unwrap(), "Rusian");
        assert_eq!(ako.rtas[0].relation, "spouse_in_game");
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let json = minimal_manifest(r#", "librarian_notes": {"cover": "cover.jpg"}"#);
        let manifest = Manifest::from_json(&json).unwrap();
        let out = serde_json::to_string(&manifest).unwrap();
        assert!(out.contains("librarian_notes"));
        assert!(out.contains("cover.jpg"));
    }

    #[test]
    fn default_output_file_swaps_language_suffix() {
        let manifest = Manifest::from_json(&minimal_manifest("")).unwrap();
        assert_eq!(
            manifest.chapters[0].default_output_file(TargetLanguage::En),
            "CHAPTER_01_EN.md"
        );
        assert_eq!(
            manifest.chapters[0].default_output_file(TargetLanguage::Vn),
            "CHAPTER_01_VN.md"
        );
    }

    #[test]
    fn validate_rejects_empty_chapter_list() {
        let json = r#"{"schema_version": "v2", "volume_id": "vol_x"}"#;
        let manifest = Manifest::from_json(json).unwrap();
        assert!(matches!(
            manifest.validate(),
            Err(ManifestError::NoChapters)
        ));
    }
}
