//! RAG source file schema.
//!
//! One JSON file per store kind. Two pattern layouts coexist: the
//! Sino-Vietnamese style nests context blocks (one per meaning, each with
//! its own examples and avoid-list); the grammar style attaches examples
//! directly to the pattern. Negative anchors appear either per category
//! or as a top-level `negative_vectors` map; both are honored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PatternError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagExample {
    #[serde(default)]
    pub jp: Option<String>,
    #[serde(default)]
    pub zh: Option<String>,
    /// An offending target-language rendering (AI-ism entries): the
    /// indexed text, with the rewrite under `fix`/`natural`.
    #[serde(default)]
    pub bad: Option<String>,
    #[serde(default)]
    pub literal: Option<String>,
    #[serde(default, alias = "fix")]
    pub natural: Option<String>,
    #[serde(default)]
    pub vn_correct: Option<String>,
    #[serde(default)]
    pub vn_wrong: Option<String>,
    /// Genre context tag (cultivation, modern, historical, ...).
    #[serde(default)]
    pub context: Option<String>,
}

impl RagExample {
    pub fn source_text(&self) -> Option<&str> {
        self.jp.as_deref().or(self.zh.as_deref()).or(self.bad.as_deref())
    }

    pub fn target_text(&self) -> Option<&str> {
        self.natural.as_deref().or(self.vn_correct.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagContext {
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(default)]
    pub register: Option<String>,
    #[serde(default)]
    pub zh_indicators: Vec<String>,
    #[serde(default)]
    pub avoid: Vec<String>,
    #[serde(default)]
    pub examples: Vec<RagExample>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagPattern {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub hanzi: Option<String>,
    #[serde(default)]
    pub primary_reading: Option<String>,
    #[serde(default)]
    pub japanese_structure: Option<String>,
    #[serde(default)]
    pub japanese_indicators: Vec<String>,
    #[serde(default)]
    pub english_pattern: Option<String>,
    #[serde(default)]
    pub vietnamese_pattern: Option<String>,
    #[serde(default)]
    pub usage_rules: Vec<String>,
    #[serde(default)]
    pub register: Option<String>,
    #[serde(default)]
    pub sino_vietnamese: Option<bool>,
    #[serde(default)]
    pub contexts: Vec<RagContext>,
    #[serde(default)]
    pub examples: Vec<RagExample>,
}

impl RagPattern {
    pub fn id_base(&self) -> String {
        self.id
            .clone()
            .or_else(|| self.hanzi.clone())
            .unwrap_or_else(|| "pattern".to_string())
    }

    /// The target-language pattern template, whichever language the
    /// source file is for.
    pub fn target_pattern(&self) -> Option<&str> {
        self.english_pattern
            .as_deref()
            .or(self.vietnamese_pattern.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NegativeBlock {
    #[serde(default)]
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagCategory {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub patterns: Vec<RagPattern>,
    #[serde(default)]
    pub negative_vectors: Option<NegativeBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagSource {
    #[serde(default)]
    pub pattern_categories: BTreeMap<String, RagCategory>,
    /// Extra section used by some source files; entries that parse as
    /// categories are merged with `pattern_categories` for indexing.
    #[serde(default)]
    pub advanced_patterns: BTreeMap<String, serde_json::Value>,
    /// Top-level negative anchors: category -> texts.
    #[serde(default)]
    pub negative_vectors: BTreeMap<String, Vec<String>>,
}

impl RagSource {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PatternError::RagSourceNotFound {
                path: path.display().to_string(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| PatternError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| PatternError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// All indexable categories: `pattern_categories` plus any
    /// `advanced_patterns` entry that carries a pattern list.
    pub fn categories(&self) -> Vec<(String, RagCategory)> {
        let mut result: Vec<(String, RagCategory)> = self
            .pattern_categories
            .iter()
            .map(|(name, category)| (name.clone(), category.clone()))
            .collect();
        for (name, value) in &self.advanced_patterns {
            if let Ok(category) = serde_json::from_value::<RagCategory>(value.clone())
                && !category.patterns.is_empty()
            {
                result.push((name.clone(), category));
            }
        }
        result
    }

    /// Negative anchor texts per category, merging both layouts.
    pub fn negative_texts(&self) -> BTreeMap<String, Vec<String>> {
        let mut result = self.negative_vectors.clone();
        for (name, category) in self.categories() {
            if let Some(block) = &category.negative_vectors
                && !block.texts.is_empty()
            {
                result.entry(name).or_default().extend(block.texts.clone());
            }
        }
        result.retain(|_, texts| !texts.is_empty());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_texts_merges_both_layouts() {
        let json = r#"{
            "pattern_categories": {
                "hedging": {
                    "patterns": [{"id": "p1", "examples": [{"jp": "なんか変", "natural": "kinda weird"}]}],
                    "negative_vectors": {"texts": ["literal nanka as what"]}
                }
            },
            "negative_vectors": {
                "hedging": ["another negative"],
                "intensifiers": ["totally literal"]
            }
        }"#;
        let source: RagSource = serde_json::from_str(json).unwrap();
        let negatives = source.negative_texts();
        assert_eq!(negatives["hedging"].len(), 2);
        assert_eq!(negatives["intensifiers"].len(), 1);
    }

    #[test]
    fn advanced_patterns_merge_into_categories() {
        let json = r#"{
            "pattern_categories": {"a": {"patterns": [{"id": "p1"}]}},
            "advanced_patterns": {
                "description": "extras",
                "b": {"patterns": [{"id": "p2"}]}
            }
        }"#;
        let source: RagSource = serde_json::from_str(json).unwrap();
        let names: Vec<String> = source.categories().into_iter().map(|(n, _)| n).collect();
        assert!(names.contains(&"a".to_string()));
        assert!(names.contains(&"b".to_string()));
        assert_eq!(names.len(), 2);
    }
}
