//! Pre-baked illustration analysis ("Art Director's Notes").
//!
//! Produced by the visual analysis phase and consumed read-only here.
//! Keyed by illustration id (`illust-NNN`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpoilerPrevention {
    #[serde(default)]
    pub do_not_reveal_before_text: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VisualContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotional_delta: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub key_details: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub narrative_directives: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spoiler_prevention: Option<SpoilerPrevention>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl VisualContext {
    pub fn do_not_reveal(&self) -> &[String] {
        self.spoiler_prevention
            .as_ref()
            .map(|s| s.do_not_reveal_before_text.as_slice())
            .unwrap_or_default()
    }
}

/// The whole `visual_cache.json` file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VisualCache {
    #[serde(default)]
    pub illustrations: BTreeMap<String, VisualContext>,
}

impl VisualCache {
    pub fn get(&self, illustration_id: &str) -> Option<&VisualContext> {
        self.illustrations.get(illustration_id)
    }

    pub fn len(&self) -> usize {
        self.illustrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.illustrations.is_empty()
    }
}
