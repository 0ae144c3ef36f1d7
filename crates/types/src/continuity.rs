//! Cross-volume continuity state.
//!
//! A continuity pack is written when a volume completes and read when the
//! next volume of the same series starts. Chapter snapshots accumulate
//! during a run; only the orchestrator mutates the pack.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub a: String,
    pub b: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// What one completed chapter contributed to series continuity.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChapterSnapshot {
    pub chapter_id: String,
    /// JP -> target names that actually appeared in this chapter.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub roster: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub glossary: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub narrative_flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContinuityPack {
    #[serde(default)]
    pub roster: BTreeMap<String, String>,
    #[serde(default)]
    pub glossary: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub narrative_flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chapter_snapshots: Vec<ChapterSnapshot>,
}

impl ContinuityPack {
    /// Aggregate chapter snapshots into a pack for the next volume.
    ///
    /// Later chapters win on roster/glossary conflicts; narrative flags
    /// are deduplicated in first-seen order. Relationships carry over
    /// from the prior pack untouched.
    pub fn from_snapshots(
        snapshots: Vec<ChapterSnapshot>,
        carried_relationships: Vec<Relationship>,
    ) -> Self {
        let mut roster = BTreeMap::new();
        let mut glossary = BTreeMap::new();
        let mut narrative_flags: Vec<String> = Vec::new();
        for snapshot in &snapshots {
            roster.extend(snapshot.roster.clone());
            glossary.extend(snapshot.glossary.clone());
            for flag in &snapshot.narrative_flags {
                if !narrative_flags.contains(flag) {
                    narrative_flags.push(flag.clone());
                }
            }
        }
        Self {
            roster,
            glossary,
            relationships: carried_relationships,
            narrative_flags,
            chapter_snapshots: snapshots,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
            && self.glossary.is_empty()
            && self.relationships.is_empty()
            && self.narrative_flags.is_empty()
            && self.chapter_snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: &str, roster: &[(&str, &str)], flags: &[&str]) -> ChapterSnapshot {
        ChapterSnapshot {
            chapter_id: id.to_string(),
            roster: roster
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            glossary: BTreeMap::new(),
            narrative_flags: flags.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn later_snapshots_win_roster_conflicts() {
        let pack = ContinuityPack::from_snapshots(
            vec![
                snapshot("chapter_01", &[("アコ", "Ako")], &["met at school"]),
                snapshot("chapter_02", &[("アコ", "Ako Tamaki")], &["met at school"]),
            ],
            Vec::new(),
        );
        assert_eq!(pack.roster.get("アコ").unwrap(), "Ako Tamaki");
        assert_eq!(pack.narrative_flags, vec!["met at school"]);
        assert_eq!(pack.chapter_snapshots.len(), 2);
    }
}
