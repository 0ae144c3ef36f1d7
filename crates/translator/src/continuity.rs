//! Continuity snapshot extraction.
//!
//! After a chapter completes, the orchestrator records which canonical
//! names and glossary terms actually surfaced in the translation, plus
//! any narrative hints the detectors produced. Snapshots aggregate into
//! the next volume's continuity pack at finalization. Extraction is
//! heuristic by design: no extra LLM call, so per-chapter LLM semantics
//! stay at-most-once.

use std::collections::BTreeMap;

use honyaku_types::{ChapterSnapshot, ContinuityPack, Relationship};

/// Build a snapshot from a completed chapter.
///
/// Roster/glossary entries are included when their target-language
/// rendering occurs in the output (the JP key is long gone by then).
pub fn extract_snapshot(
    chapter_id: &str,
    translation: &str,
    roster: &BTreeMap<String, String>,
    glossary: &BTreeMap<String, String>,
    narrative_flags: Vec<String>,
) -> ChapterSnapshot {
    let occurred = |target: &String| !target.is_empty() && translation.contains(target.as_str());
    ChapterSnapshot {
        chapter_id: chapter_id.to_string(),
        roster: roster
            .iter()
            .filter(|(_, target)| occurred(target))
            .map(|(jp, target)| (jp.clone(), target.clone()))
            .collect(),
        glossary: glossary
            .iter()
            .filter(|(_, target)| occurred(target))
            .map(|(jp, target)| (jp.clone(), target.clone()))
            .collect(),
        narrative_flags,
    }
}

/// Format a prior volume's pack for the system instruction.
pub fn format_continuity_for_prompt(pack: &ContinuityPack) -> String {
    if pack.is_empty() {
        return String::new();
    }
    let mut lines = vec!["## SERIES CONTINUITY (PRIOR VOLUMES)".to_string()];
    if !pack.relationships.is_empty() {
        lines.push("Established relationships:".to_string());
        for rel in &pack.relationships {
            let note = rel
                .note
                .as_deref()
                .map(|n| format!(" ({n})"))
                .unwrap_or_default();
            lines.push(format!("- {} ↔ {}: {}{note}", rel.a, rel.b, rel.kind));
        }
    }
    if !pack.narrative_flags.is_empty() {
        lines.push("Narrative state carried forward:".to_string());
        for flag in &pack.narrative_flags {
            lines.push(format!("- {flag}"));
        }
    }
    lines.join("\n")
}

/// Aggregate run snapshots into the pack written for the next volume.
pub fn finalize_pack(
    snapshots: Vec<ChapterSnapshot>,
    carried_relationships: Vec<Relationship>,
) -> ContinuityPack {
    ContinuityPack::from_snapshots(snapshots, carried_relationships)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_keeps_only_names_that_occurred() {
        let roster = BTreeMap::from([
            ("アコ".to_string(), "Ako".to_string()),
            ("マスター".to_string(), "Master".to_string()),
        ]);
        let glossary = BTreeMap::from([(
            "伝説の武器".to_string(),
            "Legendary Arms".to_string(),
        )]);
        let snapshot = extract_snapshot(
            "chapter_01",
            "Ako equipped the Legendary Arms and smiled.",
            &roster,
            &glossary,
            vec!["guild formed".to_string()],
        );
        assert!(snapshot.roster.contains_key("アコ"));
        assert!(!snapshot.roster.contains_key("マスター"));
        assert!(snapshot.glossary.contains_key("伝説の武器"));
        assert_eq!(snapshot.narrative_flags, vec!["guild formed"]);
    }

    #[test]
    fn continuity_prompt_lists_relationships_and_flags() {
        let pack = ContinuityPack {
            relationships: vec![Relationship {
                a: "Ako".into(),
                b: "Rusian".into(),
                kind: "in-game married".into(),
                note: Some("she does not separate game and reality".into()),
            }],
            narrative_flags: vec!["guild Alley Cats formed".into()],
            ..Default::default()
        };
        let text = format_continuity_for_prompt(&pack);
        assert!(text.contains("Ako ↔ Rusian"));
        assert!(text.contains("Alley Cats"));
        assert!(format_continuity_for_prompt(&ContinuityPack::default()).is_empty());
    }
}
