//! Chapter title normalization.
//!
//! The canonical title is derived from the chapter id (`chapter_04` →
//! "Chapter 4"). Model- or manifest-supplied titles are kept only when
//! they are unique across the volume and agree with the canonical
//! number; everything else collapses to the canonical form. This is a
//! correctness fix: duplicated titles put the same heading on two
//! chapters.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use honyaku_types::{ChapterEntry, TargetLanguage};

fn id_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)chapter[_\-](\d+)").unwrap())
}

fn title_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bchapter\s+(\d+)\b").unwrap())
}

/// `chapter_04` → `Chapter 4`.
pub fn canonical_title_from_id(chapter_id: &str) -> Option<String> {
    let captures = id_number_regex().captures(chapter_id)?;
    let number: u32 = captures[1].parse().ok()?;
    Some(format!("Chapter {number}"))
}

/// The chapter number a human-facing title claims, if any.
pub fn extract_title_number(title: &str) -> Option<u32> {
    let captures = title_number_regex().captures(title)?;
    captures[1].parse().ok()
}

/// Resolve the prompt title for every chapter.
///
/// A supplied title survives only if it is unique among the supplied
/// titles AND does not contradict the canonical chapter number.
pub fn resolve_titles(
    chapters: &[ChapterEntry],
    lang: TargetLanguage,
) -> BTreeMap<String, Option<String>> {
    let mut title_counts: HashMap<&str, usize> = HashMap::new();
    for chapter in chapters {
        if let Some(title) = chapter.title_for(lang) {
            *title_counts.entry(title).or_insert(0) += 1;
        }
    }

    let mut resolved = BTreeMap::new();
    for chapter in chapters {
        let canonical = canonical_title_from_id(&chapter.id);
        let supplied = chapter.title_for(lang);

        let title = match supplied {
            None => canonical.clone(),
            Some(supplied_title) => {
                let duplicated = title_counts.get(supplied_title).copied().unwrap_or(0) > 1;
                let contradicts = match (&canonical, extract_title_number(supplied_title)) {
                    (Some(canonical_title), Some(claimed)) => {
                        extract_title_number(canonical_title) != Some(claimed)
                    }
                    _ => false,
                };
                if duplicated || contradicts {
                    tracing::info!(
                        chapter = %chapter.id,
                        supplied = supplied_title,
                        duplicated,
                        contradicts,
                        "normalizing chapter title to canonical form"
                    );
                    canonical.clone()
                } else {
                    Some(supplied_title.to_string())
                }
            }
        };
        resolved.insert(chapter.id.clone(), title);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(id: &str, title_en: Option<&str>) -> ChapterEntry {
        ChapterEntry {
            id: id.to_string(),
            source_file: format!("{id}_JP.md"),
            title_en: title_en.map(str::to_string),
            title_vn: None,
            en_file: None,
            vn_file: None,
            translation_status: Default::default(),
            model: None,
            schema_cache: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn canonical_title_parses_id_number() {
        assert_eq!(
            canonical_title_from_id("chapter_04").as_deref(),
            Some("Chapter 4")
        );
        assert_eq!(
            canonical_title_from_id("chapter-12").as_deref(),
            Some("Chapter 12")
        );
        assert_eq!(canonical_title_from_id("prologue"), None);
    }

    #[test]
    fn duplicated_titles_collapse_to_canonical() {
        let chapters = vec![
            chapter("chapter_01", Some("Chapter 1: The Fated Meeting")),
            chapter("chapter_02", Some("Chapter 1: The Fated Meeting")),
        ];
        let resolved = resolve_titles(&chapters, TargetLanguage::En);
        assert_eq!(resolved["chapter_01"].as_deref(), Some("Chapter 1"));
        assert_eq!(resolved["chapter_02"].as_deref(), Some("Chapter 2"));
    }

    #[test]
    fn mismatched_number_collapses_to_canonical() {
        let chapters = vec![chapter("chapter_03", Some("Chapter 7: Wrong Number"))];
        let resolved = resolve_titles(&chapters, TargetLanguage::En);
        assert_eq!(resolved["chapter_03"].as_deref(), Some("Chapter 3"));
    }

    #[test]
    fn unique_matching_title_survives() {
        let chapters = vec![chapter("chapter_05", Some("Chapter 5: Rooftop Confession"))];
        let resolved = resolve_titles(&chapters, TargetLanguage::En);
        assert_eq!(
            resolved["chapter_05"].as_deref(),
            Some("Chapter 5: Rooftop Confession")
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let chapters = vec![
            chapter("chapter_01", Some("Chapter 1: A")),
            chapter("chapter_02", Some("Chapter 1: A")),
            chapter("chapter_03", None),
        ];
        let first = resolve_titles(&chapters, TargetLanguage::En);

        // Apply the result back and re-run.
        let rewritten: Vec<ChapterEntry> = chapters
            .iter()
            .map(|c| {
                let mut c = c.clone();
                c.title_en = first[&c.id].clone();
                c
            })
            .collect();
        let second = resolve_titles(&rewritten, TargetLanguage::En);
        assert_eq!(first, second);
    }
}
