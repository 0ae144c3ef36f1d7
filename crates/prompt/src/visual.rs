//! Visual context injection ("Art Director's Notes").
//!
//! Pre-baked illustration analysis becomes a stylistic guidance block in
//! the user prompt. The canon-event-fidelity directive is part of the
//! prompt contract: illustrations inform vocabulary and mood, never
//! content, and spoilers listed in `do_not_reveal_before_text` stay out
//! of the output until the source text confirms them.

use std::collections::BTreeMap;

use honyaku_types::{VisualCache, VisualContext};

/// Strict output requirement appended after visual guidance to prevent
/// analysis leaking into the translation.
pub const MULTIMODAL_STRICT_SUFFIX: &str = "
CRITICAL OUTPUT REQUIREMENT:
Your response MUST be ONLY the translated text.
DO NOT output any analysis, planning, thinking process, or commentary.
DO NOT describe what you're going to do or what you observed.
DO NOT explain your translation choices.
ONLY output the final translated text, maintaining all formatting
including all illustration markers (e.g. [ILLUSTRATION: xxx]) in their original positions.
Begin your response with the translated text immediately.
";

pub const CANON_EVENT_FIDELITY_DIRECTIVE: &str = "
=== CANON EVENT FIDELITY (ABSOLUTE PRIORITY) ===

The Art Director's Notes above provide STYLISTIC guidance only (vocabulary, atmosphere, emotional tone).

**STRICT 1:1 CANON EVENT RULES:**
1. NEVER add events, actions, or dialogue that appear in illustrations but NOT in the source text
2. NEVER alter the sequence or timing of events based on what illustrations show
3. NEVER describe visual details that the source text does not describe
4. If an illustration shows a character crying but the text only mentions they \"looked sad\", translate as \"looked sad\"
5. If an illustration shows physical contact but the text only implies it, maintain the implication
6. The illustration INFORMS your vocabulary choice, NOT your content invention

**WHAT TO USE FROM ART DIRECTOR'S NOTES:**
- Emotional tone vocabulary (\"cold\", \"distant\", \"frozen\" vs generic \"sad\")
- Atmosphere descriptors matching visual mood
- Character expression adjectives that fit the scene

**WHAT NEVER TO DO:**
- Adding unwritten actions visible in the illustration
- Describing unmentioned clothing/accessories details
- Revealing plot points the text hasn't confirmed

**SPOILER PREVENTION:**
The \"do_not_reveal_before_text\" list contains visual spoilers.
Even if you SEE it in the Art Director's Notes, DO NOT translate it until the SOURCE TEXT confirms it.

=== END CANON EVENT FIDELITY ===
";

/// The assembled visual guidance for one chapter.
#[derive(Debug, Clone)]
pub struct VisualGuidance {
    /// Guidance blocks plus the fidelity directive, ready for injection.
    pub block: String,
    /// Spoiler phrases the output must not contain ahead of the source.
    pub do_not_reveal: Vec<String>,
    pub illustration_ids: Vec<String>,
}

/// Extract every `[ILLUSTRATION: illust-NNN]` id from chapter source.
pub fn extract_illustration_ids(source: &str) -> Vec<String> {
    let mut ids = Vec::new();
    for (idx, _) in source.match_indices("[ILLUSTRATION:") {
        let rest = &source[idx + "[ILLUSTRATION:".len()..];
        if let Some(end) = rest.find(']') {
            let id = rest[..end].trim().to_string();
            if !id.is_empty() && !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// Build the chapter-wide guidance block from cached analyses.
///
/// JP names inside the cached text are replaced with the merged
/// glossary's canonical renderings before injection, so the notes can
/// never re-introduce a non-canonical name. Returns `None` when no
/// referenced illustration has a cached analysis.
pub fn build_chapter_visual_guidance(
    illustration_ids: &[String],
    cache: &VisualCache,
    glossary: &BTreeMap<String, String>,
) -> Option<VisualGuidance> {
    let mut blocks: Vec<String> = Vec::new();
    let mut do_not_reveal: Vec<String> = Vec::new();
    let mut used_ids: Vec<String> = Vec::new();

    for id in illustration_ids {
        let Some(context) = cache.get(id) else {
            tracing::debug!(illustration = %id, "no cached visual context");
            continue;
        };
        blocks.push(format_context_block(id, context, glossary));
        for phrase in context.do_not_reveal() {
            if !do_not_reveal.contains(phrase) {
                do_not_reveal.push(phrase.clone());
            }
        }
        used_ids.push(id.clone());
    }

    if blocks.is_empty() {
        return None;
    }

    let mut block = blocks.join("\n\n");
    block.push('\n');
    block.push_str(CANON_EVENT_FIDELITY_DIRECTIVE);
    Some(VisualGuidance {
        block,
        do_not_reveal,
        illustration_ids: used_ids,
    })
}

fn format_context_block(
    id: &str,
    context: &VisualContext,
    glossary: &BTreeMap<String, String>,
) -> String {
    let canon = |text: &str| enforce_canon_names(text, glossary);
    let mut lines = vec![format!("--- ART DIRECTOR'S NOTES [{id}] ---")];
    lines.push(format!(
        "Scene Composition: {}",
        canon(context.composition.as_deref().unwrap_or("N/A"))
    ));
    lines.push(format!(
        "Emotional Context: {}",
        canon(context.emotional_delta.as_deref().unwrap_or("N/A"))
    ));
    if !context.key_details.is_empty() {
        lines.push("Key Visual Details:".to_string());
        for (key, value) in &context.key_details {
            lines.push(format!("  - {}: {}", canon(key), canon(value)));
        }
    }
    if !context.narrative_directives.is_empty() {
        lines.push("Translation Directives:".to_string());
        for directive in &context.narrative_directives {
            lines.push(format!("  - {}", canon(directive)));
        }
    }
    let spoilers = context.do_not_reveal();
    if !spoilers.is_empty() {
        lines.push(format!(
            "SPOILER PREVENTION: Do not mention: {}",
            spoilers.join(", ")
        ));
    }
    lines.push(format!("--- END ART DIRECTOR'S NOTES [{id}] ---"));
    lines.join("\n")
}

/// Replace JP names in visual text with their canonical renderings.
/// Longer keys substitute first so full names win over fragments.
fn enforce_canon_names(text: &str, glossary: &BTreeMap<String, String>) -> String {
    let mut keys: Vec<&String> = glossary
        .keys()
        .filter(|k| !k.is_ascii() && text.contains(k.as_str()))
        .collect();
    if keys.is_empty() {
        return text.to_string();
    }
    keys.sort_by_key(|k| std::cmp::Reverse(k.chars().count()));
    let mut result = text.to_string();
    for key in keys {
        if let Some(canonical) = glossary.get(key) {
            result = result.replace(key.as_str(), canonical);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use honyaku_types::SpoilerPrevention;

    fn cache_with(id: &str, context: VisualContext) -> VisualCache {
        let mut cache = VisualCache::default();
        cache.illustrations.insert(id.to_string(), context);
        cache
    }

    #[test]
    fn extracts_unique_ids_in_order() {
        let source = "text [ILLUSTRATION: illust-001] more\n[ILLUSTRATION: illust-002] and [ILLUSTRATION: illust-001]";
        assert_eq!(
            extract_illustration_ids(source),
            vec!["illust-001".to_string(), "illust-002".to_string()]
        );
    }

    #[test]
    fn guidance_includes_fidelity_directive_and_spoilers() {
        let cache = cache_with(
            "illust-001",
            VisualContext {
                composition: Some("Two figures under a frozen lake moon".into()),
                emotional_delta: Some("grief held back".into()),
                spoiler_prevention: Some(SpoilerPrevention {
                    do_not_reveal_before_text: vec!["the silver ring".into()],
                }),
                ..Default::default()
            },
        );
        let guidance = build_chapter_visual_guidance(
            &["illust-001".to_string()],
            &cache,
            &BTreeMap::new(),
        )
        .unwrap();
        assert!(guidance.block.contains("ART DIRECTOR'S NOTES [illust-001]"));
        assert!(guidance.block.contains("CANON EVENT FIDELITY"));
        assert_eq!(guidance.do_not_reveal, vec!["the silver ring"]);
    }

    #[test]
    fn canon_names_replace_jp_forms() {
        let glossary = BTreeMap::from([
            ("ティグル".to_string(), "Tigre".to_string()),
            ("ティグルヴルムド".to_string(), "Tigrevurmud".to_string()),
        ]);
        let cache = cache_with(
            "illust-003",
            VisualContext {
                composition: Some("ティグルヴルムドが弓を構える".into()),
                ..Default::default()
            },
        );
        let guidance = build_chapter_visual_guidance(
            &["illust-003".to_string()],
            &cache,
            &glossary,
        )
        .unwrap();
        // Longest key wins: the full name, not "Tigreヴルムド".
        assert!(guidance.block.contains("Tigrevurmud"));
        assert!(!guidance.block.contains("ティグル"));
    }

    #[test]
    fn missing_cache_entries_yield_none() {
        let cache = VisualCache::default();
        assert!(
            build_chapter_visual_guidance(
                &["illust-404".to_string()],
                &cache,
                &BTreeMap::new()
            )
            .is_none()
        );
    }
}
