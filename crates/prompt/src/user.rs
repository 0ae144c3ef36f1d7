//! Per-chapter user prompt assembly.

use honyaku_patterns::BulkGuidance;
use honyaku_types::TargetLanguage;

use crate::guidance;
use crate::visual::{MULTIMODAL_STRICT_SUFFIX, VisualGuidance};

/// Everything a chapter contributes to its prompt. Block order is the
/// contract:
/// previous context → title → source → Sino-VN guidance → gap guidance →
/// dialect guidance → pattern guidance → visual guidance + directives.
#[derive(Debug, Clone, Default)]
pub struct UserPromptArgs<'a> {
    pub chapter_id: &'a str,
    pub chapter_title: Option<&'a str>,
    /// Source body with the JP H1 title already stripped.
    pub source_text: &'a str,
    pub previous_context: Option<&'a str>,
    pub sino_guidance: Option<&'a BulkGuidance>,
    pub gap_guidance: Option<&'a str>,
    pub dialect_guidance: Option<&'a str>,
    pub pattern_guidance: Option<&'a BulkGuidance>,
    pub visual_guidance: Option<&'a VisualGuidance>,
}

impl UserPromptArgs<'_> {
    pub(crate) fn assemble(&self, target: TargetLanguage) -> String {
        let mut sections: Vec<String> = Vec::new();

        if let Some(context) = self.previous_context
            && !context.is_empty()
        {
            sections.push(format!("## Previous Chapter Context\n\n{context}"));
        }

        let title = self.chapter_title.unwrap_or(self.chapter_id);
        sections.push(format!(
            "## Chapter: {title}\n\nTranslate the following Japanese chapter into {}. \
             Output the full chapter as pure Markdown prose.\n\n<SOURCE>\n{}\n</SOURCE>",
            target.display_name(),
            self.source_text
        ));

        if target.is_vietnamese()
            && let Some(block) = self.sino_guidance.and_then(guidance::format_sino_vietnamese)
        {
            sections.push(block);
        }

        if let Some(gap) = self.gap_guidance
            && !gap.is_empty()
        {
            sections.push(gap.to_string());
        }

        if let Some(dialect) = self.dialect_guidance
            && !dialect.is_empty()
        {
            sections.push(dialect.to_string());
        }

        if let Some(patterns) = self.pattern_guidance {
            let block = match target {
                TargetLanguage::En => guidance::format_english_patterns(patterns),
                TargetLanguage::Vn => guidance::format_vietnamese_patterns(patterns),
            };
            if let Some(block) = block {
                sections.push(block);
            }
        }

        if let Some(visual) = self.visual_guidance {
            sections.push(format!("{}\n{}", visual.block, MULTIMODAL_STRICT_SUFFIX));
        }

        sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PromptLoader;

    #[test]
    fn minimal_prompt_has_title_and_source() {
        let loader = PromptLoader::new(TargetLanguage::En);
        let prompt = loader.build_user_prompt(&UserPromptArgs {
            chapter_id: "chapter_04",
            chapter_title: Some("Chapter 4"),
            source_text: "彼女は笑った。",
            ..Default::default()
        });
        assert!(prompt.contains("## Chapter: Chapter 4"));
        assert!(prompt.contains("彼女は笑った。"));
        assert!(prompt.contains("into English"));
    }

    #[test]
    fn previous_context_comes_first() {
        let loader = PromptLoader::new(TargetLanguage::En);
        let prompt = loader.build_user_prompt(&UserPromptArgs {
            chapter_id: "chapter_02",
            source_text: "本文",
            previous_context: Some("Ako confessed on the rooftop."),
            ..Default::default()
        });
        let ctx = prompt.find("Previous Chapter Context").unwrap();
        let body = prompt.find("## Chapter:").unwrap();
        assert!(ctx < body);
    }

    #[test]
    fn sino_guidance_only_for_vietnamese_target() {
        use honyaku_patterns::store::PatternMetadata;
        use honyaku_patterns::{GuidanceMatch, LookupStats};

        let sino = BulkGuidance {
            high_confidence: vec![GuidanceMatch {
                pattern_id: "dao_direct".into(),
                similarity: 1.0,
                raw_similarity: 1.0,
                neg_penalty: 0.0,
                queried_term: "修道".into(),
                metadata: PatternMetadata {
                    source: "修道".into(),
                    target: "tu đạo".into(),
                    ..Default::default()
                },
                direct: true,
            }],
            medium_confidence: Vec::new(),
            stats: LookupStats::default(),
        };

        let args = UserPromptArgs {
            chapter_id: "chapter_01",
            source_text: "修道之人",
            sino_guidance: Some(&sino),
            ..Default::default()
        };
        let en_prompt = PromptLoader::new(TargetLanguage::En).build_user_prompt(&args);
        assert!(!en_prompt.contains("Sino-Vietnamese"));
        let vn_prompt = PromptLoader::new(TargetLanguage::Vn).build_user_prompt(&args);
        assert!(vn_prompt.contains("Sino-Vietnamese Term Guidance"));
        assert!(vn_prompt.contains("tu đạo"));
    }
}
