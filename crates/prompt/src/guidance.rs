//! Formatting of per-chapter guidance blocks.
//!
//! Only high-confidence matches are ever formatted; medium-confidence
//! guidance is logged upstream and deliberately never reaches the prompt.

use honyaku_patterns::BulkGuidance;

const MAX_SINO_ITEMS: usize = 10;
const MAX_PATTERN_ITEMS: usize = 8;

/// Sino-Vietnamese (Hán Việt) term guidance block.
pub fn format_sino_vietnamese(guidance: &BulkGuidance) -> Option<String> {
    if guidance.high_confidence.is_empty() {
        return None;
    }
    let mut lines = vec![
        "## Sino-Vietnamese Term Guidance".to_string(),
        String::new(),
        "The following Vietnamese renderings for Hán Việt terms are recommended:".to_string(),
        String::new(),
    ];
    for item in guidance.high_confidence.iter().take(MAX_SINO_ITEMS) {
        let mut entry = format!("- **{}** → **{}**", item.metadata.source, item.metadata.target);
        if !item.metadata.meaning.is_empty() {
            entry.push_str(&format!(" ({})", item.metadata.meaning));
        }
        if !item.metadata.avoid.is_empty() {
            entry.push_str(&format!(" [Avoid: {}]", item.metadata.avoid.join(", ")));
        }
        lines.push(entry);
    }
    lines.push(String::new());
    Some(lines.join("\n"))
}

/// Natural English phrasing guidance for detected JP grammar patterns.
pub fn format_english_patterns(guidance: &BulkGuidance) -> Option<String> {
    if guidance.high_confidence.is_empty() {
        return None;
    }
    let mut lines = vec![
        "## Natural English Phrasing Guidance".to_string(),
        String::new(),
        "These Japanese grammar patterns were detected in this chapter.".to_string(),
        "Prefer the natural English equivalents over literal renderings:".to_string(),
        String::new(),
    ];
    for item in guidance.high_confidence.iter().take(MAX_PATTERN_ITEMS) {
        let structure = if item.metadata.structure.is_empty() {
            item.metadata.source.as_str()
        } else {
            item.metadata.structure.as_str()
        };
        lines.push(format!(
            "- **{structure}** → **{}**",
            item.metadata.target_pattern
        ));
        if !item.metadata.target.is_empty() {
            lines.push(format!("  *Example:* \"{}\"", item.metadata.target));
        }
        if item.similarity >= 0.90 {
            lines.push(format!("  _(High confidence: {:.2})_", item.similarity));
        }
        lines.push(String::new());
    }
    lines.push("---".to_string());
    lines.push(
        "**Note:** Use these patterns for natural, conversational English instead of literal translations."
            .to_string(),
    );
    lines.push(String::new());
    Some(lines.join("\n"))
}

/// Natural Vietnamese phrasing guidance, with the anti-AI-ism reminder.
pub fn format_vietnamese_patterns(guidance: &BulkGuidance) -> Option<String> {
    if guidance.high_confidence.is_empty() {
        return None;
    }
    let mut lines = vec![
        "## Hướng Dẫn Diễn Đạt Tiếng Việt Tự Nhiên".to_string(),
        String::new(),
        "Các mẫu ngữ pháp tiếng Nhật sau đã được phát hiện trong chương này.".to_string(),
        "Dùng cách diễn đạt tiếng Việt tự nhiên thay vì dịch trực tiếp:".to_string(),
        String::new(),
    ];
    for item in guidance.high_confidence.iter().take(MAX_PATTERN_ITEMS) {
        let structure = if item.metadata.structure.is_empty() {
            item.metadata.source.as_str()
        } else {
            item.metadata.structure.as_str()
        };
        lines.push(format!(
            "- **{structure}** → **{}**",
            item.metadata.target_pattern
        ));
        if !item.metadata.target.is_empty() {
            lines.push(format!("  *Ví dụ:* \"{}\"", item.metadata.target));
        }
        if let Some(rule) = item.metadata.usage_rules.first() {
            lines.push(format!("  _Lưu ý: {rule}_"));
        }
        lines.push(String::new());
    }
    lines.push("---".to_string());
    lines.push(
        "**QUAN TRỌNG:** Tránh các lỗi AI-ism: 'một cách [adj]', 'một cảm giác', 'Sự [verb]', 'Việc [verb]'."
            .to_string(),
    );
    lines.push("Dùng tiếng Việt tự nhiên như người bản xứ đọc light novel.".to_string());
    lines.push(String::new());
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use honyaku_patterns::{GuidanceMatch, LookupStats};
    use honyaku_patterns::store::PatternMetadata;

    fn guidance_with(high: Vec<GuidanceMatch>) -> BulkGuidance {
        BulkGuidance {
            high_confidence: high,
            medium_confidence: Vec::new(),
            stats: LookupStats::default(),
        }
    }

    fn a_match(source: &str, target: &str, similarity: f32) -> GuidanceMatch {
        GuidanceMatch {
            pattern_id: "p_ex0".into(),
            similarity,
            raw_similarity: similarity,
            neg_penalty: 0.0,
            queried_term: source.into(),
            metadata: PatternMetadata {
                category: "contrastive_comparison".into(),
                pattern_id_base: "p".into(),
                source: source.into(),
                target: target.into(),
                target_pattern: "X is one thing, but Y...".into(),
                priority: 10,
                ..Default::default()
            },
            direct: false,
        }
    }

    #[test]
    fn empty_guidance_formats_to_none() {
        assert!(format_english_patterns(&guidance_with(vec![])).is_none());
        assert!(format_sino_vietnamese(&guidance_with(vec![])).is_none());
    }

    #[test]
    fn english_block_lists_pattern_and_example() {
        let block = format_english_patterns(&guidance_with(vec![a_match(
            "AはBだが",
            "Maria's one thing, but...",
            0.93,
        )]))
        .unwrap();
        assert!(block.contains("X is one thing, but Y..."));
        assert!(block.contains("Maria's one thing"));
        assert!(block.contains("High confidence: 0.93"));
    }

    #[test]
    fn item_count_is_capped() {
        let matches: Vec<GuidanceMatch> = (0..20)
            .map(|i| a_match(&format!("src{i}"), &format!("tgt{i}"), 0.85))
            .collect();
        let block = format_english_patterns(&guidance_with(matches)).unwrap();
        assert!(block.contains("src7"));
        assert!(!block.contains("src9"));
    }
}
