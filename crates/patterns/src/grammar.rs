//! Japanese grammar pattern detection.
//!
//! Lightweight indicator scan that feeds the grammar pattern stores: each
//! hit names a store category, the indicator that fired, and the line it
//! fired on (the query context for vector search).

use std::collections::HashMap;

/// Indicator tables per category. Order within a table matters: longer,
/// more specific indicators come first so 「って言う」 wins over 「って」.
const INDICATOR_TABLE: &[(&str, &[&str])] = &[
    ("contrastive_comparison", &["のに対して", "ですが", "だが", "けど"]),
    (
        "giving_receiving",
        &["くれた", "くれる", "もらった", "もらう", "あげた", "あげる"],
    ),
    ("structure_particles", &["わけがない", "わけ", "はず", "こそ"]),
    ("desire_intention", &["てほしい", "気になる", "たくて", "たい"]),
    (
        "quotation_hearsay",
        &["って言う", "って言った", "というか", "という", "そうだ", "らしい"],
    ),
    ("concession_contrast", &["にしても", "くせに", "のに"]),
    ("inner_monologue", &["思わず", "なぜか", "ふと"]),
    ("intensifiers", &["めっちゃ", "すごく", "かなり", "結構"]),
    ("hedging", &["なんか", "ちょっと", "たぶん"]),
    ("onomatopoeia", &["ドキドキ", "ニヤリ", "チラッ", "ゴクリ", "ジロジロ"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedPattern {
    pub category: String,
    pub indicator: String,
    /// The line the indicator fired on, used as query context.
    pub context: String,
    pub line_number: usize,
    pub occurrences: usize,
}

/// Scan JP text for grammar indicators and return the `top_n` most
/// frequent (category, indicator) hits, each with its first context line.
pub fn detect_patterns(text: &str, top_n: usize) -> Vec<DetectedPattern> {
    let mut found: HashMap<(String, String), DetectedPattern> = HashMap::new();

    for (line_idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        for (category, indicators) in INDICATOR_TABLE {
            for indicator in *indicators {
                let hits = trimmed.matches(indicator).count();
                if hits == 0 {
                    continue;
                }
                found
                    .entry((category.to_string(), indicator.to_string()))
                    .and_modify(|p| p.occurrences += hits)
                    .or_insert_with(|| DetectedPattern {
                        category: category.to_string(),
                        indicator: indicator.to_string(),
                        context: truncate_chars(trimmed, 80),
                        line_number: line_idx + 1,
                        occurrences: hits,
                    });
                // Longest indicator wins per category per line.
                break;
            }
        }
    }

    let mut patterns: Vec<DetectedPattern> = found.into_values().collect();
    patterns.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then(a.category.cmp(&b.category))
            .then(a.indicator.cmp(&b.indicator))
    });
    patterns.truncate(top_n);
    patterns
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_contrastive_kedo() {
        let patterns = detect_patterns("真理亜は変だけど、如月さんも結構変だ", 10);
        let categories: Vec<&str> = patterns.iter().map(|p| p.category.as_str()).collect();
        assert!(categories.contains(&"contrastive_comparison"));
        assert!(categories.contains(&"intensifiers")); // 結構
    }

    #[test]
    fn longer_indicator_shadows_shorter() {
        let patterns = detect_patterns("嘘だって言うの？", 10);
        let hit = patterns
            .iter()
            .find(|p| p.category == "quotation_hearsay")
            .unwrap();
        assert_eq!(hit.indicator, "って言う");
    }

    #[test]
    fn frequency_ranks_results() {
        let text = "なんか変だ。\nなんか怖い。\nドキドキした。";
        let patterns = detect_patterns(text, 10);
        assert_eq!(patterns[0].indicator, "なんか");
        assert_eq!(patterns[0].occurrences, 2);
    }

    #[test]
    fn top_n_limits_output() {
        let text = "けど なんか すごく ふと はず らしい のに";
        let patterns = detect_patterns(text, 3);
        assert_eq!(patterns.len(), 3);
    }
}
