//! Regional dialect detection.
//!
//! Regex-free marker scan for the dialects that actually show up in
//! light novels. A hit produces a guidance block naming the dialect and
//! the register advice; silence means standard Japanese.

const KANSAI_MARKERS: &[&str] = &[
    "やねん", "へんか", "せやな", "せやけど", "ちゃうん", "ちゃうわ", "あかん",
    "ほんま", "おおきに", "なんでやねん", "やんか", "まっせ",
];

const TOHOKU_MARKERS: &[&str] = &["だべ", "んだな", "んだべ", "べさ", "だっぺ"];

const MIN_HITS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Kansai,
    Tohoku,
}

impl Dialect {
    fn name(&self) -> &'static str {
        match self {
            Dialect::Kansai => "Kansai-ben",
            Dialect::Tohoku => "Tohoku-ben",
        }
    }

    fn advice(&self) -> &'static str {
        match self {
            Dialect::Kansai => {
                "Render as relaxed, fast-talking colloquial English with comic timing. \
                 Do NOT map to any real-world English regional accent; convey the energy \
                 through rhythm and word choice."
            }
            Dialect::Tohoku => {
                "Render as unhurried rural speech: simple vocabulary, dropped g's at most. \
                 Keep it warm, never mocking."
            }
        }
    }
}

/// Detect dialect speech in a chapter. Requires at least two marker hits
/// to avoid firing on one-off quotations.
pub fn detect_dialects(source: &str) -> Option<String> {
    let mut detected: Vec<(Dialect, usize)> = Vec::new();
    for (dialect, markers) in [
        (Dialect::Kansai, KANSAI_MARKERS),
        (Dialect::Tohoku, TOHOKU_MARKERS),
    ] {
        let hits: usize = markers.iter().map(|m| source.matches(m).count()).sum();
        if hits >= MIN_HITS {
            detected.push((dialect, hits));
        }
    }
    if detected.is_empty() {
        return None;
    }

    let mut lines = vec![
        "## Dialect Guidance".to_string(),
        String::new(),
        "Regional dialect speech detected in this chapter:".to_string(),
        String::new(),
    ];
    for (dialect, hits) in detected {
        lines.push(format!(
            "- **{}** ({hits} marker hits). {}",
            dialect.name(),
            dialect.advice()
        ));
    }
    lines.push(String::new());
    lines.push(
        "Keep each speaker's dialect consistent for the whole chapter; standard-Japanese \
         speakers stay standard."
            .to_string(),
    );
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kansai_speech_is_detected() {
        let source = "「なんでやねん！」\n「ほんま、あかんわ」";
        let guidance = detect_dialects(source).unwrap();
        assert!(guidance.contains("Kansai-ben"));
    }

    #[test]
    fn single_marker_does_not_fire() {
        assert!(detect_dialects("「ほんま？」").is_none());
    }

    #[test]
    fn standard_japanese_yields_none() {
        assert!(detect_dialects("彼女は静かに笑った。").is_none());
    }
}
