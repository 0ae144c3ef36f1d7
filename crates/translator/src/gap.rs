//! Semantic gap detection.
//!
//! Pre-translation scan for constructions that routinely lose meaning:
//! emotion+action combos, ruby annotations with semantic weight
//! (kira-kira names, character-name ghost ruby, archaic readings), and
//! sarcasm/subtext markers. Low volume, high precision: each flag
//! becomes one line of prompt guidance.

use std::sync::OnceLock;

use regex::Regex;

const MAX_SHOWN_PER_GAP: usize = 5;

const EMOTION_MARKERS: &[&str] = &[
    "泣き", "涙", "笑い", "笑み", "怒り", "照れ", "震え", "俯き", "頬を染め",
];
const SARCASM_MARKERS: &[&str] = &[
    "はいはい", "（棒）", "(棒)", "わざとらしく", "皮肉", "白々しい", "どうだか",
];
const ARCHAIC_KANJI: &[char] = &['頷', '呟', '躊', '躇', '俯', '睨', '囁'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RubyKind {
    /// Unusual name reading with wordplay: romanize + TL-note footnote.
    KiraKira,
    /// Plain pronunciation ruby on a name: use the roster romanization.
    CharacterName,
    /// Old-style reading for atmosphere: contextual equivalent.
    Archaic,
}

#[derive(Debug, Clone)]
pub struct EmotionActionFlag {
    pub line_number: usize,
    pub context: String,
    pub marker: String,
}

#[derive(Debug, Clone)]
pub struct RubyFlag {
    pub line_number: usize,
    pub kanji: String,
    pub reading: String,
    pub kind: RubyKind,
}

#[derive(Debug, Clone)]
pub struct SarcasmFlag {
    pub line_number: usize,
    pub context: String,
    pub marker: String,
}

#[derive(Debug, Clone, Default)]
pub struct GapFlags {
    pub emotion_action: Vec<EmotionActionFlag>,
    pub ruby: Vec<RubyFlag>,
    pub sarcasm: Vec<SarcasmFlag>,
}

impl GapFlags {
    pub fn total(&self) -> usize {
        self.emotion_action.len() + self.ruby.len() + self.sarcasm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

fn ruby_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // 漢字《よみ》 and ｜漢字《よみ》 ruby notation.
    RE.get_or_init(|| Regex::new(r"｜?([\p{Han}]{1,8})《([^》]{1,20})》").unwrap())
}

fn is_katakana(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| matches!(c, '\u{30A0}'..='\u{30FF}' | 'ー'))
}

fn classify_ruby(kanji: &str, reading: &str) -> RubyKind {
    if kanji.chars().count() == 1 && kanji.chars().all(|c| ARCHAIC_KANJI.contains(&c)) {
        RubyKind::Archaic
    } else if is_katakana(reading) {
        RubyKind::KiraKira
    } else {
        RubyKind::CharacterName
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Scan a chapter for semantic gaps.
pub fn detect_gaps(source: &str) -> GapFlags {
    let mut flags = GapFlags::default();

    for (idx, line) in source.lines().enumerate() {
        let line_number = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // Emotion marker + simultaneous-action particle on one line.
        if trimmed.contains("ながら") || trimmed.contains("つつ") {
            if let Some(marker) = EMOTION_MARKERS.iter().find(|m| trimmed.contains(*m)) {
                flags.emotion_action.push(EmotionActionFlag {
                    line_number,
                    context: truncate_chars(trimmed, 80),
                    marker: (*marker).to_string(),
                });
            }
        }

        for capture in ruby_regex().captures_iter(trimmed) {
            let kanji = capture[1].to_string();
            let reading = capture[2].to_string();
            let kind = classify_ruby(&kanji, &reading);
            flags.ruby.push(RubyFlag {
                line_number,
                kanji,
                reading,
                kind,
            });
        }

        if let Some(marker) = SARCASM_MARKERS.iter().find(|m| trimmed.contains(*m)) {
            flags.sarcasm.push(SarcasmFlag {
                line_number,
                context: truncate_chars(trimmed, 80),
                marker: (*marker).to_string(),
            });
        }
    }

    flags
}

/// Render detected gaps as a prompt guidance block.
pub fn format_gap_guidance(flags: &GapFlags) -> Option<String> {
    if flags.is_empty() {
        return None;
    }
    let mut lines = vec![
        "## Translation Guidance: Semantic Gaps Detected".to_string(),
        String::new(),
        format!(
            "This chapter contains **{} semantic gap(s)** requiring special attention:",
            flags.total()
        ),
        String::new(),
    ];

    if !flags.emotion_action.is_empty() {
        lines.push(format!(
            "### Emotion+Action Markers ({} instances)",
            flags.emotion_action.len()
        ));
        lines.push(
            "**Treatment:** Separate emotion from action. Translate the emotion explicitly, keep the action natural."
                .to_string(),
        );
        for flag in flags.emotion_action.iter().take(MAX_SHOWN_PER_GAP) {
            lines.push(format!(
                "- **Line {}:** `{}...`",
                flag.line_number, flag.context
            ));
        }
        if flags.emotion_action.len() > MAX_SHOWN_PER_GAP {
            lines.push(format!(
                "  _(+{} more instances)_",
                flags.emotion_action.len() - MAX_SHOWN_PER_GAP
            ));
        }
        lines.push(String::new());
    }

    if !flags.ruby.is_empty() {
        lines.push(format!("### Ruby Annotations ({} instances)", flags.ruby.len()));
        let kira: Vec<&RubyFlag> = flags
            .ruby
            .iter()
            .filter(|f| f.kind == RubyKind::KiraKira)
            .collect();
        let names: Vec<&RubyFlag> = flags
            .ruby
            .iter()
            .filter(|f| f.kind == RubyKind::CharacterName)
            .collect();
        let archaic: Vec<&RubyFlag> = flags
            .ruby
            .iter()
            .filter(|f| f.kind == RubyKind::Archaic)
            .collect();
        if !kira.is_empty() {
            lines.push(format!(
                "**Kira-kira Names ({}):** unusual readings with wordplay. Use the romanized reading plus a TL-note footnote explaining the pun.",
                kira.len()
            ));
            for flag in kira.iter().take(3) {
                lines.push(format!("- `{}` read as `{}`", flag.kanji, flag.reading));
            }
        }
        if !names.is_empty() {
            lines.push(format!(
                "**Character-Name Ruby ({}):** plain pronunciation ruby. Use the established romanization from the roster, no footnote.",
                names.len()
            ));
        }
        if !archaic.is_empty() {
            lines.push(format!(
                "**Archaic Kanji ({}):** old-style readings for atmosphere. Use the contextual English equivalent (頷→nod, 呟→mutter).",
                archaic.len()
            ));
        }
        lines.push(String::new());
    }

    if !flags.sarcasm.is_empty() {
        lines.push(format!(
            "### Sarcasm/Subtext Markers ({} instances)",
            flags.sarcasm.len()
        ));
        lines.push(
            "**Treatment:** Adjust tone to convey the hidden meaning; keep the surface words deniable."
                .to_string(),
        );
        for flag in flags.sarcasm.iter().take(MAX_SHOWN_PER_GAP) {
            lines.push(format!(
                "- **Line {}** ({}): `{}...`",
                flag.line_number, flag.marker, flag.context
            ));
        }
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.push(
        "**Note:** These gaps are automatically detected. Use your judgment to preserve intent."
            .to_string(),
    );
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emotion_plus_nagara_is_flagged() {
        let flags = detect_gaps("彼女は泣きながら走った。");
        assert_eq!(flags.emotion_action.len(), 1);
        assert_eq!(flags.emotion_action[0].marker, "泣き");
    }

    #[test]
    fn action_without_emotion_is_not_flagged() {
        let flags = detect_gaps("彼は歩きながら話した。");
        assert!(flags.emotion_action.is_empty());
    }

    #[test]
    fn ruby_kinds_are_classified() {
        let flags = detect_gaps("｜聖剣《エクスカリバー》を抜き、彼は頷《うなず》いた。\n彼女の名は光宙《ぴかちゅう》。");
        let kira = flags.ruby.iter().filter(|f| f.kind == RubyKind::KiraKira).count();
        let archaic = flags.ruby.iter().filter(|f| f.kind == RubyKind::Archaic).count();
        let name = flags
            .ruby
            .iter()
            .filter(|f| f.kind == RubyKind::CharacterName)
            .count();
        assert_eq!(kira, 1);
        assert_eq!(archaic, 1);
        assert_eq!(name, 1);
    }

    #[test]
    fn sarcasm_markers_are_flagged() {
        let flags = detect_gaps("「はいはい、すごいすごい」");
        assert_eq!(flags.sarcasm.len(), 1);
    }

    #[test]
    fn guidance_names_each_gap_class() {
        let flags = detect_gaps("彼女は泣きながら走った。\n「はいはい」\n光宙《ぴかちゅう》");
        let block = format_gap_guidance(&flags).unwrap();
        assert!(block.contains("Emotion+Action"));
        assert!(block.contains("Ruby Annotations"));
        assert!(block.contains("Sarcasm/Subtext"));
        assert!(format_gap_guidance(&GapFlags::default()).is_none());
    }
}
