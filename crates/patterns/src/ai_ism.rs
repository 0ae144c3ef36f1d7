//! AI-ism candidate selection for the bad-prose index.
//!
//! Scoring every output sentence against the vector index would cost an
//! embedding call per sentence. Instead, cue tables per bad-prose
//! family prescreen the output; only cue-hit sentences go to the vector
//! check, which then confirms or clears them (negative anchors handle
//! prose that merely resembles a crutch).

/// Cues per category. English families first, then the Vietnamese
/// AI-ism families; cues from the wrong target language simply never
/// fire.
const CUE_TABLE: &[(&str, &[&str])] = &[
    (
        "filter_word",
        &[
            "I felt a", "I felt the", "I heard the sound of", "I saw her", "I saw his",
            "I noticed that", "I could feel", "I found myself", "I began to", "I started to feel",
            "seemed to sense",
        ],
    ),
    (
        "nominalization",
        &[
            "gave a small", "gave a shake of", "gave a wave of", "let out a sigh of",
            "came to a realization", "made a decision to", "offered a smile of",
        ],
    ),
    (
        "prepositional_bloat",
        &["in the direction of", "was located at", "positioned himself at", "positioned herself at"],
    ),
    (
        "ai_crutch",
        &[
            "shiver ran down", "hung heavy in the air", "stirred deep within",
            "seemed to slow down around", "couldn't help but feel", "like a knife",
            "washed over me", "washed over her", "washed over him", "thick with unspoken",
        ],
    ),
    ("vn_mot_cach", &["một cách"]),
    ("vn_mot_cam_giac", &["một cảm giác"]),
    ("vn_su_nominalization", &["Sự ", "Việc "]),
];

const MAX_SENTENCE_CHARS: usize = 200;

/// One output sentence suspected of being AI-ism prose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProseFlag {
    pub category: String,
    pub cue: String,
    /// The full sentence, the query for the vector check.
    pub sentence: String,
    pub line_number: usize,
}

fn sentences_of(line: &str) -> impl Iterator<Item = &str> {
    line.split_inclusive(['.', '!', '?', '…'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Prescreen translated output for bad-prose candidates. At most one
/// flag per (category, sentence); `max_flags` bounds the embedding batch.
pub fn detect_prose_flags(output: &str, max_flags: usize) -> Vec<ProseFlag> {
    let mut flags: Vec<ProseFlag> = Vec::new();
    for (idx, line) in output.lines().enumerate() {
        for sentence in sentences_of(line) {
            for (category, cues) in CUE_TABLE {
                let Some(cue) = cues.iter().find(|cue| sentence.contains(*cue)) else {
                    continue;
                };
                let truncated: String = sentence.chars().take(MAX_SENTENCE_CHARS).collect();
                if flags
                    .iter()
                    .any(|f| f.category == *category && f.sentence == truncated)
                {
                    continue;
                }
                flags.push(ProseFlag {
                    category: (*category).to_string(),
                    cue: (*cue).to_string(),
                    sentence: truncated,
                    line_number: idx + 1,
                });
                if flags.len() >= max_flags {
                    return flags;
                }
            }
        }
    }
    flags
}
