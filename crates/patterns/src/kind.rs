//! Store kinds and their per-kind tuning.
//!
//! The four stores share one implementation; only thresholds and the
//! category priority table differ. Polymorphism is a tag plus config,
//! not dispatch.

/// English grammar categories, highest priority first.
const ENGLISH_PRIORITIES: &[(&str, u8)] = &[
    ("contrastive_comparison", 10),
    ("dismissive_acknowledgment", 9),
    ("giving_receiving", 9),
    ("intensifiers", 8),
    ("structure_particles", 8),
    ("hedging", 7),
    ("desire_intention", 7),
    ("inner_monologue", 7),
    ("response_particles", 6),
    ("quotation_hearsay", 6),
    ("onomatopoeia", 6),
    ("natural_transitions", 5),
    ("concession_contrast", 5),
];

const SINO_VIETNAMESE_PRIORITIES: &[(&str, u8)] = &[
    ("cultivation_terms", 10),
    ("titles_and_ranks", 9),
    ("proper_nouns", 8),
    ("classical_idioms", 7),
    ("common_compounds", 5),
];

const VIETNAMESE_PRIORITIES: &[(&str, u8)] = &[
    ("contrastive_comparison", 9),
    ("giving_receiving", 8),
    ("sentence_final_particles", 8),
    ("hedging", 6),
    ("onomatopoeia", 6),
];

/// Bad-prose families, worst offenders first.
const AI_ISM_PRIORITIES: &[(&str, u8)] = &[
    ("filter_word", 10),
    ("vn_mot_cach", 10),
    ("ai_crutch", 9),
    ("vn_mot_cam_giac", 9),
    ("nominalization", 8),
    ("vn_su_nominalization", 8),
    ("prepositional_bloat", 7),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    EnglishGrammar,
    SinoVietnamese,
    VietnameseGrammar,
    /// Bad-prose index, scored against the chapter *output*.
    AiIsm,
}

#[derive(Debug, Clone, Copy)]
pub struct KindConfig {
    /// At or above: guidance is injected into the prompt.
    pub inject_threshold: f32,
    /// Between log and inject: recorded for audit, never injected.
    pub log_threshold: f32,
    pub category_priorities: &'static [(&'static str, u8)],
    pub default_priority: u8,
}

/// Negative-anchor constants, shared by every kind.
pub const NEGATIVE_ANCHOR_THRESHOLD: f32 = 0.72;
pub const NEGATIVE_ANCHOR_PENALTY: f32 = 0.15;

impl StoreKind {
    pub fn config(&self) -> KindConfig {
        match self {
            // Lowered from 0.82 for light-novel register variety.
            StoreKind::EnglishGrammar => KindConfig {
                inject_threshold: 0.78,
                log_threshold: 0.65,
                category_priorities: ENGLISH_PRIORITIES,
                default_priority: 5,
            },
            // Higher bar: Vietnamese tone complexity makes near-misses costly.
            StoreKind::SinoVietnamese => KindConfig {
                inject_threshold: 0.85,
                log_threshold: 0.70,
                category_priorities: SINO_VIETNAMESE_PRIORITIES,
                default_priority: 5,
            },
            StoreKind::VietnameseGrammar => KindConfig {
                inject_threshold: 0.70,
                log_threshold: 0.65,
                category_priorities: VIETNAMESE_PRIORITIES,
                default_priority: 5,
            },
            // A sentence at or above 0.80 to a known bad rendering is
            // flagged; 0.70..0.80 is recorded for review only.
            StoreKind::AiIsm => KindConfig {
                inject_threshold: 0.80,
                log_threshold: 0.70,
                category_priorities: AI_ISM_PRIORITIES,
                default_priority: 5,
            },
        }
    }

    /// Name of the persisted index file under the store directory.
    pub fn index_file_name(&self) -> &'static str {
        match self {
            StoreKind::EnglishGrammar => "english_grammar_patterns.json",
            StoreKind::SinoVietnamese => "sino_vietnamese_patterns.json",
            StoreKind::VietnameseGrammar => "vietnamese_grammar_patterns.json",
            StoreKind::AiIsm => "ai_ism_patterns.json",
        }
    }

    /// Default RAG source filename for this kind.
    pub fn rag_file_name(&self) -> &'static str {
        match self {
            StoreKind::EnglishGrammar => "english_grammar_rag.json",
            StoreKind::SinoVietnamese => "sino_vietnamese_rag.json",
            StoreKind::VietnameseGrammar => "vietnamese_grammar_rag.json",
            StoreKind::AiIsm => "ai_ism_rag.json",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StoreKind::EnglishGrammar => "english-grammar",
            StoreKind::SinoVietnamese => "sino-vietnamese",
            StoreKind::VietnameseGrammar => "vietnamese-grammar",
            StoreKind::AiIsm => "ai-ism",
        }
    }

    pub fn priority_for(&self, category: &str) -> u8 {
        let config = self.config();
        config
            .category_priorities
            .iter()
            .find(|(name, _)| *name == category)
            .map(|(_, priority)| *priority)
            .unwrap_or(config.default_priority)
    }
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "english-grammar" | "en" => Ok(StoreKind::EnglishGrammar),
            "sino-vietnamese" | "sino-vn" => Ok(StoreKind::SinoVietnamese),
            "vietnamese-grammar" | "vn" => Ok(StoreKind::VietnameseGrammar),
            "ai-ism" => Ok(StoreKind::AiIsm),
            other => Err(format!("unknown store kind: {other}")),
        }
    }
}
