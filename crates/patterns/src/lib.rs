//! Semantic pattern stores for translation guidance.
//!
//! A [`PatternStore`] indexes translation patterns from a JSON RAG
//! source and answers similarity queries with a negative-anchor penalty
//! scheme. Four store kinds exist (English grammar, Sino-Vietnamese
//! disambiguation, Vietnamese grammar, and the AI-ism bad-prose index);
//! they share one implementation and differ only in per-kind config.
//! The first three are queried against the chapter source, the AI-ism
//! index against the translated output.
//!
//! The `kanji`, `grammar`, and `ai_ism` modules hold the text detectors
//! that produce the store queries.

pub mod ai_ism;
pub mod error;
pub mod grammar;
pub mod kanji;
pub mod kind;
pub mod math;
pub mod pinyin;
pub mod rag;
pub mod store;

pub use ai_ism::{ProseFlag, detect_prose_flags};
pub use error::{PatternError, Result};
pub use grammar::{DetectedPattern, detect_patterns};
pub use kanji::extract_unique_compounds;
pub use kind::{KindConfig, StoreKind};
pub use rag::RagSource;
pub use store::{
    BulkGuidance, Embedder, GuidanceMatch, GuidanceQuery, LookupStats, PatternStore, SearchFilters,
    SearchMatch,
};
