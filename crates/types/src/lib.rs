//! Shared data model for the honyaku translation pipeline.
//!
//! This crate holds the serde types every other member works with:
//! the volume manifest and its chapters, the cross-volume continuity
//! pack, the pre-baked visual analysis cache, and translation results.

pub mod continuity;
pub mod lang;
pub mod manifest;
pub mod report;
pub mod visual;

pub use continuity::{ChapterSnapshot, ContinuityPack, Relationship};
pub use lang::TargetLanguage;
pub use manifest::{
    ChapterEntry, CharacterVoice, LanguageMetadata, Manifest, PipelineState, RtasRelationship,
    SemanticMetadata, StageState, TranslationStatus, TranslatorState, TranslatorStatus,
    VolumeMetadata,
};
pub use report::{AuditReport, LogEntry, TranslationLog, TranslationReport, TranslationResult};
pub use visual::{SpoilerPrevention, VisualCache, VisualContext};
