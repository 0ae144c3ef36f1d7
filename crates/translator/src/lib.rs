//! The translation engine: per-chapter processing and the volume
//! orchestrator.
//!
//! [`ChapterProcessor`] turns one JP chapter into one output file
//! (detectors, RAG guidance, prompt assembly, the LLM call, cleanup,
//! audit). [`TranslatorAgent`] owns the volume lifecycle: bible and
//! continuity resolution, the shared volume cache, the resumable
//! chapter loop with model fallback, and finalization.

pub mod agent;
pub mod audit;
pub mod cjk;
pub mod continuity;
pub mod dialect;
pub mod error;
pub mod gap;
pub mod leak;
pub mod processor;
pub mod scene_breaks;
pub mod titles;

pub use agent::{AgentConfig, TranslatorAgent};
pub use error::{Result, TranslatorError};
pub use processor::{ChapterProcessor, ChapterRequest, ProcessorConfig};
