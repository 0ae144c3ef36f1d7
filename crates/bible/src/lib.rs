//! Series bibles: canonical per-series terminology and world rules.
//!
//! One JSON file per series plus a registry index. The registry resolves
//! a volume manifest to its bible (explicit id, volume short-hash, or
//! fuzzy title match); the bible flattens its categories into the
//! authoritative JP→EN glossary and formats the prompt block.

pub mod error;
pub mod registry;
pub mod series;

pub use error::{BibleError, Result};
pub use registry::{BibleIndex, BibleRegistry, IndexEntry, extract_short_id};
pub use series::{
    BibleEntry, CategoryPath, Geography, SeriesBible, WorldException, WorldSetting,
};
