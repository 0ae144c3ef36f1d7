//! Volume directory access for the translation pipeline.
//!
//! A volume is a directory produced by the Librarian: `manifest.json`,
//! `JP/` sources, asset folders, and the optional `visual_cache.json` /
//! `continuity_pack.json`. This crate owns every read and write against
//! that layout. Writes that participate in resumability (manifest, log,
//! continuity pack) are write-temp-then-rename.

pub mod error;
pub mod volume;

pub use error::{Result, VolumeStorageError};
pub use volume::VolumeStorage;
