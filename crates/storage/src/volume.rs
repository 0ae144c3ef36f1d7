//! Filesystem layout of one volume and the operations against it.

use std::path::{Path, PathBuf};

use tokio::fs;

use honyaku_types::{ContinuityPack, Manifest, TargetLanguage, TranslationLog, VisualCache};

use crate::error::{Result, VolumeStorageError};

/// Handle to a volume working directory.
///
/// ```text
/// <volume_dir>/
///   manifest.json
///   JP/CHAPTER_NN_JP.md
///   <LANG>/CHAPTER_NN_<LANG>.md     <- written here
///   visual_cache.json               <- read-only input
///   continuity_pack.json            <- read and (re)written
///   translation_log.json            <- written here
///   THINKING/<chapter>_THINKING.md  <- optional
/// ```
#[derive(Debug, Clone)]
pub struct VolumeStorage {
    root: PathBuf,
}

impl VolumeStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    // ── Manifest ────────────────────────────────────────────────────

    pub async fn load_manifest(&self) -> Result<Manifest> {
        let path = self.manifest_path();
        if !path.exists() {
            return Err(VolumeStorageError::ManifestNotFound {
                path: path.display().to_string(),
            });
        }
        let text = fs::read_to_string(&path)
            .await
            .map_err(|e| VolumeStorageError::operation("read manifest", e))?;
        Manifest::from_json(&text).map_err(|e| VolumeStorageError::InvalidManifest {
            message: e.to_string(),
            source: Some(eyre::Report::new(e)),
        })
    }

    /// Durable checkpoint: the per-chapter loop calls this after every
    /// chapter so a crash resumes cleanly.
    pub async fn save_manifest(&self, manifest: &Manifest) -> Result<()> {
        let text = serde_json::to_string_pretty(manifest)
            .map_err(|e| VolumeStorageError::operation("serialize manifest", e))?;
        self.write_atomic(&self.manifest_path(), &text).await
    }

    // ── Chapter sources and outputs ─────────────────────────────────

    pub fn source_path(&self, source_file: &str) -> PathBuf {
        self.root.join("JP").join(source_file)
    }

    pub async fn read_source(&self, source_file: &str) -> Result<String> {
        let path = self.source_path(source_file);
        if !path.exists() {
            return Err(VolumeStorageError::SourceNotFound {
                path: path.display().to_string(),
            });
        }
        fs::read_to_string(&path)
            .await
            .map_err(|e| VolumeStorageError::operation("read chapter source", e))
    }

    pub fn output_dir(&self, lang: TargetLanguage) -> PathBuf {
        self.root.join(lang.output_dir())
    }

    pub fn output_path(&self, lang: TargetLanguage, file_name: &str) -> PathBuf {
        self.output_dir(lang).join(file_name)
    }

    pub async fn write_output(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| VolumeStorageError::operation("create output directory", e))?;
        }
        self.write_atomic(path, content).await
    }

    // ── Optional inputs ─────────────────────────────────────────────

    pub async fn load_visual_cache(&self) -> Result<Option<VisualCache>> {
        self.load_optional_json("visual_cache.json").await
    }

    pub async fn load_continuity_pack(&self) -> Result<Option<ContinuityPack>> {
        self.load_optional_json("continuity_pack.json").await
    }

    pub async fn save_continuity_pack(&self, pack: &ContinuityPack) -> Result<()> {
        let text = serde_json::to_string_pretty(pack)
            .map_err(|e| VolumeStorageError::operation("serialize continuity pack", e))?;
        self.write_atomic(&self.root.join("continuity_pack.json"), &text)
            .await
    }

    // ── Translation log ─────────────────────────────────────────────

    pub async fn load_log(&self) -> Result<TranslationLog> {
        Ok(self
            .load_optional_json("translation_log.json")
            .await?
            .unwrap_or_default())
    }

    pub async fn save_log(&self, log: &TranslationLog) -> Result<()> {
        let text = serde_json::to_string_pretty(log)
            .map_err(|e| VolumeStorageError::operation("serialize translation log", e))?;
        self.write_atomic(&self.root.join("translation_log.json"), &text)
            .await
    }

    // ── Thinking transcripts ────────────────────────────────────────

    pub async fn write_thinking(&self, chapter_id: &str, content: &str) -> Result<()> {
        let dir = self.root.join("THINKING");
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| VolumeStorageError::operation("create THINKING directory", e))?;
        let path = dir.join(format!("{chapter_id}_THINKING.md"));
        self.write_atomic(&path, content).await
    }

    // ── Helpers ─────────────────────────────────────────────────────

    async fn load_optional_json<T: serde::de::DeserializeOwned>(
        &self,
        file_name: &str,
    ) -> Result<Option<T>> {
        let path = self.root.join(file_name);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .await
            .map_err(|e| VolumeStorageError::operation(format!("read {file_name}"), e))?;
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| VolumeStorageError::operation(format!("parse {file_name}"), e))
    }

    async fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());
        let tmp = path.with_file_name(format!("{file_name}.tmp"));
        fs::write(&tmp, content)
            .await
            .map_err(|e| VolumeStorageError::operation(format!("write {file_name}"), e))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| VolumeStorageError::operation(format!("commit {file_name}"), e))?;
        Ok(())
    }
}
