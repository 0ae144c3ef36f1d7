//! CLI configuration.
//!
//! Defaults, overlaid by `<work_dir>/config.json` when present, overlaid
//! by flags. The API key only ever comes from the environment.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};

const DEFAULT_WORK_DIR: &str = "./WORK";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub fallback_model: String,
    pub requests_per_minute: u32,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub volume_cache_ttl_seconds: u64,
    pub enable_caching: bool,
    pub thinking_mode: ThinkingMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThinkingMode {
    pub enabled: bool,
    pub save_to_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-pro".to_string(),
            fallback_model: "gemini-2.5-flash".to_string(),
            requests_per_minute: 10,
            temperature: 0.7,
            max_output_tokens: 65536,
            volume_cache_ttl_seconds: 7200,
            enable_caching: true,
            thinking_mode: ThinkingMode::default(),
        }
    }
}

impl Config {
    pub fn load(work_dir: &Path) -> Result<Self> {
        let path = work_dir.join("config.json");
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| eyre!("failed to read {}: {e}", path.display()))?;
        serde_json::from_str(&text).map_err(|e| eyre!("invalid {}: {e}", path.display()))
    }
}

/// Resolve the working directory: flag > env (handled by clap) > default.
pub fn resolve_work_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR))
}

/// The provider API key, from either accepted variable.
pub fn resolve_api_key() -> Result<String> {
    std::env::var("GOOGLE_API_KEY")
        .or_else(|_| std::env::var("GEMINI_API_KEY"))
        .map_err(|_| eyre!("set GOOGLE_API_KEY or GEMINI_API_KEY"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert!(config.enable_caching);
    }

    #[test]
    fn partial_config_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"requests_per_minute": 4, "thinking_mode": {"enabled": true}}"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.requests_per_minute, 4);
        assert!(config.thinking_mode.enabled);
        assert_eq!(config.fallback_model, "gemini-2.5-flash");
    }
}
