//! Pattern store maintenance. Index rebuilds happen out-of-band;
//! translation runs treat the stores as read-only.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use eyre::{Result, eyre};

use honyaku_client::GeminiBackend;
use honyaku_patterns::{PatternStore, StoreKind};

use crate::EXIT_INVALID;
use crate::cli::PatternCommands;
use crate::config::{Config, resolve_api_key};

use super::BackendEmbedder;

pub async fn run(work_dir: &Path, _config: &Config, command: PatternCommands) -> Result<i32> {
    match command {
        PatternCommands::Rebuild { kind } => rebuild(work_dir, &kind).await,
    }
}

async fn rebuild(work_dir: &Path, kind: &str) -> Result<i32> {
    let kind: StoreKind = match kind.parse() {
        Ok(kind) => kind,
        Err(err) => {
            eprintln!("{err}");
            return Ok(EXIT_INVALID);
        }
    };

    let rag_path = work_dir.join("config").join(kind.rag_file_name());
    if !rag_path.exists() {
        eprintln!("RAG source not found: {}", rag_path.display());
        return Ok(EXIT_INVALID);
    }

    let api_key = resolve_api_key()?;
    let backend = Arc::new(
        GeminiBackend::new(api_key, Duration::from_secs(60))
            .map_err(|e| eyre!("failed to build provider client: {e}"))?,
    );
    let embedder = Arc::new(BackendEmbedder(backend));

    let store_dir = work_dir.join("vector_store");
    let mut store = PatternStore::open(kind, &store_dir, &rag_path, embedder).await?;
    let counts = store.build_index(true).await?;

    let total: usize = counts.values().sum();
    println!("Rebuilt {} index: {total} pattern(s)", kind.label());
    for (category, count) in counts {
        println!("  {category}: {count}");
    }
    Ok(0)
}
