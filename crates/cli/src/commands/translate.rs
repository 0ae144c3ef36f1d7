//! The `translate` command: wire up the backend, stores, and agent, run
//! the volume, print the report.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use eyre::{Result, eyre};

use honyaku_client::GeminiBackend;
use honyaku_patterns::{PatternStore, StoreKind};
use honyaku_translator::agent::RagStores;
use honyaku_translator::{AgentConfig, TranslatorAgent, TranslatorError};
use honyaku_types::TargetLanguage;

use crate::config::{Config, resolve_api_key};
use crate::{EXIT_INVALID, EXIT_PARTIAL};

use super::BackendEmbedder;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct TranslateArgs {
    pub work_dir: PathBuf,
    pub config: Config,
    pub volume_id: String,
    pub chapters: Vec<String>,
    pub force: bool,
    pub language: String,
    pub model: Option<String>,
    pub enable_continuity: bool,
    pub enable_gap_analysis: bool,
    pub enable_multimodal: bool,
    pub no_cache: bool,
}

pub async fn run(args: TranslateArgs) -> Result<i32> {
    let Some(target) = TargetLanguage::parse(&args.language) else {
        eprintln!("Unsupported target language: {}", args.language);
        return Ok(EXIT_INVALID);
    };

    let volume_dir = args.work_dir.join(&args.volume_id);
    if !volume_dir.join("manifest.json").exists() {
        eprintln!("No manifest found in {}", volume_dir.display());
        return Ok(EXIT_INVALID);
    }

    let api_key = resolve_api_key()?;
    let backend = Arc::new(
        GeminiBackend::new(api_key, REQUEST_TIMEOUT)
            .map_err(|e| eyre!("failed to build provider client: {e}"))?,
    );

    let stores = open_stores(&args.work_dir, target, backend.clone()).await;

    let agent_config = AgentConfig {
        target,
        model: args.model.clone().unwrap_or(args.config.model.clone()),
        fallback_model: args.config.fallback_model.clone(),
        enable_caching: args.config.enable_caching && !args.no_cache,
        enable_continuity: args.enable_continuity,
        enable_gap_analysis: args.enable_gap_analysis,
        enable_multimodal: args.enable_multimodal,
        save_thinking: args.config.thinking_mode.enabled && args.config.thinking_mode.save_to_file,
        requests_per_minute: args.config.requests_per_minute,
        temperature: args.config.temperature,
        max_output_tokens: args.config.max_output_tokens,
        volume_cache_ttl_seconds: args.config.volume_cache_ttl_seconds,
        pipeline_root: args.work_dir.clone(),
        ..Default::default()
    };

    let mut agent = match TranslatorAgent::new(&volume_dir, backend, agent_config, stores).await {
        Ok(agent) => agent,
        Err(TranslatorError::Storage(err)) => {
            eprintln!("Cannot open volume: {err}");
            return Ok(EXIT_INVALID);
        }
        Err(TranslatorError::Manifest(err)) => {
            eprintln!("Invalid manifest: {err}");
            return Ok(EXIT_INVALID);
        }
        Err(err) => return Err(err.into()),
    };

    // Ctrl-C finishes the in-flight chapter, persists, then stops.
    let interrupt = agent.interrupt_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupt received, finishing in-flight chapter...");
            interrupt.store(true, Ordering::Relaxed);
        }
    });

    let selection = (!args.chapters.is_empty()).then_some(args.chapters.as_slice());
    let report = match agent.translate_volume(selection, args.force).await {
        Ok(report) => report,
        Err(TranslatorError::InvalidVolume(message)) => {
            eprintln!("Invalid input: {message}");
            return Ok(EXIT_INVALID);
        }
        Err(err) => return Err(err.into()),
    };

    println!("\nTranslation report for {}:", args.volume_id);
    println!("  Chapters: {}", report.total_chapters);
    println!("  Succeeded: {}", report.succeeded);
    println!("  Failed: {}", report.failed);
    println!(
        "  Tokens: {} in / {} out",
        report.total_input_tokens, report.total_output_tokens
    );
    if !report.failed_chapter_ids.is_empty() {
        println!("  Failed chapters: {}", report.failed_chapter_ids.join(", "));
        println!("  Re-run the same command to retry; completed chapters are skipped.");
        return Ok(EXIT_PARTIAL);
    }
    // An interrupted run can have zero failures yet unprocessed chapters.
    let run_completed = agent
        .manifest()
        .pipeline_state
        .translator
        .as_ref()
        .is_some_and(|state| state.status == honyaku_types::TranslatorStatus::Completed);
    if !run_completed {
        println!("  Run did not complete; re-run to continue.");
        return Ok(EXIT_PARTIAL);
    }
    Ok(0)
}

/// Open the RAG stores for the target language. Missing RAG sources are
/// normal (guidance simply unavailable); store errors are non-fatal.
async fn open_stores(
    work_dir: &std::path::Path,
    target: TargetLanguage,
    backend: Arc<GeminiBackend>,
) -> RagStores {
    let store_dir = work_dir.join("vector_store");
    let rag_dir = work_dir.join("config");
    let embedder = Arc::new(BackendEmbedder(backend));

    let open = |kind: StoreKind| {
        let store_dir = store_dir.clone();
        let rag_path = rag_dir.join(kind.rag_file_name());
        let embedder = embedder.clone();
        async move {
            match PatternStore::open(kind, &store_dir, &rag_path, embedder).await {
                Ok(store) if !store.is_empty() => Some(Arc::new(store)),
                Ok(_) => {
                    tracing::debug!(store = kind.label(), "no indexed patterns, store disabled");
                    None
                }
                Err(err) => {
                    tracing::warn!(store = kind.label(), "store unavailable: {err}");
                    None
                }
            }
        }
    };

    // The bad-prose index is target-agnostic: its entries are keyed by
    // category, and cues from the other language never fire.
    let ai_ism = open(StoreKind::AiIsm).await;
    match target {
        TargetLanguage::En => RagStores {
            sino: None,
            patterns: open(StoreKind::EnglishGrammar).await,
            ai_ism,
        },
        TargetLanguage::Vn => RagStores {
            sino: open(StoreKind::SinoVietnamese).await,
            patterns: open(StoreKind::VietnameseGrammar).await,
            ai_ism,
        },
    }
}
