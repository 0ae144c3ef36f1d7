//! Volume lifecycle scenarios against a scripted provider backend.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use honyaku_client::{CacheSpec, ClientError, GenerateRequest, GenerativeBackend, RawResponse};
use honyaku_translator::agent::RagStores;
use honyaku_translator::{AgentConfig, TranslatorAgent};
use honyaku_types::{TranslationStatus, TranslatorStatus};

const CHAPTER_MARKERS: [&str; 3] = ["第一章の本文", "第二章の本文", "第三章の本文"];

#[derive(Debug, Clone)]
struct GenRecord {
    model: String,
    cached_content: Option<String>,
    prompt: String,
}

#[derive(Default)]
struct Ledger {
    generates: Vec<GenRecord>,
    created_caches: Vec<(String, String)>, // (name, model)
    deleted_caches: Vec<String>,
}

/// A rule: when the prompt contains `marker` and the model matches,
/// return this response instead of the default translation.
struct Rule {
    marker: &'static str,
    model: Option<String>,
    response: RawResponse,
}

struct ScriptedBackend {
    ledger: Mutex<Ledger>,
    rules: Vec<Rule>,
}

impl ScriptedBackend {
    fn new(rules: Vec<Rule>) -> Arc<Self> {
        Arc::new(Self {
            ledger: Mutex::new(Ledger::default()),
            rules,
        })
    }

    fn generates(&self) -> Vec<GenRecord> {
        self.ledger.lock().unwrap().generates.clone()
    }

    fn created(&self) -> Vec<(String, String)> {
        self.ledger.lock().unwrap().created_caches.clone()
    }

    fn deleted(&self) -> Vec<String> {
        self.ledger.lock().unwrap().deleted_caches.clone()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<RawResponse, ClientError> {
        self.ledger.lock().unwrap().generates.push(GenRecord {
            model: request.model.clone(),
            cached_content: request.cached_content.clone(),
            prompt: request.prompt.clone(),
        });
        for rule in &self.rules {
            let model_matches = rule
                .model
                .as_ref()
                .is_none_or(|model| model == &request.model);
            if model_matches && request.prompt.contains(rule.marker) {
                return Ok(rule.response.clone());
            }
        }
        let chapter = CHAPTER_MARKERS
            .iter()
            .position(|marker| request.prompt.contains(marker))
            .map(|idx| idx + 1)
            .unwrap_or(0);
        Ok(RawResponse {
            content: format!("She laughed in chapter {chapter}.\n\n***\n\nScene over."),
            finish_reason: "STOP".into(),
            input_tokens: 1000,
            output_tokens: 500,
            cached_tokens: if request.cached_content.is_some() { 800 } else { 0 },
            ..Default::default()
        })
    }

    async fn create_cache(&self, spec: &CacheSpec) -> Result<String, ClientError> {
        let mut ledger = self.ledger.lock().unwrap();
        let name = format!("cachedContents/test-{}", ledger.created_caches.len());
        ledger
            .created_caches
            .push((name.clone(), spec.model.clone()));
        Ok(name)
    }

    async fn delete_cache(&self, name: &str) -> Result<(), ClientError> {
        self.ledger
            .lock()
            .unwrap()
            .deleted_caches
            .push(name.to_string());
        Ok(())
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ClientError> {
        Ok(texts.iter().map(|_| vec![0.0, 1.0]).collect())
    }
}

fn safety_block() -> RawResponse {
    RawResponse {
        content: String::new(),
        finish_reason: "SAFETY".into(),
        input_tokens: 900,
        output_tokens: 0,
        ..Default::default()
    }
}

async fn seed_volume(dir: &Path) {
    let manifest = r#"{
        "schema_version": "v2",
        "volume_id": "fixture_vol_20260101_ab12",
        "metadata": {"series": "Fixture Series", "title": "Fixture Vol 1", "genre": "romcom_school_life"},
        "metadata_en": {
            "character_names": {"アコ": "Ako"},
            "locked_glossary": {"ギルド": "guild"}
        },
        "pipeline_state": {"librarian": {"status": "completed"}},
        "chapters": [
            {"id": "chapter_01", "source_file": "CHAPTER_01_JP.md"},
            {"id": "chapter_02", "source_file": "CHAPTER_02_JP.md"},
            {"id": "chapter_03", "source_file": "CHAPTER_03_JP.md"}
        ]
    }"#;
    tokio::fs::write(dir.join("manifest.json"), manifest)
        .await
        .unwrap();
    tokio::fs::create_dir_all(dir.join("JP")).await.unwrap();
    for (i, marker) in CHAPTER_MARKERS.iter().enumerate() {
        tokio::fs::write(
            dir.join(format!("JP/CHAPTER_0{}_JP.md", i + 1)),
            format!("# 第{}章\n\n{marker}。アコは笑った。", i + 1),
        )
        .await
        .unwrap();
    }
}

fn test_config(pipeline_root: &Path) -> AgentConfig {
    AgentConfig {
        requests_per_minute: 0,
        chapter_delay_cached: Duration::ZERO,
        chapter_delay_uncached: Duration::ZERO,
        pipeline_root: pipeline_root.to_path_buf(),
        ..Default::default()
    }
}

async fn agent_with(
    dir: &Path,
    backend: Arc<ScriptedBackend>,
    config: AgentConfig,
) -> TranslatorAgent {
    TranslatorAgent::new(dir, backend, config, RagStores::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn s1_cold_run_completes_with_one_cache_pair() {
    let dir = TempDir::new().unwrap();
    seed_volume(dir.path()).await;
    let backend = ScriptedBackend::new(Vec::new());
    let mut agent = agent_with(dir.path(), backend.clone(), test_config(dir.path())).await;

    let report = agent.translate_volume(None, false).await.unwrap();
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 0);

    for i in 1..=3 {
        assert!(dir.path().join(format!("EN/CHAPTER_0{i}_EN.md")).exists());
    }

    let manifest = agent.manifest();
    assert_eq!(
        manifest.pipeline_state.translator.as_ref().unwrap().status,
        TranslatorStatus::Completed
    );
    for chapter in &manifest.chapters {
        assert_eq!(chapter.translation_status, TranslationStatus::Completed);
        assert!(chapter.en_file.is_some());
    }

    // Exactly one volume cache created and deleted, zero orphans.
    let created = backend.created();
    let deleted = backend.deleted();
    assert_eq!(created.len(), 1);
    assert_eq!(deleted, vec![created[0].0.clone()]);

    // Every chapter request rode the volume cache.
    for record in backend.generates() {
        assert_eq!(record.cached_content.as_deref(), Some(created[0].0.as_str()));
    }

    // Continuity pack with one snapshot per chapter.
    let pack: serde_json::Value = serde_json::from_str(
        &tokio::fs::read_to_string(dir.path().join("continuity_pack.json"))
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(pack["chapter_snapshots"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn s2_resume_skips_completed_chapter() {
    let dir = TempDir::new().unwrap();
    seed_volume(dir.path()).await;

    // Simulate a crash after chapter 1 completed: status + output on disk.
    let manifest_path = dir.path().join("manifest.json");
    let mut manifest: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(&manifest_path).await.unwrap()).unwrap();
    manifest["chapters"][0]["translation_status"] = "completed".into();
    manifest["chapters"][0]["en_file"] = "CHAPTER_01_EN.md".into();
    tokio::fs::write(&manifest_path, manifest.to_string())
        .await
        .unwrap();
    tokio::fs::create_dir_all(dir.path().join("EN")).await.unwrap();
    let preserved = "# Chapter 1\n\nAlready translated before the crash.\n";
    tokio::fs::write(dir.path().join("EN/CHAPTER_01_EN.md"), preserved)
        .await
        .unwrap();

    let backend = ScriptedBackend::new(Vec::new());
    let mut agent = agent_with(dir.path(), backend.clone(), test_config(dir.path())).await;
    let report = agent.translate_volume(None, false).await.unwrap();
    assert_eq!(report.failed, 0);

    // Chapter 1 was not re-sent to the provider and its file is intact.
    let generates = backend.generates();
    assert!(generates.iter().all(|g| !g.prompt.contains(CHAPTER_MARKERS[0])));
    assert!(generates.iter().any(|g| g.prompt.contains(CHAPTER_MARKERS[1])));
    assert!(generates.iter().any(|g| g.prompt.contains(CHAPTER_MARKERS[2])));
    let untouched = tokio::fs::read_to_string(dir.path().join("EN/CHAPTER_01_EN.md"))
        .await
        .unwrap();
    assert_eq!(untouched, preserved);

    assert_eq!(
        agent
            .manifest()
            .pipeline_state
            .translator
            .as_ref()
            .unwrap()
            .status,
        TranslatorStatus::Completed
    );
}

#[tokio::test]
async fn s3_safety_block_falls_back_to_alternate_model() {
    let dir = TempDir::new().unwrap();
    seed_volume(dir.path()).await;

    let config = test_config(dir.path());
    let primary = config.model.clone();
    let fallback = config.fallback_model.clone();

    // Chapter 2 is safety-blocked on the primary model only.
    let backend = ScriptedBackend::new(vec![Rule {
        marker: CHAPTER_MARKERS[1],
        model: Some(primary.clone()),
        response: safety_block(),
    }]);
    let mut agent = agent_with(dir.path(), backend.clone(), config).await;
    let report = agent.translate_volume(None, false).await.unwrap();
    assert_eq!(report.failed, 0);

    // The fallback model is recorded on the chapter.
    let chapter_02 = agent.manifest().chapter("chapter_02").unwrap();
    assert_eq!(chapter_02.model.as_deref(), Some(fallback.as_str()));
    assert_eq!(chapter_02.translation_status, TranslationStatus::Completed);

    // P4: the fallback request carried no cache from the primary model.
    let generates = backend.generates();
    let volume_cache = backend.created()[0].0.clone();
    let fallback_calls: Vec<&GenRecord> = generates
        .iter()
        .filter(|g| g.model == fallback)
        .collect();
    assert!(!fallback_calls.is_empty());
    for call in &fallback_calls {
        assert_ne!(call.cached_content.as_deref(), Some(volume_cache.as_str()));
    }

    // P3: zero orphan caches — everything created was deleted.
    let created: Vec<String> = backend.created().into_iter().map(|(name, _)| name).collect();
    let deleted = backend.deleted();
    for name in &created {
        assert!(deleted.contains(name), "cache {name} leaked");
    }
    // And the volume cache itself was created exactly once.
    assert_eq!(
        backend
            .created()
            .iter()
            .filter(|(_, model)| model == &primary)
            .count(),
        1
    );
}

#[tokio::test]
async fn s6_force_retranslates_only_selected_chapter() {
    let dir = TempDir::new().unwrap();
    seed_volume(dir.path()).await;

    // First pass: everything completes.
    let backend = ScriptedBackend::new(Vec::new());
    let mut agent = agent_with(dir.path(), backend.clone(), test_config(dir.path())).await;
    agent.translate_volume(None, false).await.unwrap();

    let ch1_before = tokio::fs::read_to_string(dir.path().join("EN/CHAPTER_01_EN.md"))
        .await
        .unwrap();
    let ch3_before = tokio::fs::read_to_string(dir.path().join("EN/CHAPTER_03_EN.md"))
        .await
        .unwrap();

    // Second pass: force just chapter_02.
    let backend2 = ScriptedBackend::new(Vec::new());
    let mut agent2 = agent_with(dir.path(), backend2.clone(), test_config(dir.path())).await;
    let report = agent2
        .translate_volume(Some(&["chapter_02".to_string()]), true)
        .await
        .unwrap();
    assert_eq!(report.failed, 0);

    let generates = backend2.generates();
    assert_eq!(generates.len(), 1);
    assert!(generates[0].prompt.contains(CHAPTER_MARKERS[1]));

    // Other chapters untouched.
    assert_eq!(
        tokio::fs::read_to_string(dir.path().join("EN/CHAPTER_01_EN.md"))
            .await
            .unwrap(),
        ch1_before
    );
    assert_eq!(
        tokio::fs::read_to_string(dir.path().join("EN/CHAPTER_03_EN.md"))
            .await
            .unwrap(),
        ch3_before
    );

    assert_eq!(
        agent2
            .manifest()
            .chapter("chapter_02")
            .unwrap()
            .translation_status,
        TranslationStatus::Completed
    );

    // One cache pair for the forced run too.
    let created = backend2.created();
    assert_eq!(created.len(), 1);
    assert_eq!(backend2.deleted(), vec![created[0].0.clone()]);
}

#[tokio::test]
async fn unknown_chapter_selection_is_invalid_input() {
    let dir = TempDir::new().unwrap();
    seed_volume(dir.path()).await;
    let backend = ScriptedBackend::new(Vec::new());
    let mut agent = agent_with(dir.path(), backend, test_config(dir.path())).await;
    let err = agent
        .translate_volume(Some(&["chapter_99".to_string()]), false)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("chapter_99"));
}
