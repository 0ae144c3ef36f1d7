//! Volume storage behavior against a real temp directory.

use honyaku_storage::{VolumeStorage, VolumeStorageError};
use honyaku_types::{
    ChapterSnapshot, ContinuityPack, LogEntry, TargetLanguage, TranslationStatus,
};
use tempfile::TempDir;

const MANIFEST: &str = r#"{
    "schema_version": "v2",
    "volume_id": "vol_test_20260101_ab12",
    "metadata": {"series": "Test Series", "title": "Test Vol 1", "genre": "romcom_school_life"},
    "chapters": [
        {"id": "chapter_01", "source_file": "CHAPTER_01_JP.md"},
        {"id": "chapter_02", "source_file": "CHAPTER_02_JP.md"}
    ]
}"#;

async fn seeded_volume() -> (TempDir, VolumeStorage) {
    let dir = TempDir::new().unwrap();
    let storage = VolumeStorage::new(dir.path());
    tokio::fs::write(dir.path().join("manifest.json"), MANIFEST)
        .await
        .unwrap();
    tokio::fs::create_dir_all(dir.path().join("JP")).await.unwrap();
    tokio::fs::write(
        dir.path().join("JP/CHAPTER_01_JP.md"),
        "# 第一章\n\n彼女は笑った。",
    )
    .await
    .unwrap();
    (dir, storage)
}

#[tokio::test]
async fn manifest_round_trip_preserves_status_changes() {
    let (_dir, storage) = seeded_volume().await;
    let mut manifest = storage.load_manifest().await.unwrap();
    assert_eq!(manifest.chapters.len(), 2);

    manifest.chapters[0].translation_status = TranslationStatus::Completed;
    manifest.chapters[0].en_file = Some("CHAPTER_01_EN.md".to_string());
    storage.save_manifest(&manifest).await.unwrap();

    let reloaded = storage.load_manifest().await.unwrap();
    assert_eq!(
        reloaded.chapters[0].translation_status,
        TranslationStatus::Completed
    );
    assert_eq!(
        reloaded.chapters[0].en_file.as_deref(),
        Some("CHAPTER_01_EN.md")
    );
    // No stray temp file left behind.
    assert!(!_dir.path().join("manifest.json.tmp").exists());
}

#[tokio::test]
async fn missing_manifest_is_a_distinct_error() {
    let dir = TempDir::new().unwrap();
    let storage = VolumeStorage::new(dir.path());
    match storage.load_manifest().await {
        Err(VolumeStorageError::ManifestNotFound { .. }) => {}
        other => panic!("expected ManifestNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn source_read_and_output_write() {
    let (dir, storage) = seeded_volume().await;
    let source = storage.read_source("CHAPTER_01_JP.md").await.unwrap();
    assert!(source.contains("彼女は笑った"));

    match storage.read_source("CHAPTER_99_JP.md").await {
        Err(VolumeStorageError::SourceNotFound { .. }) => {}
        other => panic!("expected SourceNotFound, got {other:?}"),
    }

    let out = storage.output_path(TargetLanguage::En, "CHAPTER_01_EN.md");
    storage.write_output(&out, "# Chapter 1\n\nShe laughed.").await.unwrap();
    let written = tokio::fs::read_to_string(dir.path().join("EN/CHAPTER_01_EN.md"))
        .await
        .unwrap();
    assert!(written.contains("She laughed."));
}

#[tokio::test]
async fn log_records_replace_per_chapter() {
    let (_dir, storage) = seeded_volume().await;
    let mut log = storage.load_log().await.unwrap();
    assert!(log.chapters.is_empty());

    log.record(LogEntry {
        chapter_id: "chapter_01".into(),
        input_tokens: 100,
        output_tokens: 50,
        success: false,
        error: Some("safety block".into()),
        quality: None,
    });
    storage.save_log(&log).await.unwrap();

    let mut reloaded = storage.load_log().await.unwrap();
    reloaded.record(LogEntry {
        chapter_id: "chapter_01".into(),
        input_tokens: 120,
        output_tokens: 80,
        success: true,
        error: None,
        quality: None,
    });
    storage.save_log(&reloaded).await.unwrap();

    let last = storage.load_log().await.unwrap();
    assert_eq!(last.chapters.len(), 1);
    assert!(last.chapters[0].success);
}

#[tokio::test]
async fn continuity_pack_round_trip() {
    let (_dir, storage) = seeded_volume().await;
    assert!(storage.load_continuity_pack().await.unwrap().is_none());

    let pack = ContinuityPack::from_snapshots(
        vec![ChapterSnapshot {
            chapter_id: "chapter_01".into(),
            roster: [("アコ".to_string(), "Ako".to_string())].into(),
            ..Default::default()
        }],
        Vec::new(),
    );
    storage.save_continuity_pack(&pack).await.unwrap();

    let loaded = storage.load_continuity_pack().await.unwrap().unwrap();
    assert_eq!(loaded.roster.get("アコ").unwrap(), "Ako");
    assert_eq!(loaded.chapter_snapshots.len(), 1);
}
