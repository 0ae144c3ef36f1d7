//! Registry resolution against a real on-disk bible layout.

use std::collections::BTreeMap;

use honyaku_bible::{BibleEntry, BibleRegistry};
use honyaku_types::Manifest;
use tempfile::TempDir;

fn manifest_json(volume_id: &str, title: &str, bible_id: Option<&str>) -> String {
    let bible_field = bible_id
        .map(|id| format!(r#""bible_id": "{id}","#))
        .unwrap_or_default();
    format!(
        r#"{{
            "schema_version": "v2",
            "volume_id": "{volume_id}",
            {bible_field}
            "metadata": {{"title": "{title}"}},
            "chapters": [{{"id": "chapter_01", "source_file": "CHAPTER_01_JP.md"}}]
        }}"#
    )
}

fn seeded_registry(root: &TempDir) -> BibleRegistry {
    let mut registry = BibleRegistry::open(root.path()).unwrap();
    let mut bible = registry
        .create_bible(
            "madan_no_ou_to_vanadis",
            BTreeMap::from([
                ("en".to_string(), "Lord Marksman and Vanadis".to_string()),
                ("ja".to_string(), "魔弾の王と戦姫".to_string()),
            ]),
            vec!["Madan no Ou".to_string(), "魔弾の王".to_string()],
        )
        .unwrap();
    bible
        .add_entry(
            "characters",
            "ティグルヴルムド＝ヴォルン",
            BibleEntry {
                canonical_en: "Tigrevurmud Vorn".to_string(),
                short_name: Some("Tigre".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    bible.save().unwrap();
    // Reopen so the registry reflects the saved state.
    BibleRegistry::open(root.path()).unwrap()
}

#[test]
fn fuzzy_title_match_resolves_and_links_volume() {
    let root = TempDir::new().unwrap();
    let mut registry = seeded_registry(&root);

    let manifest = Manifest::from_json(&manifest_json(
        "madan_vol1_20260208_25d9",
        "Madan no Ou to Vanadis Vol. 1",
        None,
    ))
    .unwrap();

    let bible = registry.resolve(&manifest).expect("bible should resolve");
    assert_eq!(bible.series_id(), "madan_no_ou_to_vanadis");

    let prompt = bible.format_for_prompt();
    assert!(prompt.contains("=== CHARACTERS ==="));
    assert!(prompt.contains("Tigrevurmud Vorn"));

    // The short-id is now linked in the index.
    let entry = &registry.index.series["madan_no_ou_to_vanadis"];
    assert!(entry.volumes.contains(&"25d9".to_string()));

    // A fresh registry resolves the same volume via the short-id alone.
    let mut reopened = BibleRegistry::open(root.path()).unwrap();
    let manifest2 = Manifest::from_json(&manifest_json(
        "madan_vol1_20260208_25d9",
        "completely unrelated title",
        None,
    ))
    .unwrap();
    assert!(reopened.resolve(&manifest2).is_some());
}

#[test]
fn explicit_bible_id_wins() {
    let root = TempDir::new().unwrap();
    let mut registry = seeded_registry(&root);
    let manifest = Manifest::from_json(&manifest_json(
        "anything_20260101_ffff",
        "no matching title at all",
        Some("madan_no_ou_to_vanadis"),
    ))
    .unwrap();
    assert!(registry.resolve(&manifest).is_some());
}

#[test]
fn unmatched_volume_is_standalone() {
    let root = TempDir::new().unwrap();
    let mut registry = seeded_registry(&root);
    let manifest = Manifest::from_json(&manifest_json(
        "other_20260101_0000",
        "A Totally Different Series",
        None,
    ))
    .unwrap();
    assert!(registry.resolve(&manifest).is_none());
}

#[test]
fn japanese_pattern_substring_matches_series_field() {
    let root = TempDir::new().unwrap();
    let mut registry = seeded_registry(&root);
    let json = r#"{
        "schema_version": "v2",
        "volume_id": "vol_x",
        "metadata": {"series": "魔弾の王と戦姫", "title": "第1章"},
        "chapters": [{"id": "chapter_01", "source_file": "CHAPTER_01_JP.md"}]
    }"#;
    let manifest = Manifest::from_json(json).unwrap();
    assert!(registry.resolve(&manifest).is_some());
}
