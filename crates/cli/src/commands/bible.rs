//! Bible management commands. These run out-of-band: bibles are
//! read-only during a translation run.

use std::path::Path;

use eyre::Result;

use honyaku_bible::BibleRegistry;
use honyaku_storage::VolumeStorage;
use honyaku_types::TargetLanguage;

use crate::EXIT_INVALID;
use crate::cli::BibleCommands;

pub async fn run(work_dir: &Path, command: BibleCommands) -> Result<i32> {
    match command {
        BibleCommands::List => list(work_dir),
        BibleCommands::Import {
            volume_id,
            series,
            language,
        } => import(work_dir, &volume_id, &series, &language).await,
    }
}

fn list(work_dir: &Path) -> Result<i32> {
    let registry = BibleRegistry::open(work_dir)?;
    let bibles = registry.list();
    if bibles.is_empty() {
        println!("No series bibles registered.");
        return Ok(0);
    }
    println!("Registered series bibles:");
    for (series_id, entry) in bibles {
        println!(
            "  {series_id}: {} entries, {} volume(s), patterns: {}",
            entry.entry_count,
            entry.volumes.len(),
            entry.match_patterns.join(" | ")
        );
    }
    let problems = registry.validate_index();
    for problem in problems {
        println!("  WARNING: {problem}");
    }
    Ok(0)
}

async fn import(work_dir: &Path, volume_id: &str, series: &str, language: &str) -> Result<i32> {
    let Some(lang) = TargetLanguage::parse(language) else {
        eprintln!("Unsupported language: {language}");
        return Ok(EXIT_INVALID);
    };
    let volume_dir = work_dir.join(volume_id);
    let storage = VolumeStorage::new(&volume_dir);
    let manifest = match storage.load_manifest().await {
        Ok(manifest) => manifest,
        Err(err) => {
            eprintln!("Cannot load volume {volume_id}: {err}");
            return Ok(EXIT_INVALID);
        }
    };

    let mut registry = BibleRegistry::open(work_dir)?;
    match registry.import_from_manifest(&manifest, series, lang) {
        Ok(count) => {
            println!("Imported {count} entr(ies) from {volume_id} into {series}.");
            Ok(0)
        }
        Err(err) => {
            eprintln!("Import failed: {err}");
            Ok(EXIT_INVALID)
        }
    }
}
