//! Translation outcomes: per-chapter results, the append-only run log,
//! and the end-of-run report.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Quick quality audit outcome. The metrics behind it are internal; only
/// this shape is part of the contract.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuditReport {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Outcome of translating one chapter.
#[derive(Debug, Clone)]
pub struct TranslationResult {
    pub success: bool,
    pub output_path: PathBuf,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub audit: Option<AuditReport>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl TranslationResult {
    pub fn failure(output_path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            success: false,
            output_path,
            input_tokens: 0,
            output_tokens: 0,
            audit: None,
            warnings: Vec::new(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub chapter_id: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<AuditReport>,
}

/// `translation_log.json`: one entry per chapter, replaced on re-run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TranslationLog {
    #[serde(default)]
    pub chapters: Vec<LogEntry>,
}

impl TranslationLog {
    /// Insert or replace the entry for a chapter.
    pub fn record(&mut self, entry: LogEntry) {
        self.chapters.retain(|c| c.chapter_id != entry.chapter_id);
        self.chapters.push(entry);
    }
}

/// End-of-run summary printed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TranslationReport {
    pub total_chapters: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_chapter_ids: Vec<String>,
}

impl TranslationReport {
    pub fn from_log(log: &TranslationLog) -> Self {
        let mut report = Self {
            total_chapters: log.chapters.len(),
            ..Default::default()
        };
        for entry in &log.chapters {
            report.total_input_tokens += entry.input_tokens;
            report.total_output_tokens += entry.output_tokens;
            if entry.success {
                report.succeeded += 1;
            } else {
                report.failed += 1;
                report.failed_chapter_ids.push(entry.chapter_id.clone());
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_replaces_existing_chapter_entry() {
        let mut log = TranslationLog::default();
        log.record(LogEntry {
            chapter_id: "chapter_01".into(),
            input_tokens: 10,
            output_tokens: 5,
            success: false,
            error: Some("boom".into()),
            quality: None,
        });
        log.record(LogEntry {
            chapter_id: "chapter_01".into(),
            input_tokens: 12,
            output_tokens: 8,
            success: true,
            error: None,
            quality: None,
        });
        assert_eq!(log.chapters.len(), 1);
        assert!(log.chapters[0].success);
    }

    #[test]
    fn report_tallies_failures() {
        let mut log = TranslationLog::default();
        for (id, ok) in [("chapter_01", true), ("chapter_02", false)] {
            log.record(LogEntry {
                chapter_id: id.into(),
                input_tokens: 100,
                output_tokens: 50,
                success: ok,
                error: (!ok).then(|| "safety block".into()),
                quality: None,
            });
        }
        let report = TranslationReport::from_log(&log);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed_chapter_ids, vec!["chapter_02"]);
        assert_eq!(report.total_input_tokens, 200);
    }
}
