//! Quick quality audit over a finished chapter.
//!
//! Cheap structural checks only; an empty output fails, everything else
//! is a warning. The `{passed, warnings}` shape is the contract, the
//! metrics behind it are not.

use honyaku_types::AuditReport;

const MIN_LENGTH_RATIO: f64 = 0.3;
const MAX_LENGTH_RATIO: f64 = 4.0;

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'   // kana
        | '\u{4E00}'..='\u{9FFF}' // han
        | '\u{3400}'..='\u{4DBF}'
    )
}

pub fn quick_audit(output: &str, source: &str) -> AuditReport {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return AuditReport {
            passed: false,
            warnings: vec!["output is empty".to_string()],
        };
    }

    let mut warnings = Vec::new();

    // Truncation signals: dangling fence or an explicitly cut-off tail.
    if trimmed.matches("```").count() % 2 == 1 {
        warnings.push("unbalanced code fence suggests truncated output".to_string());
    }
    if trimmed.ends_with("[CONTINUED]") || trimmed.ends_with("...]") {
        warnings.push("output ends with a truncation marker".to_string());
    }

    // Length sanity vs the CJK body of the source. Translated English
    // runs longer per character; a wildly short or long output usually
    // means dropped or hallucinated content.
    let source_cjk = source.chars().filter(|c| is_cjk(*c)).count();
    if source_cjk > 200 {
        let ratio = trimmed.chars().count() as f64 / source_cjk as f64;
        if ratio < MIN_LENGTH_RATIO {
            warnings.push(format!(
                "output suspiciously short ({ratio:.2}x source ideographs)"
            ));
        } else if ratio > MAX_LENGTH_RATIO {
            warnings.push(format!(
                "output suspiciously long ({ratio:.2}x source ideographs)"
            ));
        }
    }

    // Scene breaks should have been normalized already.
    if output
        .lines()
        .any(|l| !l.trim().is_empty() && l.trim().chars().all(|c| c == '*'))
    {
        warnings.push("unformatted asterisk scene break remains".to_string());
    }

    AuditReport {
        passed: true,
        warnings,
    }
}
