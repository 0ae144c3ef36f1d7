//! Analysis-leak detection.
//!
//! When visual guidance is injected, models sometimes answer with
//! analysis instead of translation. These checks only ever produce
//! warnings; the output still ships.

use std::sync::OnceLock;

use regex::Regex;

const LEAK_PATTERNS: &[&str] = &[
    r"(?i)^I notice\b",
    r"(?i)\bthe illustration (shows|depicts)\b",
    r"(?i)\bin this illustration\b",
    r"(?i)\bas depicted in\b",
    r"(?i)^I will translate\b",
    r"(?i)^Here is the translat",
    r"(?i)^Based on the art director",
];

fn regexes() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        LEAK_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("leak pattern compiles"))
            .collect()
    })
}

/// Scan translated output for analysis leakage. Returns one issue per
/// offending line (first 60 chars).
pub fn detect_analysis_leak(output: &str) -> Vec<String> {
    let mut issues = Vec::new();
    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if regexes().iter().any(|re| re.is_match(trimmed)) {
            issues.push(format!(
                "possible analysis leak: \"{}\"",
                trimmed.chars().take(60).collect::<String>()
            ));
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_openers_are_caught() {
        let output = "I notice the scene takes place at night.\nShe laughed.";
        let issues = detect_analysis_leak(output);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn illustration_references_are_caught() {
        let issues = detect_analysis_leak("The illustration shows two figures embracing.");
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn normal_prose_is_clean() {
        let output = "She noticed him across the courtyard.\nHe didn't wave back.";
        assert!(detect_analysis_leak(output).is_empty());
    }
}
