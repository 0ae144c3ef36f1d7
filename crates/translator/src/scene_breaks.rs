//! Scene-break normalization.
//!
//! Source chapters and model output mark scene breaks with lines of
//! asterisks in various shapes. Output uses a single centered `◆`.

pub const SCENE_BREAK: &str = "◆";

fn is_asterisk_break(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    let stripped: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    !stripped.is_empty() && stripped.len() <= 8 && stripped.chars().all(|c| c == '*' || c == '＊')
}

/// Replace asterisk-only lines (`*`, `**`, `***`, `* * *`, ...) with the
/// scene-break glyph. Returns the formatted text and the replacement
/// count.
pub fn format_scene_breaks(text: &str) -> (String, usize) {
    let mut count = 0;
    let lines: Vec<&str> = text.lines().collect();
    let formatted: Vec<String> = lines
        .iter()
        .map(|line| {
            if is_asterisk_break(line) {
                count += 1;
                SCENE_BREAK.to_string()
            } else {
                line.to_string()
            }
        })
        .collect();
    let mut result = formatted.join("\n");
    if text.ends_with('\n') {
        result.push('\n');
    }
    (result, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_all_asterisk_shapes() {
        let text = "before\n*\nmiddle\n***\nspaced\n* * *\nafter";
        let (formatted, count) = format_scene_breaks(text);
        assert_eq!(count, 3);
        assert_eq!(formatted.matches(SCENE_BREAK).count(), 3);
        assert!(!formatted.contains('*'));
    }

    #[test]
    fn leaves_emphasis_alone() {
        let text = "she was *really* sure\n**bold claim** indeed";
        let (formatted, count) = format_scene_breaks(text);
        assert_eq!(count, 0);
        assert_eq!(formatted, text);
    }

    #[test]
    fn preserves_trailing_newline() {
        let (formatted, _) = format_scene_breaks("line\n***\n");
        assert!(formatted.ends_with('\n'));
        let (formatted2, _) = format_scene_breaks("line\n***");
        assert!(!formatted2.ends_with('\n'));
    }
}
