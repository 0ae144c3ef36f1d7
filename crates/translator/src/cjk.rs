//! Vietnamese CJK scrubbing.
//!
//! Models occasionally leak raw hanzi into Vietnamese output. Known
//! characters are hard-substituted with their Hán Việt readings; unknown
//! leaks are counted and reported, never fatal.

use std::collections::HashMap;
use std::sync::OnceLock;

/// hanzi -> Hán Việt reading. Conservative: only unambiguous,
/// high-frequency characters of the genre.
const HAN_VIET: &[(&str, &str)] = &[
    ("道", "đạo"), ("気", "khí"), ("氣", "khí"), ("剣", "kiếm"), ("劍", "kiếm"),
    ("魔", "ma"), ("王", "vương"), ("神", "thần"), ("聖", "thánh"), ("皇", "hoàng"),
    ("帝", "đế"), ("天", "thiên"), ("地", "địa"), ("人", "nhân"), ("心", "tâm"),
    ("武", "võ"), ("法", "pháp"), ("術", "thuật"), ("力", "lực"), ("龍", "long"),
    ("鬼", "quỷ"), ("仙", "tiên"), ("霊", "linh"), ("靈", "linh"), ("魂", "hồn"),
    ("火", "hỏa"), ("水", "thủy"), ("風", "phong"), ("雷", "lôi"), ("光", "quang"),
    ("闇", "ám"), ("影", "ảnh"), ("血", "huyết"), ("戦", "chiến"), ("戰", "chiến"),
    ("軍", "quân"), ("師", "sư"), ("士", "sĩ"), ("将", "tướng"), ("將", "tướng"),
    ("門", "môn"), ("宮", "cung"), ("殿", "điện"), ("城", "thành"), ("界", "giới"),
    ("世", "thế"), ("命", "mệnh"), ("運", "vận"), ("福", "phúc"), ("徳", "đức"),
];

fn table() -> &'static HashMap<char, &'static str> {
    static TABLE: OnceLock<HashMap<char, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HAN_VIET
            .iter()
            .filter_map(|(han, viet)| han.chars().next().map(|c| (c, *viet)))
            .collect()
    })
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{3040}'..='\u{30FF}'
    )
}

#[derive(Debug, Clone, Default)]
pub struct ScrubReport {
    pub substitutions: usize,
    pub remaining_leaks: usize,
}

/// Substitute known hanzi with Hán Việt readings; count what remains.
pub fn scrub(text: &str) -> (String, ScrubReport) {
    let mut report = ScrubReport::default();
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        if let Some(viet) = table().get(&c) {
            result.push_str(viet);
            report.substitutions += 1;
        } else {
            if is_cjk(c) {
                report.remaining_leaks += 1;
            }
            result.push(c);
        }
    }
    (result, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_hanzi_are_substituted() {
        let (cleaned, report) = scrub("Sức mạnh của 気 tràn ngập 天 hạ");
        assert_eq!(report.substitutions, 2);
        assert!(cleaned.contains("khí"));
        assert!(cleaned.contains("thiên"));
        assert!(!cleaned.contains('気'));
    }

    #[test]
    fn unknown_cjk_counts_as_leak() {
        let (cleaned, report) = scrub("một chữ lạ: 蠱");
        assert_eq!(report.substitutions, 0);
        assert_eq!(report.remaining_leaks, 1);
        assert!(cleaned.contains('蠱'));
    }

    #[test]
    fn clean_vietnamese_is_untouched() {
        let text = "Cô ấy mỉm cười dưới ánh trăng.";
        let (cleaned, report) = scrub(text);
        assert_eq!(cleaned, text);
        assert_eq!(report.substitutions, 0);
        assert_eq!(report.remaining_leaks, 0);
    }
}
