//! Pinyin domain hints for short Chinese queries.
//!
//! Embedding models produce nearly identical vectors for short hanzi-only
//! strings. Prefixing a romanized reading pulls the vectors apart. The
//! table covers the high-frequency characters of the cultivation /
//! light-novel domain; unknown characters simply contribute no reading.

use std::collections::HashMap;
use std::sync::OnceLock;

const READINGS: &[(&str, &str)] = &[
    ("道", "dao"), ("修", "xiu"), ("仙", "xian"), ("魔", "mo"), ("法", "fa"),
    ("王", "wang"), ("国", "guo"), ("天", "tian"), ("地", "di"), ("人", "ren"),
    ("剣", "jian"), ("武", "wu"), ("気", "qi"), ("心", "xin"), ("神", "shen"),
    ("龍", "long"), ("竜", "long"), ("鬼", "gui"), ("聖", "sheng"), ("皇", "huang"),
    ("帝", "di"), ("姫", "ji"), ("士", "shi"), ("師", "shi"), ("学", "xue"),
    ("院", "yuan"), ("校", "xiao"), ("生", "sheng"), ("先", "xian"), ("大", "da"),
    ("小", "xiao"), ("中", "zhong"), ("上", "shang"), ("下", "xia"), ("山", "shan"),
    ("海", "hai"), ("火", "huo"), ("水", "shui"), ("風", "feng"), ("雷", "lei"),
    ("光", "guang"), ("闇", "an"), ("影", "ying"), ("夜", "ye"), ("月", "yue"),
    ("日", "ri"), ("星", "xing"), ("花", "hua"), ("雪", "xue"), ("戦", "zhan"),
    ("争", "zheng"), ("軍", "jun"), ("兵", "bing"), ("将", "jiang"), ("団", "tuan"),
    ("力", "li"), ("術", "shu"), ("技", "ji"), ("能", "neng"), ("獣", "shou"),
    ("霊", "ling"), ("魂", "hun"), ("血", "xue"), ("死", "si"), ("命", "ming"),
    ("世", "shi"), ("界", "jie"), ("門", "men"), ("殿", "dian"), ("宮", "gong"),
    ("城", "cheng"), ("都", "du"), ("村", "cun"), ("里", "li"), ("家", "jia"),
    ("族", "zu"), ("名", "ming"), ("者", "zhe"), ("言", "yan"), ("語", "yu"),
    ("書", "shu"), ("物", "wu"), ("事", "shi"), ("年", "nian"), ("時", "shi"),
];

fn table() -> &'static HashMap<char, &'static str> {
    static TABLE: OnceLock<HashMap<char, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        READINGS
            .iter()
            .filter_map(|(ch, reading)| ch.chars().next().map(|c| (c, *reading)))
            .collect()
    })
}

fn is_cjk(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}')
}

/// Add a romanization hint to a short hanzi-only query.
///
/// Longer or mixed-script queries already embed distinctly and are
/// returned unchanged.
pub fn enhance_query(query: &str) -> String {
    let chars: Vec<char> = query.chars().collect();
    if chars.is_empty() || chars.len() > 4 || !chars.iter().all(|c| is_cjk(*c)) {
        return query.to_string();
    }
    let readings: Vec<&str> = chars
        .iter()
        .filter_map(|c| table().get(c).copied())
        .collect();
    if readings.is_empty() {
        return query.to_string();
    }
    format!("{query} [pinyin: {}]", readings.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hanzi_gains_reading() {
        assert_eq!(enhance_query("修道"), "修道 [pinyin: xiu dao]");
    }

    #[test]
    fn mixed_script_is_untouched() {
        assert_eq!(enhance_query("修道する"), "修道する");
    }

    #[test]
    fn long_compound_is_untouched() {
        assert_eq!(enhance_query("魔法学院騎士団"), "魔法学院騎士団");
    }

    #[test]
    fn unknown_characters_fall_back_to_original() {
        assert_eq!(enhance_query("齉齈"), "齉齈");
    }
}
