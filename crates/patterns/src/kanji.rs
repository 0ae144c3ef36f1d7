//! Kanji compound extraction for Sino-Vietnamese lookup.

use std::collections::HashMap;

fn is_kanji(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'    // CJK Unified Ideographs
        | '\u{3400}'..='\u{4DBF}'  // Extension A
        | '々'
    )
}

/// Extract the most frequent kanji compounds from JP text.
///
/// Maximal kanji runs are windowed into compounds of `min_len..=max_len`
/// characters and ranked by frequency. Ties break toward longer
/// compounds, then lexicographically, so the result is deterministic.
pub fn extract_unique_compounds(
    text: &str,
    min_len: usize,
    max_len: usize,
    top_n: usize,
) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    let mut run: Vec<char> = Vec::new();
    let mut flush = |run: &mut Vec<char>, counts: &mut HashMap<String, usize>| {
        if run.len() >= min_len {
            let upper = run.len().min(max_len);
            for size in min_len..=upper {
                for window in run.windows(size) {
                    let compound: String = window.iter().collect();
                    *counts.entry(compound).or_insert(0) += 1;
                }
            }
        }
        run.clear();
    };

    for c in text.chars() {
        if is_kanji(c) {
            run.push(c);
        } else {
            flush(&mut run, &mut counts);
        }
    }
    flush(&mut run, &mut counts);

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|(a_term, a_count), (b_term, b_count)| {
        b_count
            .cmp(a_count)
            .then(b_term.chars().count().cmp(&a_term.chars().count()))
            .then(a_term.cmp(b_term))
    });
    ranked.into_iter().take(top_n).map(|(term, _)| term).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_compounds_between_kana() {
        let text = "彼は魔法使いだった。魔法の才能は魔法学院で開花した。";
        let compounds = extract_unique_compounds(text, 2, 4, 30);
        assert!(compounds.contains(&"魔法".to_string()));
        // 魔法 appears three times and should outrank single-occurrence terms.
        assert_eq!(compounds[0], "魔法");
    }

    #[test]
    fn single_kanji_is_ignored() {
        let compounds = extract_unique_compounds("猫がいる", 2, 4, 10);
        assert!(compounds.is_empty());
    }

    #[test]
    fn top_n_caps_results() {
        let text = "一二三四五六七八九十";
        let compounds = extract_unique_compounds(text, 2, 4, 3);
        assert_eq!(compounds.len(), 3);
    }

    #[test]
    fn ranking_is_deterministic() {
        let text = "天地人 天地人";
        let a = extract_unique_compounds(text, 2, 3, 10);
        let b = extract_unique_compounds(text, 2, 3, 10);
        assert_eq!(a, b);
    }
}
