//! Embedded master prompts and genre style guides.

use honyaku_types::TargetLanguage;

pub const DEFAULT_GENRE: &str = "romcom_school_life";

const MASTER_EN: &str = include_str!("../assets/master_en.md");
const MASTER_VN: &str = include_str!("../assets/master_vn.md");

const STYLE_GUIDES: &[(&str, &str)] = &[
    (
        "romcom_school_life",
        include_str!("../assets/style_romcom_school_life.md"),
    ),
    (
        "isekai_fantasy",
        include_str!("../assets/style_isekai_fantasy.md"),
    ),
    (
        "battle_academy",
        include_str!("../assets/style_battle_academy.md"),
    ),
];

pub fn master_prompt(target: TargetLanguage) -> &'static str {
    match target {
        TargetLanguage::En => MASTER_EN,
        TargetLanguage::Vn => MASTER_VN,
    }
}

/// Look up a genre style guide, falling back to the default genre.
pub fn style_guide(genre: &str) -> (&'static str, &'static str) {
    STYLE_GUIDES
        .iter()
        .find(|(name, _)| *name == genre)
        .copied()
        .unwrap_or_else(|| {
            STYLE_GUIDES
                .iter()
                .find(|(name, _)| *name == DEFAULT_GENRE)
                .copied()
                .expect("default style guide is always present")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_genre_falls_back_to_romcom() {
        let (name, _) = style_guide("grimdark_horror");
        assert_eq!(name, DEFAULT_GENRE);
    }

    #[test]
    fn known_genres_resolve() {
        assert_eq!(style_guide("isekai_fantasy").0, "isekai_fantasy");
        assert_eq!(style_guide("battle_academy").0, "battle_academy");
    }
}
