//! Target language handling.

use serde::{Deserialize, Serialize};

/// Supported translation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    #[default]
    #[serde(alias = "english")]
    En,
    #[serde(alias = "vi", alias = "vietnamese")]
    Vn,
}

impl TargetLanguage {
    /// Parse a language code. Accepts `en`, `vi`, and `vn`.
    pub fn parse(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "vi" | "vn" => Some(Self::Vn),
            _ => None,
        }
    }

    /// Short code used in manifest keys (`en_file`, `title_vn`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Vn => "vn",
        }
    }

    /// Per-volume output directory name (`EN/`, `VN/`).
    pub fn output_dir(&self) -> &'static str {
        match self {
            Self::En => "EN",
            Self::Vn => "VN",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Vn => "Vietnamese",
        }
    }

    /// Whether this target needs the Sino-Vietnamese RAG path.
    pub fn is_vietnamese(&self) -> bool {
        matches!(self, Self::Vn)
    }
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_vi_and_vn() {
        assert_eq!(TargetLanguage::parse("vi"), Some(TargetLanguage::Vn));
        assert_eq!(TargetLanguage::parse("vn"), Some(TargetLanguage::Vn));
        assert_eq!(TargetLanguage::parse("EN"), Some(TargetLanguage::En));
        assert_eq!(TargetLanguage::parse("fr"), None);
    }

    #[test]
    fn output_dir_is_uppercase_code() {
        assert_eq!(TargetLanguage::En.output_dir(), "EN");
        assert_eq!(TargetLanguage::Vn.output_dir(), "VN");
    }
}
