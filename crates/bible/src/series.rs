//! A single series' canonical data.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BibleError, Result};

pub const BIBLE_SCHEMA_VERSION: &str = "1.1";

/// One glossary entry. Every entry must carry a non-empty
/// `canonical_en`; aliases resolve to `short_name` (falling back to the
/// canonical form).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BibleEntry {
    pub canonical_en: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases_jp: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wielder: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl BibleEntry {
    pub fn named(canonical_en: impl Into<String>) -> Self {
        Self {
            canonical_en: canonical_en.into(),
            ..Default::default()
        }
    }

    fn alias_target(&self) -> &str {
        self.short_name.as_deref().unwrap_or(&self.canonical_en)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Geography {
    #[serde(default)]
    pub countries: BTreeMap<String, BibleEntry>,
    #[serde(default)]
    pub regions: BTreeMap<String, BibleEntry>,
    #[serde(default)]
    pub cities: BTreeMap<String, BibleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HonorificsPolicy {
    #[serde(default)]
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NameOrderPolicy {
    #[serde(default)]
    pub default: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldException {
    #[serde(default)]
    pub character_en: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub name_order_override: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldSetting {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub setting_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honorifics: Option<HonorificsPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_order: Option<NameOrderPolicy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<WorldException>,
}

impl WorldSetting {
    pub fn is_empty(&self) -> bool {
        self.setting_type.is_none()
            && self.label.is_none()
            && self.honorifics.is_none()
            && self.name_order.is_none()
            && self.exceptions.is_empty()
    }

    fn display_label(&self) -> &str {
        self.label
            .as_deref()
            .or(self.setting_type.as_deref())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TranslationRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub titles: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredVolume {
    pub volume_id: String,
    pub title: String,
    pub index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BibleData {
    #[serde(default)]
    pub bible_version: String,
    #[serde(default)]
    pub series_id: String,
    /// {"ja": ..., "en": ..., "romaji": ...}
    #[serde(default)]
    pub series_title: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub volumes_registered: Vec<RegisteredVolume>,
    #[serde(default)]
    pub world_setting: WorldSetting,
    #[serde(default)]
    pub characters: BTreeMap<String, BibleEntry>,
    #[serde(default)]
    pub geography: Geography,
    /// Nested: sub-category -> JP key -> entry.
    #[serde(default)]
    pub weapons_artifacts: BTreeMap<String, BTreeMap<String, BibleEntry>>,
    #[serde(default)]
    pub organizations: BTreeMap<String, BibleEntry>,
    #[serde(default)]
    pub cultural_terms: BTreeMap<String, BibleEntry>,
    #[serde(default)]
    pub mythology: BTreeMap<String, BibleEntry>,
    #[serde(default)]
    pub translation_rules: TranslationRules,
}

/// Dotted category path used by [`SeriesBible::add_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryPath {
    Characters,
    Organizations,
    CulturalTerms,
    Mythology,
    Geography(String),
    Weapons(String),
}

impl CategoryPath {
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = || BibleError::InvalidCategory {
            path: path.to_string(),
        };
        match path.split_once('.') {
            None => match path {
                "characters" => Ok(Self::Characters),
                "organizations" => Ok(Self::Organizations),
                "cultural_terms" => Ok(Self::CulturalTerms),
                "mythology" => Ok(Self::Mythology),
                _ => Err(invalid()),
            },
            Some(("geography", sub)) => match sub {
                "countries" | "regions" | "cities" => Ok(Self::Geography(sub.to_string())),
                _ => Err(invalid()),
            },
            Some(("weapons_artifacts", sub)) if !sub.is_empty() => {
                Ok(Self::Weapons(sub.to_string()))
            }
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeriesBible {
    path: PathBuf,
    pub data: BibleData,
}

impl SeriesBible {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BibleError::NotFound {
                path: path.display().to_string(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| BibleError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let data: BibleData = serde_json::from_str(&text).map_err(|source| BibleError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(series = %data.series_id, entries = entry_count(&data), "bible loaded");
        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn create(path: &Path, data: BibleData) -> Result<Self> {
        if path.exists() {
            return Err(BibleError::AlreadyExists {
                path: path.display().to_string(),
            });
        }
        let mut bible = Self {
            path: path.to_path_buf(),
            data,
        };
        bible.data.bible_version = BIBLE_SCHEMA_VERSION.to_string();
        bible.data.created_at = Some(Utc::now().to_rfc3339());
        bible.save()?;
        Ok(bible)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn series_id(&self) -> &str {
        &self.data.series_id
    }

    /// Timestamp and write the bible to disk (temp + rename).
    pub fn save(&mut self) -> Result<()> {
        self.data.last_updated = Some(Utc::now().to_rfc3339());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| BibleError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let io_err = |source| BibleError::Io {
            path: self.path.display().to_string(),
            source,
        };
        let text = serde_json::to_string_pretty(&self.data).map_err(|source| BibleError::Parse {
            path: self.path.display().to_string(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        tracing::info!(series = %self.data.series_id, path = %self.path.display(), "bible saved");
        Ok(())
    }

    // ── Glossary generation ─────────────────────────────────────────

    /// Flatten all categories into the authoritative JP→EN map.
    /// Aliases resolve to the owning entry's short name.
    pub fn flat_glossary(&self) -> BTreeMap<String, String> {
        let mut glossary = BTreeMap::new();
        for (jp, entry) in &self.data.characters {
            if entry.canonical_en.is_empty() {
                continue;
            }
            glossary.insert(jp.clone(), entry.canonical_en.clone());
            for alias in &entry.aliases_jp {
                if !alias.is_empty() {
                    glossary.insert(alias.clone(), entry.alias_target().to_string());
                }
            }
        }
        for map in [
            &self.data.geography.countries,
            &self.data.geography.regions,
            &self.data.geography.cities,
            &self.data.organizations,
            &self.data.cultural_terms,
            &self.data.mythology,
        ] {
            for (jp, entry) in map {
                if !entry.canonical_en.is_empty() {
                    glossary.insert(jp.clone(), entry.canonical_en.clone());
                }
            }
        }
        for sub in self.data.weapons_artifacts.values() {
            for (jp, entry) in sub {
                if !entry.canonical_en.is_empty() {
                    glossary.insert(jp.clone(), entry.canonical_en.clone());
                }
            }
        }
        glossary
    }

    pub fn characters_glossary(&self) -> BTreeMap<String, String> {
        let mut glossary = BTreeMap::new();
        for (jp, entry) in &self.data.characters {
            if entry.canonical_en.is_empty() {
                continue;
            }
            glossary.insert(jp.clone(), entry.canonical_en.clone());
            for alias in &entry.aliases_jp {
                if !alias.is_empty() {
                    glossary.insert(alias.clone(), entry.alias_target().to_string());
                }
            }
        }
        glossary
    }

    // ── Prompt formatting ───────────────────────────────────────────

    /// Categorized prompt block for the cached system instruction.
    pub fn format_for_prompt(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        let title = self
            .data
            .series_title
            .get("en")
            .cloned()
            .unwrap_or_else(|| self.data.series_id.clone());
        lines.push(format!("<!-- SERIES BIBLE: {title} (CACHED) -->"));
        lines.push(String::new());

        let ws = &self.data.world_setting;
        if !ws.is_empty() {
            lines.push("=== WORLD SETTING ===".into());
            lines.push(format!("Type: {}", ws.display_label()));
            if let Some(hon) = &ws.honorifics {
                let mode_label = match hon.mode.as_str() {
                    "localize" => "Localize — drop JP honorifics, use English register/titles",
                    "retain" => "Retain all JP honorifics (-san, -kun, -chan, etc.)",
                    other => other,
                };
                lines.push(format!("Honorifics: {mode_label}"));
                if let Some(policy) = &hon.policy {
                    lines.push(format!("  Policy: {policy}"));
                }
            }
            if let Some(order) = &ws.name_order {
                let order_label = match order.default.as_str() {
                    "given_family" => "Given-Family (Western first-name order)",
                    "family_given" => "Family-Given (Japanese surname-first order)",
                    other => other,
                };
                lines.push(format!("Name Order: {order_label}"));
                if let Some(policy) = &order.policy {
                    lines.push(format!("  Policy: {policy}"));
                }
            }
            if !ws.exceptions.is_empty() {
                lines.push(format!("Exceptions ({}):", ws.exceptions.len()));
                for exc in &ws.exceptions {
                    lines.push(format!(
                        "  • {}: {} → name order: {}",
                        exc.character_en, exc.reason, exc.name_order_override
                    ));
                }
            }
            lines.push(String::new());
        }

        if !self.data.characters.is_empty() {
            lines.push("=== CHARACTERS ===".into());
            for (jp, entry) in &self.data.characters {
                let suffix = match &entry.short_name {
                    Some(short) if short != &entry.canonical_en => format!(" ({short})"),
                    _ => String::new(),
                };
                let cat_tag = entry
                    .category
                    .as_deref()
                    .map(|c| format!(" [{c}]"))
                    .unwrap_or_default();
                lines.push(format!("  {jp} = {}{suffix}{cat_tag}", entry.canonical_en));
            }
            lines.push(String::new());
        }

        for (sub, label) in [
            (&self.data.geography.countries, "COUNTRIES"),
            (&self.data.geography.regions, "REGIONS"),
            (&self.data.geography.cities, "CITIES"),
        ] {
            let entries: Vec<String> = sub
                .iter()
                .filter(|(_, e)| !e.canonical_en.is_empty())
                .map(|(jp, e)| format!("{jp} = {}", e.canonical_en))
                .collect();
            if !entries.is_empty() {
                lines.push(format!("=== GEOGRAPHY: {label} ==="));
                lines.push(format!("  {}", entries.join(" | ")));
                lines.push(String::new());
            }
        }

        if self.data.weapons_artifacts.values().any(|s| !s.is_empty()) {
            lines.push("=== WEAPONS & ARTIFACTS ===".into());
            for sub in self.data.weapons_artifacts.values() {
                for (jp, entry) in sub {
                    if entry.canonical_en.is_empty() {
                        continue;
                    }
                    let extra = if let Some(wielder) = &entry.wielder {
                        format!(" (wielder: {wielder})")
                    } else if let Some(kind) = &entry.entry_type {
                        format!(" ({kind})")
                    } else {
                        String::new()
                    };
                    lines.push(format!("  {jp} = {}{extra}", entry.canonical_en));
                }
            }
            lines.push(String::new());
        }

        if !self.data.organizations.is_empty() {
            lines.push("=== ORGANIZATIONS ===".into());
            for (jp, entry) in &self.data.organizations {
                if !entry.canonical_en.is_empty() {
                    lines.push(format!("  {jp} = {}", entry.canonical_en));
                }
            }
            lines.push(String::new());
        }

        if !self.data.cultural_terms.is_empty() {
            lines.push("=== CULTURAL TERMS ===".into());
            for (jp, entry) in &self.data.cultural_terms {
                if entry.canonical_en.is_empty() {
                    continue;
                }
                let literal = entry
                    .literal
                    .as_deref()
                    .map(|l| format!(" (lit. {l})"))
                    .unwrap_or_default();
                lines.push(format!("  {jp} = {}{literal}", entry.canonical_en));
            }
            lines.push(String::new());
        }

        if !self.data.mythology.is_empty() {
            lines.push("=== MYTHOLOGY ===".into());
            for (jp, entry) in &self.data.mythology {
                if entry.canonical_en.is_empty() {
                    continue;
                }
                let tag = entry
                    .entry_type
                    .as_deref()
                    .map(|t| format!(" [{t}]"))
                    .unwrap_or_default();
                lines.push(format!("  {jp} = {}{tag}", entry.canonical_en));
            }
            lines.push(String::new());
        }

        let rules = &self.data.translation_rules;
        if rules.style.is_some() || !rules.titles.is_empty() {
            lines.push("=== TRANSLATION RULES ===".into());
            if let Some(style) = &rules.style {
                lines.push(format!("  Style: {style}"));
            }
            if !rules.titles.is_empty() {
                let titles: Vec<String> = rules
                    .titles
                    .iter()
                    .map(|(jp, en)| format!("{jp}={en}"))
                    .collect();
                lines.push(format!("  Titles: {}", titles.join(" | ")));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }

    /// Compact one-line world-setting directive for space-constrained use.
    pub fn format_world_setting_directive(&self) -> String {
        let ws = &self.data.world_setting;
        if ws.is_empty() {
            return String::new();
        }
        let mut parts = vec![format!("[World: {}]", ws.display_label())];
        if let Some(hon) = &ws.honorifics {
            match hon.mode.as_str() {
                "localize" => parts.push("Honorifics: DROP all JP → English register/titles".into()),
                "retain" => parts.push("Honorifics: KEEP JP (-san, -kun, etc.)".into()),
                _ => {}
            }
        }
        if let Some(order) = &ws.name_order {
            match order.default.as_str() {
                "given_family" => parts.push("Names: Given-Family order".into()),
                "family_given" => parts.push("Names: Family-Given order".into()),
                _ => {}
            }
        }
        for exc in &ws.exceptions {
            if !exc.character_en.is_empty() {
                parts.push(format!(
                    "Exception: {} → {}",
                    exc.character_en, exc.name_order_override
                ));
            }
        }
        parts.join(" | ")
    }

    // ── Mutation ────────────────────────────────────────────────────

    /// Add or merge an entry at a dotted category path
    /// (`characters`, `geography.cities`, `weapons_artifacts.swords`).
    pub fn add_entry(&mut self, category: &str, jp_key: &str, entry: BibleEntry) -> Result<()> {
        let target = match CategoryPath::parse(category)? {
            CategoryPath::Characters => &mut self.data.characters,
            CategoryPath::Organizations => &mut self.data.organizations,
            CategoryPath::CulturalTerms => &mut self.data.cultural_terms,
            CategoryPath::Mythology => &mut self.data.mythology,
            CategoryPath::Geography(sub) => match sub.as_str() {
                "countries" => &mut self.data.geography.countries,
                "regions" => &mut self.data.geography.regions,
                _ => &mut self.data.geography.cities,
            },
            CategoryPath::Weapons(sub) => self.data.weapons_artifacts.entry(sub).or_default(),
        };
        match target.get_mut(jp_key) {
            Some(existing) => {
                merge_entry(existing, entry);
                tracing::debug!(category, jp_key, "bible entry updated");
            }
            None => {
                target.insert(jp_key.to_string(), entry);
                tracing::debug!(category, jp_key, "bible entry added");
            }
        }
        Ok(())
    }

    pub fn get_character(&self, jp_name: &str) -> Option<&BibleEntry> {
        self.data.characters.get(jp_name)
    }

    /// Register a volume (idempotent; kept sorted by index).
    pub fn register_volume(&mut self, volume_id: &str, title: &str, index: u32) {
        let volumes = &mut self.data.volumes_registered;
        if let Some(existing) = volumes.iter_mut().find(|v| v.volume_id == volume_id) {
            existing.title = title.to_string();
            existing.index = index;
        } else {
            volumes.push(RegisteredVolume {
                volume_id: volume_id.to_string(),
                title: title.to_string(),
                index,
            });
        }
        volumes.sort_by_key(|v| v.index);
    }

    pub fn entry_count(&self) -> usize {
        entry_count(&self.data)
    }

    /// Invariant check: every entry carries a non-empty canonical form.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut check = |category: &str, map: &BTreeMap<String, BibleEntry>| {
            for (jp, entry) in map {
                if entry.canonical_en.is_empty() {
                    problems.push(format!("{category}/{jp}: empty canonical_en"));
                }
            }
        };
        check("characters", &self.data.characters);
        check("geography.countries", &self.data.geography.countries);
        check("geography.regions", &self.data.geography.regions);
        check("geography.cities", &self.data.geography.cities);
        check("organizations", &self.data.organizations);
        check("cultural_terms", &self.data.cultural_terms);
        check("mythology", &self.data.mythology);
        for (sub, map) in &self.data.weapons_artifacts {
            check(&format!("weapons_artifacts.{sub}"), map);
        }
        problems
    }
}

fn merge_entry(existing: &mut BibleEntry, incoming: BibleEntry) {
    if !incoming.canonical_en.is_empty() {
        existing.canonical_en = incoming.canonical_en;
    }
    if incoming.short_name.is_some() {
        existing.short_name = incoming.short_name;
    }
    for alias in incoming.aliases_jp {
        if !existing.aliases_jp.contains(&alias) {
            existing.aliases_jp.push(alias);
        }
    }
    if incoming.category.is_some() {
        existing.category = incoming.category;
    }
    if incoming.notes.is_some() {
        existing.notes = incoming.notes;
    }
    existing.extra.extend(incoming.extra);
}

fn entry_count(data: &BibleData) -> usize {
    data.characters.len()
        + data.geography.countries.len()
        + data.geography.regions.len()
        + data.geography.cities.len()
        + data.organizations.len()
        + data.cultural_terms.len()
        + data.mythology.len()
        + data
            .weapons_artifacts
            .values()
            .map(|sub| sub.len())
            .sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bible() -> SeriesBible {
        let mut data = BibleData {
            series_id: "madan_no_ou_to_vanadis".into(),
            ..Default::default()
        };
        data.series_title
            .insert("en".into(), "Lord Marksman and Vanadis".into());
        data.characters.insert(
            "ティグルヴルムド＝ヴォルン".into(),
            BibleEntry {
                canonical_en: "Tigrevurmud Vorn".into(),
                short_name: Some("Tigre".into()),
                aliases_jp: vec!["ティグル".into()],
                ..Default::default()
            },
        );
        data.geography.countries.insert(
            "ジスタート".into(),
            BibleEntry::named("Zhcted"),
        );
        data.world_setting = WorldSetting {
            label: Some("Medieval European Fantasy".into()),
            honorifics: Some(HonorificsPolicy {
                mode: "localize".into(),
                policy: None,
            }),
            name_order: Some(NameOrderPolicy {
                default: "given_family".into(),
                policy: None,
            }),
            ..Default::default()
        };
        SeriesBible {
            path: PathBuf::from("/tmp/unused.json"),
            data,
        }
    }

    #[test]
    fn flat_glossary_resolves_aliases_to_short_name() {
        let bible = sample_bible();
        let glossary = bible.flat_glossary();
        assert_eq!(
            glossary.get("ティグルヴルムド＝ヴォルン").unwrap(),
            "Tigrevurmud Vorn"
        );
        assert_eq!(glossary.get("ティグル").unwrap(), "Tigre");
        assert_eq!(glossary.get("ジスタート").unwrap(), "Zhcted");
    }

    #[test]
    fn prompt_block_contains_world_setting_and_characters() {
        let bible = sample_bible();
        let block = bible.format_for_prompt();
        assert!(block.contains("=== WORLD SETTING ==="));
        assert!(block.contains("=== CHARACTERS ==="));
        assert!(block.contains("Tigrevurmud Vorn (Tigre)"));
        assert!(block.contains("Localize"));
    }

    #[test]
    fn world_directive_is_single_line() {
        let bible = sample_bible();
        let directive = bible.format_world_setting_directive();
        assert!(!directive.contains('\n'));
        assert!(directive.contains("Given-Family"));
    }

    #[test]
    fn add_entry_merges_into_existing() {
        let mut bible = sample_bible();
        bible
            .add_entry(
                "characters",
                "ティグルヴルムド＝ヴォルン",
                BibleEntry {
                    canonical_en: "Tigrevurmud Vorn".into(),
                    aliases_jp: vec!["若様".into()],
                    ..Default::default()
                },
            )
            .unwrap();
        let entry = bible.get_character("ティグルヴルムド＝ヴォルン").unwrap();
        assert!(entry.aliases_jp.contains(&"若様".to_string()));
        assert!(entry.aliases_jp.contains(&"ティグル".to_string()));
    }

    #[test]
    fn dotted_paths_parse() {
        assert!(CategoryPath::parse("geography.cities").is_ok());
        assert!(CategoryPath::parse("weapons_artifacts.bows").is_ok());
        assert!(CategoryPath::parse("geography.oceans").is_err());
        assert!(CategoryPath::parse("nonsense").is_err());
    }

    #[test]
    fn register_volume_is_idempotent_and_sorted() {
        let mut bible = sample_bible();
        bible.register_volume("vol_b", "Volume 2", 2);
        bible.register_volume("vol_a", "Volume 1", 1);
        bible.register_volume("vol_b", "Volume 2 (rev)", 2);
        let volumes = &bible.data.volumes_registered;
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].volume_id, "vol_a");
        assert_eq!(volumes[1].title, "Volume 2 (rev)");
    }

    #[test]
    fn validate_flags_empty_canonical() {
        let mut bible = sample_bible();
        bible
            .data
            .organizations
            .insert("騎士団".into(), BibleEntry::default());
        let problems = bible.validate();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("騎士団"));
    }
}
