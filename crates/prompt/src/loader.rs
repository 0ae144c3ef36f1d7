//! The prompt loader: per-volume state assembled once, reused for every
//! chapter of the run.

use std::collections::BTreeMap;

use honyaku_types::{SemanticMetadata, TargetLanguage};

use crate::style;
use crate::user::UserPromptArgs;

#[derive(Debug, Clone)]
pub struct PromptLoader {
    target: TargetLanguage,
    genre: String,
    bible_prompt: Option<String>,
    world_directive: Option<String>,
    roster: BTreeMap<String, String>,
    glossary: BTreeMap<String, String>,
    semantic: Option<SemanticMetadata>,
    continuity_text: Option<String>,
}

impl PromptLoader {
    pub fn new(target: TargetLanguage) -> Self {
        Self {
            target,
            genre: style::DEFAULT_GENRE.to_string(),
            bible_prompt: None,
            world_directive: None,
            roster: BTreeMap::new(),
            glossary: BTreeMap::new(),
            semantic: None,
            continuity_text: None,
        }
    }

    pub fn target(&self) -> TargetLanguage {
        self.target
    }

    /// Select the genre style guide; unknown genres fall back to the
    /// default and log.
    pub fn set_genre(&mut self, genre: Option<&str>) {
        let requested = genre.unwrap_or(style::DEFAULT_GENRE);
        let (resolved, _) = style::style_guide(requested);
        if resolved != requested {
            tracing::warn!(requested, resolved, "unknown genre, using fallback style guide");
        }
        self.genre = resolved.to_string();
    }

    pub fn set_bible_prompt(&mut self, prompt: String, world_directive: String) {
        self.bible_prompt = (!prompt.is_empty()).then_some(prompt);
        self.world_directive = (!world_directive.is_empty()).then_some(world_directive);
    }

    /// Merged character roster (continuity ⊕ manifest, current volume wins).
    pub fn set_roster(&mut self, roster: BTreeMap<String, String>) {
        self.roster = roster;
    }

    pub fn roster(&self) -> &BTreeMap<String, String> {
        &self.roster
    }

    /// Merged effective glossary. Injected once; immutable for the life
    /// of the volume cache.
    pub fn set_glossary(&mut self, glossary: BTreeMap<String, String>) {
        self.glossary = glossary;
    }

    pub fn glossary(&self) -> &BTreeMap<String, String> {
        &self.glossary
    }

    pub fn set_semantic_metadata(&mut self, semantic: SemanticMetadata) {
        if !semantic.is_empty() {
            self.semantic = Some(semantic);
        }
    }

    pub fn set_continuity_text(&mut self, text: String) {
        self.continuity_text = (!text.is_empty()).then_some(text);
    }

    /// The stable per-volume system instruction. Layer order is fixed;
    /// later sections may reference earlier ones.
    pub fn build_system_instruction(&self) -> String {
        let mut sections: Vec<String> = Vec::new();

        // 1. Master translator directive.
        sections.push(style::master_prompt(self.target).trim_end().to_string());

        // 2. Genre style guide.
        let (_, guide) = style::style_guide(&self.genre);
        sections.push(guide.trim_end().to_string());

        // 3. Series bible block + compact world directive.
        if let Some(bible) = &self.bible_prompt {
            sections.push(bible.trim_end().to_string());
        }
        if let Some(directive) = &self.world_directive {
            sections.push(format!("WORLD DIRECTIVE: {directive}"));
        }

        // 4. Character roster.
        if !self.roster.is_empty() {
            let mut block = String::from("## CHARACTER ROSTER (CANONICAL)\n");
            block.push_str("Use these renderings for every occurrence, including partial name forms:\n");
            for (jp, target_name) in &self.roster {
                block.push_str(&format!("  {jp} = {target_name}\n"));
            }
            sections.push(block.trim_end().to_string());
        }

        // 5. Locked glossary.
        if !self.glossary.is_empty() {
            let mut block = String::from("## LOCKED GLOSSARY\n");
            block.push_str("Non-negotiable term renderings:\n");
            for (jp, target_term) in &self.glossary {
                block.push_str(&format!("  {jp} = {target_term}\n"));
            }
            sections.push(block.trim_end().to_string());
        }

        // 6. Semantic metadata: voice fingerprints, keigo switches, RTAS.
        if let Some(semantic) = &self.semantic {
            sections.push(format_semantic_metadata(semantic));
        }

        // 7. Continuity pack.
        if let Some(continuity) = &self.continuity_text {
            sections.push(continuity.trim_end().to_string());
        }

        sections.join("\n\n---\n\n")
    }

    /// The per-chapter user prompt. See [`UserPromptArgs`] for the block
    /// sequence.
    pub fn build_user_prompt(&self, args: &UserPromptArgs<'_>) -> String {
        args.assemble(self.target)
    }
}

fn format_semantic_metadata(semantic: &SemanticMetadata) -> String {
    let mut lines: Vec<String> = vec!["## CHARACTER VOICE PROFILES".to_string()];

    for voice in &semantic.characters {
        lines.push(format!("### {} ({})", voice.en_name, voice.jp_name));
        if let Some(nickname) = &voice.nickname {
            lines.push(format!("- Nickname: {nickname}"));
        }
        if let Some(fingerprint) = &voice.speech_fingerprint {
            lines.push(format!("- Speech fingerprint: {fingerprint}"));
        }
        if let Some(rate) = voice.contraction_rate {
            lines.push(format!(
                "- Contraction rate: {:.0}% of contractable forms",
                rate * 100.0
            ));
        }
        if !voice.keigo_switch.is_empty() {
            lines.push("- Register by conversation partner:".to_string());
            for (partner, register) in &voice.keigo_switch {
                lines.push(format!("    {partner}: {register}"));
            }
        }
        if !voice.rtas.is_empty() {
            lines.push("- Relationships:".to_string());
            for rel in &voice.rtas {
                let mut line = format!("    {} — {}", rel.target, rel.relation);
                if let Some(score) = rel.score {
                    line.push_str(&format!(" (closeness {score:.2})"));
                }
                if let Some(rate) = rel.contraction_rate_override {
                    line.push_str(&format!(" [contraction {:.0}%]", rate * 100.0));
                }
                lines.push(line);
            }
        }
        if !voice.how_refers_to_others.is_empty() {
            lines.push("- Address forms:".to_string());
            for (other, form) in &voice.how_refers_to_others {
                lines.push(format!("    calls {other}: \"{form}\""));
            }
        }
        if let Some(notes) = &voice.notes {
            lines.push(format!("- Notes: {notes}"));
        }
    }

    if !semantic.dialogue_patterns.is_empty() {
        lines.push("### Dialogue patterns".to_string());
        for (name, pattern) in &semantic.dialogue_patterns {
            lines.push(format!("- {name}: {pattern}"));
        }
    }
    if !semantic.scene_contexts.is_empty() {
        lines.push("### Scene contexts".to_string());
        for (scene, context) in &semantic.scene_contexts {
            lines.push(format!("- {scene}: {context}"));
        }
    }
    if !semantic.translation_guidelines.is_empty() {
        lines.push("### Additional guidelines".to_string());
        for guideline in &semantic.translation_guidelines {
            lines.push(format!("- {guideline}"));
        }
    }

    lines.join("\n")
}
