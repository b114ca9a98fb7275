//! Persona registry
//!
//! Static role-play configuration for each philosopher and the pure function
//! that turns a persona, a feature tag and free-text user context into a
//! system prompt.

use crate::persona_prompts::*;
use serde::{Deserialize, Serialize};

const DEFAULT_VOICE_ID: &str = "pNInz6obpgDQGcFmaJgB";

// ============ Identifiers ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonaId {
    Socrates,
    Plato,
    Aristotle,
    Heraclitus,
    Diogenes,
    Epicurus,
}

impl PersonaId {
    pub const ALL: [PersonaId; 6] = [
        PersonaId::Socrates,
        PersonaId::Plato,
        PersonaId::Aristotle,
        PersonaId::Heraclitus,
        PersonaId::Diogenes,
        PersonaId::Epicurus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaId::Socrates => "socrates",
            PersonaId::Plato => "plato",
            PersonaId::Aristotle => "aristotle",
            PersonaId::Heraclitus => "heraclitus",
            PersonaId::Diogenes => "diogenes",
            PersonaId::Epicurus => "epicurus",
        }
    }

    pub fn from_str(s: &str) -> Option<PersonaId> {
        match s.trim().to_lowercase().as_str() {
            "socrates" => Some(PersonaId::Socrates),
            "plato" => Some(PersonaId::Plato),
            "aristotle" => Some(PersonaId::Aristotle),
            "heraclitus" => Some(PersonaId::Heraclitus),
            "diogenes" => Some(PersonaId::Diogenes),
            "epicurus" => Some(PersonaId::Epicurus),
            _ => None,
        }
    }
}

/// Feature tag: selects both the prompt template and the upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Chat,
    Debate,
    Journal,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Chat => "chat",
            Feature::Debate => "debate",
            Feature::Journal => "journal",
        }
    }

    /// Unknown tags fall back to chat.
    pub fn parse(s: &str) -> Feature {
        match s.trim().to_lowercase().as_str() {
            "debate" => Feature::Debate,
            "journal" => Feature::Journal,
            _ => Feature::Chat,
        }
    }
}

// ============ Persona Data ============

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Expertise {
    pub topic: &'static str,
    pub reason: &'static str,
}

/// Later thinkers and events the persona must claim ignorance of.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct KnowledgeBoundary {
    pub later_philosophers: &'static [&'static str],
    pub later_events: &'static [&'static str],
}

/// Every persona must supply all three context templates.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplates {
    pub chat: &'static str,
    pub debate: &'static str,
    pub journal: &'static str,
    pub general: Option<&'static str>,
}

impl PromptTemplates {
    pub fn for_feature(&self, feature: Feature) -> &'static str {
        match feature {
            Feature::Chat => self.chat,
            Feature::Debate => self.debate,
            Feature::Journal => self.journal,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Persona {
    pub id: PersonaId,
    pub name: &'static str,
    pub era: &'static str,
    pub boundary: KnowledgeBoundary,
    pub expertise: &'static [Expertise],
    #[serde(skip)]
    pub templates: PromptTemplates,
    #[serde(skip)]
    pub voice_id: &'static str,
}

impl Persona {
    /// The "historical boundary" paragraph, generated from the boundary lists.
    pub fn historical_boundary(&self) -> String {
        let mut paragraph = format!(
            "HISTORICAL BOUNDARY: You are {}, and you live in {}. You know nothing of anything that happened after your lifetime.",
            self.name, self.era
        );

        if !self.boundary.later_philosophers.is_empty() {
            paragraph.push_str(&format!(
                " You have never heard of these later thinkers: {}.",
                self.boundary.later_philosophers.join(", ")
            ));
        }

        if !self.boundary.later_events.is_empty() {
            paragraph.push_str(&format!(
                " You know nothing of these later events: {}.",
                self.boundary.later_events.join(", ")
            ));
        }

        paragraph.push_str(
            " If the visitor mentions any of them, respond with honest puzzlement, as someone hearing of it for the first time.",
        );
        paragraph
    }

    /// Render the full system prompt for a feature and optional user context.
    pub fn render(&self, feature: Feature, user_context: &str) -> String {
        let mut sections: Vec<String> = vec![self.templates.for_feature(feature).to_string()];

        if feature != Feature::Debate {
            if let Some(general) = self.templates.general {
                sections.push(general.to_string());
            }
        }

        sections.push(self.historical_boundary());

        if let Some(context) = user_context_paragraph(user_context) {
            sections.push(context);
        }

        sections.join("\n\n")
    }

    pub fn primary_expertise(&self) -> Option<&Expertise> {
        self.expertise.first()
    }
}

fn user_context_paragraph(user_context: &str) -> Option<String> {
    let trimmed = user_context.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("ABOUT THE PERSON YOU ARE SPEAKING WITH:\n{}", trimmed))
    }
}

// ============ Registry ============

pub struct PersonaRegistry {
    personas: Vec<Persona>,
}

impl PersonaRegistry {
    /// The built-in philosopher set.
    pub fn builtin() -> Self {
        Self {
            personas: PersonaId::ALL.iter().map(|id| builtin_persona(*id)).collect(),
        }
    }

    pub fn personas(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }

    pub fn get(&self, id: PersonaId) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    pub fn get_persona(&self, id: &str) -> Option<&Persona> {
        PersonaId::from_str(id).and_then(|id| self.get(id))
    }

    /// Look up by display name, ignoring case ("Plato", "plato").
    pub fn find_by_name(&self, name: &str) -> Option<&Persona> {
        let name = name.trim();
        self.personas.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Render a persona's system prompt. `None` for an unknown id.
    pub fn render_prompt(&self, id: &str, context: &str, user_context: &str) -> Option<String> {
        self.get_persona(id)
            .map(|persona| persona.render(Feature::parse(context), user_context))
    }

    /// Prompt used when a request names a persona we don't know.
    pub fn default_prompt(&self, feature: Feature, user_context: &str) -> String {
        let mut sections = vec![DEFAULT_PERSONA_PROMPT.to_string()];
        if feature != Feature::Debate {
            sections.push(GENERAL_GUIDANCE_PROMPT.to_string());
        }
        if let Some(context) = user_context_paragraph(user_context) {
            sections.push(context);
        }
        sections.join("\n\n")
    }

    pub fn voice_for(&self, id: &str) -> &'static str {
        self.get_persona(id).map(|p| p.voice_id).unwrap_or(DEFAULT_VOICE_ID)
    }
}

fn builtin_persona(id: PersonaId) -> Persona {
    match id {
        PersonaId::Socrates => Persona {
            id,
            name: "Socrates",
            era: "Classical Athens, 470-399 BCE",
            boundary: KnowledgeBoundary {
                later_philosophers: &["Aristotle", "Epicurus", "Zeno of Citium", "Plotinus", "Augustine"],
                later_events: &["the conquests of Alexander", "the rise of Rome", "Christianity"],
            },
            expertise: &[
                Expertise { topic: "ethics", reason: "spent his life asking what virtue is" },
                Expertise { topic: "self-knowledge", reason: "took 'know thyself' as his life's command" },
                Expertise { topic: "definitions", reason: "never accepted a term without testing it" },
            ],
            templates: PromptTemplates {
                chat: SOCRATES_CHAT_PROMPT,
                debate: SOCRATES_DEBATE_PROMPT,
                journal: SOCRATES_JOURNAL_PROMPT,
                general: Some(GENERAL_GUIDANCE_PROMPT),
            },
            voice_id: "VR6AewLTigWG4xSOukaG",
        },
        PersonaId::Plato => Persona {
            id,
            name: "Plato",
            era: "Classical Athens, 428-348 BCE",
            boundary: KnowledgeBoundary {
                later_philosophers: &["Epicurus", "Zeno of Citium", "Plotinus", "Augustine"],
                later_events: &["the death of Alexander", "the rise of Rome", "Christianity"],
            },
            expertise: &[
                Expertise { topic: "justice", reason: "devoted the Republic to what justice is" },
                Expertise { topic: "the Forms", reason: "held that true reality lies beyond appearances" },
                Expertise { topic: "love", reason: "traced the ascent of love in the Symposium" },
            ],
            templates: PromptTemplates {
                chat: PLATO_CHAT_PROMPT,
                debate: PLATO_DEBATE_PROMPT,
                journal: PLATO_JOURNAL_PROMPT,
                general: Some(GENERAL_GUIDANCE_PROMPT),
            },
            voice_id: "ErXwobaYiN019PkySvjV",
        },
        PersonaId::Aristotle => Persona {
            id,
            name: "Aristotle",
            era: "Classical and Macedonian Greece, 384-322 BCE",
            boundary: KnowledgeBoundary {
                later_philosophers: &["Epicurus", "Zeno of Citium", "Cicero", "Aquinas"],
                later_events: &["the rise of Rome", "Christianity", "the printing press"],
            },
            expertise: &[
                Expertise { topic: "virtue", reason: "defined virtue as the mean between extremes" },
                Expertise { topic: "logic", reason: "founded the formal study of reasoning" },
                Expertise { topic: "politics", reason: "compared the constitutions of over a hundred cities" },
            ],
            templates: PromptTemplates {
                chat: ARISTOTLE_CHAT_PROMPT,
                debate: ARISTOTLE_DEBATE_PROMPT,
                journal: ARISTOTLE_JOURNAL_PROMPT,
                general: Some(GENERAL_GUIDANCE_PROMPT),
            },
            voice_id: "pNInz6obpgDQGcFmaJgB",
        },
        PersonaId::Heraclitus => Persona {
            id,
            name: "Heraclitus",
            era: "Archaic Ephesus, c. 535-475 BCE",
            boundary: KnowledgeBoundary {
                later_philosophers: &["Socrates", "Plato", "Aristotle", "Epicurus", "Hegel"],
                later_events: &["the Persian Wars", "the Athenian democracy's golden age", "the rise of Rome"],
            },
            expertise: &[
                Expertise { topic: "change", reason: "taught that everything flows" },
                Expertise { topic: "opposites", reason: "saw the unity of opposites in all things" },
            ],
            templates: PromptTemplates {
                chat: HERACLITUS_CHAT_PROMPT,
                debate: HERACLITUS_DEBATE_PROMPT,
                journal: HERACLITUS_JOURNAL_PROMPT,
                general: Some(GENERAL_GUIDANCE_PROMPT),
            },
            voice_id: "TxGEqnHWrfWFTfGW9XjX",
        },
        PersonaId::Diogenes => Persona {
            id,
            name: "Diogenes",
            era: "Classical Athens and Corinth, c. 412-323 BCE",
            boundary: KnowledgeBoundary {
                later_philosophers: &["Epicurus", "Zeno of Citium", "Seneca", "Nietzsche"],
                later_events: &["the rise of Rome", "Christianity", "money without coins"],
            },
            expertise: &[
                Expertise { topic: "simplicity", reason: "lived in a jar and owned only a cloak" },
                Expertise { topic: "convention", reason: "defaced the currency of custom" },
            ],
            templates: PromptTemplates {
                chat: DIOGENES_CHAT_PROMPT,
                debate: DIOGENES_DEBATE_PROMPT,
                journal: DIOGENES_JOURNAL_PROMPT,
                general: Some(GENERAL_GUIDANCE_PROMPT),
            },
            voice_id: "yoZ06aMxZJJ28mfd3POQ",
        },
        PersonaId::Epicurus => Persona {
            id,
            name: "Epicurus",
            era: "Hellenistic Athens, 341-270 BCE",
            boundary: KnowledgeBoundary {
                later_philosophers: &["Lucretius", "Seneca", "Marcus Aurelius", "Bentham"],
                later_events: &["the rise of Rome", "Christianity", "the printing press"],
            },
            expertise: &[
                Expertise { topic: "happiness", reason: "taught that tranquillity is the highest pleasure" },
                Expertise { topic: "death", reason: "argued that death is nothing to us" },
                Expertise { topic: "friendship", reason: "built his school around friends in a garden" },
            ],
            templates: PromptTemplates {
                chat: EPICURUS_CHAT_PROMPT,
                debate: EPICURUS_DEBATE_PROMPT,
                journal: EPICURUS_JOURNAL_PROMPT,
                general: Some(GENERAL_GUIDANCE_PROMPT),
            },
            voice_id: "2EiwWnXFnvU5JabPnv8n",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_name_and_era_for_every_context() {
        let registry = PersonaRegistry::builtin();
        for persona in registry.personas() {
            for context in ["chat", "debate", "journal"] {
                let prompt = registry
                    .render_prompt(persona.id.as_str(), context, "")
                    .expect("known persona renders");
                assert!(prompt.contains(persona.name), "{} / {}", persona.name, context);
                assert!(prompt.contains(persona.era), "{} / {}", persona.name, context);
            }
        }
    }

    #[test]
    fn test_unknown_persona_renders_none() {
        let registry = PersonaRegistry::builtin();
        assert!(registry.render_prompt("pythagoras", "chat", "").is_none());
        assert!(registry.render_prompt("", "chat", "").is_none());
    }

    #[test]
    fn test_unknown_context_falls_back_to_chat() {
        let registry = PersonaRegistry::builtin();
        let chat = registry.render_prompt("socrates", "chat", "").unwrap();
        let unknown = registry.render_prompt("socrates", "symposium", "").unwrap();
        assert_eq!(chat, unknown);
    }

    #[test]
    fn test_general_template_skipped_in_debate() {
        let registry = PersonaRegistry::builtin();
        let debate = registry.render_prompt("plato", "debate", "").unwrap();
        let chat = registry.render_prompt("plato", "chat", "").unwrap();
        assert!(!debate.contains("GENERAL GUIDANCE"));
        assert!(chat.contains("GENERAL GUIDANCE"));
    }

    #[test]
    fn test_boundary_is_deterministic() {
        let registry = PersonaRegistry::builtin();
        let persona = registry.get(PersonaId::Aristotle).unwrap();
        assert_eq!(persona.historical_boundary(), persona.historical_boundary());
        assert!(persona.historical_boundary().contains("Epicurus, Zeno of Citium, Cicero, Aquinas"));

        let first = registry.render_prompt("aristotle", "journal", "I keep a garden.").unwrap();
        let second = registry.render_prompt("aristotle", "journal", "I keep a garden.").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_user_context_appended_only_when_present() {
        let registry = PersonaRegistry::builtin();
        let with = registry.render_prompt("epicurus", "chat", "  Works night shifts.  ").unwrap();
        let without = registry.render_prompt("epicurus", "chat", "   ").unwrap();
        assert!(with.ends_with("ABOUT THE PERSON YOU ARE SPEAKING WITH:\nWorks night shifts."));
        assert!(!without.contains("ABOUT THE PERSON"));
    }

    #[test]
    fn test_persona_ids_are_case_insensitive() {
        let registry = PersonaRegistry::builtin();
        assert_eq!(registry.get_persona("Socrates").map(|p| p.id), Some(PersonaId::Socrates));
        assert_eq!(PersonaId::from_str(" DIOGENES "), Some(PersonaId::Diogenes));
    }

    #[test]
    fn test_find_by_display_name() {
        let registry = PersonaRegistry::builtin();
        assert_eq!(registry.find_by_name("heraclitus").map(|p| p.id), Some(PersonaId::Heraclitus));
        assert_eq!(registry.find_by_name("Epicurus").map(|p| p.id), Some(PersonaId::Epicurus));
        assert!(registry.find_by_name("Thales").is_none());
    }

    #[test]
    fn test_voice_falls_back_to_default() {
        let registry = PersonaRegistry::builtin();
        assert_eq!(registry.voice_for("nobody"), DEFAULT_VOICE_ID);
        assert_eq!(registry.voice_for("plato"), "ErXwobaYiN019PkySvjV");
    }
}
