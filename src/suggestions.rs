//! Persona-switch suggestions
//!
//! Plain substring search for other philosophers' display names in a reply.
//! A name inside a longer word ("Platonic") or a quotation still counts; this
//! is a known limitation of the heuristic.

use crate::personas::{PersonaId, PersonaRegistry};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Sentences longer than this are replaced by the canned reason.
const MAX_REASON_CHARS: usize = 240;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchSuggestion {
    pub suggested_persona: PersonaId,
    pub suggested_name: String,
    pub current_persona: String,
    pub reason: String,
}

/// Personas not yet part of the conversation.
pub fn candidates_excluding(registry: &PersonaRegistry, present: &[String]) -> Vec<PersonaId> {
    registry
        .personas()
        .map(|p| p.id)
        .filter(|id| !present.iter().any(|p| p.eq_ignore_ascii_case(id.as_str())))
        .collect()
}

/// Suggest the first candidate, in registry order, whose name appears in `response`.
pub fn detect_switch(
    registry: &PersonaRegistry,
    response: &str,
    current: &str,
    candidates: &[PersonaId],
) -> Option<SwitchSuggestion> {
    let (position, persona) = registry
        .personas()
        .filter(|p| candidates.contains(&p.id) && !p.id.as_str().eq_ignore_ascii_case(current))
        .find_map(|p| response.find(p.name).map(|pos| (pos, p)))?;

    let reason = sentence_around(response, position)
        .filter(|s| s.chars().count() <= MAX_REASON_CHARS)
        .unwrap_or_else(|| match persona.primary_expertise() {
            Some(expertise) => format!(
                "{} might offer a fresh perspective on {}: {} {}.",
                persona.name, expertise.topic, persona.name, expertise.reason
            ),
            None => format!("{} might offer a fresh perspective on this.", persona.name),
        });

    Some(SwitchSuggestion {
        suggested_persona: persona.id,
        suggested_name: persona.name.to_string(),
        current_persona: current.to_string(),
        reason,
    })
}

/// The sentence containing byte offset `position`.
fn sentence_around(text: &str, position: usize) -> Option<String> {
    let is_end = |c: char| matches!(c, '.' | '!' | '?' | '\n');

    let start = text[..position]
        .rfind(is_end)
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = text[position..]
        .find(is_end)
        .map(|i| position + i + 1)
        .unwrap_or(text.len());

    let sentence = text[start..end].trim();
    if sentence.is_empty() {
        None
    } else {
        Some(sentence.to_string())
    }
}

// ============ Suggestion State ============

#[derive(Debug, Clone, PartialEq)]
pub enum SwitchState {
    Idle,
    Suggested(SwitchSuggestion),
}

/// Per-conversation suggestion state. Transitions are driven by the caller;
/// nothing times out on its own.
#[derive(Debug, Clone)]
pub struct SwitchTracker {
    active: String,
    state: SwitchState,
    cooldown: Duration,
    last_suggested_at: Option<DateTime<Utc>>,
}

impl SwitchTracker {
    pub fn new(active: impl Into<String>, cooldown: Duration) -> Self {
        Self {
            active: active.into(),
            state: SwitchState::Idle,
            cooldown,
            last_suggested_at: None,
        }
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    pub fn state(&self) -> &SwitchState {
        &self.state
    }

    /// Move to `Suggested` if idle and outside the cooldown window.
    pub fn offer(&mut self, suggestion: SwitchSuggestion, now: DateTime<Utc>) -> bool {
        if self.state != SwitchState::Idle {
            return false;
        }
        if let Some(last) = self.last_suggested_at {
            if now - last < self.cooldown {
                return false;
            }
        }
        self.state = SwitchState::Suggested(suggestion);
        self.last_suggested_at = Some(now);
        true
    }

    /// Accept the pending suggestion; returns the new active persona.
    pub fn accept(&mut self) -> Option<PersonaId> {
        match std::mem::replace(&mut self.state, SwitchState::Idle) {
            SwitchState::Suggested(suggestion) => {
                self.active = suggestion.suggested_persona.as_str().to_string();
                Some(suggestion.suggested_persona)
            }
            SwitchState::Idle => None,
        }
    }

    pub fn decline(&mut self) -> bool {
        match std::mem::replace(&mut self.state, SwitchState::Idle) {
            SwitchState::Suggested(_) => true,
            SwitchState::Idle => false,
        }
    }
}
