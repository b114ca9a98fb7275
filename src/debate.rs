//! Debate arena turn-taking
//!
//! Participants speak round-robin. Each turn the speaker sees the transcript
//! and is asked to answer the previous speaker directly. Debates stop at a
//! hard turn limit.

use crate::conversation::{ConversationTurn, Transcript};
use crate::dispatcher::{DispatchRequest, Dispatcher};
use crate::error::AppError;
use crate::logging;
use crate::personas::{Feature, PersonaId, PersonaRegistry};
use serde::Serialize;

pub const MIN_PARTICIPANTS: usize = 2;
pub const MAX_PARTICIPANTS: usize = 4;
pub const DEFAULT_MAX_TURNS: usize = 12;

#[derive(Debug, Clone)]
pub struct DebateSession {
    topic: String,
    participants: Vec<PersonaId>,
    transcript: Transcript,
    max_turns: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateTurn {
    pub response: String,
    pub philosopher_id: PersonaId,
    pub next_philosopher_id: Option<PersonaId>,
    pub concluded: bool,
    pub model: String,
}

impl DebateSession {
    /// Validates the topic and a set of 2-4 distinct participants.
    pub fn new(
        topic: &str,
        participants: &[String],
        transcript: Transcript,
        max_turns: Option<usize>,
    ) -> Result<Self, AppError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(AppError::Validation("Debate topic is required".to_string()));
        }

        let mut ids: Vec<PersonaId> = Vec::with_capacity(participants.len());
        for raw in participants {
            let id = PersonaId::from_str(raw)
                .ok_or_else(|| AppError::Validation(format!("Unknown philosopher: {}", raw)))?;
            if ids.contains(&id) {
                return Err(AppError::Validation(format!("{} is listed twice", raw)));
            }
            ids.push(id);
        }

        if ids.len() < MIN_PARTICIPANTS || ids.len() > MAX_PARTICIPANTS {
            return Err(AppError::Validation(format!(
                "A debate needs between {} and {} philosophers",
                MIN_PARTICIPANTS, MAX_PARTICIPANTS
            )));
        }

        Ok(Self {
            topic: topic.to_string(),
            participants: ids,
            transcript,
            max_turns: max_turns.unwrap_or(DEFAULT_MAX_TURNS).max(1),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn participants(&self) -> &[PersonaId] {
        &self.participants
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_concluded(&self) -> bool {
        self.transcript.philosopher_turn_count() >= self.max_turns
    }

    /// Round-robin: the participant after whoever spoke last.
    pub fn next_speaker(&self) -> PersonaId {
        let last = self
            .transcript
            .last_philosopher_turn()
            .and_then(|t| t.philosopher_id())
            .and_then(PersonaId::from_str)
            .and_then(|id| self.participants.iter().position(|p| *p == id));

        match last {
            Some(index) => self.participants[(index + 1) % self.participants.len()],
            None => self.participants[0],
        }
    }

    /// The user message for `speaker`'s turn.
    pub fn turn_prompt(&self, registry: &PersonaRegistry, speaker: PersonaId) -> String {
        let others: Vec<&str> = self
            .participants
            .iter()
            .filter(|p| **p != speaker)
            .filter_map(|p| registry.get(*p).map(|persona| persona.name))
            .collect();

        let previous = self
            .transcript
            .last_philosopher_turn()
            .and_then(|turn| {
                let id = turn.philosopher_id()?;
                let persona = registry.get_persona(id)?;
                (persona.id != speaker).then(|| (persona.name, turn.content()))
            });

        match previous {
            Some((name, statement)) => format!(
                "The debate topic is: \"{}\". Your opponents are {}. {} just said: \"{}\" Respond to {} directly.",
                self.topic,
                others.join(", "),
                name,
                statement,
                name
            ),
            None => format!(
                "The debate topic is: \"{}\". Your opponents are {}. Open the debate with your position.",
                self.topic,
                others.join(", ")
            ),
        }
    }

    /// Ask the next speaker for their contribution and append it.
    pub async fn take_turn(&mut self, dispatcher: &Dispatcher, user_context: &str) -> Result<DebateTurn, AppError> {
        if self.is_concluded() {
            return Err(AppError::Validation("This debate has already concluded".to_string()));
        }

        let speaker = self.next_speaker();
        let request = DispatchRequest {
            persona_id: speaker.as_str().to_string(),
            user_text: self.turn_prompt(dispatcher.registry(), speaker),
            history: self.transcript.turns().to_vec(),
            user_context: user_context.to_string(),
            feature: Feature::Debate,
        };

        let reply = dispatcher.send_message(&request).await?;

        self.transcript
            .push(ConversationTurn::philosopher(speaker.as_str(), reply.text.clone()));

        let concluded = self.is_concluded();
        logging::log_conversation(
            None,
            &format!(
                "Debate '{}': {} spoke (turn {}/{}{})",
                self.topic,
                speaker.as_str(),
                self.transcript.philosopher_turn_count(),
                self.max_turns,
                if concluded { ", concluded" } else { "" }
            ),
        );

        Ok(DebateTurn {
            response: reply.text,
            philosopher_id: speaker,
            next_philosopher_id: (!concluded).then(|| self.next_speaker()),
            concluded,
            model: reply.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{ChatBackend, Completion, Provider};
    use crate::error::ProviderError;
    use crate::openai::ChatMessage;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct EchoBackend {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatBackend for EchoBackend {
        fn provider(&self) -> Provider {
            Provider::OpenAI
        }

        async fn complete(
            &self,
            model: &str,
            system_prompt: &str,
            messages: Vec<ChatMessage>,
        ) -> Result<Completion, ProviderError> {
            self.prompts.lock().unwrap().push(system_prompt.to_string());
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(Completion {
                text: format!("reply to: {}", last),
                model: model.to_string(),
                usage: None,
            })
        }
    }

    fn participants(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rejects_bad_participant_sets() {
        assert!(DebateSession::new("Is change real?", &participants(&["plato"]), Transcript::new(), None).is_err());
        assert!(DebateSession::new("Is change real?", &participants(&["plato", "plato"]), Transcript::new(), None).is_err());
        assert!(DebateSession::new("Is change real?", &participants(&["plato", "thales"]), Transcript::new(), None).is_err());
        assert!(DebateSession::new("  ", &participants(&["plato", "heraclitus"]), Transcript::new(), None).is_err());
        assert!(DebateSession::new(
            "Is change real?",
            &participants(&["plato", "heraclitus", "socrates", "aristotle", "diogenes"]),
            Transcript::new(),
            None
        )
        .is_err());
    }

    #[test]
    fn test_round_robin_from_transcript() {
        let mut transcript = Transcript::new();
        let session = DebateSession::new(
            "Is change real?",
            &participants(&["heraclitus", "plato", "aristotle"]),
            transcript.clone(),
            None,
        )
        .unwrap();
        assert_eq!(session.next_speaker(), PersonaId::Heraclitus);

        transcript.push(ConversationTurn::philosopher("heraclitus", "All flows."));
        transcript.push(ConversationTurn::philosopher("plato", "Forms abide."));
        let session = DebateSession::new(
            "Is change real?",
            &participants(&["heraclitus", "plato", "aristotle"]),
            transcript.clone(),
            None,
        )
        .unwrap();
        assert_eq!(session.next_speaker(), PersonaId::Aristotle);

        transcript.push(ConversationTurn::philosopher("aristotle", "In one sense."));
        let session = DebateSession::new(
            "Is change real?",
            &participants(&["heraclitus", "plato", "aristotle"]),
            transcript,
            None,
        )
        .unwrap();
        assert_eq!(session.next_speaker(), PersonaId::Heraclitus);
    }

    #[test]
    fn test_turn_prompt_names_previous_speaker() {
        let registry = PersonaRegistry::builtin();
        let mut transcript = Transcript::new();
        transcript.push(ConversationTurn::philosopher("heraclitus", "No one steps in the same river twice."));
        let session = DebateSession::new("Is change real?", &participants(&["heraclitus", "plato"]), transcript, None).unwrap();

        let prompt = session.turn_prompt(&registry, PersonaId::Plato);
        assert!(prompt.contains("Heraclitus just said: \"No one steps in the same river twice.\""));
        assert!(prompt.contains("Respond to Heraclitus directly."));
    }

    #[tokio::test]
    async fn test_take_turn_until_concluded() {
        let backend = Arc::new(EchoBackend { prompts: Mutex::new(Vec::new()) });
        let dispatcher = Dispatcher::new(
            Arc::new(PersonaRegistry::builtin()),
            None,
            Some(backend.clone() as Arc<dyn ChatBackend>),
            vec![],
            "gpt-test",
        );
        let mut session =
            DebateSession::new("What is the good life?", &participants(&["epicurus", "diogenes"]), Transcript::new(), Some(3))
                .unwrap();

        let first = session.take_turn(&dispatcher, "").await.unwrap();
        assert_eq!(first.philosopher_id, PersonaId::Epicurus);
        assert_eq!(first.next_philosopher_id, Some(PersonaId::Diogenes));
        assert!(!first.concluded);

        let second = session.take_turn(&dispatcher, "").await.unwrap();
        assert_eq!(second.philosopher_id, PersonaId::Diogenes);
        assert!(second.response.contains("Epicurus just said"));

        let third = session.take_turn(&dispatcher, "").await.unwrap();
        assert!(third.concluded);
        assert_eq!(third.next_philosopher_id, None);
        assert!(session.take_turn(&dispatcher, "").await.is_err());

        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(|p| !p.contains("GENERAL GUIDANCE")));
    }
}
