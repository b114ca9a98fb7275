//! Conversation turns and append-only transcripts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ConversationTurn {
    /// UI notices ("Plato has joined"); never forwarded upstream.
    System {
        #[serde(alias = "text")]
        content: String,
    },
    User {
        #[serde(alias = "text")]
        content: String,
    },
    Philosopher {
        #[serde(rename = "philosopherId")]
        philosopher_id: String,
        #[serde(alias = "text")]
        content: String,
    },
    Assistant {
        #[serde(alias = "text")]
        content: String,
    },
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        ConversationTurn::User { content: content.into() }
    }

    pub fn philosopher(philosopher_id: impl Into<String>, content: impl Into<String>) -> Self {
        ConversationTurn::Philosopher {
            philosopher_id: philosopher_id.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        ConversationTurn::System { content: content.into() }
    }

    pub fn content(&self) -> &str {
        match self {
            ConversationTurn::System { content }
            | ConversationTurn::User { content }
            | ConversationTurn::Philosopher { content, .. }
            | ConversationTurn::Assistant { content } => content,
        }
    }

    pub fn philosopher_id(&self) -> Option<&str> {
        match self {
            ConversationTurn::Philosopher { philosopher_id, .. } => Some(philosopher_id),
            _ => None,
        }
    }
}

/// Insertion-ordered, append-only list of turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<ConversationTurn>) -> Self {
        Self { turns }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent philosopher turn, if any.
    pub fn last_philosopher_turn(&self) -> Option<&ConversationTurn> {
        self.turns.iter().rev().find(|t| t.philosopher_id().is_some())
    }

    pub fn philosopher_turn_count(&self) -> usize {
        self.turns.iter().filter(|t| t.philosopher_id().is_some()).count()
    }

    /// Distinct philosopher ids in order of first appearance.
    pub fn philosophers_present(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for id in self.turns.iter().filter_map(|t| t.philosopher_id()) {
            if !seen.iter().any(|s| s == id) {
                seen.push(id.to_string());
            }
        }
        seen
    }
}
