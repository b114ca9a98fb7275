//! Daily philosophical challenge, stable for a given date.

use crate::personas::PersonaId;
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

const CHALLENGES: &[(&str, PersonaId)] = &[
    (
        "Question one belief you hold with certainty. Ask yourself how you came to know it, and whether you could defend it to a stranger.",
        PersonaId::Socrates,
    ),
    (
        "Define a word you use every day, such as 'friend' or 'fair'. Then find one case your definition fails to cover.",
        PersonaId::Socrates,
    ),
    (
        "Notice something beautiful today. Ask what it shares with every other beautiful thing you have seen.",
        PersonaId::Plato,
    ),
    (
        "Describe the ideal version of your working day. Which parts of it are shadows on the cave wall?",
        PersonaId::Plato,
    ),
    (
        "Pick one habit and name the virtue it builds or erodes. Act once today toward the mean between two extremes.",
        PersonaId::Aristotle,
    ),
    (
        "Ask of one thing you do today: what is it for? Follow the chain of purposes until you reach an end you want for its own sake.",
        PersonaId::Aristotle,
    ),
    (
        "Find something in your life you are trying to keep fixed. Let it change today and observe what remains.",
        PersonaId::Heraclitus,
    ),
    (
        "Look for a tension between two opposites in your day, such as rest and effort. Consider how each needs the other.",
        PersonaId::Heraclitus,
    ),
    (
        "Go one day without one thing you think you need. At night, note whether you missed it.",
        PersonaId::Diogenes,
    ),
    (
        "Spot one custom you follow only because others do. Ask whether it serves you or just the crowd.",
        PersonaId::Diogenes,
    ),
    (
        "Share a simple meal with a friend and talk slowly. Notice which pleasures leave no regret behind.",
        PersonaId::Epicurus,
    ),
    (
        "Write down one fear about the future. Ask whether it concerns something that can actually harm you.",
        PersonaId::Epicurus,
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyChallenge {
    pub date: String,
    pub challenge: String,
    pub philosopher_id: PersonaId,
}

/// The challenge for `date`. Same date, same challenge.
pub fn challenge_for(date: NaiveDate) -> DailyChallenge {
    let seed = date.num_days_from_ce() as u64;
    let mut rng = StdRng::seed_from_u64(seed);
    let (challenge, philosopher_id) = CHALLENGES[rng.random_range(0..CHALLENGES.len())];

    DailyChallenge {
        date: date.format("%Y-%m-%d").to_string(),
        challenge: challenge.to_string(),
        philosopher_id,
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
