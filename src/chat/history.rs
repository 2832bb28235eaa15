//! Conversation records: questions, answers, and per-session history.

use crate::lang::LanguageCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a question reached the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    Typed,
    Microphone,
    Uploaded,
}

/// A normalized user question. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub raw_text: String,
    pub source: InputSource,
    pub language: LanguageCode,
    pub received_at: DateTime<Utc>,
}

impl Question {
    pub fn new(raw_text: String, source: InputSource, language: LanguageCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            raw_text,
            source,
            language,
            received_at: Utc::now(),
        }
    }
}

/// The model's reply to one question. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub language: LanguageCode,
    /// The question this answers.
    pub question_id: Uuid,
}

/// One completed exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub question: Question,
    pub answer: Answer,
}

/// Ordered, append-only record of a session's completed exchanges.
///
/// Never pruned within a session; unbounded growth over a session's lifetime
/// is accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed exchange. Failed exchanges are not recorded: the
    /// model never produced a reply for them, and replaying an unanswered
    /// question would desync the user/model role alternation on the wire.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// A conversation session, owned by the caller and passed into each pipeline
/// call. Two sessions never share history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub history: ConversationHistory,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            history: ConversationHistory::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
