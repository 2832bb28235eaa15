//! The question/answer exchange with the chat model.

use crate::chat::history::{Answer, Question, Session, Turn};
use crate::chat::model::ChatModel;
use crate::chat::prompt::answer_prompt;
use crate::error::{PolyvoxError, Result};
use crate::lang::LanguageIdentifier;
use std::sync::Arc;
use std::time::Duration;

/// Exchanges questions for answers, carrying the session's prior turns as
/// context so follow-ups resolve pronouns.
///
/// Transport, auth and quota failures from the model are surfaced verbatim,
/// with no retry: the service is stateful and calls are billed, so the
/// caller decides whether to try again.
pub struct ConversationDispatcher {
    model: Arc<dyn ChatModel>,
    identifier: LanguageIdentifier,
    timeout: Duration,
}

impl ConversationDispatcher {
    pub fn new(model: Arc<dyn ChatModel>, timeout: Duration) -> Self {
        Self {
            model,
            identifier: LanguageIdentifier::new(),
            timeout,
        }
    }

    /// Ask one question. On success the completed (question, answer) pair is
    /// appended to the session history; on failure the history is unchanged.
    pub async fn ask(&self, session: &mut Session, question: Question) -> Result<Answer> {
        let prompt = answer_prompt(&question);

        tracing::info!(
            session = %session.id,
            question_language = %question.language,
            source = ?question.source,
            "dispatching question"
        );

        let reply = tokio::time::timeout(
            self.timeout,
            self.model.send(session.history.turns(), &prompt),
        )
        .await
        .map_err(|_| PolyvoxError::timeout("model", self.timeout))??;

        let text = reply.trim().to_string();
        let language = self.identifier.identify(&text);
        let answer = Answer {
            text,
            language,
            question_id: question.id,
        };

        tracing::info!(
            session = %session.id,
            answer_language = %answer.language,
            chars = answer.text.len(),
            "answer received"
        );

        session.history.push(Turn {
            question,
            answer: answer.clone(),
        });
        Ok(answer)
    }
}
