//! Chat model abstraction.

use crate::chat::history::Turn;
use crate::error::{PolyvoxError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A conversational language-model service.
///
/// `history` is the ordered list of prior completed exchanges; the
/// implementation must preserve turn order on the wire so follow-up
/// questions resolve pronouns against earlier answers.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send a prompt with prior history as context; returns the raw reply
    /// text.
    async fn send(&self, history: &[Turn], prompt: &str) -> Result<String>;

    /// Service identifier, for logging and error messages.
    fn id(&self) -> &str;
}

/// What the mock saw on each call, for asserting context propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub history_turns: usize,
    pub prompt: String,
}

/// Mock chat model for testing.
#[derive(Debug, Default)]
pub struct MockChatModel {
    responses: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<RecordedCall>>,
    should_fail: bool,
}

impl MockChatModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply; successive calls pop in order. With the queue empty a
    /// default reply is returned.
    pub fn with_response(self, response: &str) -> Self {
        self.responses
            .lock()
            .expect("mock lock")
            .push_back(response.to_string());
        self
    }

    /// Configure the mock to fail with a remote-service error.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn send(&self, history: &[Turn], prompt: &str) -> Result<String> {
        self.calls.lock().expect("mock lock").push(RecordedCall {
            history_turns: history.len(),
            prompt: prompt.to_string(),
        });
        if self.should_fail {
            return Err(PolyvoxError::RemoteService {
                service: self.id().to_string(),
                message: "mock transport failure".to_string(),
            });
        }
        Ok(self
            .responses
            .lock()
            .expect("mock lock")
            .pop_front()
            .unwrap_or_else(|| "mock reply".to_string()))
    }

    fn id(&self) -> &str {
        "mock"
    }
}
