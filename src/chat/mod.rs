//! Conversation state and the exchange with the chat model.

pub mod dispatcher;
pub mod gemini;
pub mod history;
pub mod model;
pub mod prompt;

pub use dispatcher::ConversationDispatcher;
pub use gemini::GeminiChat;
pub use history::{Answer, ConversationHistory, InputSource, Question, Session, Turn};
pub use model::{ChatModel, MockChatModel};
