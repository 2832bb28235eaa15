//! Prompt construction for the chat model.

use crate::chat::history::Question;
use crate::lang::LanguageCode;

/// Build the instruction wrapping a user question.
///
/// The model must reply in the language the question was asked in, never
/// translate, and must not name or explain that language in the reply.
pub fn answer_prompt(question: &Question) -> String {
    let supported = LanguageCode::ALL
        .iter()
        .map(|code| code.english_name())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a multilingual assistant.\n\
         \n\
         Respond to the user's question in the same language it is asked in. \
         Supported languages include: {supported}. Never translate the question \
         or the answer into another language.\n\
         \n\
         Do not mention or explain the detected language. Just return the \
         answer to the question.\n\
         \n\
         Question:\n\
         {question}",
        supported = supported,
        question = question.raw_text,
    )
}
