//! The core models for a single request/response conversation with
//! the scheduling agent. History is owned by the caller and passed in
//! on every request.
use serde::{Deserialize, Serialize};

use crate::openai::{Message, Role};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One prior exchange as the client remembers it. Only user and
/// assistant text is kept, tool traffic never leaves the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: &str) -> Self {
        Self {
            role: TurnRole::User,
            text: text.to_string(),
        }
    }

    pub fn assistant(text: &str) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.to_string(),
        }
    }
}

impl From<&ConversationTurn> for Message {
    fn from(turn: &ConversationTurn) -> Self {
        let role = match turn.role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        };
        Message::new(role, &turn.text)
    }
}

/// Messages sent to the LLM for one request: system prompt, prior
/// turns, the new message and any tool traffic from this request.
#[derive(Default)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    pub fn new(system_prompt: &str, history: &[ConversationTurn], message: &str) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::new(Role::System, system_prompt));
        // Blank turns add nothing for the model
        messages.extend(
            history
                .iter()
                .filter(|t| !t.text.trim().is_empty())
                .map(Message::from),
        );
        messages.push(Message::new(Role::User, message));
        Self(messages)
    }

    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    pub fn push(&mut self, msg: Message) {
        self.0.push(msg)
    }
}
