//! Public types for the chat API
use serde::{Deserialize, Serialize};

use crate::ai::ConversationTurn;

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    // Prior turns as the client remembers them, oldest first
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}
