pub mod chat;
pub use chat::{AgentBuilder, ConversationTurn, SchedulingAgent, TurnRole};

pub mod prompt;

pub mod tools;
