mod core;
pub use self::core::{AgentBuilder, SchedulingAgent};

mod models;
pub use models::{ConversationTurn, Transcript, TurnRole};
