//! API routes module

pub mod calendar;
pub mod chat;
pub mod health;

use std::sync::Arc;

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<AppState>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Chat routes
        .nest("/chat", chat::router())
        // Calendar routes
        .nest("/calendar", calendar::router())
        // Liveness
        .nest("/health", health::router())
}
