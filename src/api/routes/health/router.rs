use std::sync::Arc;

use axum::{Json, Router, routing::get};
use chrono::Utc;

use crate::api::state::AppState;
use super::public;

type SharedState = Arc<AppState>;

async fn health_handler() -> Json<public::HealthResponse> {
    Json(public::HealthResponse {
        status: String::from("ok"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(health_handler))
}
