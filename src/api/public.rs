//! Public API types

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::core::SchedulingError;

// Errors

/// Body of every non-2xx response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

pub struct ApiError(anyhow::Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<SchedulingError>() {
            Some(SchedulingError::InvalidInput(_)) | Some(SchedulingError::InvalidRange { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Some(SchedulingError::ServiceUnavailable(_))
            | Some(SchedulingError::CalendarUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert `ApiError` into an Axum compatible response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Always log the error
        tracing::error!("{}", self.0);

        let status = self.status();
        let body = match self.0.downcast_ref::<SchedulingError>() {
            Some(err) if status != StatusCode::INTERNAL_SERVER_ERROR => ErrorResponse {
                error: err.kind().to_string(),
                message: err.to_string(),
            },
            _ => ErrorResponse {
                error: String::from("internal"),
                message: format!("Something went wrong: {}", self.0),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Enables using `?` on functions that return `Result<_,
/// anyhow::Error>` to turn them into `Result<_, ApiError>`
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// Re-export public types from each route

pub mod calendar {
    pub use crate::api::routes::calendar::public::*;
}

pub mod chat {
    pub use crate::api::routes::chat::public::*;
}

pub mod health {
    pub use crate::api::routes::health::public::*;
}
