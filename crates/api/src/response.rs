use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use storyloom_runtime::StoryError;

pub type AppSuccess = GenericResponse;

pub const CONCEALED_SESSION_MESSAGE: &str = "Session not found or unavailable";
const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericResponse {
    pub status: u16,
    pub message: String,
    pub data: serde_json::Value,
}

impl GenericResponse {
    pub fn new(status: StatusCode, message: &str, data: serde_json::Value) -> Self {
        Self {
            status: status.as_u16(),
            message: message.to_string(),
            data,
        }
    }
}

impl IntoResponse for GenericResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

// Make our own error that wraps `anyhow::Error`.
#[derive(Debug)]
pub struct AppError(pub StatusCode, pub anyhow::Error);
impl AppError {
    pub fn new(status: StatusCode, err: anyhow::Error) -> Self {
        Self(status, err)
    }

    /// Maps the domain taxonomy onto HTTP. Missing and forbidden sessions are
    /// indistinguishable from the outside.
    pub fn story(err: StoryError) -> Self {
        let status = match &err {
            e if e.is_concealed() => StatusCode::NOT_FOUND,
            StoryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            StoryError::GenerationUnavailable(_) => StatusCode::BAD_GATEWAY,
            StoryError::Access(_) | StoryError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self(status, err.into())
    }

    pub fn concealed() -> Self {
        Self(StatusCode::NOT_FOUND, anyhow::anyhow!(CONCEALED_SESSION_MESSAGE))
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.0.is_server_error() {
            tracing::error!("CODE: {}, MESSAGE: {:?}", self.0.as_u16(), self.1);
            INTERNAL_ERROR_MESSAGE.to_string()
        } else if self.0 == StatusCode::NOT_FOUND {
            tracing::warn!("CODE: {}, MESSAGE: {}", self.0.as_u16(), self.1);
            CONCEALED_SESSION_MESSAGE.to_string()
        } else {
            tracing::warn!("CODE: {}, MESSAGE: {}", self.0.as_u16(), self.1);
            self.1.to_string()
        };
        GenericResponse::new(self.0, &message, json!({})).into_response()
    }
}

// This enables using `?` on functions that return `Result<_, anyhow::Error>` to turn them into
// `Result<_, AppError>`. That way you don't need to do that manually.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(StatusCode::BAD_REQUEST, err.into())
    }
}

#[cfg(test)]
mod tests {
    use storyloom_runtime::AccessError;

    use super::*;

    #[test]
    fn story_errors_map_to_statuses() {
        let denied = StoryError::Access(AccessError::Denied { session_id: "s".into(), principal: "p".into() });
        assert_eq!(AppError::story(denied).0, StatusCode::NOT_FOUND);
        assert_eq!(AppError::story(AccessError::NotFound("s".into()).into()).0, StatusCode::NOT_FOUND);
        assert_eq!(AppError::story(AccessError::AuthenticationRequired.into()).0, StatusCode::NOT_FOUND);
        assert_eq!(AppError::story(StoryError::InvalidInput("x".into())).0, StatusCode::BAD_REQUEST);
        assert_eq!(AppError::story(StoryError::GenerationUnavailable("x".into())).0, StatusCode::BAD_GATEWAY);
        assert_eq!(
            AppError::story(StoryError::persistence(anyhow::anyhow!("db down"))).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn server_errors_hide_details() {
        let response = AppError::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("password=hunter2")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
