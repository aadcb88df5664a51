use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use storyloom_runtime::{Principal, StoryError, StoryPath};

use crate::response::CONCEALED_SESSION_MESSAGE;
use crate::GlobalState;

pub fn generate_routes() -> Router<GlobalState> {
    Router::new()
        .route("/generate-paths", post(generate_paths))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePathsRequest {
    pub session_id: String,
    pub context: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratePathsResponse {
    pub paths: Vec<StoryPath>,
}

/// Failure envelope of `/generate-paths`: `{ error, details? }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratePathsError {
    #[serde(skip)]
    status: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl GeneratePathsError {
    fn new(status: StatusCode, error: &str, details: Option<String>) -> Self {
        Self { status: status.as_u16(), error: error.to_string(), details }
    }

    fn from_story(err: StoryError) -> Self {
        match err {
            e if e.is_concealed() => {
                tracing::warn!("[/generate-paths] {}", e);
                Self::new(StatusCode::NOT_FOUND, CONCEALED_SESSION_MESSAGE, None)
            }
            StoryError::InvalidInput(details) => {
                Self::new(StatusCode::BAD_REQUEST, "Invalid request", Some(details))
            }
            StoryError::GenerationUnavailable(details) => {
                tracing::error!("[/generate-paths] Backend failure: {}", details);
                Self::new(StatusCode::BAD_GATEWAY, "Failed to generate paths", Some("The story generator is unavailable".into()))
            }
            e => {
                tracing::error!("[/generate-paths] {:?}", e);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate paths", None)
            }
        }
    }
}

impl IntoResponse for GeneratePathsError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

async fn generate_paths(
    State(state): State<GlobalState>,
    Extension(principal): Extension<Option<Principal>>,
    payload: Result<Json<GeneratePathsRequest>, JsonRejection>,
) -> Result<Json<GeneratePathsResponse>, GeneratePathsError> {
    let principal = principal.ok_or_else(|| {
        GeneratePathsError::new(StatusCode::UNAUTHORIZED, "Authentication required", None)
    })?;

    let Json(payload) = payload.map_err(|rejection| {
        tracing::warn!("[/generate-paths] Rejected body: {}", rejection.body_text());
        GeneratePathsError::new(StatusCode::BAD_REQUEST, "Invalid request", Some(rejection.body_text()))
    })?;

    if payload.session_id.trim().is_empty() {
        return Err(GeneratePathsError::new(
            StatusCode::BAD_REQUEST, "Invalid request", Some("sessionId is required".into())
        ));
    }

    let paths = state.runtime
        .generate_paths(&payload.session_id, &principal, payload.context.as_deref())
        .await
        .map_err(GeneratePathsError::from_story)?;

    tracing::info!("[/generate-paths] {} paths for session {}", paths.len(), payload.session_id);
    Ok(Json(GeneratePathsResponse { paths }))
}
