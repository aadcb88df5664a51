use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use storyloom_runtime::{PartType, Principal};

use crate::middleware::require_principal;
use crate::response::{AppError, AppSuccess};
use crate::GlobalState;

pub fn session_routes() -> Router<GlobalState> {
    Router::new()
        .route("/sessions/completed", get(list_completed_sessions))
        .route("/session/{id}", get(get_session))

        .route("/sessions",
            post(create_session)
            .get(list_sessions)
            .route_layer(middleware::from_fn(require_principal))
        )
        .route("/session/{id}/parts",
            post(append_story_part)
            .route_layer(middleware::from_fn(require_principal))
        )
        .route("/session/{id}/complete",
            post(complete_session)
            .route_layer(middleware::from_fn(require_principal))
        )
        .route("/session/{id}/image",
            post(generate_image)
            .route_layer(middleware::from_fn(require_principal))
        )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub topic: String,
}
async fn create_session(
    State(state): State<GlobalState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<AppSuccess, AppError> {
    let id = state.runtime.repository()
        .create_session(&principal, &payload.topic)
        .await
        .map_err(AppError::story)?;

    Ok(AppSuccess::new(StatusCode::CREATED, "Session created successfully", json!({ "id": id })))
}

async fn list_sessions(
    State(state): State<GlobalState>,
    Extension(principal): Extension<Principal>,
) -> Result<AppSuccess, AppError> {
    let sessions = state.runtime.repository()
        .list_sessions_for(&principal)
        .await
        .map_err(AppError::story)?;

    Ok(AppSuccess::new(StatusCode::OK, "Sessions fetched successfully", json!(sessions)))
}

async fn list_completed_sessions(
    State(state): State<GlobalState>,
) -> Result<AppSuccess, AppError> {
    let stories = state.runtime.repository()
        .list_completed_sessions()
        .await
        .map_err(AppError::story)?;

    Ok(AppSuccess::new(StatusCode::OK, "Completed stories fetched successfully", json!(stories)))
}

async fn get_session(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
    Extension(principal): Extension<Option<Principal>>,
) -> Result<AppSuccess, AppError> {
    let view = state.runtime.repository()
        .get_session(&id, principal.as_ref())
        .await
        .ok_or_else(AppError::concealed)?;

    Ok(AppSuccess::new(StatusCode::OK, "Session fetched successfully", json!(view)))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendPartRequest {
    pub content: String,
    #[serde(rename = "type", default = "default_part_type")]
    pub part_type: PartType,
    pub image_url: Option<String>,
}
fn default_part_type() -> PartType {
    PartType::Text
}
async fn append_story_part(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<AppendPartRequest>,
) -> Result<AppSuccess, AppError> {
    state.runtime.repository()
        .try_append_story_part(&id, &principal, &payload.content, payload.part_type, payload.image_url.as_deref())
        .await
        .map_err(AppError::story)?;

    Ok(AppSuccess::new(StatusCode::CREATED, "Story part added successfully", json!({})))
}

async fn complete_session(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
    Extension(principal): Extension<Principal>,
) -> Result<AppSuccess, AppError> {
    state.runtime.repository()
        .try_complete_session(&id, &principal)
        .await
        .map_err(AppError::story)?;

    Ok(AppSuccess::new(StatusCode::OK, "Session completed successfully", json!({})))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
}
async fn generate_image(
    State(state): State<GlobalState>,
    Path(id): Path<String>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<GenerateImageRequest>,
) -> Result<AppSuccess, AppError> {
    let image_url = state.runtime
        .generate_image_for_story(&id, &principal, &payload.prompt)
        .await
        .map_err(AppError::story)?
        .ok_or_else(|| AppError::new(StatusCode::BAD_GATEWAY, anyhow!("image generation failed for session {}", id)))?;

    Ok(AppSuccess::new(StatusCode::OK, "Image generated successfully", json!({ "imageUrl": image_url })))
}
