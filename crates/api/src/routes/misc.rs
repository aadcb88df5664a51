use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde_json::json;

use crate::response::AppSuccess;
use crate::GlobalState;

pub fn misc_routes() -> Router<GlobalState> {
    Router::new()
        .route("/health",
            get(|| async { "OK" })
        )
        .route("/topics",
            get(list_topics)
        )
}

async fn list_topics(State(state): State<GlobalState>) -> AppSuccess {
    let topics = state.runtime.generate_topics().await;
    AppSuccess::new(StatusCode::OK, "Topics generated successfully", json!({ "topics": topics }))
}
