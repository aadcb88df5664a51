use anyhow::anyhow;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

use storyloom_runtime::Principal;

use crate::global_state::GlobalState;
use crate::response::AppError;
use crate::utils::extract_bearer_token;

/// Resolves the bearer token, if any, and stores the outcome as an
/// `Option<Principal>` extension. Never rejects.
pub async fn authenticate(
    State(state): State<GlobalState>,
    mut req: Request,
    next: Next,
) -> Response {
    let principal = match extract_bearer_token(&req) {
        Ok(token) => match state.identity.resolve(&token).await {
            Ok(principal) => principal,
            Err(e) => {
                tracing::warn!("[authenticate] Identity provider failed: {:?}", e);
                None
            }
        },
        Err(_) => None,
    };

    req.extensions_mut().insert(principal);
    next.run(req).await
}

/// Rejects requests without a principal, and exposes it as a plain `Principal`
/// extension to the handler.
pub async fn require_principal(mut req: Request, next: Next) -> Result<Response, AppError> {
    let principal = req
        .extensions()
        .get::<Option<Principal>>()
        .cloned()
        .flatten()
        .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, anyhow!("authentication required")))?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
