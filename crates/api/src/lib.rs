mod env;
mod global_state;
mod middleware;
mod response;
mod routes;
mod utils;

use axum::Router;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

pub use routes::{generate_routes, misc_routes, session_routes};

pub use env::ApiServerEnv;
pub use global_state::GlobalState;
pub use utils::{extract_bearer_token, setup_tracing};
pub use middleware::{authenticate, require_principal};
pub use response::{AppError, AppSuccess, GenericResponse};

/// The full router with authentication, CORS, tracing and a request timeout applied.
pub fn app(state: GlobalState, request_timeout: std::time::Duration) -> Router {
    Router::new()
        .merge(misc_routes())
        .merge(session_routes())
        .merge(generate_routes())
        .layer(axum::middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
