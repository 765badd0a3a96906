pub mod auth;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::error::ApiError;
use state::AppState;

// Re-export the handlers the binary wires into the router.
pub use auth::{login_handler, logout_handler};
pub use middleware::require_login;
pub use rest::{action_handler, get_state_handler};
pub use ws_handler::ws_handler;

/// Builds the API router: public state/auth/ws routes plus the login-gated actions.
pub fn router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid ALLOWED_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let public_routes = Router::new()
        .route("/state", get(get_state_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/ws", get(ws_handler));

    let protected_routes = Router::new()
        .route("/actions", post(action_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_login,
        ));

    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state))
}
