//! services/api/src/web/middleware.rs
//!
//! Login gate for the action routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::web::state::AppState;

/// Rejects requests with 401 Unauthorized while the book is logged out.
/// The login screen itself is served by `/state` and `/auth/login`, which stay public.
pub async fn require_login(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !state.is_logged_in().await {
        debug!(path = %req.uri().path(), "Rejected request while logged out");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}
