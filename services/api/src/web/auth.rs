//! services/api/src/web/auth.rs
//!
//! Login and logout endpoints for the shared-password gate.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use std::sync::Arc;
use stichelbuch_core::Action;
use tracing::error;
use utoipa::ToSchema;

use crate::web::{protocol::Snapshot, rest::status_for, state::AppState};

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub password: String,
}

/// Logging out is destructive for the navigation state, so the client confirms it.
#[derive(Deserialize, ToSchema)]
pub struct LogoutRequest {
    pub confirmed: bool,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/login - Unlock the book with the shared password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = Snapshot),
        (status = 401, description = "Wrong password; the snapshot carries the error flag", body = Snapshot),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let dispatched = state
        .dispatch(Action::Login {
            password: req.password,
        })
        .await
        .map_err(|e| {
            error!("Failed to process login: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
        })?;

    Ok((
        status_for(dispatched.rejected.as_ref()),
        Json(dispatched.snapshot),
    ))
}

/// POST /auth/logout - Lock the book again
#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Logged out, or left unchanged when not confirmed", body = Snapshot),
        (status = 401, description = "Not logged in", body = Snapshot)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogoutRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let dispatched = state
        .dispatch(Action::Logout {
            confirmed: req.confirmed,
        })
        .await
        .map_err(|e| {
            error!("Failed to logout: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
        })?;

    Ok((
        status_for(dispatched.rejected.as_ref()),
        Json(dispatched.snapshot),
    ))
}
