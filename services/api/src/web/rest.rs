//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    auth::{LoginRequest, LogoutRequest},
    protocol::{ClientMessage, DraftView, Snapshot, StoryCard},
    state::AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use stichelbuch_core::Rejection;
use tracing::{error, warn};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_state_handler,
        action_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
    ),
    components(
        schemas(Snapshot, StoryCard, DraftView, ClientMessage, LoginRequest, LogoutRequest)
    ),
    tags(
        (name = "Stichelbuch API", description = "State and actions of the password-gated story book.")
    )
)]
pub struct ApiDoc;

/// Maps a refused action to the status code the client sees next to the snapshot.
pub(crate) fn status_for(rejected: Option<&Rejection>) -> StatusCode {
    match rejected {
        None => StatusCode::OK,
        Some(Rejection::InvalidPassword) | Some(Rejection::NotLoggedIn) => StatusCode::UNAUTHORIZED,
        Some(Rejection::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Returns everything the front-end needs to render the current screen.
#[utoipa::path(
    get,
    path = "/state",
    responses(
        (status = 200, description = "Current snapshot", body = Snapshot)
    )
)]
pub async fn get_state_handler(State(app_state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(app_state.snapshot().await)
}

/// Applies one user action and returns the resulting snapshot.
#[utoipa::path(
    post,
    path = "/actions",
    request_body = ClientMessage,
    responses(
        (status = 200, description = "Action applied", body = Snapshot),
        (status = 400, description = "Unknown person in the request"),
        (status = 401, description = "Not logged in"),
        (status = 422, description = "Draft is missing required fields", body = Snapshot),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn action_handler(
    State(app_state): State<Arc<AppState>>,
    Json(message): Json<ClientMessage>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let action = message.into_action().map_err(|e| {
        warn!("Rejected action: {}", e);
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    let dispatched = app_state.dispatch(action).await.map_err(|e| {
        error!("Failed to apply action: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to apply action".to_string(),
        )
    })?;

    Ok((
        status_for(dispatched.rejected.as_ref()),
        Json(dispatched.snapshot),
    ))
}
