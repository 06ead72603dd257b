//! HTTP request handlers

use super::types::{
    ChatRequest, CreateSessionRequest, ErrorResponse, ResetRequest, RolesResponse,
    RosterResponse, SessionView, TurnResponse,
};
use super::AppState;
use crate::prompt::ROLE_PRESETS;
use crate::session::SessionError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Cast and suggested identities
        .route("/api/roster", get(get_roster))
        .route("/api/roles", get(get_roles))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:key", get(get_session).delete(close_session))
        .route("/api/sessions/:key/reset", post(reset_session))
        // Turns
        .route("/api/sessions/:key/arrival", post(ensure_arrival))
        .route("/api/sessions/:key/chat", post(send_chat))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Roster
// ============================================================

async fn get_roster(State(state): State<AppState>) -> Json<RosterResponse> {
    Json(RosterResponse {
        personas: state.roster().personas().to_vec(),
    })
}

async fn get_roles() -> Json<RolesResponse> {
    Json(RolesResponse {
        presets: ROLE_PRESETS.to_vec(),
    })
}

// ============================================================
// Session lifecycle
// ============================================================

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let requested_key = req.key.filter(|k| !k.trim().is_empty());
    let resuming = requested_key.is_some();
    let key = requested_key.unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut session = state.new_session(key);
    if resuming {
        session.resume(&req.user_label).await?;
    } else {
        session.start(&req.user_label).await?;
    }

    tracing::info!(session_key = %session.key(), resuming, "Session created");
    let view = SessionView::of(&session);
    state.insert(session).await;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.get(&key).await.ok_or(AppError::UnknownSession(key))?;
    let session = session.lock().await;
    Ok(Json(SessionView::of(&session)))
}

async fn close_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .remove(&key)
        .await
        .ok_or(AppError::UnknownSession(key.clone()))?;
    tracing::info!(session_key = %key, "Session closed");
    Ok(StatusCode::NO_CONTENT)
}

async fn reset_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Option<Json<ResetRequest>>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.get(&key).await.ok_or(AppError::UnknownSession(key))?;
    let mut session = session.lock().await;

    let req = body.map(|Json(req)| req).unwrap_or_default();
    match req.user_label {
        Some(label) => session.reset_as(&label).await?,
        None => session.reset().await?,
    }
    Ok(Json(SessionView::of(&session)))
}

// ============================================================
// Turns
// ============================================================

async fn ensure_arrival(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<TurnResponse>, AppError> {
    let session = state.get(&key).await.ok_or(AppError::UnknownSession(key))?;
    let mut session = session.lock().await;

    let appended = session.ensure_arrival().await?;
    Ok(Json(TurnResponse {
        appended,
        session: SessionView::of(&session),
    }))
}

async fn send_chat(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    let session = state.get(&key).await.ok_or(AppError::UnknownSession(key))?;
    let mut session = session.lock().await;

    let appended = session.send(&req.text).await?;
    Ok(Json(TurnResponse {
        appended,
        session: SessionView::of(&session),
    }))
}

async fn get_version() -> &'static str {
    concat!("persona-room ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    Session(SessionError),
    UnknownSession(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Session(e) => {
                let status = match &e {
                    SessionError::Validation(_) => StatusCode::BAD_REQUEST,
                    SessionError::NotReady(_) => StatusCode::CONFLICT,
                    SessionError::Completion(_) => StatusCode::BAD_GATEWAY,
                };
                (status, ErrorResponse::from(&e))
            }
            AppError::UnknownSession(key) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new(format!("Session not found: {key}")),
            ),
        };

        (status, Json(body)).into_response()
    }
}
