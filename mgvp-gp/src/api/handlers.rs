//! HTTP request handlers

use crate::api::server::AppContext;
use crate::error::{Error, Result};
use crate::gesture::{PermissionDecision, PermissionRequest, RawSensorEvent};
use crate::playback::{BroadcastPlayer, ControlAction, PlayerEvent, SessionOutcome};
use crate::session::{self, SessionCommand, SessionContext, SessionHandle, SessionSnapshot};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Scanned tag token identifying the sequence
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    status: String,
    outcome: SessionOutcome,
}

#[derive(Debug, Serialize)]
pub struct InputResponse {
    /// False when the session input queue was full and the event was dropped
    accepted: bool,
}

#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    pub action: ControlAction,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

fn active(slot: &Option<SessionHandle>) -> Result<&SessionHandle> {
    slot.as_ref()
        .ok_or_else(|| Error::NotFound("no active session".to_string()))
}

fn accepted() -> (StatusCode, Json<StatusResponse>) {
    (
        StatusCode::ACCEPTED,
        Json(StatusResponse {
            status: "accepted".to_string(),
        }),
    )
}

// ============================================================================
// Health
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "mgvp-gp".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Session lifecycle
// ============================================================================

/// POST /session - fetch the scanned sequence and start playing it
pub async fn start_session(
    State(ctx): State<AppContext>,
    Json(request): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>)> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(Error::BadRequest("token must not be empty".to_string()));
    }

    let state = &ctx.state;
    let _starting = state
        .starting
        .try_lock()
        .map_err(|_| Error::InvalidState("a session is already starting".to_string()))?;
    if state
        .session
        .lock()
        .await
        .as_ref()
        .is_some_and(|handle| !handle.is_finished())
    {
        return Err(Error::InvalidState("a session is already running".to_string()));
    }

    // Network calls run without holding the session slot
    info!("Starting session for token {}", token);
    let items = state.sequences.fetch(token).await?;

    let session_ctx = SessionContext {
        clock: state.clock.clone(),
        bus: state.bus.clone(),
        authority: state.authority.clone(),
        player: Box::new(BroadcastPlayer::new(state.bus.clone())),
        permission: state.permission_gate().await,
        settings: state.config.session_settings(),
    };
    let handle = session::start_session(items, session_ctx).await?;
    let snapshot = handle.snapshot();
    *state.session.lock().await = Some(handle);

    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// POST /session/stop
pub async fn stop_session(State(ctx): State<AppContext>) -> Result<Json<StopResponse>> {
    let handle = ctx
        .state
        .session
        .lock()
        .await
        .take()
        .ok_or_else(|| Error::NotFound("no active session".to_string()))?;

    let outcome = handle.stop().await?;
    info!("Session stopped: {:?}", outcome);

    Ok(Json(StopResponse {
        status: "stopped".to_string(),
        outcome,
    }))
}

/// GET /session - current snapshot (kept after the session finishes until replaced)
pub async fn get_session(State(ctx): State<AppContext>) -> Result<Json<SessionSnapshot>> {
    let slot = ctx.state.session.lock().await;
    Ok(Json(active(&slot)?.snapshot()))
}

// ============================================================================
// Input
// ============================================================================

/// POST /permission - consent answer from the front end
pub async fn request_permission(
    State(ctx): State<AppContext>,
    Json(request): Json<PermissionRequest>,
) -> Json<PermissionDecision> {
    let (decision, gate) = ctx.state.request_permission(&request).await;

    let slot = ctx.state.session.lock().await;
    if let Some(handle) = slot.as_ref() {
        if let Err(e) = handle.send(SessionCommand::Permission(gate)).await {
            debug!("Permission not forwarded: {}", e);
        }
    }

    Json(decision)
}

/// POST /input - one raw sensor or touch event
pub async fn submit_input(
    State(ctx): State<AppContext>,
    Json(event): Json<RawSensorEvent>,
) -> Result<(StatusCode, Json<InputResponse>)> {
    let slot = ctx.state.session.lock().await;
    let accepted = active(&slot)?.send_sensor(event)?;
    Ok((StatusCode::ACCEPTED, Json(InputResponse { accepted })))
}

/// POST /controls - button fallback
pub async fn submit_control(
    State(ctx): State<AppContext>,
    Json(request): Json<ControlRequest>,
) -> Result<(StatusCode, Json<StatusResponse>)> {
    let slot = ctx.state.session.lock().await;
    active(&slot)?
        .send(SessionCommand::Control(request.action))
        .await?;
    Ok(accepted())
}

/// POST /player/events - report from the front-end media player
pub async fn submit_player_event(
    State(ctx): State<AppContext>,
    Json(event): Json<PlayerEvent>,
) -> Result<(StatusCode, Json<StatusResponse>)> {
    let slot = ctx.state.session.lock().await;
    active(&slot)?.send(SessionCommand::Player(event)).await?;
    Ok(accepted())
}
