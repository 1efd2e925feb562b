use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::report::spawn_reporter;
use crate::route::{Route, RouteOption};
use crate::session::{LocationEvent, NavigationSession, SessionUpdate};
use crate::tracker::{DisplayState, LocationSample, ProgressSnapshot, StartMode, TrackerMode};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub route: RouteOption,
    /// Start in preview; tracking begins with `/start`.
    #[serde(default)]
    pub preview: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub mode: TrackerMode,
    pub total_km: f64,
    pub base_duration_min: Option<u32>,
    pub base_avg_speed_kmh: f64,
    pub distance: String,
    pub duration: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionStatusResponse {
    pub id: Uuid,
    pub mode: TrackerMode,
    pub display: Option<DisplayState>,
    pub last_snapshot: Option<ProgressSnapshot>,
}

#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionResponse),
        (status = 400, description = "Invalid route", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let options = state.config.session_options()?;
    let route = Route::from(request.route);
    let mut session = NavigationSession::open(
        route.clone(),
        StartMode::from_preview(request.preview),
        &options,
    )?;

    let response = session_response(&session)?;
    let mut sessions = state.sessions.lock().await;

    if let (Some(reporter), Some(reporter_options)) =
        (&state.reporter, state.config.reporter_options()?)
    {
        // The backend tracks a single route, so only the newest session reports.
        for (id, other) in sessions.iter_mut() {
            if other.detach_reporter() {
                log::info!("session {} no longer reports remotely", id);
            }
        }
        session = session.with_reporter(spawn_reporter(reporter.clone(), route, reporter_options));
    }
    sessions.insert(session.id(), session);

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session status", body = SessionStatusResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionStatusResponse>> {
    let sessions = state.sessions.lock().await;
    let session = sessions.get(&id).ok_or(ApiError::NotFound)?;
    let status = session.status();

    Ok(Json(SessionStatusResponse {
        id,
        mode: status.mode,
        display: status.display,
        last_snapshot: status.last_snapshot,
    }))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/start",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Tracking started", body = TrackerMode),
        (status = 404, description = "Unknown session", body = ErrorResponse),
        (status = 409, description = "Session already ended", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn start(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TrackerMode>> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or(ApiError::NotFound)?;
    Ok(Json(session.start()?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/stop",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Tracking stopped", body = TrackerMode),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn stop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TrackerMode>> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or(ApiError::NotFound)?;
    Ok(Json(session.stop()))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/location",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = LocationSample,
    responses(
        (status = 200, description = "Progress update", body = SessionUpdate),
        (status = 400, description = "Malformed sample", body = ErrorResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse),
        (status = 409, description = "Location permission denied", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(sample): Json<LocationSample>,
) -> ApiResult<Json<SessionUpdate>> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or(ApiError::NotFound)?;
    Ok(Json(session.handle(LocationEvent::Fix(sample))?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/permission-denied",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session stopped", body = TrackerMode),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn permission_denied(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TrackerMode>> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or(ApiError::NotFound)?;
    // Always an error by construction; the session is now terminal.
    let _ = session.handle(LocationEvent::PermissionDenied);
    Ok(Json(session.mode()))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 204, description = "Session ended"),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let mut session = state
        .sessions
        .lock()
        .await
        .remove(&id)
        .ok_or(ApiError::NotFound)?;
    session.stop();
    log::info!("session {} ended", id);
    Ok(StatusCode::NO_CONTENT)
}

fn session_response(session: &NavigationSession) -> ApiResult<SessionResponse> {
    let model = session
        .model()
        .ok_or_else(|| ApiError::Internal("session has no route model".into()))?;
    Ok(SessionResponse {
        id: session.id(),
        mode: session.mode(),
        total_km: model.total_route_km(),
        base_duration_min: model.baseline_minutes(),
        base_avg_speed_kmh: model.baseline_average_speed_kmh(),
        distance: model.route().distance_label.clone(),
        duration: model.route().duration_label.clone(),
    })
}
