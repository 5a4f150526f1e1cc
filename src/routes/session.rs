use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{
    dto::session::{CreateSessionRequest, JoinAck, JoinRequest, SessionCreated, SessionSummary},
    error::{AppError, ServiceError},
    services::session_service,
    state::SharedState,
};

/// Routes handling session bootstrap, membership, and export.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/session", post(create_session))
        .route("/session/{sid}", get(get_session))
        .route("/session/{sid}/join", post(join_session))
        .route("/session/{sid}/submissions.csv", get(download_submissions))
}

/// Open a fresh session under a caller-chosen 4-digit id.
#[utoipa::path(
    post,
    path = "/session",
    tag = "session",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionCreated),
        (status = 400, description = "Malformed session id"),
        (status = 409, description = "Session id already in use")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionCreated>), AppError> {
    let created = session_service::create_session(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Inspect a session's roster and current leaderboard.
#[utoipa::path(
    get,
    path = "/session/{sid}",
    tag = "session",
    params(("sid" = String, Path, description = "4-digit session id")),
    responses(
        (status = 200, description = "Session snapshot", body = SessionSummary),
        (status = 404, description = "Session does not exist")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(sid): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::session_summary(&state, &sid).await?;
    Ok(Json(summary))
}

/// Register a player name in an existing session.
#[utoipa::path(
    post,
    path = "/session/{sid}/join",
    tag = "session",
    params(("sid" = String, Path, description = "4-digit session id")),
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Player joined", body = JoinAck),
        (status = 400, description = "Malformed player name"),
        (status = 404, description = "Session does not exist"),
        (status = 409, description = "Name already taken")
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    Path(sid): Path<String>,
    Json(payload): Json<JoinRequest>,
) -> Result<Json<JoinAck>, AppError> {
    session_service::join_session(&state, &sid, &payload.name).await?;
    Ok(Json(JoinAck { ok: true }))
}

/// Download the session leaderboard as a CSV attachment.
///
/// Unlike the JSON endpoints this surfaces a plain-text 404, since the
/// response is consumed by a file download rather than an API client.
#[utoipa::path(
    get,
    path = "/session/{sid}/submissions.csv",
    tag = "session",
    params(("sid" = String, Path, description = "4-digit session id")),
    responses(
        (status = 200, description = "CSV export of the ranked submissions", body = String, content_type = "text/csv"),
        (status = 404, description = "Session does not exist", body = String, content_type = "text/plain")
    )
)]
pub async fn download_submissions(
    State(state): State<SharedState>,
    Path(sid): Path<String>,
) -> Response {
    match session_service::submissions_csv(&state, &sid).await {
        Ok(csv) => {
            let headers = [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"submissions_{sid}.csv\""),
                ),
            ];
            (StatusCode::OK, headers, csv).into_response()
        }
        Err(ServiceError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "Session not found.").into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}
