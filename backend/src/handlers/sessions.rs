use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppError,
    models::{
        attendance_session::AttendanceSession,
        session::{
            ActiveSessionQuery, ExtendSessionRequest, IssueSessionRequest, IssueSessionResponse,
            SessionResponse,
        },
        user::CurrentUser,
    },
    services::{codec, IssueSession},
    state::AppState,
    types::SessionId,
    utils::time::millis_in_timezone,
    validation::Validate,
};

pub async fn issue_session(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<IssueSessionRequest>,
) -> Result<(StatusCode, Json<IssueSessionResponse>), AppError> {
    payload.validate()?;

    let now = state.clock.now_ms();
    let request = IssueSession {
        teacher_id: user.id,
        schedule_id: payload.schedule_id.trim().to_string(),
        subject: payload.subject.trim().to_string(),
        section: payload.section.trim().to_string(),
        expiration_minutes: payload
            .expiration_minutes
            .unwrap_or(state.config.qr_default_expiration_minutes),
        location: payload.location.map(|report| report.into_fix(now)),
    };

    let (session, qr_payload) = state.issuer().issue(request).await?;
    let qr_text = codec::encode(&qr_payload);

    Ok((
        StatusCode::CREATED,
        Json(IssueSessionResponse {
            session: session_response(&state, session),
            payload: qr_payload,
            qr_text,
        }),
    ))
}

/// Current live session for the schedule, used to resume the teacher's QR
/// screen after a reload.
pub async fn get_active_session(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ActiveSessionQuery>,
) -> Result<Json<Option<SessionResponse>>, AppError> {
    if query.schedule_id.trim().is_empty() {
        return Err(AppError::BadRequest("schedule_id is required".into()));
    }
    let session = state
        .issuer()
        .load_active_session(&user.id, query.schedule_id.trim())
        .await?;
    Ok(Json(session.map(|s| session_response(&state, s))))
}

pub async fn extend_session(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(session_id): Path<String>,
    Json(payload): Json<ExtendSessionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    payload.validate()?;
    let session_id = parse_session_id(&session_id)?;
    let session = state
        .issuer()
        .extend_expiration(&user.id, &session_id, payload.expiration_minutes)
        .await?;
    Ok(Json(session_response(&state, session)))
}

pub(crate) fn parse_session_id(raw: &str) -> Result<SessionId, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid session id".into()))
}

fn session_response(state: &AppState, session: AttendanceSession) -> SessionResponse {
    let now = state.clock.now_ms();
    SessionResponse {
        remaining_ms: session.remaining_ms_at(now),
        expires_at_local: millis_in_timezone(session.expires_at, &state.config.time_zone)
            .to_rfc3339(),
        session,
    }
}
