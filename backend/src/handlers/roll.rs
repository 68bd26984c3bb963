use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    handlers::sessions::parse_session_id,
    models::{
        attendance::{AttendanceRecord, ManualAttendanceRequest, UpdateAttendanceRequest},
        user::CurrentUser,
    },
    state::AppState,
    types::AttendanceId,
    validation::Validate,
};

pub async fn list_session_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    let session_id = parse_session_id(&session_id)?;
    let records = state.roll().list(&user.id, &session_id).await?;
    Ok(Json(records))
}

pub async fn add_manual_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(session_id): Path<String>,
    Json(payload): Json<ManualAttendanceRequest>,
) -> Result<(StatusCode, Json<AttendanceRecord>), AppError> {
    payload.validate()?;
    let session_id = parse_session_id(&session_id)?;
    let record = state
        .roll()
        .add_manual(&user.id, &session_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAttendanceRequest>,
) -> Result<Json<AttendanceRecord>, AppError> {
    payload.validate()?;
    let id = parse_attendance_id(&id)?;
    let record = state
        .roll()
        .update_entry(&user.id, &id, payload.status, payload.notes)
        .await?;
    Ok(Json(record))
}

pub async fn delete_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_attendance_id(&id)?;
    state.roll().remove(&user.id, &id).await?;
    Ok(Json(json!({ "message": "Attendance record deleted" })))
}

fn parse_attendance_id(raw: &str) -> Result<AttendanceId, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid attendance id".into()))
}
