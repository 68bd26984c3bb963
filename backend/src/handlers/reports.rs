use axum::{
    extract::{Extension, Query, State},
    Json,
};

use crate::{
    error::AppError,
    models::{
        attendance::{AttendanceRecord, SummaryQuery, SummaryResponse},
        user::CurrentUser,
    },
    state::AppState,
    validation::Validate,
};

/// The caller's own attendance, newest first.
pub async fn my_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    let records = state.reports().history(&user.id).await?;
    Ok(Json(records))
}

pub async fn attendance_summary(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, AppError> {
    query.validate()?;
    let summary = state.reports().summary(&user.id, query).await?;
    Ok(Json(summary))
}
