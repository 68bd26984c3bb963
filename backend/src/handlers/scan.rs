use axum::{
    extract::{Extension, State},
    Json,
};

use crate::{
    error::AppError,
    models::{
        scan::{ScanOutcome, ScanRequest},
        user::CurrentUser,
    },
    services::geo::ReportedLocation,
    state::AppState,
    validation::Validate,
};

pub async fn scan_qr(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<ScanRequest>,
) -> Result<Json<ScanOutcome>, AppError> {
    payload.validate()?;

    let now = state.clock.now_ms();
    let location = ReportedLocation::new(
        payload.location.map(|report| report.into_fix(now)),
        payload.location_services_enabled,
    );

    let outcome = state
        .scan_service()
        .scan(&payload.qr_text, &user, &location)
        .await?;
    Ok(Json(outcome))
}
