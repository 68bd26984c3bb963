use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::session::LocationReport;
use crate::types::{AttendanceId, SessionId};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScanRequest {
    #[validate(length(min = 1, max = 4096))]
    pub qr_text: String,
    #[validate(nested)]
    pub location: Option<LocationReport>,
    #[serde(default = "location_services_default")]
    pub location_services_enabled: bool,
}

fn location_services_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub attendance_id: AttendanceId,
    pub session_id: SessionId,
    pub subject: String,
    pub section: String,
    pub distance_meters: f64,
    pub message: String,
}
