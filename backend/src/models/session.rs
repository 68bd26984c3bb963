use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{attendance_session::AttendanceSession, qr_payload::QrPayload};
use crate::services::geo::LocationFix;

/// Device location as reported by a mobile client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct LocationReport {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 0.0))]
    pub accuracy_meters: Option<f64>,
    pub timestamp_ms: Option<i64>,
}

impl LocationReport {
    pub fn into_fix(self, fallback_timestamp_ms: i64) -> LocationFix {
        LocationFix {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy_meters: self.accuracy_meters,
            timestamp_ms: self.timestamp_ms.unwrap_or(fallback_timestamp_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IssueSessionRequest {
    #[validate(custom(function = "crate::validation::rules::validate_identifier"))]
    pub schedule_id: String,
    #[validate(custom(function = "crate::validation::rules::validate_identifier"))]
    pub subject: String,
    #[validate(length(max = 128))]
    pub section: String,
    #[validate(range(min = 1, max = 60))]
    pub expiration_minutes: Option<u32>,
    #[validate(nested)]
    pub location: Option<LocationReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExtendSessionRequest {
    #[validate(range(min = 1, max = 60))]
    pub expiration_minutes: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActiveSessionQuery {
    pub schedule_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: AttendanceSession,
    pub remaining_ms: i64,
    /// `expires_at` rendered in the configured school timezone.
    pub expires_at_local: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueSessionResponse {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub payload: QrPayload,
    /// Text to render into the QR image.
    pub qr_text: String,
}
