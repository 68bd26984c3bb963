//! Text encoding of [`QrPayload`] for QR images.

use crate::error::AttendanceError;
use crate::models::qr_payload::QrPayload;

pub fn encode(payload: &QrPayload) -> String {
    // Non-finite coordinates serialize as null and decode as "no location".
    serde_json::to_string(payload).unwrap_or_default()
}

pub fn decode(text: &str) -> Result<QrPayload, AttendanceError> {
    serde_json::from_str(text.trim()).map_err(|err| {
        tracing::debug!(error = %err, "Rejected QR payload");
        AttendanceError::MalformedPayload
    })
}
