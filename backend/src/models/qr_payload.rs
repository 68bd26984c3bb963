//! Data embedded in an attendance QR image.
//!
//! Field names are camelCase because existing mobile and web clients already
//! produce and consume this exact JSON shape.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_EXPIRATION_MINUTES;
use crate::services::geo::LocationFix;

const MILLIS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub teacher_id: String,
    pub session_id: String,
    pub user_id: String,
    pub schedule_id: String,
    pub subject: String,
    pub section: String,
    /// Issuance instant, epoch milliseconds.
    pub timestamp: i64,
    #[serde(default = "default_expiration_minutes")]
    pub expiration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_timestamp: Option<i64>,
}

fn default_expiration_minutes() -> u32 {
    DEFAULT_EXPIRATION_MINUTES
}

impl QrPayload {
    pub fn expires_at_ms(&self) -> i64 {
        self.timestamp
            .saturating_add(i64::from(self.expiration_minutes) * MILLIS_PER_MINUTE)
    }

    /// A payload is valid for instants strictly before `timestamp + expirationMinutes`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms()
    }

    pub fn has_location(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    pub fn location(&self) -> Option<LocationFix> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(LocationFix {
                latitude,
                longitude,
                accuracy_meters: None,
                timestamp_ms: self.location_timestamp.unwrap_or(self.timestamp),
            }),
            _ => None,
        }
    }

    pub fn with_location(mut self, fix: &LocationFix) -> Self {
        self.latitude = Some(fix.latitude);
        self.longitude = Some(fix.longitude);
        self.location_timestamp = Some(fix.timestamp_ms);
        self
    }
}
