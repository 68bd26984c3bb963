use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::SessionId;

/// A time-bounded grant tied to one teacher and one class schedule.
///
/// Timestamps are epoch milliseconds, the same unit carried in QR payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AttendanceSession {
    pub session_id: SessionId,
    pub teacher_id: String,
    pub schedule_id: String,
    pub subject: String,
    pub section: String,
    pub created_at: i64,
    pub expires_at: i64,
    /// Where the teacher's device stood at issuance. Scanned payloads must
    /// carry the same position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl AttendanceSession {
    pub fn is_active_at(&self, now_ms: i64) -> bool {
        self.expires_at > now_ms
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        !self.is_active_at(now_ms)
    }

    pub fn remaining_ms_at(&self, now_ms: i64) -> i64 {
        (self.expires_at - now_ms).max(0)
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// Picks the session that stays open the longest among those still active.
///
/// Candidates are filtered in memory so the store only needs equality lookups.
pub fn latest_active(
    sessions: impl IntoIterator<Item = AttendanceSession>,
    now_ms: i64,
) -> Option<AttendanceSession> {
    sessions
        .into_iter()
        .filter(|s| s.is_active_at(now_ms))
        .max_by_key(|s| s.expires_at)
}
