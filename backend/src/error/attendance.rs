//! Domain failures of the QR attendance flow.
//!
//! Every scan rejection is terminal for that attempt: the caller shows the
//! message and the student scans again. Nothing here is retried.

use axum::http::StatusCode;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttendanceError {
    #[error("Invalid QR code data format")]
    MalformedPayload,
    #[error("This QR code has expired")]
    Expired,
    #[error("Unable to get your current location")]
    LocationUnavailable,
    #[error("This QR code was generated without location data. Attendance requires location verification.")]
    LocationDataMissing,
    #[error(
        "You must be within {radius_meters:.0}m of the teacher to mark attendance. You are {distance_meters:.0}m away."
    )]
    OutOfRange {
        distance_meters: f64,
        radius_meters: f64,
    },
    #[error("Invalid or expired session")]
    SessionNotFound,
    #[error("This QR code is not for this class/teacher")]
    TeacherMismatch,
    #[error("This QR code session has expired")]
    SessionExpired,
    #[error("Attendance already marked for this session")]
    AlreadyMarked,
    #[error("Failed to save attendance session: {0}")]
    SessionPersistence(String),
    #[error("Failed to mark attendance: {0}")]
    Persistence(String),
}

impl AttendanceError {
    /// Stable machine-readable code used in API error bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::MalformedPayload => "MALFORMED_PAYLOAD",
            AttendanceError::Expired => "EXPIRED",
            AttendanceError::LocationUnavailable => "LOCATION_UNAVAILABLE",
            AttendanceError::LocationDataMissing => "LOCATION_DATA_MISSING",
            AttendanceError::OutOfRange { .. } => "OUT_OF_RANGE",
            AttendanceError::SessionNotFound => "SESSION_NOT_FOUND",
            AttendanceError::TeacherMismatch => "TEACHER_MISMATCH",
            AttendanceError::SessionExpired => "SESSION_EXPIRED",
            AttendanceError::AlreadyMarked => "ALREADY_MARKED",
            AttendanceError::SessionPersistence(_) => "SESSION_PERSISTENCE_ERROR",
            AttendanceError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::MalformedPayload => StatusCode::BAD_REQUEST,
            AttendanceError::SessionNotFound => StatusCode::NOT_FOUND,
            AttendanceError::AlreadyMarked => StatusCode::CONFLICT,
            AttendanceError::SessionPersistence(_) | AttendanceError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            AttendanceError::SessionPersistence(_) | AttendanceError::Persistence(_)
        )
    }

    pub(crate) fn session_store(err: sqlx::Error) -> Self {
        AttendanceError::SessionPersistence(err.to_string())
    }

    pub(crate) fn attendance_store(err: sqlx::Error) -> Self {
        AttendanceError::Persistence(err.to_string())
    }
}
