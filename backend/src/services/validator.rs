//! Decides whether one scan attempt may be recorded.
//!
//! Checks run in a fixed order and the first failure ends the attempt:
//! location data present, payload expiry, scanner within the geofence,
//! session binding, duplicate scan.

use std::sync::Arc;

use crate::error::AttendanceError;
use crate::models::attendance_session::AttendanceSession;
use crate::models::qr_payload::QrPayload;
use crate::repositories::{AttendanceRepository, SessionRepository};
use crate::services::geo::{self, LocationFix, LocationProvider};
use crate::types::SessionId;
use crate::utils::time::Clock;

/// How far a payload's stamped position may drift from the stored one after a
/// JSON round trip.
const BOUND_LOCATION_TOLERANCE_METERS: f64 = 1.0;

/// A scan that passed every check and may be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedScan {
    pub session: AttendanceSession,
    pub scanner_location: LocationFix,
    pub distance_meters: f64,
}

#[derive(Clone)]
pub struct ScanValidator {
    sessions: Arc<dyn SessionRepository>,
    attendance: Arc<dyn AttendanceRepository>,
    clock: Arc<dyn Clock>,
    radius_meters: f64,
}

impl ScanValidator {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        attendance: Arc<dyn AttendanceRepository>,
        clock: Arc<dyn Clock>,
        radius_meters: f64,
    ) -> Self {
        Self {
            sessions,
            attendance,
            clock,
            radius_meters,
        }
    }

    pub async fn validate(
        &self,
        payload: QrPayload,
        scanner_user_id: &str,
        location: &dyn LocationProvider,
    ) -> Result<ValidatedScan, AttendanceError> {
        // Location-less codes are never valid, whatever their age.
        let qr_location = payload
            .location()
            .ok_or(AttendanceError::LocationDataMissing)?;

        if payload.is_expired_at(self.clock.now_ms()) {
            return Err(AttendanceError::Expired);
        }

        let (scanner_location, distance_meters) =
            self.check_location(&qr_location, location).await?;

        let session = self.check_session_binding(&payload).await?;

        let already_marked = self
            .attendance
            .exists_for(scanner_user_id, &session.session_id)
            .await
            .map_err(AttendanceError::attendance_store)?;
        if already_marked {
            return Err(AttendanceError::AlreadyMarked);
        }

        Ok(ValidatedScan {
            session,
            scanner_location,
            distance_meters,
        })
    }

    async fn check_location(
        &self,
        qr_location: &LocationFix,
        location: &dyn LocationProvider,
    ) -> Result<(LocationFix, f64), AttendanceError> {
        let scanner = location.current_location().await?;
        let distance_meters = geo::distance_meters(&scanner, qr_location);
        if !geo::within_radius(distance_meters, self.radius_meters) {
            return Err(AttendanceError::OutOfRange {
                distance_meters,
                radius_meters: self.radius_meters,
            });
        }
        Ok((scanner, distance_meters))
    }

    async fn check_session_binding(
        &self,
        payload: &QrPayload,
    ) -> Result<AttendanceSession, AttendanceError> {
        // Ids that are not ours cannot name a stored session.
        let Ok(session_id) = payload.session_id.parse::<SessionId>() else {
            return Err(AttendanceError::SessionNotFound);
        };
        let session = self
            .sessions
            .find_by_id(&session_id)
            .await
            .map_err(AttendanceError::session_store)?
            .ok_or(AttendanceError::SessionNotFound)?;

        if !is_bound_to(payload, &session) {
            tracing::debug!(
                session_id = %session.session_id,
                "QR payload does not match its stored session"
            );
            return Err(AttendanceError::TeacherMismatch);
        }
        // The session may have been extended or shortened after the QR was drawn.
        if session.is_expired_at(self.clock.now_ms()) {
            return Err(AttendanceError::SessionExpired);
        }
        Ok(session)
    }
}

/// The QR text travels through the student's device, so every class field and
/// the stamped position must agree with what was stored at issuance.
fn is_bound_to(payload: &QrPayload, session: &AttendanceSession) -> bool {
    let same_class = payload.teacher_id == session.teacher_id
        && payload.schedule_id == session.schedule_id
        && payload.subject == session.subject
        && payload.section == session.section
        && payload.timestamp == session.created_at;
    let same_place = match (payload.location(), session.coordinates()) {
        (Some(stamped), Some((latitude, longitude))) => {
            let issued = LocationFix {
                latitude,
                longitude,
                accuracy_meters: None,
                timestamp_ms: stamped.timestamp_ms,
            };
            geo::distance_meters(&stamped, &issued) <= BOUND_LOCATION_TOLERANCE_METERS
        }
        (None, None) => true,
        _ => false,
    };
    same_class && same_place
}
