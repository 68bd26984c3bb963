//! End-to-end handling of one QR scan: decode, validate, record.

use crate::error::AttendanceError;
use crate::models::scan::ScanOutcome;
use crate::models::user::CurrentUser;
use crate::services::codec;
use crate::services::geo::LocationProvider;
use crate::services::recorder::AttendanceRecorder;
use crate::services::validator::ScanValidator;

#[derive(Clone)]
pub struct ScanService {
    validator: ScanValidator,
    recorder: AttendanceRecorder,
}

impl ScanService {
    pub fn new(validator: ScanValidator, recorder: AttendanceRecorder) -> Self {
        Self {
            validator,
            recorder,
        }
    }

    pub async fn scan(
        &self,
        qr_text: &str,
        scanner: &CurrentUser,
        location: &dyn LocationProvider,
    ) -> Result<ScanOutcome, AttendanceError> {
        let result = self.scan_inner(qr_text, scanner, location).await;
        match &result {
            Ok(outcome) => tracing::info!(
                user_id = %scanner.id,
                session_id = %outcome.session_id,
                distance_meters = outcome.distance_meters,
                "Scan accepted"
            ),
            Err(err) if err.is_persistence() => tracing::error!(
                user_id = %scanner.id,
                reason = err.code(),
                error = %err,
                "Scan failed"
            ),
            Err(err) => tracing::info!(
                user_id = %scanner.id,
                reason = err.code(),
                "Scan rejected"
            ),
        }
        result
    }

    async fn scan_inner(
        &self,
        qr_text: &str,
        scanner: &CurrentUser,
        location: &dyn LocationProvider,
    ) -> Result<ScanOutcome, AttendanceError> {
        let payload = codec::decode(qr_text)?;
        let validated = self
            .validator
            .validate(payload, &scanner.id, location)
            .await?;
        let attendance_id = self
            .recorder
            .record(&validated, &scanner.id, &scanner.name)
            .await?;

        Ok(ScanOutcome {
            attendance_id,
            session_id: validated.session.session_id,
            subject: validated.session.subject,
            section: validated.session.section,
            distance_meters: validated.distance_meters,
            message: format!(
                "Attendance marked successfully! You are within {:.0}m of the teacher.",
                validated.distance_meters
            ),
        })
    }
}
