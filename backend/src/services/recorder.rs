//! Writes attendance records for accepted scans.

use std::sync::Arc;

use crate::error::AttendanceError;
use crate::models::attendance::{AttendanceRecord, AttendanceStatus};
use crate::repositories::AttendanceRepository;
use crate::services::validator::ValidatedScan;
use crate::types::AttendanceId;
use crate::utils::time::Clock;

#[derive(Clone)]
pub struct AttendanceRecorder {
    attendance: Arc<dyn AttendanceRepository>,
    clock: Arc<dyn Clock>,
}

impl AttendanceRecorder {
    pub fn new(attendance: Arc<dyn AttendanceRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { attendance, clock }
    }

    /// Inserts one PRESENT record for the scanner.
    ///
    /// The write is conditional on `(user_id, session_id)`, so a scan racing
    /// past the duplicate check still ends as `AlreadyMarked`.
    pub async fn record(
        &self,
        scan: &ValidatedScan,
        scanner_user_id: &str,
        scanner_display_name: &str,
    ) -> Result<AttendanceId, AttendanceError> {
        let record = AttendanceRecord {
            id: AttendanceId::new(),
            user_id: scanner_user_id.to_string(),
            student_name: scanner_display_name.to_string(),
            session_id: scan.session.session_id,
            teacher_id: scan.session.teacher_id.clone(),
            schedule_id: scan.session.schedule_id.clone(),
            subject: scan.session.subject.clone(),
            section: scan.session.section.clone(),
            timestamp: self.clock.now_utc(),
            status: AttendanceStatus::Present,
            location: format!(
                "{:.6},{:.6} ({:.0}m)",
                scan.scanner_location.latitude,
                scan.scanner_location.longitude,
                scan.distance_meters
            ),
            notes: String::new(),
        };

        let inserted = self
            .attendance
            .insert_if_absent(&record)
            .await
            .map_err(AttendanceError::attendance_store)?;
        if !inserted {
            tracing::warn!(
                user_id = scanner_user_id,
                session_id = %record.session_id,
                "Concurrent scan lost the insert race"
            );
            return Err(AttendanceError::AlreadyMarked);
        }

        tracing::info!(
            attendance_id = %record.id,
            user_id = scanner_user_id,
            session_id = %record.session_id,
            "Attendance recorded"
        );
        Ok(record.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance_session::AttendanceSession;
    use crate::repositories::attendance::MockAttendanceRepository;
    use crate::repositories::InMemoryAttendanceRepository;
    use crate::services::geo::tests::fix;
    use crate::types::SessionId;
    use crate::utils::time::FixedClock;

    const T0: i64 = 1_700_000_000_000;

    fn scan() -> ValidatedScan {
        let session = AttendanceSession {
            session_id: SessionId::new(),
            teacher_id: "T1".into(),
            schedule_id: "S1".into(),
            subject: "Math".into(),
            section: "A".into(),
            created_at: T0,
            expires_at: T0 + 300_000,
            latitude: None,
            longitude: None,
        };
        ValidatedScan {
            session,
            scanner_location: fix(14.5999, 120.9842),
            distance_meters: 44.2,
        }
    }

    #[tokio::test]
    async fn record_inserts_present_row_with_denormalized_fields() {
        let repo = Arc::new(InMemoryAttendanceRepository::new());
        let recorder = AttendanceRecorder::new(repo.clone(), Arc::new(FixedClock::new(T0 + 60_000)));
        let scan = scan();

        let id = recorder.record(&scan, "U1", "Ana Reyes").await.expect("record");

        let rows = repo.snapshot().await;
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, id);
        assert_eq!(row.user_id, "U1");
        assert_eq!(row.student_name, "Ana Reyes");
        assert_eq!(row.session_id, scan.session.session_id);
        assert_eq!(row.teacher_id, "T1");
        assert_eq!(row.subject, "Math");
        assert_eq!(row.section, "A");
        assert_eq!(row.status, AttendanceStatus::Present);
        assert_eq!(row.timestamp.timestamp_millis(), T0 + 60_000);
        assert_eq!(row.location, "14.599900,120.984200 (44m)");
    }

    #[tokio::test]
    async fn second_record_for_same_user_and_session_is_refused() {
        let repo = Arc::new(InMemoryAttendanceRepository::new());
        let recorder = AttendanceRecorder::new(repo.clone(), Arc::new(FixedClock::new(T0)));
        let scan = scan();

        recorder.record(&scan, "U1", "Ana").await.unwrap();
        assert_eq!(
            recorder.record(&scan, "U1", "Ana").await,
            Err(AttendanceError::AlreadyMarked)
        );
        assert_eq!(repo.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_records_store_exactly_one_row() {
        let repo = Arc::new(InMemoryAttendanceRepository::new());
        let recorder = AttendanceRecorder::new(repo.clone(), Arc::new(FixedClock::new(T0)));
        let scan = scan();

        let (a, b) = tokio::join!(
            recorder.record(&scan, "U1", "Ana"),
            recorder.record(&scan, "U1", "Ana")
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(repo.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn storage_failure_surfaces_as_persistence_error() {
        let mut repo = MockAttendanceRepository::new();
        repo.expect_insert_if_absent()
            .returning(|_| Err(sqlx::Error::PoolTimedOut));
        let recorder = AttendanceRecorder::new(Arc::new(repo), Arc::new(FixedClock::new(T0)));

        let err = recorder.record(&scan(), "U1", "Ana").await.unwrap_err();
        assert!(matches!(err, AttendanceError::Persistence(_)));
    }
}
