//! Teacher-side management of a session's attendance roll.

use std::sync::Arc;

use crate::error::{AppError, AttendanceError};
use crate::models::attendance::{AttendanceRecord, AttendanceStatus, ManualAttendanceRequest};
use crate::models::attendance_session::AttendanceSession;
use crate::repositories::{AttendanceRepository, SessionRepository};
use crate::types::{AttendanceId, SessionId};
use crate::utils::time::Clock;

#[derive(Clone)]
pub struct RollService {
    sessions: Arc<dyn SessionRepository>,
    attendance: Arc<dyn AttendanceRepository>,
    clock: Arc<dyn Clock>,
}

impl RollService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        attendance: Arc<dyn AttendanceRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            attendance,
            clock,
        }
    }

    pub async fn list(
        &self,
        teacher_id: &str,
        session_id: &SessionId,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let session = self.owned_session(teacher_id, session_id).await?;
        self.attendance
            .list_by_session(&session.session_id)
            .await
            .map_err(|e| AttendanceError::attendance_store(e).into())
    }

    /// Adds a student the teacher marks by hand, e.g. one whose phone could
    /// not scan. Subject to the same one-record-per-session rule as scans.
    pub async fn add_manual(
        &self,
        teacher_id: &str,
        session_id: &SessionId,
        entry: ManualAttendanceRequest,
    ) -> Result<AttendanceRecord, AppError> {
        let session = self.owned_session(teacher_id, session_id).await?;
        let record = AttendanceRecord {
            id: AttendanceId::new(),
            user_id: entry.student_id,
            student_name: entry.student_name,
            session_id: session.session_id,
            teacher_id: session.teacher_id,
            schedule_id: session.schedule_id,
            subject: session.subject,
            section: session.section,
            timestamp: self.clock.now_utc(),
            status: entry.status,
            location: String::new(),
            notes: entry.notes.unwrap_or_default(),
        };
        let inserted = self
            .attendance
            .insert_if_absent(&record)
            .await
            .map_err(AttendanceError::attendance_store)?;
        if !inserted {
            return Err(AttendanceError::AlreadyMarked.into());
        }
        tracing::info!(
            attendance_id = %record.id,
            user_id = %record.user_id,
            session_id = %record.session_id,
            status = record.status.db_value(),
            "Manual attendance entry added"
        );
        Ok(record)
    }

    pub async fn update_entry(
        &self,
        teacher_id: &str,
        id: &AttendanceId,
        status: AttendanceStatus,
        notes: Option<String>,
    ) -> Result<AttendanceRecord, AppError> {
        let existing = self.owned_record(teacher_id, id).await?;
        let notes = notes.unwrap_or(existing.notes);
        let updated = self
            .attendance
            .update_entry(id, status, &notes)
            .await
            .map_err(AttendanceError::attendance_store)?
            .ok_or_else(|| AppError::NotFound("Attendance record not found".into()))?;
        tracing::info!(
            attendance_id = %id,
            status = status.db_value(),
            "Attendance entry updated"
        );
        Ok(updated)
    }

    pub async fn remove(&self, teacher_id: &str, id: &AttendanceId) -> Result<(), AppError> {
        self.owned_record(teacher_id, id).await?;
        let deleted = self
            .attendance
            .delete(id)
            .await
            .map_err(AttendanceError::attendance_store)?;
        if !deleted {
            return Err(AppError::NotFound("Attendance record not found".into()));
        }
        tracing::info!(attendance_id = %id, "Attendance entry removed");
        Ok(())
    }

    async fn owned_session(
        &self,
        teacher_id: &str,
        session_id: &SessionId,
    ) -> Result<AttendanceSession, AppError> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .await
            .map_err(AttendanceError::session_store)?
            .ok_or(AttendanceError::SessionNotFound)?;
        if session.teacher_id != teacher_id {
            return Err(AppError::Forbidden(
                "Only the session's teacher can manage its roll".into(),
            ));
        }
        Ok(session)
    }

    async fn owned_record(
        &self,
        teacher_id: &str,
        id: &AttendanceId,
    ) -> Result<AttendanceRecord, AppError> {
        let record = self
            .attendance
            .find_by_id(id)
            .await
            .map_err(AttendanceError::attendance_store)?
            .ok_or_else(|| AppError::NotFound("Attendance record not found".into()))?;
        if record.teacher_id != teacher_id {
            return Err(AppError::Forbidden(
                "Only the session's teacher can manage its roll".into(),
            ));
        }
        Ok(record)
    }
}
