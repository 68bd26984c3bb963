//! Storage for attendance records.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::attendance::{
    AttendanceRecord, AttendanceRow, AttendanceStatus, AttendanceSummary, SummaryFilter,
};
use crate::types::{AttendanceId, SessionId};

const SELECT_COLUMNS: &str = "id, user_id, student_name, session_id, teacher_id, schedule_id, \
     subject, section, timestamp, status, location, notes";

/// Repository trait for attendance records.
///
/// This trait is designed to be mocked with mockall in unit tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn exists_for(&self, user_id: &str, session_id: &SessionId) -> Result<bool, sqlx::Error>;

    /// Inserts unless a record for `(user_id, session_id)` already exists.
    /// Returns `false` when the write was skipped.
    async fn insert_if_absent(&self, record: &AttendanceRecord) -> Result<bool, sqlx::Error>;

    async fn find_by_id(&self, id: &AttendanceId) -> Result<Option<AttendanceRecord>, sqlx::Error>;

    async fn list_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<AttendanceRecord>, sqlx::Error>;

    /// A student's own records, newest first.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<AttendanceRecord>, sqlx::Error>;

    async fn summarize(&self, filter: &SummaryFilter) -> Result<AttendanceSummary, sqlx::Error>;

    async fn update_entry(
        &self,
        id: &AttendanceId,
        status: AttendanceStatus,
        notes: &str,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error>;

    async fn delete(&self, id: &AttendanceId) -> Result<bool, sqlx::Error>;
}

#[derive(Debug, Clone)]
pub struct PgAttendanceRepository {
    pool: PgPool,
}

impl PgAttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceRepository for PgAttendanceRepository {
    async fn exists_for(&self, user_id: &str, session_id: &SessionId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM attendance WHERE user_id = $1 AND session_id = $2)",
        )
        .bind(user_id)
        .bind(*session_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn insert_if_absent(&self, record: &AttendanceRecord) -> Result<bool, sqlx::Error> {
        let query = format!(
            "INSERT INTO attendance ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (user_id, session_id) DO NOTHING",
            SELECT_COLUMNS
        );
        let result = sqlx::query(&query)
            .bind(record.id)
            .bind(&record.user_id)
            .bind(&record.student_name)
            .bind(record.session_id)
            .bind(&record.teacher_id)
            .bind(&record.schedule_id)
            .bind(&record.subject)
            .bind(&record.section)
            .bind(record.timestamp)
            .bind(record.status.db_value())
            .bind(&record.location)
            .bind(&record.notes)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, id: &AttendanceId) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        let query = format!("SELECT {} FROM attendance WHERE id = $1", SELECT_COLUMNS);
        sqlx::query_as::<_, AttendanceRow>(&query)
            .bind(*id)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn list_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM attendance WHERE session_id = $1 ORDER BY timestamp ASC, id ASC",
            SELECT_COLUMNS
        );
        sqlx::query_as::<_, AttendanceRow>(&query)
            .bind(*session_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect()
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM attendance WHERE user_id = $1 ORDER BY timestamp DESC, id DESC",
            SELECT_COLUMNS
        );
        sqlx::query_as::<_, AttendanceRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect()
    }

    async fn summarize(&self, filter: &SummaryFilter) -> Result<AttendanceSummary, sqlx::Error> {
        sqlx::query_as::<_, AttendanceSummary>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(DISTINCT user_id) AS unique_students,
                COUNT(*) FILTER (WHERE status = 'PRESENT') AS present,
                COUNT(*) FILTER (WHERE status = 'LATE') AS late,
                COUNT(*) FILTER (WHERE status = 'ABSENT') AS absent,
                COUNT(*) FILTER (WHERE status = 'EXCUSED') AS excused
            FROM attendance
            WHERE teacher_id = $1
              AND timestamp >= $2
              AND timestamp < $3
              AND ($4::TEXT IS NULL OR subject = $4)
              AND ($5::TEXT IS NULL OR LOWER(section) = LOWER($5))
            "#,
        )
        .bind(&filter.teacher_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.subject.as_deref())
        .bind(filter.section.as_deref())
        .fetch_one(&self.pool)
        .await
    }

    async fn update_entry(
        &self,
        id: &AttendanceId,
        status: AttendanceStatus,
        notes: &str,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE attendance SET status = $1, notes = $2 WHERE id = $3 RETURNING {}",
            SELECT_COLUMNS
        );
        sqlx::query_as::<_, AttendanceRow>(&query)
            .bind(status.db_value())
            .bind(notes)
            .bind(*id)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn delete(&self, id: &AttendanceId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = $1")
            .bind(*id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
