//! Storage for attendance sessions.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::attendance_session::AttendanceSession;
use crate::types::SessionId;

const SELECT_COLUMNS: &str = "session_id, teacher_id, schedule_id, subject, section, \
     created_at, expires_at, latitude, longitude";

/// Repository trait for attendance sessions.
///
/// Queries are equality lookups only; "which session is active" is decided by
/// the caller over the returned candidate set.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: &AttendanceSession) -> Result<(), sqlx::Error>;

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<AttendanceSession>, sqlx::Error>;

    /// All sessions for a teacher/schedule pair, oldest first.
    async fn list_for_schedule(
        &self,
        teacher_id: &str,
        schedule_id: &str,
    ) -> Result<Vec<AttendanceSession>, sqlx::Error>;

    async fn delete(&self, id: &SessionId) -> Result<bool, sqlx::Error>;

    async fn update_expires_at(&self, id: &SessionId, expires_at: i64)
        -> Result<bool, sqlx::Error>;

    /// Removes sessions that expired before `cutoff_ms`; returns how many.
    async fn delete_expired_before(&self, cutoff_ms: i64) -> Result<u64, sqlx::Error>;
}

#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn insert(&self, session: &AttendanceSession) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO attendance_sessions
                (session_id, teacher_id, schedule_id, subject, section, created_at, expires_at,
                 latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.session_id)
        .bind(&session.teacher_id)
        .bind(&session.schedule_id)
        .bind(&session.subject)
        .bind(&session.section)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.latitude)
        .bind(session.longitude)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<AttendanceSession>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM attendance_sessions WHERE session_id = $1",
            SELECT_COLUMNS
        );
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(*id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_for_schedule(
        &self,
        teacher_id: &str,
        schedule_id: &str,
    ) -> Result<Vec<AttendanceSession>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM attendance_sessions \
             WHERE teacher_id = $1 AND schedule_id = $2 \
             ORDER BY created_at ASC, session_id ASC",
            SELECT_COLUMNS
        );
        sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(teacher_id)
            .bind(schedule_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM attendance_sessions WHERE session_id = $1")
            .bind(*id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_expires_at(
        &self,
        id: &SessionId,
        expires_at: i64,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE attendance_sessions SET expires_at = $1 WHERE session_id = $2")
                .bind(expires_at)
                .bind(*id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_before(&self, cutoff_ms: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM attendance_sessions WHERE expires_at < $1")
            .bind(cutoff_ms)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
