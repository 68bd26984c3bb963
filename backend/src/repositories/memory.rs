//! In-process stores backing single-node deployments (`DATABASE_URL=memory://`)
//! and the API test suite.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AttendanceRepository, SessionRepository};
use crate::models::attendance::{
    AttendanceRecord, AttendanceStatus, AttendanceSummary, SummaryFilter,
};
use crate::models::attendance_session::AttendanceSession;
use crate::types::{AttendanceId, SessionId};

#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<Vec<AttendanceSession>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<AttendanceSession> {
        self.sessions.read().await.clone()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: &AttendanceSession) -> Result<(), sqlx::Error> {
        let mut sessions = self.sessions.write().await;
        if sessions.iter().any(|s| s.session_id == session.session_id) {
            return Err(sqlx::Error::Protocol(format!(
                "duplicate session id {}",
                session.session_id
            )));
        }
        sessions.push(session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<AttendanceSession>, sqlx::Error> {
        let sessions = self.sessions.read().await;
        Ok(sessions.iter().find(|s| &s.session_id == id).cloned())
    }

    async fn list_for_schedule(
        &self,
        teacher_id: &str,
        schedule_id: &str,
    ) -> Result<Vec<AttendanceSession>, sqlx::Error> {
        let sessions = self.sessions.read().await;
        let mut matching: Vec<AttendanceSession> = sessions
            .iter()
            .filter(|s| s.teacher_id == teacher_id && s.schedule_id == schedule_id)
            .cloned()
            .collect();
        matching.sort_by_key(|s| (s.created_at, s.session_id));
        Ok(matching)
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, sqlx::Error> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|s| &s.session_id != id);
        Ok(sessions.len() != before)
    }

    async fn update_expires_at(
        &self,
        id: &SessionId,
        expires_at: i64,
    ) -> Result<bool, sqlx::Error> {
        let mut sessions = self.sessions.write().await;
        match sessions.iter_mut().find(|s| &s.session_id == id) {
            Some(session) => {
                session.expires_at = expires_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expired_before(&self, cutoff_ms: i64) -> Result<u64, sqlx::Error> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|s| s.expires_at >= cutoff_ms);
        Ok((before - sessions.len()) as u64)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAttendanceRepository {
    records: RwLock<Vec<AttendanceRecord>>,
}

impl InMemoryAttendanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<AttendanceRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AttendanceRepository for InMemoryAttendanceRepository {
    async fn exists_for(&self, user_id: &str, session_id: &SessionId) -> Result<bool, sqlx::Error> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .any(|r| r.user_id == user_id && &r.session_id == session_id))
    }

    async fn insert_if_absent(&self, record: &AttendanceRecord) -> Result<bool, sqlx::Error> {
        // Check and push under one write guard so concurrent scans serialize.
        let mut records = self.records.write().await;
        if records
            .iter()
            .any(|r| r.user_id == record.user_id && r.session_id == record.session_id)
        {
            return Ok(false);
        }
        records.push(record.clone());
        Ok(true)
    }

    async fn find_by_id(&self, id: &AttendanceId) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| &r.id == id).cloned())
    }

    async fn list_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        let records = self.records.read().await;
        let mut matching: Vec<AttendanceRecord> = records
            .iter()
            .filter(|r| &r.session_id == session_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| (r.timestamp, r.id));
        Ok(matching)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
        let records = self.records.read().await;
        let mut matching: Vec<AttendanceRecord> = records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| std::cmp::Reverse((r.timestamp, r.id)));
        Ok(matching)
    }

    async fn summarize(&self, filter: &SummaryFilter) -> Result<AttendanceSummary, sqlx::Error> {
        let records = self.records.read().await;
        let mut summary = AttendanceSummary::default();
        let mut students = HashSet::new();
        for record in records.iter().filter(|r| filter.matches(r)) {
            summary.tally(record);
            students.insert(record.user_id.as_str());
        }
        summary.unique_students = students.len() as i64;
        Ok(summary)
    }

    async fn update_entry(
        &self,
        id: &AttendanceId,
        status: AttendanceStatus,
        notes: &str,
    ) -> Result<Option<AttendanceRecord>, sqlx::Error> {
        let mut records = self.records.write().await;
        Ok(records.iter_mut().find(|r| &r.id == id).map(|record| {
            record.status = status;
            record.notes = notes.to_string();
            record.clone()
        }))
    }

    async fn delete(&self, id: &AttendanceId) -> Result<bool, sqlx::Error> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| &r.id != id);
        Ok(records.len() != before)
    }
}
