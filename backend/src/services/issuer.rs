//! Creates, extends and looks up attendance sessions.

use std::sync::Arc;

use crate::error::AttendanceError;
use crate::models::attendance_session::{latest_active, AttendanceSession};
use crate::models::qr_payload::QrPayload;
use crate::repositories::SessionRepository;
use crate::services::geo::LocationFix;
use crate::types::SessionId;
use crate::utils::time::Clock;

const MILLIS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone)]
pub struct IssueSession {
    pub teacher_id: String,
    pub schedule_id: String,
    pub subject: String,
    pub section: String,
    pub expiration_minutes: u32,
    /// Teacher device position at issuance; stamped into the QR payload.
    pub location: Option<LocationFix>,
}

#[derive(Clone)]
pub struct SessionIssuer {
    sessions: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
}

impl SessionIssuer {
    pub fn new(sessions: Arc<dyn SessionRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { sessions, clock }
    }

    /// Rotates the session for a teacher/schedule pair.
    ///
    /// Prior sessions are deleted one by one before the new one is inserted;
    /// the sequence is not transactional, so concurrent issuance for the same
    /// pair can briefly leave two sessions alive.
    pub async fn issue(
        &self,
        request: IssueSession,
    ) -> Result<(AttendanceSession, QrPayload), AttendanceError> {
        let session_id = SessionId::new();
        let now = self.clock.now_ms();
        let expires_at = expiry_from(now, request.expiration_minutes);

        let superseded = self
            .sessions
            .list_for_schedule(&request.teacher_id, &request.schedule_id)
            .await
            .map_err(AttendanceError::session_store)?;

        let mut first_failure = None;
        for old in &superseded {
            match self.sessions.delete(&old.session_id).await {
                Ok(_) => tracing::debug!(session_id = %old.session_id, "Deleted superseded session"),
                Err(err) => {
                    tracing::warn!(
                        session_id = %old.session_id,
                        error = %err,
                        "Failed to delete superseded session"
                    );
                    first_failure.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_failure {
            return Err(AttendanceError::session_store(err));
        }

        let session = AttendanceSession {
            session_id,
            teacher_id: request.teacher_id.clone(),
            schedule_id: request.schedule_id.clone(),
            subject: request.subject.clone(),
            section: request.section.clone(),
            created_at: now,
            expires_at,
            latitude: request.location.as_ref().map(|fix| fix.latitude),
            longitude: request.location.as_ref().map(|fix| fix.longitude),
        };
        self.sessions
            .insert(&session)
            .await
            .map_err(AttendanceError::session_store)?;

        let mut payload = QrPayload {
            teacher_id: request.teacher_id.clone(),
            session_id: session_id.to_string(),
            user_id: request.teacher_id,
            schedule_id: request.schedule_id,
            subject: request.subject,
            section: request.section,
            timestamp: now,
            expiration_minutes: request.expiration_minutes,
            latitude: None,
            longitude: None,
            location_timestamp: None,
        };
        if let Some(fix) = &request.location {
            payload = payload.with_location(fix);
        }

        tracing::info!(
            session_id = %session.session_id,
            teacher_id = %session.teacher_id,
            schedule_id = %session.schedule_id,
            expires_at = session.expires_at,
            superseded = superseded.len(),
            with_location = payload.has_location(),
            "Issued attendance session"
        );

        Ok((session, payload))
    }

    /// Pushes out the expiry of the newest session for the schedule that
    /// `session_id` belongs to. The session id and QR image stay the same.
    pub async fn extend_expiration(
        &self,
        teacher_id: &str,
        session_id: &SessionId,
        expiration_minutes: u32,
    ) -> Result<AttendanceSession, AttendanceError> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .await
            .map_err(AttendanceError::session_store)?
            .ok_or(AttendanceError::SessionNotFound)?;
        if session.teacher_id != teacher_id {
            return Err(AttendanceError::TeacherMismatch);
        }

        let mut latest = self
            .sessions
            .list_for_schedule(&session.teacher_id, &session.schedule_id)
            .await
            .map_err(AttendanceError::session_store)?
            .into_iter()
            .max_by_key(|s| s.created_at)
            .unwrap_or(session);

        let expires_at = expiry_from(self.clock.now_ms(), expiration_minutes);
        let updated = self
            .sessions
            .update_expires_at(&latest.session_id, expires_at)
            .await
            .map_err(AttendanceError::session_store)?;
        if !updated {
            return Err(AttendanceError::SessionNotFound);
        }
        latest.expires_at = expires_at;

        tracing::info!(
            session_id = %latest.session_id,
            expires_at,
            "Extended attendance session"
        );
        Ok(latest)
    }

    pub async fn load_active_session(
        &self,
        teacher_id: &str,
        schedule_id: &str,
    ) -> Result<Option<AttendanceSession>, AttendanceError> {
        let candidates = self
            .sessions
            .list_for_schedule(teacher_id, schedule_id)
            .await
            .map_err(AttendanceError::session_store)?;
        Ok(latest_active(candidates, self.clock.now_ms()))
    }
}

fn expiry_from(now_ms: i64, minutes: u32) -> i64 {
    now_ms.saturating_add(i64::from(minutes) * MILLIS_PER_MINUTE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::session::MockSessionRepository;
    use crate::repositories::InMemorySessionRepository;
    use crate::utils::time::FixedClock;

    const T0: i64 = 1_700_000_000_000;

    fn request(minutes: u32) -> IssueSession {
        IssueSession {
            teacher_id: "T1".into(),
            schedule_id: "S1".into(),
            subject: "Math".into(),
            section: "A".into(),
            expiration_minutes: minutes,
            location: None,
        }
    }

    fn issuer_with(repo: Arc<InMemorySessionRepository>, clock: Arc<FixedClock>) -> SessionIssuer {
        SessionIssuer::new(repo, clock)
    }

    #[tokio::test]
    async fn issue_persists_session_and_builds_payload() {
        let repo = Arc::new(InMemorySessionRepository::new());
        let clock = Arc::new(FixedClock::new(T0));
        let issuer = issuer_with(repo.clone(), clock);

        let (session, payload) = issuer.issue(request(5)).await.expect("issue");

        assert_eq!(session.created_at, T0);
        assert_eq!(session.expires_at, T0 + 300_000);
        assert_eq!(payload.timestamp, T0);
        assert_eq!(payload.session_id, session.session_id.to_string());
        assert_eq!(payload.teacher_id, "T1");
        assert_eq!(payload.expiration_minutes, 5);
        assert!(!payload.has_location());
        assert_eq!(repo.snapshot().await, vec![session]);
    }

    #[tokio::test]
    async fn issue_stamps_teacher_location() {
        let repo = Arc::new(InMemorySessionRepository::new());
        let issuer = issuer_with(repo, Arc::new(FixedClock::new(T0)));
        let mut req = request(5);
        req.location = Some(LocationFix {
            latitude: 14.6,
            longitude: 121.0,
            accuracy_meters: Some(5.0),
            timestamp_ms: T0 - 1_000,
        });

        let (session, payload) = issuer.issue(req).await.expect("issue");
        assert_eq!(session.coordinates(), Some((14.6, 121.0)));
        assert_eq!(payload.latitude, Some(14.6));
        assert_eq!(payload.longitude, Some(121.0));
        assert_eq!(payload.location_timestamp, Some(T0 - 1_000));
    }

    #[tokio::test]
    async fn reissue_leaves_single_active_session() {
        let repo = Arc::new(InMemorySessionRepository::new());
        let clock = Arc::new(FixedClock::new(T0));
        let issuer = issuer_with(repo.clone(), clock.clone());

        let (first, _) = issuer.issue(request(5)).await.unwrap();
        clock.advance_ms(30_000);
        let (second, _) = issuer.issue(request(5)).await.unwrap();

        let now = clock.now_ms();
        let active: Vec<_> = repo
            .snapshot()
            .await
            .into_iter()
            .filter(|s| s.teacher_id == "T1" && s.schedule_id == "S1" && s.is_active_at(now))
            .collect();
        assert_eq!(active, vec![second.clone()]);
        assert_ne!(first.session_id, second.session_id);
    }

    #[tokio::test]
    async fn reissue_does_not_touch_other_schedules() {
        let repo = Arc::new(InMemorySessionRepository::new());
        let issuer = issuer_with(repo.clone(), Arc::new(FixedClock::new(T0)));
        let mut other = request(5);
        other.schedule_id = "S2".into();

        issuer.issue(other).await.unwrap();
        issuer.issue(request(5)).await.unwrap();
        issuer.issue(request(5)).await.unwrap();

        assert_eq!(repo.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn load_active_session_picks_greatest_expiry() {
        let repo = Arc::new(InMemorySessionRepository::new());
        let clock = Arc::new(FixedClock::new(T0));
        for (offset, minutes) in [(0, 1), (10, 30), (20, 10)] {
            repo.insert(&AttendanceSession {
                session_id: SessionId::new(),
                teacher_id: "T1".into(),
                schedule_id: "S1".into(),
                subject: "Math".into(),
                section: "A".into(),
                created_at: T0 + offset,
                expires_at: T0 + offset + minutes * 60_000,
                latitude: None,
                longitude: None,
            })
            .await
            .unwrap();
        }
        let issuer = issuer_with(repo, clock.clone());

        clock.advance_ms(2 * 60_000);
        let active = issuer
            .load_active_session("T1", "S1")
            .await
            .unwrap()
            .expect("active");
        assert_eq!(active.expires_at, T0 + 10 + 30 * 60_000);

        clock.advance_ms(60 * 60_000);
        assert!(issuer.load_active_session("T1", "S1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn extend_updates_expiry_without_rotating_id() {
        let repo = Arc::new(InMemorySessionRepository::new());
        let clock = Arc::new(FixedClock::new(T0));
        let issuer = issuer_with(repo.clone(), clock.clone());
        let (session, _) = issuer.issue(request(5)).await.unwrap();

        clock.advance_ms(4 * 60_000);
        let extended = issuer
            .extend_expiration("T1", &session.session_id, 15)
            .await
            .expect("extend");

        assert_eq!(extended.session_id, session.session_id);
        assert_eq!(extended.expires_at, T0 + 4 * 60_000 + 15 * 60_000);
        assert_eq!(repo.snapshot().await[0].expires_at, extended.expires_at);
    }

    #[tokio::test]
    async fn extend_rejects_other_teacher_and_unknown_session() {
        let repo = Arc::new(InMemorySessionRepository::new());
        let issuer = issuer_with(repo, Arc::new(FixedClock::new(T0)));
        let (session, _) = issuer.issue(request(5)).await.unwrap();

        assert_eq!(
            issuer.extend_expiration("T2", &session.session_id, 10).await,
            Err(AttendanceError::TeacherMismatch)
        );
        assert_eq!(
            issuer.extend_expiration("T1", &SessionId::new(), 10).await,
            Err(AttendanceError::SessionNotFound)
        );
    }

    #[tokio::test]
    async fn failed_insert_reports_session_persistence_error() {
        let mut repo = MockSessionRepository::new();
        repo.expect_list_for_schedule()
            .returning(|_, _| Ok(Vec::new()));
        repo.expect_insert()
            .returning(|_| Err(sqlx::Error::PoolTimedOut));
        let issuer = SessionIssuer::new(Arc::new(repo), Arc::new(FixedClock::new(T0)));

        let err = issuer.issue(request(5)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::SessionPersistence(_)));
    }

    #[tokio::test]
    async fn failed_delete_aborts_before_insert() {
        let old = AttendanceSession {
            session_id: SessionId::new(),
            teacher_id: "T1".into(),
            schedule_id: "S1".into(),
            subject: "Math".into(),
            section: "A".into(),
            created_at: T0 - 1,
            expires_at: T0 + 1,
            latitude: None,
            longitude: None,
        };
        let mut repo = MockSessionRepository::new();
        repo.expect_list_for_schedule()
            .returning(move |_, _| Ok(vec![old.clone()]));
        repo.expect_delete()
            .times(1)
            .returning(|_| Err(sqlx::Error::PoolClosed));
        repo.expect_insert().never();
        let issuer = SessionIssuer::new(Arc::new(repo), Arc::new(FixedClock::new(T0)));

        let err = issuer.issue(request(5)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::SessionPersistence(_)));
    }
}
