//! Read-only views over recorded attendance: a student's own history and a
//! teacher's period summary.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use chrono_tz::Tz;

use crate::error::{AppError, AttendanceError};
use crate::models::attendance::{AttendanceRecord, SummaryFilter, SummaryQuery, SummaryResponse};
use crate::repositories::AttendanceRepository;
use crate::utils::time::{local_date, start_of_day_utc, Clock};

/// Days covered when the caller gives no `from` date.
pub const DEFAULT_SUMMARY_DAYS: u64 = 30;

#[derive(Clone)]
pub struct ReportService {
    attendance: Arc<dyn AttendanceRepository>,
    clock: Arc<dyn Clock>,
    time_zone: Tz,
}

impl ReportService {
    pub fn new(
        attendance: Arc<dyn AttendanceRepository>,
        clock: Arc<dyn Clock>,
        time_zone: Tz,
    ) -> Self {
        Self {
            attendance,
            clock,
            time_zone,
        }
    }

    pub async fn history(&self, user_id: &str) -> Result<Vec<AttendanceRecord>, AppError> {
        self.attendance
            .list_by_user(user_id)
            .await
            .map_err(|e| AttendanceError::attendance_store(e).into())
    }

    /// Counts the teacher's records between two local dates, both inclusive.
    /// `to` defaults to today and `from` to `DEFAULT_SUMMARY_DAYS` before it.
    pub async fn summary(
        &self,
        teacher_id: &str,
        query: SummaryQuery,
    ) -> Result<SummaryResponse, AppError> {
        let to = query
            .to
            .unwrap_or_else(|| local_date(self.clock.now_ms(), &self.time_zone));
        let from = query.from.unwrap_or_else(|| {
            to.checked_sub_days(Days::new(DEFAULT_SUMMARY_DAYS))
                .unwrap_or(NaiveDate::MIN)
        });
        if from > to {
            return Err(AppError::BadRequest("from must not be after to".into()));
        }
        let end = to
            .succ_opt()
            .ok_or_else(|| AppError::BadRequest("to is out of range".into()))?;

        let filter = SummaryFilter {
            teacher_id: teacher_id.to_string(),
            from: start_of_day_utc(from, &self.time_zone),
            to: start_of_day_utc(end, &self.time_zone),
            subject: query.subject.map(|s| s.trim().to_string()),
            section: query.section.map(|s| s.trim().to_string()),
        };
        let counts = self
            .attendance
            .summarize(&filter)
            .await
            .map_err(AttendanceError::attendance_store)?;

        tracing::debug!(
            teacher_id,
            %from,
            %to,
            total = counts.total,
            "Computed attendance summary"
        );
        Ok(SummaryResponse {
            from,
            to,
            attendance_rate: counts.attendance_rate(),
            punctuality_rate: counts.punctuality_rate(),
            counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance::AttendanceSummary;
    use crate::repositories::attendance::MockAttendanceRepository;
    use crate::utils::time::FixedClock;

    // 2023-11-14T22:13:20Z, i.e. 2023-11-15 06:13 in Manila.
    const T0: i64 = 1_700_000_000_000;

    fn service(repo: MockAttendanceRepository) -> ReportService {
        ReportService::new(
            Arc::new(repo),
            Arc::new(FixedClock::new(T0)),
            chrono_tz::Asia::Manila,
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn default_window_ends_with_local_today() {
        let mut repo = MockAttendanceRepository::new();
        repo.expect_summarize()
            .withf(|filter| {
                filter.teacher_id == "T1"
                    && filter.from.to_rfc3339() == "2023-10-15T16:00:00+00:00"
                    && filter.to.to_rfc3339() == "2023-11-15T16:00:00+00:00"
                    && filter.subject.is_none()
            })
            .returning(|_| {
                Ok(AttendanceSummary {
                    total: 4,
                    unique_students: 2,
                    present: 2,
                    late: 1,
                    absent: 1,
                    excused: 0,
                })
            });

        let summary = service(repo)
            .summary("T1", SummaryQuery::default())
            .await
            .expect("summary");
        assert_eq!(summary.from, date(2023, 10, 16));
        assert_eq!(summary.to, date(2023, 11, 15));
        assert_eq!(summary.counts.total, 4);
        assert_eq!(summary.attendance_rate, 75.0);
        assert_eq!(summary.punctuality_rate, 50.0);
    }

    #[tokio::test]
    async fn inverted_range_is_a_bad_request() {
        let mut repo = MockAttendanceRepository::new();
        repo.expect_summarize().never();
        let query = SummaryQuery {
            from: Some(date(2023, 11, 10)),
            to: Some(date(2023, 11, 1)),
            ..SummaryQuery::default()
        };
        let err = service(repo).summary("T1", query).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn history_failure_is_a_persistence_error() {
        let mut repo = MockAttendanceRepository::new();
        repo.expect_list_by_user()
            .returning(|_| Err(sqlx::Error::PoolTimedOut));
        let err = service(repo).history("S1").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Attendance(AttendanceError::Persistence(_))
        ));
    }
}
