use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use validator::Validate;

use crate::types::{AttendanceId, SessionId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Late,
    Absent,
    Excused,
}

impl AttendanceStatus {
    pub fn db_value(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Late => "LATE",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::Excused => "EXCUSED",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PRESENT" => Ok(AttendanceStatus::Present),
            "LATE" => Ok(AttendanceStatus::Late),
            "ABSENT" => Ok(AttendanceStatus::Absent),
            "EXCUSED" => Ok(AttendanceStatus::Excused),
            other => Err(format!("unknown attendance status: {other}")),
        }
    }
}

/// One student's presence in one session. Unique on `(user_id, session_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub user_id: String,
    pub student_name: String,
    pub session_id: SessionId,
    pub teacher_id: String,
    pub schedule_id: String,
    pub subject: String,
    pub section: String,
    pub timestamp: DateTime<Utc>,
    pub status: AttendanceStatus,
    pub location: String,
    pub notes: String,
}

/// Raw `attendance` row; status is stored as TEXT.
#[derive(Debug, FromRow)]
pub(crate) struct AttendanceRow {
    pub id: AttendanceId,
    pub user_id: String,
    pub student_name: String,
    pub session_id: SessionId,
    pub teacher_id: String,
    pub schedule_id: String,
    pub subject: String,
    pub section: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub location: String,
    pub notes: String,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = sqlx::Error;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
        Ok(AttendanceRecord {
            id: row.id,
            user_id: row.user_id,
            student_name: row.student_name,
            session_id: row.session_id,
            teacher_id: row.teacher_id,
            schedule_id: row.schedule_id,
            subject: row.subject,
            section: row.section,
            timestamp: row.timestamp,
            status,
            location: row.location,
            notes: row.notes,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateAttendanceRequest {
    pub status: AttendanceStatus,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ManualAttendanceRequest {
    #[validate(length(min = 1, max = 128))]
    pub student_id: String,
    #[validate(length(min = 1, max = 200))]
    pub student_name: String,
    #[serde(default)]
    pub status: AttendanceStatus,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Record counts over one teacher's roll for a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AttendanceSummary {
    pub total: i64,
    pub unique_students: i64,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    pub excused: i64,
}

impl AttendanceSummary {
    pub fn tally(&mut self, record: &AttendanceRecord) {
        self.total += 1;
        match record.status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Excused => self.excused += 1,
        }
    }

    /// Present or late, as a percentage of all records.
    pub fn attendance_rate(&self) -> f64 {
        percent(self.present + self.late, self.total)
    }

    /// Present only, as a percentage of all records.
    pub fn punctuality_rate(&self) -> f64 {
        percent(self.present, self.total)
    }
}

fn percent(part: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Which records a summary covers. `to` is exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryFilter {
    pub teacher_id: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub subject: Option<String>,
    /// Compared case-insensitively.
    pub section: Option<String>,
}

impl SummaryFilter {
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        record.teacher_id == self.teacher_id
            && record.timestamp >= self.from
            && record.timestamp < self.to
            && self.subject.as_ref().map_or(true, |s| *s == record.subject)
            && self
                .section
                .as_ref()
                .map_or(true, |s| s.eq_ignore_ascii_case(&record.section))
    }
}

/// Query string for `GET /api/attendance/summary`. Dates are local calendar
/// days and both ends are inclusive.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SummaryQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[validate(length(min = 1, max = 200))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub section: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(flatten)]
    pub counts: AttendanceSummary,
    pub attendance_rate: f64,
    pub punctuality_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attendance_status_serde_uses_upper_case() {
        let s: AttendanceStatus = serde_json::from_str("\"EXCUSED\"").unwrap();
        assert_eq!(s, AttendanceStatus::Excused);
        let v = serde_json::to_value(AttendanceStatus::Late).unwrap();
        assert_eq!(v, serde_json::json!("LATE"));
    }

    #[test]
    fn row_with_unknown_status_fails_to_convert() {
        let row = AttendanceRow {
            id: AttendanceId::new(),
            user_id: "u".into(),
            student_name: "n".into(),
            session_id: SessionId::new(),
            teacher_id: "t".into(),
            schedule_id: "s".into(),
            subject: "Math".into(),
            section: "A".into(),
            timestamp: Utc::now(),
            status: "HALF_DAY".into(),
            location: String::new(),
            notes: String::new(),
        };
        assert!(AttendanceRecord::try_from(row).is_err());
    }

    #[test]
    fn manual_request_defaults_to_present() {
        let req: ManualAttendanceRequest =
            serde_json::from_str(r#"{"student_id":"S1","student_name":"Ana"}"#).unwrap();
        assert_eq!(req.status, AttendanceStatus::Present);
    }

    #[test]
    fn summary_rates_follow_status_counts() {
        let summary = AttendanceSummary {
            total: 8,
            unique_students: 3,
            present: 4,
            late: 2,
            absent: 1,
            excused: 1,
        };
        assert_eq!(summary.attendance_rate(), 75.0);
        assert_eq!(summary.punctuality_rate(), 50.0);
        assert_eq!(AttendanceSummary::default().attendance_rate(), 0.0);
    }

    #[test]
    fn manual_request_requires_student_identity() {
        let req = ManualAttendanceRequest {
            student_id: String::new(),
            student_name: "Ana".into(),
            status: AttendanceStatus::Late,
            notes: None,
        };
        assert!(req.validate().is_err());
    }
}
