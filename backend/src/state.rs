use std::sync::Arc;

use crate::{
    config::Config,
    db::connection::DbPool,
    repositories::{
        AttendanceRepository, InMemoryAttendanceRepository, InMemorySessionRepository,
        PgAttendanceRepository, PgSessionRepository, SessionRepository,
    },
    services::{
        AttendanceRecorder, ReportService, RollService, ScanService, ScanValidator,
        SessionIssuer,
    },
    utils::time::{Clock, SystemClock},
};

/// Explicitly constructed service context shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<dyn SessionRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        config: Config,
        sessions: Arc<dyn SessionRepository>,
        attendance: Arc<dyn AttendanceRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            sessions,
            attendance,
            clock,
        }
    }

    pub fn postgres(pool: DbPool, config: Config) -> Self {
        Self::new(
            config,
            Arc::new(PgSessionRepository::new(pool.clone())),
            Arc::new(PgAttendanceRepository::new(pool)),
            Arc::new(SystemClock),
        )
    }

    pub fn in_memory(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            config,
            Arc::new(InMemorySessionRepository::new()),
            Arc::new(InMemoryAttendanceRepository::new()),
            clock,
        )
    }

    pub fn issuer(&self) -> SessionIssuer {
        SessionIssuer::new(self.sessions.clone(), self.clock.clone())
    }

    pub fn validator(&self) -> ScanValidator {
        ScanValidator::new(
            self.sessions.clone(),
            self.attendance.clone(),
            self.clock.clone(),
            self.config.geofence_radius_meters,
        )
    }

    pub fn recorder(&self) -> AttendanceRecorder {
        AttendanceRecorder::new(self.attendance.clone(), self.clock.clone())
    }

    pub fn scan_service(&self) -> ScanService {
        ScanService::new(self.validator(), self.recorder())
    }

    pub fn roll(&self) -> RollService {
        RollService::new(
            self.sessions.clone(),
            self.attendance.clone(),
            self.clock.clone(),
        )
    }

    pub fn reports(&self) -> ReportService {
        ReportService::new(
            self.attendance.clone(),
            self.clock.clone(),
            self.config.time_zone,
        )
    }
}
