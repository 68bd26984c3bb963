//! Geofence math and device location plumbing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AttendanceError;

/// Radius within which a scanner counts as "in the classroom".
pub const GEOFENCE_RADIUS_METERS: f64 = 100.0;

/// Mean Earth radius (IUGG), meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Slack absorbed when comparing against the radius; floating-point noise only.
const DISTANCE_EPSILON_METERS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
    pub timestamp_ms: i64,
}

/// Great-circle distance between two fixes (haversine).
pub fn distance_meters(a: &LocationFix, b: &LocationFix) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

pub fn within_radius(distance_meters: f64, radius_meters: f64) -> bool {
    distance_meters <= radius_meters + DISTANCE_EPSILON_METERS
}

/// Supplies the scanning device's current position.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Result<LocationFix, AttendanceError>;
}

/// Location the scanning client attached to its request.
#[derive(Debug, Clone, Copy)]
pub struct ReportedLocation {
    fix: Option<LocationFix>,
    services_enabled: bool,
}

impl ReportedLocation {
    pub fn new(fix: Option<LocationFix>, services_enabled: bool) -> Self {
        Self {
            fix,
            services_enabled,
        }
    }

    pub fn fixed(fix: LocationFix) -> Self {
        Self::new(Some(fix), true)
    }

    pub fn unavailable() -> Self {
        Self::new(None, false)
    }
}

#[async_trait]
impl LocationProvider for ReportedLocation {
    async fn current_location(&self) -> Result<LocationFix, AttendanceError> {
        if !self.services_enabled {
            return Err(AttendanceError::LocationUnavailable);
        }
        let fix = self.fix.ok_or(AttendanceError::LocationUnavailable)?;
        if !fix.latitude.is_finite() || !fix.longitude.is_finite() {
            return Err(AttendanceError::LocationUnavailable);
        }
        Ok(fix)
    }
}
