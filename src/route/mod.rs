pub mod geodesy;
pub mod polyline;

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use geodesy::{haversine_distance, meters_to_miles, path_length_m};

/// One GPS sample as delivered by the location feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_ms: i64,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
        }
    }

    /// Finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("failed to encode route: {0}")]
    Encode(String),
    #[error("failed to decode route: {0}")]
    Decode(String),
}

#[derive(Debug, Default)]
struct RouteInner {
    recording: bool,
    fixes: Vec<LocationFix>,
    /// Running path length, extended on every append.
    length_m: f64,
}

/// Collects fixes for the active session.
///
/// `append` is called from whatever thread the location feed delivers on,
/// `reset` and `set_recording` from the session controller; both go through
/// the same lock.
#[derive(Debug, Default)]
pub struct RouteAccumulator {
    inner: Mutex<RouteInner>,
}

impl RouteAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RouteInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fixes are only kept while recording (the session is running).
    pub fn set_recording(&self, recording: bool) {
        self.lock().recording = recording;
    }

    pub fn is_recording(&self) -> bool {
        self.lock().recording
    }

    /// Appends `fix` if recording and valid. Returns whether it was kept.
    pub fn append(&self, fix: LocationFix) -> bool {
        let mut inner = self.lock();
        if !inner.recording || !fix.is_valid() {
            return false;
        }

        if let Some(last) = inner.fixes.last() {
            let leg =
                haversine_distance(last.latitude, last.longitude, fix.latitude, fix.longitude);
            inner.length_m += leg;
        }
        inner.fixes.push(fix);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().fixes.is_empty()
    }

    /// Copy of the fixes recorded so far.
    pub fn fixes(&self) -> Vec<LocationFix> {
        self.lock().fixes.clone()
    }

    pub fn distance_meters(&self) -> f64 {
        self.lock().length_m
    }

    pub fn distance_miles(&self) -> f64 {
        meters_to_miles(self.distance_meters())
    }

    pub fn encode(&self) -> Result<String, RouteError> {
        self::polyline::encode(&self.lock().fixes)
    }

    /// Clears the route and stops recording.
    pub fn reset(&self) {
        *self.lock() = RouteInner::default();
    }
}
