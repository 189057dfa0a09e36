use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::route::{self, LocationFix, RouteError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session ended at {ended_at} before it started at {started_at}")]
    InvalidTimeSpan {
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    },
    #[error("split interval must be a positive number of seconds, got {0}")]
    InvalidSplitInterval(f64),
    #[error("a split every {interval_secs}s gives more than {max} splits for this session")]
    TooManySplits { interval_secs: f64, max: usize },
    #[error("expected {expected} splits for this session, got {actual}")]
    SplitCountMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Route(#[from] RouteError),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DistanceUnit {
    #[default]
    Miles,
    Meters,
}

impl DistanceUnit {
    pub fn from_meters(self, meters: f64) -> f64 {
        match self {
            DistanceUnit::Miles => route::meters_to_miles(meters),
            DistanceUnit::Meters => meters,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceUnit::Miles => "mi",
            DistanceUnit::Meters => "m",
        }
    }
}

/// Wall-clock bounds of a session. Includes any paused spans.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSpan {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl TimeSpan {
    pub fn new(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> Result<Self, SessionError> {
        if ended_at < started_at {
            return Err(SessionError::InvalidTimeSpan {
                started_at,
                ended_at,
            });
        }
        Ok(Self {
            started_at,
            ended_at,
        })
    }

    pub fn duration_secs(&self) -> f64 {
        (self.ended_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Distance covered in each consecutive `interval_secs` window.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Splits {
    pub interval_secs: f64,
    pub values: Vec<f64>,
}

/// Upper bound on split windows per session (a day at 10 s splits).
pub const MAX_SPLITS: usize = 8_640;

impl Splits {
    /// Number of windows a session of `duration_secs` is cut into.
    pub fn expected_len(duration_secs: f64, interval_secs: f64) -> usize {
        (duration_secs / interval_secs).ceil().max(0.0) as usize
    }

    /// Buckets each leg of `route` by the timestamp of the fix that ends it.
    pub fn compute(
        route: &[LocationFix],
        span: &TimeSpan,
        interval_secs: f64,
        unit: DistanceUnit,
    ) -> Result<Self, SessionError> {
        let len = checked_len(span, interval_secs)?;
        let mut values = vec![0.0; len];
        if len > 0 {
            let start_ms = span.started_at.timestamp_millis();
            for pair in route.windows(2) {
                let offset_secs = (pair[1].timestamp_ms - start_ms) as f64 / 1000.0;
                let window = (offset_secs / interval_secs).floor().max(0.0) as usize;
                let bucket = window.min(len - 1);
                let leg = route::haversine_distance(
                    pair[0].latitude,
                    pair[0].longitude,
                    pair[1].latitude,
                    pair[1].longitude,
                );
                values[bucket] += unit.from_meters(leg);
            }
        }

        Ok(Self {
            interval_secs,
            values,
        })
    }

    fn validate(&self, span: &TimeSpan) -> Result<(), SessionError> {
        if self.values.is_empty() {
            return Ok(());
        }
        let expected = checked_len(span, self.interval_secs)?;
        if self.values.len() != expected {
            return Err(SessionError::SplitCountMismatch {
                expected,
                actual: self.values.len(),
            });
        }
        Ok(())
    }
}

/// Window count for `span`, checked before anything is allocated.
fn checked_len(span: &TimeSpan, interval_secs: f64) -> Result<usize, SessionError> {
    if !(interval_secs.is_finite() && interval_secs > 0.0) {
        return Err(SessionError::InvalidSplitInterval(interval_secs));
    }
    let windows = (span.duration_secs() / interval_secs).ceil();
    if windows > MAX_SPLITS as f64 {
        return Err(SessionError::TooManySplits {
            interval_secs,
            max: MAX_SPLITS,
        });
    }
    Ok(Splits::expected_len(span.duration_secs(), interval_secs))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SplitPlan {
    #[default]
    None,
    /// Splits measured elsewhere; checked against the session duration.
    Provided(Splits),
    /// Derive splits from the route at this interval (seconds).
    Every(f64),
}

/// Everything needed to produce a [`SessionRecord`]. The time span and route
/// are required fields, so a record can never be built without them.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub time_span: TimeSpan,
    pub route: Vec<LocationFix>,
    pub unit: DistanceUnit,
    /// Distance already measured by the caller, in `unit`. Recomputed from
    /// the route when absent.
    pub distance: Option<f64>,
    /// Running time with pauses excluded, when known.
    pub active_seconds: Option<u64>,
    pub splits: SplitPlan,
    pub comment: String,
}

impl SessionConfig {
    pub fn new(time_span: TimeSpan, route: Vec<LocationFix>) -> Self {
        Self {
            time_span,
            route,
            unit: DistanceUnit::default(),
            distance: None,
            active_seconds: None,
            splits: SplitPlan::None,
            comment: String::new(),
        }
    }
}

/// A completed run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    time_span: TimeSpan,
    encoded_route: String,
    distance: f64,
    unit: DistanceUnit,
    active_seconds: Option<u64>,
    splits: Splits,
    comment: String,
}

impl SessionRecord {
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let SessionConfig {
            time_span,
            route,
            unit,
            distance,
            active_seconds,
            splits,
            comment,
        } = config;

        let encoded_route = route::polyline::encode(&route)?;
        let distance = distance
            .filter(|d| d.is_finite())
            .unwrap_or_else(|| unit.from_meters(route::path_length_m(&route)))
            .max(0.0);

        let splits = match splits {
            SplitPlan::None => Splits::default(),
            SplitPlan::Provided(provided) => {
                provided.validate(&time_span)?;
                provided
            }
            SplitPlan::Every(interval) => Splits::compute(&route, &time_span, interval, unit)?,
        };

        Ok(Self {
            time_span,
            encoded_route,
            distance,
            unit,
            active_seconds,
            splits,
            comment,
        })
    }

    pub fn builder(time_span: TimeSpan, route: Vec<LocationFix>) -> SessionRecordBuilder {
        SessionRecordBuilder {
            config: SessionConfig::new(time_span, route),
        }
    }

    pub fn time_span(&self) -> &TimeSpan {
        &self.time_span
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.time_span.started_at
    }

    pub fn ended_at(&self) -> DateTime<Utc> {
        self.time_span.ended_at
    }

    pub fn encoded_route(&self) -> &str {
        &self.encoded_route
    }

    /// Distance in [`Self::unit`].
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn unit(&self) -> DistanceUnit {
        self.unit
    }

    pub fn active_seconds(&self) -> Option<u64> {
        self.active_seconds
    }

    pub fn split_interval_secs(&self) -> f64 {
        self.splits.interval_secs
    }

    pub fn splits(&self) -> &[f64] {
        &self.splits.values
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }
}

/// Fluent front for [`SessionConfig`]; required inputs go in `builder()`.
#[derive(Debug, Clone)]
pub struct SessionRecordBuilder {
    config: SessionConfig,
}

impl SessionRecordBuilder {
    pub fn unit(mut self, unit: DistanceUnit) -> Self {
        self.config.unit = unit;
        self
    }

    pub fn meters(self) -> Self {
        self.unit(DistanceUnit::Meters)
    }

    pub fn distance(mut self, distance: f64) -> Self {
        self.config.distance = Some(distance);
        self
    }

    pub fn active_seconds(mut self, seconds: u64) -> Self {
        self.config.active_seconds = Some(seconds);
        self
    }

    pub fn splits(mut self, interval_secs: f64, values: Vec<f64>) -> Self {
        self.config.splits = SplitPlan::Provided(Splits {
            interval_secs,
            values,
        });
        self
    }

    pub fn split_every(mut self, interval_secs: f64) -> Self {
        self.config.splits = SplitPlan::Every(interval_secs);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.config.comment = comment.into();
        self
    }

    pub fn build(self) -> Result<SessionRecord, SessionError> {
        SessionRecord::new(self.config)
    }
}
