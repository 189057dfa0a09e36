use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::display::{convert_time, format_distance, format_pace};

use super::SessionRecord;

/// Run log as exchanged with `/users/me/logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    #[serde(rename = "started-at")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "ended-at")]
    pub ended_at: DateTime<Utc>,
    /// Active seconds, excluding pauses. Older logs do not carry it.
    #[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub polyline: String,
    pub distance: f64,
    #[serde(rename = "split-interval", default)]
    pub split_interval: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub splits: Vec<f64>,
    #[serde(default)]
    pub comment: String,
}

// The server writes `null` for a log recorded without splits.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<f64>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RunLog {
    /// Active time when known, else the wall-clock span.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs.unwrap_or_else(|| {
            (self.ended_at - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
        })
    }

    pub fn distance_display(&self) -> String {
        format_distance(self.distance)
    }

    pub fn time_display(&self) -> String {
        convert_time(self.duration_secs())
    }

    pub fn pace_display(&self) -> String {
        format_pace(self.duration_secs(), self.distance)
    }
}

impl From<&SessionRecord> for RunLog {
    fn from(record: &SessionRecord) -> Self {
        Self {
            started_at: record.started_at(),
            ended_at: record.ended_at(),
            duration_secs: record.active_seconds().map(|secs| secs as f64),
            polyline: record.encoded_route().to_string(),
            distance: record.distance(),
            split_interval: record.split_interval_secs(),
            splits: record.splits().to_vec(),
            comment: record.comment().to_string(),
        }
    }
}
