use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DistanceUnit;

/// Profile returned by `/users/me` and `POST /users`. The server omits empty
/// fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(rename = "uses-metric", default)]
    pub uses_metric: bool,
}

impl UserPreferences {
    pub fn distance_unit(&self) -> DistanceUnit {
        if self.uses_metric {
            DistanceUnit::Meters
        } else {
            DistanceUnit::Miles
        }
    }
}

/// Body the server attaches to failed requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: String,
}
