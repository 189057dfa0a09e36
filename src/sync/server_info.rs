use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::SyncError;

pub const API_V1_PREFIX: &str = "/api/v1";

/// Where the account service lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub host: String,
    pub port: u16,
}

impl Default for ApiEndpoint {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8000,
        }
    }
}

impl ApiEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `http://<host>:<port>/api/v1`
    pub fn v1_base(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, API_V1_PREFIX)
    }

    /// URL of a v1 resource such as `/users/me`.
    ///
    /// The path must begin with `/` and must not end with `/`.
    pub fn v1_resource_url(&self, resource: &str) -> Result<Url, SyncError> {
        if !resource.starts_with('/') || resource.ends_with('/') {
            return Err(SyncError::InvalidResourcePath(resource.to_string()));
        }

        Url::parse(&format!("{}{}", self.v1_base(), resource))
            .map_err(|_| SyncError::InvalidResourcePath(resource.to_string()))
    }
}
