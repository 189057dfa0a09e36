use thiserror::Error;

/// Everything that can go wrong talking to the account service.
///
/// `InvalidResourcePath` is a construction error and never reaches the
/// network. The rest describe a single failed exchange; none of them are
/// retried.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid resource path '{0}': must start with '/' and not end with '/'")]
    InvalidResourcePath(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to encode request body: {0}")]
    Encode(serde_json::Error),
    #[error("failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request task did not complete")]
    Aborted,
}

impl SyncError {
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
