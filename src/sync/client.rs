use std::sync::Arc;

use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tokio::{sync::Mutex, task::JoinHandle};

use crate::models::{Account, ErrorResponse, RunLog, SessionRecord, UserPreferences};
use crate::{log_debug, log_info, log_warn};

use super::{ApiEndpoint, SyncError, TokenStore};

const ENABLE_LOGS: bool = true;

/// Raw outcome of one exchange, whatever the status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SyncError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Folds a non-success response into a `SyncError::Status`, using the
    /// server's error message when the body carries one.
    pub fn into_error(self) -> SyncError {
        let message = serde_json::from_str::<ErrorResponse>(&self.body)
            .ok()
            .map(|err| err.message)
            .filter(|message| !message.is_empty())
            .unwrap_or(self.body);
        SyncError::Status {
            status: self.status,
            message,
        }
    }

    fn expect_status(self, status: u16) -> Result<Self, SyncError> {
        if self.status == status {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }
}

/// An exchange that has been handed to a worker task. The staging lock is
/// held until the exchange completes, not until the result is read.
#[derive(Debug)]
pub struct PendingRequest {
    handle: JoinHandle<Result<ApiResponse, SyncError>>,
}

impl PendingRequest {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the exchange. This is the only point where a caller blocks
    /// on network I/O.
    pub async fn response(self) -> Result<ApiResponse, SyncError> {
        self.handle.await.map_err(|_| SyncError::Aborted)?
    }
}

/// Client for the account service.
///
/// Requests are staged one at a time: staging a second request waits until
/// the first exchange has finished. There is no queue, no retry and no
/// timeout.
#[derive(Clone)]
pub struct SyncClient {
    http: Client,
    endpoint: ApiEndpoint,
    tokens: Arc<TokenStore>,
    stage_lock: Arc<Mutex<()>>,
}

impl SyncClient {
    pub fn new(endpoint: ApiEndpoint, tokens: Arc<TokenStore>) -> Self {
        Self {
            http: Client::new(),
            endpoint,
            tokens,
            stage_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn endpoint(&self) -> &ApiEndpoint {
        &self.endpoint
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Stages a request without a body.
    pub async fn stage(
        &self,
        method: Method,
        resource: &str,
    ) -> Result<PendingRequest, SyncError> {
        self.stage_inner(method, resource, None).await
    }

    /// Stages a request with `body` encoded as JSON.
    pub async fn stage_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        resource: &str,
        body: &B,
    ) -> Result<PendingRequest, SyncError> {
        let body = serde_json::to_string(body).map_err(SyncError::Encode)?;
        self.stage_inner(method, resource, Some(body)).await
    }

    async fn stage_inner(
        &self,
        method: Method,
        resource: &str,
        body: Option<String>,
    ) -> Result<PendingRequest, SyncError> {
        let url = self.endpoint.v1_resource_url(resource)?;

        let permit = self.stage_lock.clone().lock_owned().await;
        self.tokens.refresh();

        let mut request = self
            .http
            .request(method.clone(), url)
            .bearer_auth(self.tokens.get());
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        log_debug!("staged {} {}", method, resource);
        let resource = resource.to_string();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            let result = exchange(request).await;
            match &result {
                Ok(response) => log_info!("{} {} -> {}", method, resource, response.status),
                Err(err) => log_warn!("{} {} failed: {}", method, resource, err),
            }
            result
        });

        Ok(PendingRequest { handle })
    }

    /// `GET /users/me`; any status but 200 is an error.
    pub async fn fetch_account(&self) -> Result<Account, SyncError> {
        let response = self.stage(Method::GET, "/users/me").await?.response().await?;
        response.expect_status(200)?.json()
    }

    /// `POST /users`; the server answers 201 with the new account.
    pub async fn create_account(&self) -> Result<Account, SyncError> {
        let response = self.stage(Method::POST, "/users").await?.response().await?;
        response.expect_status(201)?.json()
    }

    /// Fetches the profile, registering the user when the server does not
    /// know them. Transport failures are returned as-is.
    pub async fn get_or_create_account(&self) -> Result<Account, SyncError> {
        match self.fetch_account().await {
            Err(SyncError::Status { status, .. }) => {
                log_info!("account lookup returned {}, creating account", status);
                self.create_account().await
            }
            other => other,
        }
    }

    pub async fn fetch_preferences(&self) -> Result<UserPreferences, SyncError> {
        let response = self
            .stage(Method::GET, "/users/me/preferences")
            .await?
            .response()
            .await?;
        response.expect_status(200)?.json()
    }

    /// `POST /users/me/logs`. Only the status matters.
    pub async fn post_run_log(&self, log: &RunLog) -> Result<(), SyncError> {
        let response = self
            .stage_json(Method::POST, "/users/me/logs", log)
            .await?
            .response()
            .await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(response.into_error())
        }
    }

    pub async fn upload_session(&self, record: &SessionRecord) -> Result<(), SyncError> {
        self.post_run_log(&RunLog::from(record)).await
    }

    /// `GET /users/me/logs`. A user without logs gets an empty list.
    pub async fn list_run_logs(&self) -> Result<Vec<RunLog>, SyncError> {
        let response = self
            .stage(Method::GET, "/users/me/logs")
            .await?
            .response()
            .await?;
        let logs: Option<Vec<RunLog>> = response.expect_status(200)?.json()?;
        Ok(logs.unwrap_or_default())
    }
}

async fn exchange(request: RequestBuilder) -> Result<ApiResponse, SyncError> {
    let response = request.send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(ApiResponse { status, body })
}
