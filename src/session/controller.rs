use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    clock::{Clock, ElapsedTicks},
    display::{convert_time, format_distance, format_pace},
    models::{DistanceUnit, SessionError, SessionRecord, TimeSpan},
    route::{LocationFix, RouteAccumulator},
    sync::{SyncClient, SyncError},
};
use crate::{log_error, log_info, log_warn};

use super::{ControllerState, SessionState};

const ENABLE_LOGS: bool = true;

/// Destination for finished runs.
#[async_trait]
pub trait SessionUploader: Send + Sync {
    async fn upload(&self, record: &SessionRecord) -> Result<(), SyncError>;
}

#[async_trait]
impl SessionUploader for SyncClient {
    async fn upload(&self, record: &SessionRecord) -> Result<(), SyncError> {
        self.upload_session(record).await
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("could not package run: {0}")]
    Build(#[from] SessionError),
    #[error("could not upload run: {0}")]
    Upload(#[from] SyncError),
}

/// Outcome of one finished session. Delivered exactly once per session, and
/// once more per manual retry.
#[derive(Debug)]
pub struct Completion {
    pub session_id: Uuid,
    pub result: Result<SessionRecord, CompletionError>,
}

impl Completion {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

pub type CompletionListener = Arc<dyn Fn(Completion) + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub session_id: Option<Uuid>,
    pub elapsed_seconds: u64,
    pub distance: f64,
    pub unit: DistanceUnit,
    pub time: String,
    pub distance_text: String,
    pub pace: String,
    pub has_failed_upload: bool,
}

/// Drives a run from `start` to `stop`.
///
/// Invalid transitions are no-ops. `stop` returns to `Idle` without waiting
/// for the upload; its outcome goes to the completion listener.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<ControllerState>>,
    clock: Clock,
    route: Arc<RouteAccumulator>,
    uploader: Arc<dyn SessionUploader>,
    listener: CompletionListener,
    unit: DistanceUnit,
    split_interval_secs: Option<f64>,
}

impl SessionController {
    pub fn new(
        uploader: Arc<dyn SessionUploader>,
        listener: CompletionListener,
        tick_interval: Duration,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControllerState::default())),
            clock: Clock::new(tick_interval),
            route: Arc::new(RouteAccumulator::new()),
            uploader,
            listener,
            unit: DistanceUnit::default(),
            split_interval_secs: None,
        }
    }

    pub fn with_unit(mut self, unit: DistanceUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Records per-interval splits on every finished run.
    pub fn with_split_interval(mut self, interval_secs: f64) -> Self {
        self.split_interval_secs = Some(interval_secs);
        self
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.status
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Elapsed-time stream for the display. It ends when the session pauses
    /// or stops, on the last running value; after `stop` the zeroed clock is
    /// read from [`Self::snapshot`], and after a resume the display
    /// subscribes again.
    pub fn subscribe_elapsed(&self) -> ElapsedTicks {
        self.clock.subscribe()
    }

    pub async fn start(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.status != SessionState::Idle {
            log_warn!("start ignored while {:?}", state.status);
            return false;
        }

        let session_id = Uuid::new_v4();
        state.begin_session(session_id, Utc::now());
        self.route.reset();
        self.route.set_recording(true);
        self.clock.start().await;
        log_info!("session {} started", session_id);
        true
    }

    pub async fn pause(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.status != SessionState::Running {
            return false;
        }

        self.route.set_recording(false);
        self.clock.stop().await;
        state.status = SessionState::Paused;
        log_info!("session paused");
        true
    }

    pub async fn resume(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.status != SessionState::Paused {
            return false;
        }

        self.clock.start().await;
        self.route.set_recording(true);
        state.status = SessionState::Running;
        log_info!("session resumed");
        true
    }

    /// Single pause/resume control. Returns the new state, or `None` when the
    /// session is neither running nor paused.
    pub async fn pause_resume(&self) -> Option<SessionState> {
        let current = self.state().await;
        let changed = match current {
            SessionState::Running => self.pause().await,
            SessionState::Paused => self.resume().await,
            _ => false,
        };
        if changed {
            Some(self.state().await)
        } else {
            None
        }
    }

    /// Feeds one fix from the location source. Safe to call from any thread.
    pub fn on_location(&self, fix: LocationFix) -> bool {
        self.route.append(fix)
    }

    /// Ends the session and hands the record to the uploader.
    ///
    /// Accepted from `Running` or `Paused`. Returns the record that was
    /// submitted, or `None` for a no-op or a record that failed to build.
    pub async fn stop(&self) -> Option<SessionRecord> {
        let (session_id, built) = {
            let mut state = self.state.lock().await;
            if !state.status.is_active() {
                log_warn!("stop ignored while {:?}", state.status);
                return None;
            }
            state.status = SessionState::Finished;

            self.route.set_recording(false);
            self.clock.stop().await;
            let active_seconds = self.clock.elapsed_seconds().await;

            let ended_at = Utc::now();
            let started_at = state.started_at.unwrap_or(ended_at).min(ended_at);
            let session_id = state.session_id.unwrap_or_else(Uuid::new_v4);
            let built = self.package(started_at, ended_at, active_seconds);

            self.clock.reset().await;
            self.route.reset();
            state.finish();
            (session_id, built)
        };

        match built {
            Ok(record) => {
                log_info!(
                    "session {} finished: {:.2} {} in {}s",
                    session_id,
                    record.distance(),
                    record.unit().as_str(),
                    record.active_seconds().unwrap_or_default()
                );
                self.spawn_upload(session_id, record.clone());
                Some(record)
            }
            Err(err) => {
                log_error!("session {} could not be packaged: {}", session_id, err);
                (self.listener)(Completion {
                    session_id,
                    result: Err(err.into()),
                });
                None
            }
        }
    }

    fn package(
        &self,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        active_seconds: u64,
    ) -> Result<SessionRecord, SessionError> {
        let time_span = TimeSpan::new(started_at, ended_at)?;
        let mut builder = SessionRecord::builder(time_span, self.route.fixes())
            .unit(self.unit)
            .distance(self.unit.from_meters(self.route.distance_meters()))
            .active_seconds(active_seconds);
        if let Some(interval) = self.split_interval_secs {
            builder = builder.split_every(interval);
        }
        builder.build()
    }

    /// Re-submits the last run whose upload failed. Returns `false` when
    /// there is nothing to retry.
    pub async fn retry_upload(&self) -> bool {
        let pending = self.state.lock().await.failed_upload.take();
        match pending {
            Some((session_id, record)) => {
                log_info!("retrying upload for session {}", session_id);
                self.spawn_upload(session_id, record);
                true
            }
            None => false,
        }
    }

    pub async fn has_failed_upload(&self) -> bool {
        self.state.lock().await.failed_upload.is_some()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        let elapsed_seconds = self.clock.elapsed_seconds().await;
        let distance = self.unit.from_meters(self.route.distance_meters());
        SessionSnapshot {
            state: state.status,
            session_id: state.session_id,
            elapsed_seconds,
            distance,
            unit: self.unit,
            time: convert_time(elapsed_seconds as f64),
            distance_text: format_distance(distance),
            pace: format_pace(elapsed_seconds as f64, distance),
            has_failed_upload: state.failed_upload.is_some(),
        }
    }

    fn spawn_upload(&self, session_id: Uuid, record: SessionRecord) {
        let uploader = self.uploader.clone();
        let listener = self.listener.clone();
        let state = self.state.clone();

        tokio::spawn(async move {
            let result = match uploader.upload(&record).await {
                Ok(()) => {
                    log_info!("session {} uploaded", session_id);
                    Ok(record)
                }
                Err(err) => {
                    log_error!("session {} upload failed: {}", session_id, err);
                    state.lock().await.failed_upload = Some((session_id, record));
                    Err(CompletionError::Upload(err))
                }
            };
            listener(Completion { session_id, result });
        });
    }
}
