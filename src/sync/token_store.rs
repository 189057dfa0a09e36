use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::time::Instant;

use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

/// Tokens live for an hour upstream; refreshing every half hour keeps one valid.
pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(30 * 60);

/// Kicks off the external sign-in refresh. Fire-and-forget: the new token
/// arrives later through [`TokenStore::set`].
pub trait TokenRefresher: Send + Sync {
    fn request_refresh(&self);
}

impl<F> TokenRefresher for F
where
    F: Fn() + Send + Sync,
{
    fn request_refresh(&self) {
        (self)()
    }
}

/// Used when no sign-in flow is attached (headless runs, tests).
pub struct NoopRefresher;

impl TokenRefresher for NoopRefresher {
    fn request_refresh(&self) {}
}

#[derive(Debug, Default)]
struct TokenState {
    value: String,
    last_refresh: Option<Instant>,
}

/// Current bearer token plus refresh throttling. Every method takes the same
/// lock, so racing requests see a single writer.
pub struct TokenStore {
    state: Mutex<TokenState>,
    cooldown: Duration,
    refresher: Arc<dyn TokenRefresher>,
}

impl TokenStore {
    pub fn new(cooldown: Duration, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            state: Mutex::new(TokenState::default()),
            cooldown,
            refresher,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current token; empty if sign-in never completed.
    pub fn get(&self) -> String {
        self.lock().value.clone()
    }

    pub fn set(&self, value: impl Into<String>) {
        self.lock().value = value.into();
        log_info!("bearer token updated");
    }

    /// Starts a refresh unless one was started within the cooldown. The
    /// timestamp moves before the new token arrives. Returns whether a
    /// refresh was requested.
    pub fn refresh(&self) -> bool {
        {
            let mut state = self.lock();
            let now = Instant::now();

            if let Some(last) = state.last_refresh {
                if now.saturating_duration_since(last) < self.cooldown {
                    log_debug!("token refresh skipped, cooldown active");
                    return false;
                }
            }
            state.last_refresh = Some(now);
        }

        // The refresher may call `set` before returning.
        self.refresher.request_refresh();
        log_info!("token refresh requested");
        true
    }
}
