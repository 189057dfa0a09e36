use std::{
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Duration,
};

use serde::Serialize;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::display::convert_time;
use crate::{log_debug, log_info};

use super::ClockState;

const ENABLE_LOGS: bool = true;

/// One elapsed-time notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElapsedTick {
    pub elapsed_seconds: u64,
    pub formatted: String,
}

impl ElapsedTick {
    fn new(elapsed_seconds: u64) -> Self {
        Self {
            elapsed_seconds,
            formatted: convert_time(elapsed_seconds as f64),
        }
    }
}

/// Receiving end of a clock subscription. Yields ticks while the clock runs
/// and returns `None` once it is stopped or reset.
pub type ElapsedTicks = mpsc::UnboundedReceiver<ElapsedTick>;

type Subscribers = Arc<StdMutex<Vec<mpsc::UnboundedSender<ElapsedTick>>>>;

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Measures running time and publishes it on a fixed cadence.
///
/// The clock only emits values; marshalling them onto whatever thread owns
/// the display is the subscriber's job. `start` spawns the ticker with
/// `tokio::spawn`, so it must be called from within a runtime. Clones share
/// one clock; `start`, `stop` and `reset` may race freely between them.
#[derive(Clone)]
pub struct Clock {
    state: Arc<Mutex<ClockState>>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    subscribers: Subscribers,
    tick_interval: Duration,
}

impl Clock {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ClockState::new())),
            ticker: Arc::new(Mutex::new(None)),
            subscribers: Arc::new(StdMutex::new(Vec::new())),
            tick_interval,
        }
    }

    /// Registers for ticks. The stream ends at the next `stop` or `reset`, so
    /// a display that survives a pause subscribes again after resuming.
    pub fn subscribe(&self) -> ElapsedTicks {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.running
    }

    pub async fn elapsed_seconds(&self) -> u64 {
        self.state.lock().await.elapsed_seconds(Instant::now())
    }

    /// Begins a running segment. No-op (returns `false`) if already running.
    pub async fn start(&self) -> bool {
        let mut ticker = self.ticker.lock().await;
        {
            let mut state = self.state.lock().await;
            if !state.begin_segment(Instant::now()) {
                return false;
            }
        }

        self.replace_ticker(&mut ticker);
        log_info!("clock started");
        true
    }

    /// Closes the running segment and ends current subscriptions after a final
    /// tick. No-op (returns `false`) if not running.
    pub async fn stop(&self) -> bool {
        let mut ticker = self.ticker.lock().await;
        let elapsed = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            if !state.end_segment(now) {
                return false;
            }
            state.elapsed_seconds(now)
        };

        cancel_ticker(&mut ticker);
        publish(&self.subscribers, &ElapsedTick::new(elapsed));
        close_subscriptions(&self.subscribers);
        log_info!("clock stopped at {}s", elapsed);
        true
    }

    /// Stops the clock if needed, zeroes it and emits a single `00:00` tick.
    pub async fn reset(&self) {
        let mut ticker = self.ticker.lock().await;
        {
            let mut state = self.state.lock().await;
            state.end_segment(Instant::now());
            state.reset();
        }

        cancel_ticker(&mut ticker);
        publish(&self.subscribers, &ElapsedTick::new(0));
        close_subscriptions(&self.subscribers);
        log_info!("clock reset");
    }

    // Callers hold the ticker lock across their state change, so a racing
    // `stop` can never cancel a ticker that belongs to a newer segment.
    fn replace_ticker(&self, slot: &mut Option<Ticker>) {
        cancel_ticker(slot);

        let state = self.state.clone();
        let subscribers = self.subscribers.clone();
        let tick_interval = self.tick_interval;
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let elapsed = {
                    let guard = state.lock().await;
                    if !guard.running {
                        break;
                    }
                    guard.elapsed_seconds(Instant::now())
                };

                log_debug!("tick {}s", elapsed);
                publish(&subscribers, &ElapsedTick::new(elapsed));
            }
        });

        *slot = Some(Ticker { handle, cancel });
    }
}

fn cancel_ticker(slot: &mut Option<Ticker>) {
    if let Some(ticker) = slot.take() {
        ticker.cancel.cancel();
        ticker.handle.abort();
    }
}

/// Sends to every live subscriber, dropping the ones whose receiver is gone.
fn publish(subscribers: &Subscribers, tick: &ElapsedTick) {
    let mut guard = subscribers.lock().unwrap_or_else(PoisonError::into_inner);
    guard.retain(|tx| tx.send(tick.clone()).is_ok());
}

fn close_subscriptions(subscribers: &Subscribers) {
    subscribers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}
