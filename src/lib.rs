pub mod clock;
pub mod display;
pub mod models;
pub mod route;
pub mod session;
pub mod settings;
pub mod sync;
mod utils;

use std::{fs, path::Path, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use tokio::sync::mpsc;

use route::LocationFix;
use session::{Completion, CompletionListener, SessionController};
use settings::{ClientSettings, SettingsStore};
use sync::{SyncClient, TokenRefresher, TokenStore};

/// Everything a session needs, built once and passed down.
#[derive(Clone)]
pub struct AppContext {
    pub settings: ClientSettings,
    pub tokens: Arc<TokenStore>,
    pub client: SyncClient,
}

impl AppContext {
    pub fn new(settings: ClientSettings, refresher: Arc<dyn TokenRefresher>) -> Self {
        let tokens = Arc::new(TokenStore::new(
            settings.token_refresh_cooldown(),
            refresher,
        ));
        let client = SyncClient::new(settings.server.clone(), tokens.clone());
        Self {
            settings,
            tokens,
            client,
        }
    }

    /// A controller that uploads through this context's client.
    pub fn session_controller(&self, listener: CompletionListener) -> SessionController {
        SessionController::new(
            Arc::new(self.client.clone()),
            listener,
            self.settings.tick_interval(),
        )
        .with_unit(self.settings.distance_unit)
    }
}

/// Reads a JSON array of fixes, e.g. `[{"latitude":..,"longitude":..,"timestampMs":..}]`.
pub fn load_fixes(path: &Path) -> Result<Vec<LocationFix>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixes from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Malformed fixes in {}", path.display()))
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Cadtra starting up...");

    let Some(fixes_path) = std::env::args().nth(1).map(PathBuf::from) else {
        bail!("usage: cadtra <fixes.json>");
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(replay(fixes_path))
}

async fn replay(fixes_path: PathBuf) -> Result<()> {
    let settings_path = std::env::var("CADTRA_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("settings.json"));
    let settings = SettingsStore::new(settings_path)?.settings();
    let fixes = load_fixes(&fixes_path)?;

    let refresher: Arc<dyn TokenRefresher> =
        Arc::new(|| warn!("token refresh requested but no sign-in flow is attached"));
    let context = AppContext::new(settings, refresher);
    match std::env::var("CADTRA_TOKEN") {
        Ok(token) => context.tokens.set(token),
        Err(_) => warn!("CADTRA_TOKEN not set; requests will be unauthenticated"),
    }

    match context.client.get_or_create_account().await {
        Ok(account) => info!("signed in as account {}", account.id),
        Err(err) => warn!("account lookup failed: {}", err),
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
    let listener: CompletionListener = Arc::new(move |completion| {
        let _ = tx.send(completion);
    });
    let controller = context.session_controller(listener);

    controller.start().await;
    let accepted = fixes
        .into_iter()
        .filter(|fix| controller.on_location(*fix))
        .count();
    info!("replayed {} fixes from {}", accepted, fixes_path.display());

    controller.stop().await;
    let completion = rx
        .recv()
        .await
        .context("session ended without reporting an outcome")?;
    match completion.result {
        Ok(record) => {
            info!(
                "session {} uploaded: {} {}",
                completion.session_id,
                display::format_distance(record.distance()),
                record.unit().as_str()
            );
            Ok(())
        }
        Err(err) => Err(err).context(format!("session {} failed", completion.session_id)),
    }
}
