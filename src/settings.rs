use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use crate::models::DistanceUnit;
use crate::sync::ApiEndpoint;

const DEBUG_TICK_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub server: ApiEndpoint,
    /// Half the lifetime of a sign-in token.
    pub token_refresh_cooldown_secs: u64,
    pub tick_interval_ms: u64,
    pub distance_unit: DistanceUnit,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server: ApiEndpoint::default(),
            token_refresh_cooldown_secs: 30 * 60,
            tick_interval_ms: 1000,
            distance_unit: DistanceUnit::Miles,
        }
    }
}

impl ClientSettings {
    pub fn token_refresh_cooldown(&self) -> Duration {
        Duration::from_secs(self.token_refresh_cooldown_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Applies `CADTRA_HOST`, `CADTRA_PORT` and `CADTRA_DEBUG` from `lookup`.
    /// Unparseable values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(host) = lookup("CADTRA_HOST").filter(|host| !host.is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = lookup("CADTRA_PORT").and_then(|port| port.parse().ok()) {
            self.server.port = port;
        }
        let debug_mode = lookup("CADTRA_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.tick_interval_ms = DEBUG_TICK_INTERVAL_MS;
        }
        self
    }
}

/// JSON settings file. The file holds what the user chose; environment
/// overrides are layered on top by [`SettingsStore::settings`] and never
/// written back.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ClientSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            ClientSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Stored settings only, without environment overrides.
    pub fn stored(&self) -> ClientSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn settings(&self) -> ClientSettings {
        self.stored().with_overrides(|key| std::env::var(key).ok())
    }

    pub fn update(&self, settings: ClientSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: ClientSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed settings in {}", self.path.display()))?;
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = data;
        Ok(())
    }

    fn persist(&self, data: &ClientSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        let settings = store.stored();
        assert_eq!(settings.server, ApiEndpoint::new("localhost", 8000));
        assert_eq!(settings.token_refresh_cooldown(), Duration::from_secs(1800));
        assert_eq!(settings.tick_interval(), Duration::from_secs(1));
        assert_eq!(settings.distance_unit, DistanceUnit::Miles);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.stored(), ClientSettings::default());
        assert!(store.reload().is_err());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"distance_unit":"meters","server":{"host":"runs.local","port":9000}}"#)
            .unwrap();

        let settings = SettingsStore::new(path).unwrap().stored();
        assert_eq!(settings.distance_unit, DistanceUnit::Meters);
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.tick_interval_ms, 1000);
    }

    #[test]
    fn update_writes_through_and_reload_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut changed = store.stored();
        changed.server.port = 8443;
        store.update(changed.clone()).unwrap();

        let reopened = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reopened.stored(), changed);

        let mut edited = changed.clone();
        edited.tick_interval_ms = 500;
        fs::write(&path, serde_json::to_string(&edited).unwrap()).unwrap();
        store.reload().unwrap();
        assert_eq!(store.stored().tick_interval_ms, 500);
    }

    #[test]
    fn overrides_replace_server_and_tick() {
        let env: HashMap<&str, &str> = [
            ("CADTRA_HOST", "10.0.2.2"),
            ("CADTRA_PORT", "8080"),
            ("CADTRA_DEBUG", "TRUE"),
        ]
        .into_iter()
        .collect();

        let settings =
            ClientSettings::default().with_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(settings.server, ApiEndpoint::new("10.0.2.2", 8080));
        assert_eq!(settings.tick_interval_ms, 250);
    }

    #[test]
    fn bad_port_override_is_ignored() {
        let settings = ClientSettings::default().with_overrides(|key| match key {
            "CADTRA_PORT" => Some("eighty".into()),
            _ => None,
        });
        assert_eq!(settings.server.port, 8000);
    }
}
