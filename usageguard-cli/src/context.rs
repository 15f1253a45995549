//! Shared state built once at startup and threaded through every
//! subcommand: config, the gate registry, and the snapshot store.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use usageguard::clock::MonotonicClock;
use usageguard::config::{Config, ConfigError};
use usageguard::error::{classify_io_error, classify_parse_error, UsageError};
use usageguard::gate::GateRegistry;
use usageguard::orchestrator::ProviderSpec;
use usageguard::store::SnapshotStore;

pub struct Context {
    pub config: Config,
    pub gates: GateRegistry,
    pub store: Arc<dyn SnapshotStore>,
    pub json: bool,
    pub no_color: bool,
}

impl Context {
    pub async fn load(
        config_path: Option<&Path>,
        json_flag: bool,
        no_color_flag: bool,
    ) -> Result<Self, UsageError> {
        let config = match config_path {
            Some(path) => Config::load(path).map_err(config_load_error)?,
            None => discover_config().unwrap_or_default(),
        };

        let clock = Arc::new(MonotonicClock::default());
        let gates = GateRegistry::new(clock);

        #[cfg(feature = "file-store")]
        let store: Arc<dyn SnapshotStore> = Arc::new(
            usageguard::store::file::FileStore::discover()
                .unwrap_or_else(|| usageguard::store::file::FileStore::at(std::env::temp_dir())),
        );
        #[cfg(not(feature = "file-store"))]
        let store: Arc<dyn SnapshotStore> = Arc::new(usageguard::store::memory::MemoryStore::new());

        for provider_id in [usageguard_providers::ACME_AI, usageguard_providers::NIMBUS_AI] {
            if let Some(state) = store.load_gate(provider_id).await {
                gates.install(provider_id, state);
            }
        }

        Ok(Self {
            json: json_flag || config.display.json,
            no_color: no_color_flag || config.display.no_color,
            config,
            gates,
            store,
        })
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.config.fetch.timeout_seconds.max(0.0))
    }

    pub fn max_concurrent(&self) -> usize {
        self.config.fetch.max_concurrent
    }

    /// The illustrative providers this CLI knows how to fetch, filtered
    /// to those the config marks enabled.
    pub fn provider_specs(&self) -> Vec<ProviderSpec> {
        [usageguard_providers::ACME_AI, usageguard_providers::NIMBUS_AI]
            .into_iter()
            .map(|id| ProviderSpec {
                id: id.to_string(),
                strategies: usageguard_providers::strategies_for(
                    id,
                    &credentials_path(id),
                    &cli_executable(id),
                ),
                enabled: self.config.is_provider_enabled(id),
            })
            .collect()
    }
}

/// Convert a config load failure into the same structured error shape
/// every other startup and fetch failure uses.
fn config_load_error(err: ConfigError) -> UsageError {
    match err {
        ConfigError::Read { path, source } => {
            let fatal = source.kind() == std::io::ErrorKind::PermissionDenied;
            classify_io_error(Some(&path), fatal, None)
        }
        ConfigError::Parse { path, source } => {
            classify_parse_error(format!("{path}: {source}"), None)
        }
        ConfigError::Serialize(source) => classify_parse_error(source.to_string(), None),
        ConfigError::Write { path, source } => {
            let fatal = source.kind() == std::io::ErrorKind::PermissionDenied;
            classify_io_error(Some(&path), fatal, None)
        }
    }
}

fn discover_config() -> Option<Config> {
    let dirs = config_root()?;
    let path = dirs.join("usageguard.toml");
    Config::load(&path).ok()
}

/// The same platform config root [`usageguard::store::file::FileStore`]
/// resolves to, so the CLI's config file and credentials lookup live
/// alongside the snapshot/gate store rather than under a separate path.
#[cfg(feature = "file-store")]
fn config_root() -> Option<std::path::PathBuf> {
    usageguard::store::file::config_root()
}

#[cfg(not(feature = "file-store"))]
fn config_root() -> Option<std::path::PathBuf> {
    None
}

fn credentials_path(provider_id: &str) -> String {
    config_root()
        .unwrap_or_else(std::env::temp_dir)
        .join("credentials")
        .join(provider_id)
        .join("token")
        .display()
        .to_string()
}

fn cli_executable(provider_id: &str) -> String {
    format!("{provider_id}-cli")
}
