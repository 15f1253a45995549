//! Snapshot/gate/org-id persistence (C4): a trait abstraction plus a
//! filesystem-backed implementation. Corruption on read is always
//! treated as absence, never as an error.

use async_trait::async_trait;

use crate::model::{GateState, UsageSnapshot};

/// Persistence for everything the pipeline needs to survive a restart:
/// the last-known-good snapshot per provider, gate state per provider,
/// and a cached org id per provider. Implementations may be accessed
/// from multiple tasks concurrently and must guard their own state.
#[async_trait]
pub trait SnapshotStore: Send + Sync + std::fmt::Debug {
    async fn save_snapshot(&self, provider: &str, snapshot: &UsageSnapshot) -> Result<(), StoreError>;
    async fn load_snapshot(&self, provider: &str) -> Option<UsageSnapshot>;
    async fn clear_snapshot(&self, provider: &str);

    async fn save_gate(&self, provider: &str, state: &GateState) -> Result<(), StoreError>;
    async fn load_gate(&self, provider: &str) -> Option<GateState>;
    async fn clear_gate(&self, provider: &str);

    async fn save_org_id(&self, provider: &str, org_id: &str) -> Result<(), StoreError>;
    async fn load_org_id(&self, provider: &str) -> Option<String>;
    async fn clear_org_id(&self, provider: &str);

    async fn clear_all(&self, provider: &str) {
        self.clear_snapshot(provider).await;
        self.clear_gate(provider).await;
        self.clear_org_id(provider).await;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("failed to encode value for {provider}: {source}")]
    Encode { provider: String, #[source] source: serde_json::Error },
}

/// Minutes since a snapshot's `fetched_at`, given the current time.
pub fn snapshot_age_minutes(snapshot: &UsageSnapshot, now: chrono::DateTime<chrono::Utc>) -> i64 {
    (now - snapshot.fetched_at).num_minutes()
}

/// Whether a snapshot counts as fresh under `stale_threshold_minutes`.
pub fn is_snapshot_fresh(
    snapshot: &UsageSnapshot,
    now: chrono::DateTime<chrono::Utc>,
    stale_threshold_minutes: i64,
) -> bool {
    snapshot_age_minutes(snapshot, now) < stale_threshold_minutes
}

/// In-memory store used by tests and as a building block for the
/// filesystem store's cache layer.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct MemoryStore {
        snapshots: Mutex<HashMap<String, UsageSnapshot>>,
        gates: Mutex<HashMap<String, GateState>>,
        org_ids: Mutex<HashMap<String, String>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl SnapshotStore for MemoryStore {
        async fn save_snapshot(&self, provider: &str, snapshot: &UsageSnapshot) -> Result<(), StoreError> {
            self.snapshots
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .insert(provider.to_string(), snapshot.clone());
            Ok(())
        }

        async fn load_snapshot(&self, provider: &str) -> Option<UsageSnapshot> {
            self.snapshots.lock().unwrap_or_else(|p| p.into_inner()).get(provider).cloned()
        }

        async fn clear_snapshot(&self, provider: &str) {
            self.snapshots.lock().unwrap_or_else(|p| p.into_inner()).remove(provider);
        }

        async fn save_gate(&self, provider: &str, state: &GateState) -> Result<(), StoreError> {
            self.gates.lock().unwrap_or_else(|p| p.into_inner()).insert(provider.to_string(), state.clone());
            Ok(())
        }

        async fn load_gate(&self, provider: &str) -> Option<GateState> {
            self.gates.lock().unwrap_or_else(|p| p.into_inner()).get(provider).cloned()
        }

        async fn clear_gate(&self, provider: &str) {
            self.gates.lock().unwrap_or_else(|p| p.into_inner()).remove(provider);
        }

        async fn save_org_id(&self, provider: &str, org_id: &str) -> Result<(), StoreError> {
            self.org_ids
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .insert(provider.to_string(), org_id.to_string());
            Ok(())
        }

        async fn load_org_id(&self, provider: &str) -> Option<String> {
            self.org_ids.lock().unwrap_or_else(|p| p.into_inner()).get(provider).cloned()
        }

        async fn clear_org_id(&self, provider: &str) {
            self.org_ids.lock().unwrap_or_else(|p| p.into_inner()).remove(provider);
        }
    }
}

/// Filesystem-backed implementation, feature-gated behind `store`.
#[cfg(feature = "store")]
pub mod file {
    use super::*;
    use std::path::PathBuf;
    use tokio::fs;

    /// Layout of on-disk files under the platform config directory,
    /// resolved via `directories`.
    #[derive(Debug, Clone)]
    pub struct FileStore {
        root: PathBuf,
    }

    /// The platform-appropriate config root this store (and anything
    /// sharing its layout, e.g. the CLI's own config file and
    /// credentials lookup) resolves to: `~/.config/usageguard` on
    /// Linux, `~/Library/Application Support/dev.flyingrobots.usageguard`
    /// on macOS, etc., via `directories::ProjectDirs`.
    pub fn config_root() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "flyingrobots", "usageguard")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    impl FileStore {
        /// Use [`config_root`] as the store's root directory.
        pub fn discover() -> Option<Self> {
            config_root().map(|root| Self { root })
        }

        pub fn at(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        fn snapshot_path(&self, provider: &str) -> PathBuf {
            self.root.join("snapshots").join(format!("{provider}.json"))
        }

        fn gate_path(&self, provider: &str) -> PathBuf {
            self.root.join("gate").join(format!("{provider}.json"))
        }

        fn org_id_path(&self, provider: &str) -> PathBuf {
            self.root.join("org_ids").join(format!("{provider}.txt"))
        }

        async fn write_json<T: serde::Serialize>(
            &self,
            path: &std::path::Path,
            provider: &str,
            value: &T,
        ) -> Result<(), StoreError> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|source| StoreError::Io { path: parent.display().to_string(), source })?;
            }
            let encoded = serde_json::to_vec_pretty(value)
                .map_err(|source| StoreError::Encode { provider: provider.to_string(), source })?;
            fs::write(path, encoded)
                .await
                .map_err(|source| StoreError::Io { path: path.display().to_string(), source })
        }

        /// Read and decode a JSON file, treating any I/O or decode
        /// failure as absence rather than propagating an error - a
        /// missing or corrupted cache file should never break a fetch.
        async fn read_json<T: serde::de::DeserializeOwned>(&self, path: &std::path::Path) -> Option<T> {
            let bytes = fs::read(path).await.ok()?;
            serde_json::from_slice(&bytes).ok()
        }
    }

    #[async_trait]
    impl SnapshotStore for FileStore {
        async fn save_snapshot(&self, provider: &str, snapshot: &UsageSnapshot) -> Result<(), StoreError> {
            self.write_json(&self.snapshot_path(provider), provider, snapshot).await
        }

        async fn load_snapshot(&self, provider: &str) -> Option<UsageSnapshot> {
            self.read_json(&self.snapshot_path(provider)).await
        }

        async fn clear_snapshot(&self, provider: &str) {
            let _ = fs::remove_file(self.snapshot_path(provider)).await;
        }

        async fn save_gate(&self, provider: &str, state: &GateState) -> Result<(), StoreError> {
            self.write_json(&self.gate_path(provider), provider, state).await
        }

        async fn load_gate(&self, provider: &str) -> Option<GateState> {
            self.read_json(&self.gate_path(provider)).await
        }

        async fn clear_gate(&self, provider: &str) {
            let _ = fs::remove_file(self.gate_path(provider)).await;
        }

        async fn save_org_id(&self, provider: &str, org_id: &str) -> Result<(), StoreError> {
            let path = self.org_id_path(provider);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|source| StoreError::Io { path: parent.display().to_string(), source })?;
            }
            fs::write(&path, org_id.as_bytes())
                .await
                .map_err(|source| StoreError::Io { path: path.display().to_string(), source })
        }

        async fn load_org_id(&self, provider: &str) -> Option<String> {
            fs::read_to_string(self.org_id_path(provider)).await.ok().map(|s| s.trim().to_string())
        }

        async fn clear_org_id(&self, provider: &str) {
            let _ = fs::remove_file(self.org_id_path(provider)).await;
        }
    }

}
