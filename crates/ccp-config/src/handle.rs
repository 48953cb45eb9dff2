// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic config handle: lock-free reads, serialized writes (§4.5).

use crate::error::ConfigError;
use crate::loader::ConfigLoader;
use crate::snapshot::ConfigSnapshot;
use crate::validator::{self, Validator};
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ConfigHandle {
    current: ArcSwap<ConfigSnapshot>,
    loader: ConfigLoader,
    validators: Vec<Box<dyn Validator>>,
    /// Serializes reloads so rapid repeated signals are coalesced and
    /// applied in the order received, never concurrently (§4.5).
    reload_lock: tokio::sync::Mutex<()>,
}

impl ConfigHandle {
    pub fn load_initial(loader: ConfigLoader) -> Result<Arc<Self>, ConfigError> {
        let snapshot = loader.load()?;
        let validators = validator::default_chain();
        validator::run_chain(&validators, &snapshot)?;
        Ok(Arc::new(Self {
            current: ArcSwap::new(Arc::new(snapshot)),
            loader,
            validators,
            reload_lock: tokio::sync::Mutex::new(()),
        }))
    }

    /// Lock-free read of the current snapshot.
    pub fn current(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    /// Load a new candidate, validate it, and swap it in. On any failure,
    /// the current snapshot is left untouched (§4.5 step 3).
    pub async fn reload(&self) -> Result<(), ConfigError> {
        let _guard = self.reload_lock.lock().await;
        let candidate = self.loader.load();
        let candidate = match candidate {
            Ok(c) => c,
            Err(err) => {
                warn!(%err, "config reload failed to load, keeping current snapshot");
                return Err(err);
            }
        };
        if let Err(err) = validator::run_chain(&self.validators, &candidate) {
            warn!(%err, "config reload candidate failed validation, keeping current snapshot");
            return Err(err);
        }
        self.current.store(Arc::new(candidate));
        info!("config reload applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_reload_leaves_current_snapshot_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[registry]\npoll_interval_ms = 1000\n").unwrap();
        let handle = ConfigHandle::load_initial(ConfigLoader::new(&path)).unwrap();
        assert_eq!(handle.current().registry.poll_interval_ms, 1000);

        std::fs::write(&path, "[registry]\npoll_interval_ms = 0\n").unwrap();
        assert!(handle.reload().await.is_err());
        assert_eq!(handle.current().registry.poll_interval_ms, 1000);
    }

    #[tokio::test]
    async fn valid_reload_swaps_in_new_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[registry]\npoll_interval_ms = 1000\n").unwrap();
        let handle = ConfigHandle::load_initial(ConfigLoader::new(&path)).unwrap();

        std::fs::write(&path, "[registry]\npoll_interval_ms = 2000\n").unwrap();
        handle.reload().await.unwrap();
        assert_eq!(handle.current().registry.poll_interval_ms, 2000);
    }
}
