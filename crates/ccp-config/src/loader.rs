// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dual-layout config loading (§4.5, §9 Open Question).
//!
//! A deployment ships either a single `config.toml` (agents declared inline
//! in its own `[[agents]]` array), or the split layout: `config.toml` +
//! `nodelist.toml` (the agent list) + `.env` (agent credentials, keyed by
//! name). Both layouts load. A `config.d/` directory of fragments is also
//! supported alongside either layout, for sectioning config that isn't the
//! agent list.
//!
//! Structural values merge last-writer-wins, in the order: `config.toml`,
//! then `config.d/*.toml` (alphabetically), then `nodelist.toml`. The split
//! files are read after the single file and merged on top of it — this is a
//! decision, not an accident (DESIGN.md): the split layout is the one an
//! operator reaches for specifically to override or extend the single-file
//! agent list, so it wins on conflict.
//!
//! `.env` values never flow through this merge; they only ever supply
//! secrets, resolved per-agent by `load_agent_credentials` after the
//! structural snapshot is built.

use crate::error::ConfigError;
use crate::snapshot::{ConfigSnapshot, ConfiguredAgent};
use ccp_core::process::AgentCredentials;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct ConfigLoader {
    /// Path to the single-file config, e.g. `/etc/ccpd/config.toml`.
    pub base_path: PathBuf,
    /// Path to the split-file fragment directory, e.g. `/etc/ccpd/config.d`.
    /// Not required to exist.
    pub split_dir: PathBuf,
    /// Path to the split agent list, e.g. `/etc/ccpd/nodelist.toml`. Not
    /// required to exist.
    pub nodelist_path: PathBuf,
    /// Path to the secrets file, e.g. `/etc/ccpd/.env`. Not required to
    /// exist.
    pub env_path: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        let split_dir = base_path.with_extension("d");
        let dir = base_path.parent().map(Path::to_path_buf).unwrap_or_default();
        let nodelist_path = dir.join("nodelist.toml");
        let env_path = dir.join(".env");
        Self { base_path, split_dir, nodelist_path, env_path }
    }

    pub fn load(&self) -> Result<ConfigSnapshot, ConfigError> {
        let mut merged = toml::Value::Table(toml::map::Map::new());

        if self.base_path.exists() {
            let text = read(&self.base_path)?;
            let value: toml::Value = toml::from_str(&text)
                .map_err(|source| ConfigError::Parse { path: display(&self.base_path), source })?;
            merge(&mut merged, value);
        }

        for fragment_path in self.split_fragments()? {
            let text = read(&fragment_path)?;
            let value: toml::Value = toml::from_str(&text)
                .map_err(|source| ConfigError::Parse { path: display(&fragment_path), source })?;
            merge(&mut merged, value);
        }

        if self.nodelist_path.exists() {
            let text = read(&self.nodelist_path)?;
            let value: toml::Value = toml::from_str(&text)
                .map_err(|source| ConfigError::Parse { path: display(&self.nodelist_path), source })?;
            merge(&mut merged, value);
        }

        merged
            .try_into()
            .map_err(|e| ConfigError::Invalid(format!("could not map merged config: {e}")))
    }

    /// Resolve credentials for every `agent` from `.env`, keyed
    /// `CCP_AGENT_<NAME>_USERNAME` / `_PASSWORD` with the agent's name
    /// uppercased and non-alphanumeric characters folded to `_`. Fails if
    /// `.env` is missing an entry for a configured agent — a config-declared
    /// agent with no credentials can never successfully poll, so this is
    /// caught at load time rather than surfacing later as a transport
    /// failure.
    pub fn load_agent_credentials(
        &self,
        agents: &[ConfiguredAgent],
    ) -> Result<HashMap<String, AgentCredentials>, ConfigError> {
        let vars = read_env_file(&self.env_path)?;
        let mut out = HashMap::with_capacity(agents.len());
        for agent in agents {
            let prefix = agent_env_prefix(&agent.name);
            let username_key = format!("{prefix}_USERNAME");
            let password_key = format!("{prefix}_PASSWORD");
            let username = vars.get(&username_key).cloned().ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "missing {username_key} in {} for agent {:?}",
                    display(&self.env_path),
                    agent.name
                ))
            })?;
            let password = vars.get(&password_key).cloned().ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "missing {password_key} in {} for agent {:?}",
                    display(&self.env_path),
                    agent.name
                ))
            })?;
            out.insert(agent.name.clone(), AgentCredentials { username, password });
        }
        Ok(out)
    }

    fn split_fragments(&self) -> Result<Vec<PathBuf>, ConfigError> {
        if !self.split_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.split_dir)
            .map_err(|source| ConfigError::Io { path: display(&self.split_dir), source })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("toml"))
            .collect();
        paths.sort();
        Ok(paths)
    }
}

fn agent_env_prefix(name: &str) -> String {
    let normalized: String =
        name.chars().map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' }).collect();
    format!("CCP_AGENT_{normalized}")
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    dotenvy::from_path_iter(path)
        .map_err(|source| ConfigError::Env { path: display(path), source })?
        .collect::<Result<HashMap<_, _>, _>>()
        .map_err(|source| ConfigError::Env { path: display(path), source })
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: display(path), source })
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Recursively merge `overlay` on top of `base`: tables merge key-by-key,
/// every other value type is replaced wholesale.
fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge(existing, overlay_value),
                    None => {
                        base_table.insert(key, overlay_value);
                    }
                }
            }
        }
        (base_slot, overlay_value) => *base_slot = overlay_value,
    }
}
