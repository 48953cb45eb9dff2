// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The immutable configuration snapshot hot-swapped by `ConfigHandle` (§4.5).

use serde::{Deserialize, Serialize};

/// One agent as declared in configuration, either inline in `config.toml`'s
/// own `[[agents]]` array or in a split `nodelist.toml`. Credentials are
/// deliberately not a field here — they come from `.env` and are resolved
/// separately by `ConfigLoader::load_agent_credentials`, so a logged or
/// diffed `ConfigSnapshot` never carries a password (§9).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfiguredAgent {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    pub poll_interval_ms: u64,
    pub breaker_failure_threshold: u32,
    pub breaker_cooldown_ms: u64,
    pub max_in_flight: usize,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 30_000,
            breaker_failure_threshold: 5,
            breaker_cooldown_ms: 30_000,
            max_in_flight: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSection {
    pub max_connections: usize,
    pub heartbeat_interval_ms: u64,
    pub violation_limit: u32,
}

impl Default for HubSection {
    fn default() -> Self {
        Self { max_connections: 500, heartbeat_interval_ms: 30_000, violation_limit: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    pub worker_count: usize,
    pub probe_timeout_ms: u64,
    pub shutdown_deadline_ms: u64,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self { worker_count: 50, probe_timeout_ms: 5_000, shutdown_deadline_ms: 10_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub listen_addr: String,
    pub request_deadline_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { listen_addr: "0.0.0.0:8080".into(), request_deadline_ms: 30_000 }
    }
}

/// Everything the process ceiling governs. Loaded wholesale, validated
/// wholesale, swapped wholesale — no subsystem reads a partial update.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSnapshot {
    pub registry: RegistrySection,
    pub hub: HubSection,
    pub discovery: DiscoverySection,
    pub server: ServerSection,
    /// Agents created at startup from configuration, as opposed to the ones
    /// Discovery adds at runtime (§3 Agent).
    pub agents: Vec<ConfiguredAgent>,
}
