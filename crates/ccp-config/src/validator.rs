// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validator chain run against a freshly parsed candidate before it is ever
//! swapped in (§4.5).

use crate::error::ConfigError;
use crate::snapshot::ConfigSnapshot;

pub trait Validator: Send + Sync {
    fn validate(&self, snapshot: &ConfigSnapshot) -> Result<(), ConfigError>;
}

/// Every duration-shaped field must be non-zero; a zero poll interval or
/// heartbeat would busy-loop the subsystem that reads it.
pub struct NonZeroDurations;

impl Validator for NonZeroDurations {
    fn validate(&self, snapshot: &ConfigSnapshot) -> Result<(), ConfigError> {
        let fields: [(&str, u64); 5] = [
            ("registry.poll_interval_ms", snapshot.registry.poll_interval_ms),
            ("registry.breaker_cooldown_ms", snapshot.registry.breaker_cooldown_ms),
            ("hub.heartbeat_interval_ms", snapshot.hub.heartbeat_interval_ms),
            ("discovery.probe_timeout_ms", snapshot.discovery.probe_timeout_ms),
            ("server.request_deadline_ms", snapshot.server.request_deadline_ms),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}

/// Concurrency knobs must be positive; zero would mean the subsystem never
/// does any work at all.
pub struct PositiveConcurrency;

impl Validator for PositiveConcurrency {
    fn validate(&self, snapshot: &ConfigSnapshot) -> Result<(), ConfigError> {
        if snapshot.registry.max_in_flight == 0 {
            return Err(ConfigError::Invalid("registry.max_in_flight must be greater than zero".into()));
        }
        if snapshot.discovery.worker_count == 0 {
            return Err(ConfigError::Invalid("discovery.worker_count must be greater than zero".into()));
        }
        if snapshot.registry.breaker_failure_threshold == 0 {
            return Err(ConfigError::Invalid(
                "registry.breaker_failure_threshold must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// `listen_addr` must at least parse as `host:port`.
pub struct ListenAddrIsWellFormed;

impl Validator for ListenAddrIsWellFormed {
    fn validate(&self, snapshot: &ConfigSnapshot) -> Result<(), ConfigError> {
        if snapshot.server.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "server.listen_addr {:?} is not a valid socket address",
                snapshot.server.listen_addr
            )));
        }
        Ok(())
    }
}

/// No two configured agents may share a `(host, port)` identity — the
/// Registry keys agents by name, but two entries pointing at the same
/// endpoint would poll the same remote process under two different names.
pub struct NoDuplicateAgentEndpoints;

impl Validator for NoDuplicateAgentEndpoints {
    fn validate(&self, snapshot: &ConfigSnapshot) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for agent in &snapshot.agents {
            if !seen.insert((agent.host.as_str(), agent.port)) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate agent endpoint {}:{} in configuration",
                    agent.host, agent.port
                )));
            }
        }
        Ok(())
    }
}

pub fn default_chain() -> Vec<Box<dyn Validator>> {
    vec![
        Box::new(NonZeroDurations),
        Box::new(PositiveConcurrency),
        Box::new(ListenAddrIsWellFormed),
        Box::new(NoDuplicateAgentEndpoints),
    ]
}

pub fn run_chain(chain: &[Box<dyn Validator>], snapshot: &ConfigSnapshot) -> Result<(), ConfigError> {
    for validator in chain {
        validator.validate(snapshot)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_passes_default_chain() {
        let snapshot = ConfigSnapshot::default();
        assert!(run_chain(&default_chain(), &snapshot).is_ok());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut snapshot = ConfigSnapshot::default();
        snapshot.registry.poll_interval_ms = 0;
        assert!(run_chain(&default_chain(), &snapshot).is_err());
    }

    #[test]
    fn malformed_listen_addr_is_rejected() {
        let mut snapshot = ConfigSnapshot::default();
        snapshot.server.listen_addr = "not-an-address".into();
        assert!(run_chain(&default_chain(), &snapshot).is_err());
    }

    #[test]
    fn duplicate_agent_endpoints_are_rejected() {
        use crate::snapshot::ConfiguredAgent;
        let mut snapshot = ConfigSnapshot::default();
        snapshot.agents = vec![
            ConfiguredAgent { name: "a".into(), host: "10.0.0.1".into(), port: 9001, environment: "prod".into() },
            ConfiguredAgent { name: "b".into(), host: "10.0.0.1".into(), port: 9001, environment: "prod".into() },
        ];
        assert!(run_chain(&default_chain(), &snapshot).is_err());
    }
}
