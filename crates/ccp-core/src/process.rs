// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent and process snapshot types (spec §3).

use crate::ids::AgentName;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Lifecycle state of a remote process, mirroring the numeric states a
/// supervising agent reports. Values match the ordinal scheme named in
/// §3 so that `state as i32` round-trips through the wire layer unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessState {
    Stopped = 0,
    Starting = 10,
    Running = 20,
    Backoff = 30,
    Stopping = 40,
    Exited = 100,
    Fatal = 200,
    Unknown = 1000,
}

impl ProcessState {
    pub fn from_ordinal(value: i64) -> Self {
        match value {
            0 => ProcessState::Stopped,
            10 => ProcessState::Starting,
            20 => ProcessState::Running,
            30 => ProcessState::Backoff,
            40 => ProcessState::Stopping,
            100 => ProcessState::Exited,
            200 => ProcessState::Fatal,
            _ => ProcessState::Unknown,
        }
    }

    pub fn ordinal(self) -> i64 {
        self as i64
    }
}

/// A process as reported by one refresh of an agent. Never mutated in
/// place; a refresh always produces a fresh `ProcessSnapshot` list that
/// wholesale-replaces the previous one (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub name: String,
    pub group: String,
    pub state: ProcessState,
    pub pid: Option<u32>,
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub exit_status: Option<i32>,
    pub description: String,
}

/// Credentials used to authenticate to a remote agent's XML-RPC endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCredentials {
    pub username: String,
    pub password: String,
}

/// Identity and immutable metadata for one remote agent (§3).
///
/// `connected`, `last_ping`, and `processes` are the only fields the
/// Registry mutates after creation; readers always receive a deep-copied
/// snapshot (`AgentSummary`/`AgentView`), never a reference into this
/// struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub name: AgentName,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub credentials: AgentCredentials,
    pub connected: bool,
    pub last_ping: Option<chrono::DateTime<chrono::Utc>>,
    pub processes: Vec<ProcessSnapshot>,
    /// Set when discovered dynamically rather than loaded from config.
    pub discovered: bool,
    /// Soft-delete marker; a deregistered agent stays addressable by id
    /// long enough for in-flight operations to observe `NotFound` instead
    /// of racing a map removal.
    pub deregistered: bool,
}

impl Agent {
    pub fn new(
        name: AgentName,
        host: impl Into<String>,
        port: u16,
        environment: impl Into<String>,
        credentials: AgentCredentials,
    ) -> Self {
        Self {
            name,
            host: host.into(),
            port,
            environment: environment.into(),
            credentials,
            connected: false,
            last_ping: None,
            processes: Vec::new(),
            discovered: false,
            deregistered: false,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}:{}/RPC2", self.host, self.port)
    }

    pub fn matches_host_port(&self, host: &str, port: u16) -> bool {
        self.host == host && self.port == port
    }
}

/// Read-only view of an agent handed to callers outside the Registry.
/// Never holds a reference into the Registry's internal map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub name: AgentName,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub connected: bool,
    pub process_count: usize,
    pub last_ping: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&Agent> for AgentSummary {
    fn from(agent: &Agent) -> Self {
        Self {
            name: agent.name.clone(),
            host: agent.host.clone(),
            port: agent.port,
            environment: agent.environment.clone(),
            connected: agent.connected,
            process_count: agent.processes.len(),
            last_ping: agent.last_ping,
        }
    }
}

pub fn canonical_discovered_name(ip: Ipv4Addr) -> AgentName {
    AgentName::for_discovered_ip(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_round_trips_known_states() {
        for state in [
            ProcessState::Stopped,
            ProcessState::Starting,
            ProcessState::Running,
            ProcessState::Backoff,
            ProcessState::Stopping,
            ProcessState::Exited,
            ProcessState::Fatal,
        ] {
            assert_eq!(ProcessState::from_ordinal(state.ordinal()), state);
        }
    }

    #[test]
    fn unknown_ordinal_maps_to_unknown() {
        assert_eq!(ProcessState::from_ordinal(999), ProcessState::Unknown);
    }

    #[test]
    fn canonical_name_dashes_octets() {
        let name = canonical_discovered_name("192.168.1.7".parse().unwrap());
        assert_eq!(name.as_str(), "node-192-168-1-7");
    }
}
