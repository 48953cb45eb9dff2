// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable state-change events published into the event hub (§3).

use crate::ids::AgentName;
use crate::process::{ProcessSnapshot, ProcessState};
use serde::{Deserialize, Serialize};

/// Union of the state changes the control plane publishes. Immutable once
/// emitted; nothing downstream of publication may mutate a `StateDelta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StateDelta {
    #[serde(rename = "agent_connected")]
    AgentConnected { agent: AgentName },

    #[serde(rename = "agent_disconnected")]
    AgentDisconnected { agent: AgentName, reason: String },

    #[serde(rename = "process_state_change")]
    ProcessStateChange {
        agent: AgentName,
        process: String,
        old_state: ProcessState,
        new_state: ProcessState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    #[serde(rename = "process_list_replaced")]
    ProcessListReplaced { agent: AgentName, snapshot: Vec<ProcessSnapshot> },

    #[serde(rename = "discovery_progress")]
    DiscoveryProgress {
        task_id: crate::ids::TaskId,
        scanned: u32,
        total: u32,
        found: u32,
    },

    #[serde(rename = "node_discovered")]
    NodeDiscovered { task_id: crate::ids::TaskId, agent: AgentName, host: String, port: u16 },

    #[serde(rename = "discovery_completed")]
    DiscoveryCompleted {
        task_id: crate::ids::TaskId,
        status: crate::discovery::DiscoveryTaskStatus,
    },
}

impl StateDelta {
    /// The agent this delta is about, when it concerns exactly one agent.
    /// Used by the hub to match a subscriber's `interests` set.
    pub fn agent(&self) -> Option<&AgentName> {
        match self {
            StateDelta::AgentConnected { agent }
            | StateDelta::AgentDisconnected { agent, .. }
            | StateDelta::ProcessStateChange { agent, .. }
            | StateDelta::ProcessListReplaced { agent, .. }
            | StateDelta::NodeDiscovered { agent, .. } => Some(agent),
            StateDelta::DiscoveryProgress { .. } | StateDelta::DiscoveryCompleted { .. } => None,
        }
    }
}

/// Derive the `ProcessStateChange` deltas implied by replacing an agent's
/// previous process list with a freshly refreshed one. Processes that
/// disappear entirely are not reported as a delta here — callers that care
/// about those already get `ProcessListReplaced`.
pub fn diff_process_lists(
    agent: &AgentName,
    previous: &[ProcessSnapshot],
    current: &[ProcessSnapshot],
    now: chrono::DateTime<chrono::Utc>,
) -> Vec<StateDelta> {
    let mut deltas = Vec::new();
    for proc in current {
        let old_state = previous.iter().find(|p| p.name == proc.name).map(|p| p.state);
        if let Some(old_state) = old_state {
            if old_state != proc.state {
                deltas.push(StateDelta::ProcessStateChange {
                    agent: agent.clone(),
                    process: proc.name.clone(),
                    old_state,
                    new_state: proc.state,
                    timestamp: now,
                });
            }
        }
    }
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(name: &str, state: ProcessState) -> ProcessSnapshot {
        ProcessSnapshot {
            name: name.to_string(),
            group: name.to_string(),
            state,
            pid: None,
            start_time: None,
            exit_status: None,
            description: String::new(),
        }
    }

    #[test]
    fn diff_emits_only_changed_processes() {
        let agent = AgentName::new("web-1");
        let previous = vec![snap("web", ProcessState::Running), snap("worker", ProcessState::Running)];
        let current = vec![snap("web", ProcessState::Running), snap("worker", ProcessState::Backoff)];
        let now = chrono::Utc::now();
        let deltas = diff_process_lists(&agent, &previous, &current, now);
        assert_eq!(deltas.len(), 1);
        match &deltas[0] {
            StateDelta::ProcessStateChange { process, old_state, new_state, .. } => {
                assert_eq!(process, "worker");
                assert_eq!(*old_state, ProcessState::Running);
                assert_eq!(*new_state, ProcessState::Backoff);
            }
            other => panic!("unexpected delta: {other:?}"),
        }
    }

    #[test]
    fn diff_ignores_brand_new_processes() {
        let agent = AgentName::new("web-1");
        let previous = vec![];
        let current = vec![snap("web", ProcessState::Starting)];
        let deltas = diff_process_lists(&agent, &previous, &current, chrono::Utc::now());
        assert!(deltas.is_empty());
    }
}
