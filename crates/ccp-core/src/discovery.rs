// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery task/result data types (spec §3). The scanning logic itself
//! lives in `ccp-discovery`; this crate only owns the shapes so that
//! `ccp-repository` can depend on them without pulling in the scheduler.

use crate::ids::{AgentName, TaskId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryTaskStatus {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl DiscoveryTaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DiscoveryTaskStatus::Completed | DiscoveryTaskStatus::Cancelled | DiscoveryTaskStatus::Failed
        )
    }
}

/// Append-only record of one discovery scan (§3 DiscoveryTask).
///
/// Credentials are never stored on this type (P10/I4) — they are supplied
/// out-of-band to the worker pool and held only in memory for the
/// lifetime of the scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryTask {
    pub id: TaskId,
    pub cidr: String,
    pub port: u16,
    pub status: DiscoveryTaskStatus,
    pub total_ips: u32,
    pub scanned_ips: u32,
    pub found: u32,
    pub failed_count: u32,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub error: Option<String>,
    pub created_by: String,
}

impl DiscoveryTask {
    pub fn new(cidr: impl Into<String>, port: u16, created_by: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            cidr: cidr.into(),
            port,
            status: DiscoveryTaskStatus::Pending,
            total_ips: 0,
            scanned_ips: 0,
            found: 0,
            failed_count: 0,
            started_at: None,
            completed_at: None,
            error: None,
            created_by: created_by.into(),
        }
    }

    /// Invariant I3: for a running task, scanned <= total; on completion,
    /// equality holds, and found + failed <= scanned.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.scanned_ips > self.total_ips {
            return Err(format!(
                "scanned_ips ({}) exceeds total_ips ({})",
                self.scanned_ips, self.total_ips
            ));
        }
        if self.status == DiscoveryTaskStatus::Completed && self.scanned_ips != self.total_ips {
            return Err(format!(
                "completed task has scanned_ips ({}) != total_ips ({})",
                self.scanned_ips, self.total_ips
            ));
        }
        if self.found + self.failed_count > self.scanned_ips {
            return Err(format!(
                "found ({}) + failed_count ({}) exceeds scanned_ips ({})",
                self.found, self.failed_count, self.scanned_ips
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryResultStatus {
    Success,
    Timeout,
    ConnectionRefused,
    AuthFailed,
    Error,
}

/// One probed IP during a discovery scan (§3 DiscoveryResult).
///
/// `task_id` always resolves to a `DiscoveryTask` row (referential
/// invariant named in §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub task_id: TaskId,
    pub ip: std::net::Ipv4Addr,
    pub port: u16,
    pub status: DiscoveryResultStatus,
    pub node_name: Option<AgentName>,
    pub version: Option<String>,
    pub duration_ms: u64,
    pub error: Option<String>,
}
