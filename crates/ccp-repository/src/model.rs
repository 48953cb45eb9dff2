// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted rows the repository gateway carries. The relational schema
//! itself is out of scope (§1); these are the shapes the core hands across
//! the boundary.

use ccp_core::AgentName;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Success,
    Failure,
}

/// One audit-log line. Never carries a password or auth token in `detail`
/// (P10); callers must redact before constructing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: uuid::Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub username: String,
    pub action: String,
    pub status: ActivityStatus,
    pub detail: String,
}

impl ActivityLogEntry {
    pub fn new(
        username: impl Into<String>,
        action: impl Into<String>,
        status: ActivityStatus,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            username: username.into(),
            action: action.into(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}

/// Reference to an agent a discovery scan found, with no password field at
/// all — the type itself enforces P10 rather than relying on callers to
/// remember to scrub one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredAgentRef {
    pub agent: AgentName,
    pub host: String,
    pub port: u16,
}
