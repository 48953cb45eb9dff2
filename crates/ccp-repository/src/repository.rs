// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository gateway (§4's C7): the typed persistence interface the core
//! consumes. The backing store (a relational database, per §1) is out of
//! scope; `InMemoryRepository` exists only so the rest of the workspace has
//! something to run against in tests and examples.

use crate::error::RepositoryError;
use crate::model::{ActivityLogEntry, User};
use async_trait::async_trait;
use ccp_core::discovery::{DiscoveryResult, DiscoveryTask};
use ccp_core::process::AgentSummary;
use ccp_core::TaskId;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn record_activity(&self, entry: ActivityLogEntry);

    /// Time-descending, most recent first (§3 Persisted state).
    async fn list_activity(&self, limit: usize) -> Vec<ActivityLogEntry>;

    async fn upsert_user(&self, user: User) -> Result<(), RepositoryError>;
    async fn get_user(&self, username: &str) -> Option<User>;

    /// `DiscoveryTask` structurally has no password field (§7 P10); there is
    /// nothing for this method to redact.
    async fn record_discovery_task(&self, task: DiscoveryTask);
    async fn record_discovery_result(&self, result: DiscoveryResult);
    async fn discovery_results_for_task(&self, task_id: TaskId) -> Vec<DiscoveryResult>;

    async fn persist_agent(&self, agent: AgentSummary);
    async fn list_agents(&self) -> Vec<AgentSummary>;
}

#[derive(Default)]
pub struct InMemoryRepository {
    activity: parking_lot::Mutex<Vec<ActivityLogEntry>>,
    users: parking_lot::Mutex<std::collections::HashMap<String, User>>,
    discovery_tasks: parking_lot::Mutex<std::collections::HashMap<TaskId, DiscoveryTask>>,
    discovery_results: parking_lot::Mutex<Vec<DiscoveryResult>>,
    agents: parking_lot::Mutex<std::collections::HashMap<String, AgentSummary>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn record_activity(&self, entry: ActivityLogEntry) {
        self.activity.lock().push(entry);
    }

    async fn list_activity(&self, limit: usize) -> Vec<ActivityLogEntry> {
        let mut entries = self.activity.lock().clone();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        entries
    }

    async fn upsert_user(&self, user: User) -> Result<(), RepositoryError> {
        self.users.lock().insert(user.username.clone(), user);
        Ok(())
    }

    async fn get_user(&self, username: &str) -> Option<User> {
        self.users.lock().get(username).cloned()
    }

    async fn record_discovery_task(&self, task: DiscoveryTask) {
        self.discovery_tasks.lock().insert(task.id, task);
    }

    async fn record_discovery_result(&self, result: DiscoveryResult) {
        self.discovery_results.lock().push(result);
    }

    async fn discovery_results_for_task(&self, task_id: TaskId) -> Vec<DiscoveryResult> {
        self.discovery_results.lock().iter().filter(|r| r.task_id == task_id).cloned().collect()
    }

    async fn persist_agent(&self, agent: AgentSummary) {
        self.agents.lock().insert(agent.name.to_string(), agent);
    }

    async fn list_agents(&self) -> Vec<AgentSummary> {
        self.agents.lock().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ActivityStatus;

    #[tokio::test]
    async fn list_activity_is_time_descending() {
        let repo = InMemoryRepository::new();
        let mut first = ActivityLogEntry::new("alice", "start web", ActivityStatus::Success, "");
        first.created_at = chrono::Utc::now() - chrono::Duration::seconds(10);
        let second = ActivityLogEntry::new("alice", "stop web", ActivityStatus::Success, "");
        repo.record_activity(first).await;
        repo.record_activity(second.clone()).await;

        let entries = repo.list_activity(10).await;
        assert_eq!(entries[0].id, second.id);
    }

    #[tokio::test]
    async fn list_activity_respects_limit() {
        let repo = InMemoryRepository::new();
        for i in 0..5 {
            repo.record_activity(ActivityLogEntry::new(
                "alice",
                format!("action-{i}"),
                ActivityStatus::Success,
                "",
            ))
            .await;
        }
        assert_eq!(repo.list_activity(2).await.len(), 2);
    }
}
