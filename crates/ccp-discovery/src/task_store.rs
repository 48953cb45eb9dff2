// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage for discovery tasks and results, independent of the repository
//! gateway so the scheduler can run without a full `ccp-repository` wiring
//! (e.g. in tests).

use async_trait::async_trait;
use ccp_core::discovery::{DiscoveryResult, DiscoveryTask};
use ccp_core::TaskId;
use std::collections::HashMap;

#[async_trait]
pub trait DiscoveryTaskStore: Send + Sync {
    async fn insert_task(&self, task: DiscoveryTask);
    async fn update_task(&self, task: DiscoveryTask);
    async fn get_task(&self, id: TaskId) -> Option<DiscoveryTask>;
    async fn list_tasks(&self) -> Vec<DiscoveryTask>;
    async fn append_result(&self, result: DiscoveryResult);
    async fn results_for_task(&self, id: TaskId) -> Vec<DiscoveryResult>;
}

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: parking_lot::Mutex<HashMap<TaskId, DiscoveryTask>>,
    results: parking_lot::Mutex<Vec<DiscoveryResult>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DiscoveryTaskStore for InMemoryTaskStore {
    async fn insert_task(&self, task: DiscoveryTask) {
        self.tasks.lock().insert(task.id, task);
    }

    async fn update_task(&self, task: DiscoveryTask) {
        self.tasks.lock().insert(task.id, task);
    }

    async fn get_task(&self, id: TaskId) -> Option<DiscoveryTask> {
        self.tasks.lock().get(&id).cloned()
    }

    async fn list_tasks(&self) -> Vec<DiscoveryTask> {
        self.tasks.lock().values().cloned().collect()
    }

    async fn append_result(&self, result: DiscoveryResult) {
        self.results.lock().push(result);
    }

    async fn results_for_task(&self, id: TaskId) -> Vec<DiscoveryResult> {
        self.results.lock().iter().filter(|r| r.task_id == id).cloned().collect()
    }
}
