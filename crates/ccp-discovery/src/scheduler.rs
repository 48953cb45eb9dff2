// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery scheduler (§4.4): CIDR sweep with a fixed worker pool, single
//! flight per `(cidr, port)`, and progress/result events published into the
//! event hub.

use crate::cidr::CidrRange;
use crate::error::DiscoveryError;
use crate::task_store::DiscoveryTaskStore;
use ccp_core::discovery::{DiscoveryResult, DiscoveryResultStatus, DiscoveryTask, DiscoveryTaskStatus};
use ccp_core::process::{canonical_discovered_name, AgentCredentials};
use ccp_core::{PublishSink, StateDelta, TaskId};
use ccp_registry::Registry;
use ccp_transport::{Transport, TransportError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const PROGRESS_BATCH: u32 = 10;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub worker_count: usize,
    pub probe_timeout: Duration,
    pub shutdown_deadline: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: 50,
            probe_timeout: Duration::from_secs(5),
            shutdown_deadline: Duration::from_secs(10),
        }
    }
}

pub struct Scheduler {
    transport: Arc<dyn Transport>,
    registry: Arc<Registry>,
    sink: Arc<dyn PublishSink>,
    store: Arc<dyn DiscoveryTaskStore>,
    config: SchedulerConfig,
    inflight: parking_lot::Mutex<HashSet<(String, u16)>>,
    cancellations: parking_lot::Mutex<std::collections::HashMap<TaskId, CancellationToken>>,
}

impl Scheduler {
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<Registry>,
        sink: Arc<dyn PublishSink>,
        store: Arc<dyn DiscoveryTaskStore>,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            registry,
            sink,
            store,
            config,
            inflight: parking_lot::Mutex::new(HashSet::new()),
            cancellations: parking_lot::Mutex::new(std::collections::HashMap::new()),
        })
    }

    /// Parse, validate single-flight, create the task row, and spawn the
    /// scan in the background. Returns the new task's id immediately.
    pub async fn start_scan(
        self: &Arc<Self>,
        cidr: &str,
        port: u16,
        credentials: AgentCredentials,
        created_by: &str,
    ) -> Result<TaskId, DiscoveryError> {
        let range = CidrRange::parse(cidr).map_err(DiscoveryError::InvalidCidr)?;
        let key = (cidr.to_string(), port);
        {
            let mut inflight = self.inflight.lock();
            if inflight.contains(&key) {
                return Err(DiscoveryError::AlreadyScanning { cidr: cidr.to_string(), port });
            }
            inflight.insert(key.clone());
        }

        let mut task = DiscoveryTask::new(cidr, port, created_by);
        task.total_ips = range.host_count();
        let task_id = task.id;
        self.store.insert_task(task).await;

        let cancel = CancellationToken::new();
        self.cancellations.lock().insert(task_id, cancel.clone());

        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.run_scan(task_id, range, port, credentials, cancel).await;
            scheduler.inflight.lock().remove(&key);
            scheduler.cancellations.lock().remove(&task_id);
        });

        Ok(task_id)
    }

    pub fn cancel(&self, task_id: TaskId) -> bool {
        if let Some(token) = self.cancellations.lock().get(&task_id) {
            token.cancel();
            true
        } else {
            false
        }
    }

    /// Cancel every scan currently in flight (§6 shutdown sequence step 4).
    pub fn cancel_all(&self) {
        for token in self.cancellations.lock().values() {
            token.cancel();
        }
    }

    async fn run_scan(
        &self,
        task_id: TaskId,
        range: CidrRange,
        port: u16,
        credentials: AgentCredentials,
        cancel: CancellationToken,
    ) {
        let Some(mut task) = self.store.get_task(task_id).await else { return };
        task.status = DiscoveryTaskStatus::Running;
        task.started_at = Some(chrono::Utc::now());
        self.store.update_task(task.clone()).await;

        let semaphore = Arc::new(Semaphore::new(self.config.worker_count));
        let mut handles = Vec::new();
        for ip in range.hosts() {
            if cancel.is_cancelled() {
                break;
            }
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let transport = self.transport.clone();
            let deadline = self.config.probe_timeout;
            let endpoint = format!("http://{ip}:{port}/RPC2");
            let probe_cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                if probe_cancel.is_cancelled() {
                    return (ip, None);
                }
                let outcome = tokio::select! {
                    _ = probe_cancel.cancelled() => None,
                    result = transport.get_state(&endpoint, deadline) => Some(result),
                };
                (ip, outcome)
            }));
        }

        let mut scanned_since_progress = 0u32;
        for handle in handles {
            let (ip, outcome) = match handle.await {
                Ok(v) => v,
                Err(_) => continue,
            };
            let Some(outcome) = outcome else { continue };

            let mut task = match self.store.get_task(task_id).await {
                Some(t) => t,
                None => break,
            };
            task.scanned_ips += 1;

            match outcome {
                Ok(state) => {
                    task.found += 1;
                    self.handle_success(task_id, ip, port, state.version, &credentials).await;
                }
                Err(err) => {
                    task.failed_count += 1;
                    self.store
                        .append_result(DiscoveryResult {
                            task_id,
                            ip,
                            port,
                            status: classify_failure(&err),
                            node_name: None,
                            version: None,
                            duration_ms: 0,
                            error: Some(err.to_string()),
                        })
                        .await;
                }
            }

            self.store.update_task(task.clone()).await;
            scanned_since_progress += 1;
            if scanned_since_progress >= PROGRESS_BATCH || task.scanned_ips == task.total_ips {
                scanned_since_progress = 0;
                self.sink.publish(StateDelta::DiscoveryProgress {
                    task_id,
                    scanned: task.scanned_ips,
                    total: task.total_ips,
                    found: task.found,
                });
            }
        }

        let mut task = match self.store.get_task(task_id).await {
            Some(t) => t,
            None => return,
        };
        task.status = if cancel.is_cancelled() { DiscoveryTaskStatus::Cancelled } else { DiscoveryTaskStatus::Completed };
        task.completed_at = Some(chrono::Utc::now());
        if let Err(reason) = task.check_invariants() {
            warn!(task_id = %task_id, %reason, "discovery task invariant violated at completion");
        }
        let status = task.status;
        self.store.update_task(task).await;
        self.sink.publish(StateDelta::DiscoveryCompleted { task_id, status });
        info!(task_id = %task_id, ?status, "discovery scan finished");
    }

    /// §4.4 Result handling: dedupe by `(host, port)` against the registry
    /// before inserting a new agent.
    async fn handle_success(
        &self,
        task_id: TaskId,
        ip: std::net::Ipv4Addr,
        port: u16,
        version: Option<String>,
        credentials: &AgentCredentials,
    ) {
        let host = ip.to_string();
        let name = canonical_discovered_name(ip);

        let existing = self.registry.find_by_host_port(&host, port).await;
        if existing.is_some() {
            self.store
                .append_result(DiscoveryResult {
                    task_id,
                    ip,
                    port,
                    status: DiscoveryResultStatus::Success,
                    node_name: existing,
                    version,
                    duration_ms: 0,
                    error: None,
                })
                .await;
            return;
        }

        if let Err(err) = self.registry.register_discovered(name.clone(), host, port, credentials.clone()) {
            warn!(%err, ip = %ip, "failed to register discovered agent");
            self.store
                .append_result(DiscoveryResult {
                    task_id,
                    ip,
                    port,
                    status: DiscoveryResultStatus::Error,
                    node_name: None,
                    version,
                    duration_ms: 0,
                    error: Some(err.to_string()),
                })
                .await;
            return;
        }

        self.store
            .append_result(DiscoveryResult {
                task_id,
                ip,
                port,
                status: DiscoveryResultStatus::Success,
                node_name: Some(name.clone()),
                version,
                duration_ms: 0,
                error: None,
            })
            .await;
        self.sink.publish(StateDelta::NodeDiscovered { task_id, agent: name, host: ip.to_string(), port });
    }
}

fn classify_failure(err: &TransportError) -> DiscoveryResultStatus {
    match err {
        TransportError::Timeout => DiscoveryResultStatus::Timeout,
        TransportError::ConnectFailed(_) => DiscoveryResultStatus::ConnectionRefused,
        TransportError::Fault { fault_string, .. } if fault_string.to_ascii_uppercase().contains("AUTH") => {
            DiscoveryResultStatus::AuthFailed
        }
        _ => DiscoveryResultStatus::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_store::InMemoryTaskStore;
    use async_trait::async_trait;
    use ccp_core::{FakeClock, RecordingSink};
    use ccp_registry::RegistryConfig;
    use ccp_transport::{AgentState, CallOutcome, Value};

    struct AlwaysFailsTransport;

    #[async_trait]
    impl Transport for AlwaysFailsTransport {
        async fn call(
            &self,
            _endpoint: &str,
            _method: &str,
            _args: &[Value],
            _deadline: Duration,
        ) -> Result<Value, TransportError> {
            Err(TransportError::Timeout)
        }
        async fn start(
            &self,
            _endpoint: &str,
            _process_name: &str,
            _deadline: Duration,
        ) -> Result<CallOutcome, TransportError> {
            Err(TransportError::Timeout)
        }
        async fn stop(
            &self,
            _endpoint: &str,
            _process_name: &str,
            _deadline: Duration,
        ) -> Result<CallOutcome, TransportError> {
            Err(TransportError::Timeout)
        }
        async fn restart(
            &self,
            _endpoint: &str,
            _process_name: &str,
            _deadline: Duration,
        ) -> Result<CallOutcome, TransportError> {
            Err(TransportError::Timeout)
        }
        async fn get_state(&self, _endpoint: &str, _deadline: Duration) -> Result<AgentState, TransportError> {
            Err(TransportError::Timeout)
        }
        async fn list_processes(
            &self,
            _endpoint: &str,
            _deadline: Duration,
        ) -> Result<Vec<ccp_core::ProcessSnapshot>, TransportError> {
            Err(TransportError::Timeout)
        }
    }

    fn scheduler() -> Arc<Scheduler> {
        let transport = Arc::new(AlwaysFailsTransport);
        let sink = Arc::new(RecordingSink::new());
        let registry = Arc::new(Registry::new(
            transport.clone(),
            sink.clone(),
            Arc::new(FakeClock::new()),
            RegistryConfig::default(),
        ));
        let store = Arc::new(InMemoryTaskStore::new());
        Scheduler::new(
            transport,
            registry,
            sink,
            store,
            SchedulerConfig { worker_count: 4, probe_timeout: Duration::from_millis(50), ..Default::default() },
        )
    }

    #[tokio::test]
    async fn single_flight_rejects_concurrent_scan_of_same_range() {
        let scheduler = scheduler();
        let creds = AgentCredentials { username: "u".into(), password: "p".into() };
        scheduler.start_scan("10.0.0.0/30", 9001, creds.clone(), "op").await.unwrap();
        let second = scheduler.start_scan("10.0.0.0/30", 9001, creds, "op").await;
        assert!(matches!(second, Err(DiscoveryError::AlreadyScanning { .. })));
    }

    #[tokio::test]
    async fn invalid_cidr_is_rejected_before_scheduling() {
        let scheduler = scheduler();
        let creds = AgentCredentials { username: "u".into(), password: "p".into() };
        let result = scheduler.start_scan("not-a-cidr", 9001, creds, "op").await;
        assert!(matches!(result, Err(DiscoveryError::InvalidCidr(_))));
    }

    #[tokio::test]
    async fn failed_scan_completes_with_all_probes_failed() {
        let scheduler = scheduler();
        let creds = AgentCredentials { username: "u".into(), password: "p".into() };
        let task_id = scheduler.start_scan("10.0.0.0/30", 9001, creds, "op").await.unwrap();
        // /30 has 2 usable hosts; wait for the background scan to finish.
        for _ in 0..50 {
            if let Some(task) = scheduler.store.get_task(task_id).await {
                if task.status.is_terminal() {
                    assert_eq!(task.failed_count, 2);
                    assert_eq!(task.found, 0);
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("scan did not complete in time");
    }
}
