// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent registry (§4.2): creation, lookup, periodic polling, bounded
//! concurrency, and per-agent circuit breaking.

use crate::breaker::{Admission, CircuitBreaker};
use crate::error::RegistryError;
use ccp_core::process::{Agent, AgentCredentials, AgentSummary};
use ccp_core::{AgentName, Clock, PublishSink, StateDelta};
use ccp_repository::{ActivityLogEntry, ActivityStatus, Repository};
use ccp_transport::Transport;
use parking_lot::RwLock as PLRwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Hot-reloadable knobs (§4.2, §6 config lifecycle).
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    pub poll_interval: Duration,
    pub breaker_failure_threshold: u32,
    pub breaker_cooldown: Duration,
    pub max_in_flight: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            breaker_failure_threshold: 5,
            breaker_cooldown: Duration::from_secs(30),
            max_in_flight: 50,
        }
    }
}

struct AgentEntry {
    agent: AsyncMutex<Agent>,
    breaker: CircuitBreaker,
}

/// Which idempotent verb an operator call invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOp {
    Start,
    Stop,
    Restart,
}

pub struct Registry {
    agents: PLRwLock<HashMap<AgentName, Arc<AgentEntry>>>,
    semaphore: Arc<Semaphore>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn PublishSink>,
    clock: Arc<dyn Clock>,
    config: PLRwLock<RegistryConfig>,
    shutdown: Arc<AtomicBool>,
    cancel: CancellationToken,
    background: AsyncMutex<Vec<tokio::task::JoinHandle<()>>>,
    repository: Option<Arc<dyn Repository>>,
}

impl Registry {
    pub fn new(
        transport: Arc<dyn Transport>,
        sink: Arc<dyn PublishSink>,
        clock: Arc<dyn Clock>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            agents: PLRwLock::new(HashMap::new()),
            semaphore: Arc::new(Semaphore::new(config.max_in_flight)),
            transport,
            sink,
            clock,
            config: PLRwLock::new(config),
            shutdown: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            background: AsyncMutex::new(Vec::new()),
            repository: None,
        }
    }

    /// Attach a persistence gateway. Once set, every user-initiated
    /// `invoke` records an activity-log entry; periodic `refresh` never
    /// does (§4.2 expansion — polling must not spam the activity log).
    pub fn with_repository(mut self, repository: Arc<dyn Repository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Apply newly validated config. The semaphore's total permit count is
    /// fixed at construction; only the breaker parameters used for agents
    /// registered from this point on, and the poll interval observed by the
    /// next sweep, change immediately.
    pub fn reload_config(&self, config: RegistryConfig) {
        *self.config.write() = config;
    }

    pub fn register(
        &self,
        name: AgentName,
        host: impl Into<String>,
        port: u16,
        environment: impl Into<String>,
        credentials: AgentCredentials,
        discovered: bool,
    ) -> Result<(), RegistryError> {
        let mut agents = self.agents.write();
        if agents.contains_key(&name) {
            return Err(RegistryError::AlreadyExists(name.to_string()));
        }
        let mut agent = Agent::new(name.clone(), host, port, environment, credentials);
        agent.discovered = discovered;
        let cfg = *self.config.read();
        let entry = Arc::new(AgentEntry {
            agent: AsyncMutex::new(agent),
            breaker: CircuitBreaker::new(self.clock.clone(), cfg.breaker_failure_threshold, cfg.breaker_cooldown),
        });
        agents.insert(name, entry);
        Ok(())
    }

    /// Soft-delete: flips `deregistered` so lookups and the poll sweep stop
    /// surfacing the agent, but leaves the map entry in place so any
    /// in-flight operation holding a clone of its `Arc` keeps running to
    /// completion instead of racing a structural removal.
    pub async fn deregister(&self, name: &AgentName) -> Result<(), RegistryError> {
        let entry = {
            let agents = self.agents.read();
            agents.get(name).cloned().ok_or_else(|| RegistryError::NotFound(name.to_string()))?
        };
        entry.agent.lock().await.deregistered = true;
        Ok(())
    }

    pub async fn summary(&self, name: &AgentName) -> Result<AgentSummary, RegistryError> {
        let entry = {
            let agents = self.agents.read();
            agents.get(name).cloned().ok_or_else(|| RegistryError::NotFound(name.to_string()))?
        };
        let agent = entry.agent.lock().await;
        if agent.deregistered {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        Ok(AgentSummary::from(&*agent))
    }

    pub async fn list(&self) -> Vec<AgentSummary> {
        let names: Vec<AgentName> = self.agents.read().keys().cloned().collect();
        let mut summaries = Vec::with_capacity(names.len());
        for name in names {
            if let Ok(summary) = self.summary(&name).await {
                summaries.push(summary);
            }
        }
        summaries
    }

    fn lookup(&self, name: &AgentName) -> Result<Arc<AgentEntry>, RegistryError> {
        self.agents.read().get(name).cloned().ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Used by discovery to avoid double-registering an agent it already
    /// knows about by address (§4.4 Result handling).
    pub async fn find_by_host_port(&self, host: &str, port: u16) -> Option<AgentName> {
        let entries: Vec<(AgentName, Arc<AgentEntry>)> =
            self.agents.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        for (name, entry) in entries {
            let agent = entry.agent.lock().await;
            if !agent.deregistered && agent.matches_host_port(host, port) {
                return Some(name);
            }
        }
        None
    }

    /// Register a newly discovered agent, returning its canonical name.
    pub fn register_discovered(
        &self,
        name: AgentName,
        host: impl Into<String>,
        port: u16,
        credentials: AgentCredentials,
    ) -> Result<(), RegistryError> {
        self.register(name, host, port, "discovered", credentials, true)
    }

    /// Re-read an agent's process list via the transport and publish the
    /// resulting deltas (§4.2 Agent contract: `refresh`).
    pub async fn refresh(&self, name: &AgentName, deadline: Duration) -> Result<(), RegistryError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(RegistryError::ShuttingDown);
        }
        let entry = self.lookup(name)?;

        match entry.breaker.admit() {
            Admission::Rejected => return Err(RegistryError::BreakerOpen(name.to_string())),
            Admission::Allowed | Admission::Trial => {}
        }

        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RegistryError::ShuttingDown)?;

        let endpoint = {
            let agent = entry.agent.lock().await;
            agent.endpoint()
        };

        match self.transport.list_processes(&endpoint, deadline).await {
            Ok(processes) => {
                entry.breaker.record_success();
                let mut agent = entry.agent.lock().await;
                let previous = std::mem::replace(&mut agent.processes, processes.clone());
                agent.connected = true;
                agent.last_ping = Some(chrono::Utc::now());
                let persisted = AgentSummary::from(&*agent);
                drop(agent);

                for delta in
                    ccp_core::delta::diff_process_lists(name, &previous, &processes, chrono::Utc::now())
                {
                    self.sink.publish(delta);
                }
                self.sink.publish(StateDelta::ProcessListReplaced { agent: name.clone(), snapshot: processes });
                if let Some(repository) = &self.repository {
                    repository.persist_agent(persisted).await;
                }
                Ok(())
            }
            Err(err) => {
                entry.breaker.record_failure();
                let mut agent = entry.agent.lock().await;
                agent.connected = false;
                drop(agent);
                self.sink.publish(StateDelta::AgentDisconnected {
                    agent: name.clone(),
                    reason: err.to_string(),
                });
                Err(RegistryError::Transport(err))
            }
        }
    }

    /// Invoke `start`/`stop`/`restart` on one process of one agent (§4.2
    /// Agent contract: `invoke`).
    pub async fn invoke(
        &self,
        name: &AgentName,
        op: InvokeOp,
        process_name: &str,
        deadline: Duration,
        actor: &str,
    ) -> Result<ccp_transport::CallOutcome, RegistryError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(RegistryError::ShuttingDown);
        }
        let entry = self.lookup(name)?;

        match entry.breaker.admit() {
            Admission::Rejected => return Err(RegistryError::BreakerOpen(name.to_string())),
            Admission::Allowed | Admission::Trial => {}
        }

        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RegistryError::ShuttingDown)?;

        let endpoint = {
            let agent = entry.agent.lock().await;
            agent.endpoint()
        };

        let result = match op {
            InvokeOp::Start => self.transport.start(&endpoint, process_name, deadline).await,
            InvokeOp::Stop => self.transport.stop(&endpoint, process_name, deadline).await,
            InvokeOp::Restart => self.transport.restart(&endpoint, process_name, deadline).await,
        };

        let action = format!("{op:?} {process_name} on {name}").to_lowercase();
        match result {
            Ok(outcome) => {
                entry.breaker.record_success();
                if let Some(repository) = &self.repository {
                    repository
                        .record_activity(ActivityLogEntry::new(actor, action, ActivityStatus::Success, ""))
                        .await;
                }
                Ok(outcome)
            }
            Err(err) => {
                entry.breaker.record_failure();
                if let Some(repository) = &self.repository {
                    repository
                        .record_activity(ActivityLogEntry::new(
                            actor,
                            action,
                            ActivityStatus::Failure,
                            err.to_string(),
                        ))
                        .await;
                }
                Err(RegistryError::Transport(err))
            }
        }
    }

    /// One pass over every live agent, refreshing each subject to the
    /// concurrency bound (§4.2). Names are collected under the read lock and
    /// released before any transport call, per the collect-then-operate
    /// discipline.
    pub async fn poll_sweep(&self, deadline: Duration) {
        let names: Vec<AgentName> = self.agents.read().keys().cloned().collect();
        let mut live = Vec::with_capacity(names.len());
        for name in names {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            if self.summary(&name).await.is_ok() {
                live.push(name);
            }
        }
        for name in live {
            if let Err(err) = self.refresh(&name, deadline).await {
                debug!(agent = %name, %err, "poll sweep refresh failed");
            }
        }
    }

    /// Spawn the background poll loop. The returned task is also tracked so
    /// `shutdown` can join it.
    pub fn spawn_poll_loop(self: &Arc<Self>, probe_deadline: Duration) {
        let registry = self.clone();
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                let interval = registry.config.read().poll_interval;
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                if registry.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                registry.poll_sweep(probe_deadline).await;
            }
            info!("registry poll loop exited");
        });
        // best-effort: if shutdown already raced ahead, the task exits almost
        // immediately, which is fine; it still gets tracked and joined.
        if let Ok(mut bg) = self.background.try_lock() {
            bg.push(handle);
        }
    }

    /// Stop accepting new operations, cancel the poll loop, and wait for
    /// tracked background tasks up to `deadline`.
    pub async fn shutdown(&self, deadline: Duration) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.cancel.cancel();
        let handles: Vec<_> = std::mem::take(&mut *self.background.lock().await);
        let join_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(deadline, join_all).await.is_err() {
            warn!("registry shutdown deadline elapsed with background tasks still running");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ccp_core::{FakeClock, RecordingSink};
    use ccp_transport::{AgentState, CallOutcome, TransportError, Value};
    use std::sync::atomic::AtomicU32;

    struct StubTransport {
        fail_times: AtomicU32,
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn call(
            &self,
            _endpoint: &str,
            _method: &str,
            _args: &[Value],
            _deadline: Duration,
        ) -> Result<Value, TransportError> {
            unimplemented!()
        }

        async fn start(
            &self,
            _endpoint: &str,
            _process_name: &str,
            _deadline: Duration,
        ) -> Result<CallOutcome, TransportError> {
            Ok(CallOutcome::Ok)
        }

        async fn stop(
            &self,
            _endpoint: &str,
            _process_name: &str,
            _deadline: Duration,
        ) -> Result<CallOutcome, TransportError> {
            Ok(CallOutcome::Ok)
        }

        async fn restart(
            &self,
            _endpoint: &str,
            _process_name: &str,
            _deadline: Duration,
        ) -> Result<CallOutcome, TransportError> {
            Ok(CallOutcome::Ok)
        }

        async fn get_state(&self, _endpoint: &str, _deadline: Duration) -> Result<AgentState, TransportError> {
            Ok(AgentState { version: None, processes: vec![] })
        }

        async fn list_processes(
            &self,
            _endpoint: &str,
            _deadline: Duration,
        ) -> Result<Vec<ccp_core::ProcessSnapshot>, TransportError> {
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err(TransportError::Timeout);
            }
            Ok(vec![])
        }
    }

    fn creds() -> AgentCredentials {
        AgentCredentials { username: "u".into(), password: "p".into() }
    }

    #[tokio::test]
    async fn refresh_publishes_process_list_replaced_on_success() {
        let transport = Arc::new(StubTransport { fail_times: AtomicU32::new(0) });
        let sink = Arc::new(RecordingSink::new());
        let registry = Registry::new(transport, sink.clone(), Arc::new(FakeClock::new()), RegistryConfig::default());
        registry.register(AgentName::new("a"), "localhost", 9001, "prod", creds(), false).unwrap();
        registry.refresh(&AgentName::new("a"), Duration::from_secs(1)).await.unwrap();
        let deltas = sink.snapshot();
        assert!(deltas.iter().any(|d| matches!(d, StateDelta::ProcessListReplaced { .. })));
    }

    #[tokio::test]
    async fn refresh_failure_publishes_agent_disconnected_and_trips_breaker() {
        let transport = Arc::new(StubTransport { fail_times: AtomicU32::new(10) });
        let sink = Arc::new(RecordingSink::new());
        let config = RegistryConfig { breaker_failure_threshold: 2, ..RegistryConfig::default() };
        let registry = Registry::new(transport, sink.clone(), Arc::new(FakeClock::new()), config);
        registry.register(AgentName::new("a"), "localhost", 9001, "prod", creds(), false).unwrap();
        let name = AgentName::new("a");
        assert!(registry.refresh(&name, Duration::from_secs(1)).await.is_err());
        assert!(registry.refresh(&name, Duration::from_secs(1)).await.is_err());
        // breaker now open: third call short-circuits without calling transport.
        let result = registry.refresh(&name, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(RegistryError::BreakerOpen(_))));
        let deltas = sink.snapshot();
        assert!(deltas.iter().any(|d| matches!(d, StateDelta::AgentDisconnected { .. })));
    }

    #[tokio::test]
    async fn deregistered_agent_is_not_returned_by_summary() {
        let transport = Arc::new(StubTransport { fail_times: AtomicU32::new(0) });
        let sink = Arc::new(RecordingSink::new());
        let registry = Registry::new(transport, sink, Arc::new(FakeClock::new()), RegistryConfig::default());
        let name = AgentName::new("a");
        registry.register(name.clone(), "localhost", 9001, "prod", creds(), false).unwrap();
        registry.deregister(&name).await.unwrap();
        assert!(matches!(registry.summary(&name).await, Err(RegistryError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let transport = Arc::new(StubTransport { fail_times: AtomicU32::new(0) });
        let sink = Arc::new(RecordingSink::new());
        let registry = Registry::new(transport, sink, Arc::new(FakeClock::new()), RegistryConfig::default());
        let name = AgentName::new("a");
        registry.register(name.clone(), "localhost", 9001, "prod", creds(), false).unwrap();
        assert!(matches!(
            registry.register(name, "localhost", 9001, "prod", creds(), false),
            Err(RegistryError::AlreadyExists(_))
        ));
    }
}
