// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires every subsystem together (§4's C9 glue): Transport, Registry, Hub,
//! Discovery Scheduler, Config, Repository, and Authenticator all get
//! constructed here and nowhere else.

use ccp_auth::Authenticator;
use ccp_config::ConfigHandle;
use ccp_core::process::AgentCredentials;
use ccp_core::Clock;
use ccp_discovery::{InMemoryTaskStore, Scheduler, SchedulerConfig};
use ccp_hub::{Hub, HubConfig};
use ccp_registry::{Registry, RegistryConfig};
use ccp_repository::Repository;
use ccp_transport::Transport;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Everything a request handler or background task needs. Constructed once
/// at startup and handed out as `Arc<App>`.
pub struct App {
    pub config: Arc<ConfigHandle>,
    pub registry: Arc<Registry>,
    pub hub: Arc<Hub>,
    pub scheduler: Arc<Scheduler>,
    pub repository: Arc<dyn Repository>,
    pub authenticator: Arc<dyn Authenticator>,
    pub shutdown: CancellationToken,
}

impl App {
    pub fn new(
        config: Arc<ConfigHandle>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        repository: Arc<dyn Repository>,
        authenticator: Arc<dyn Authenticator>,
        agent_credentials: HashMap<String, AgentCredentials>,
    ) -> Arc<Self> {
        let snapshot = config.current();

        let hub = Hub::new(
            HubConfig {
                max_connections: snapshot.hub.max_connections,
                heartbeat_interval: Duration::from_millis(snapshot.hub.heartbeat_interval_ms),
                violation_limit: snapshot.hub.violation_limit,
            },
            clock.clone(),
        );

        let registry = Arc::new(
            Registry::new(
                transport.clone(),
                hub.clone(),
                clock.clone(),
                RegistryConfig {
                    poll_interval: Duration::from_millis(snapshot.registry.poll_interval_ms),
                    breaker_failure_threshold: snapshot.registry.breaker_failure_threshold,
                    breaker_cooldown: Duration::from_millis(snapshot.registry.breaker_cooldown_ms),
                    max_in_flight: snapshot.registry.max_in_flight,
                },
            )
            .with_repository(repository.clone()),
        );

        for configured in &snapshot.agents {
            let Some(credentials) = agent_credentials.get(&configured.name) else {
                warn!(agent = %configured.name, "no credentials resolved for configured agent, skipping");
                continue;
            };
            if let Err(err) = registry.register(
                configured.name.clone().into(),
                configured.host.clone(),
                configured.port,
                configured.environment.clone(),
                credentials.clone(),
                false,
            ) {
                warn!(agent = %configured.name, %err, "failed to register configured agent");
            }
        }

        let scheduler = Scheduler::new(
            transport,
            registry.clone(),
            hub.clone(),
            Arc::new(InMemoryTaskStore::new()),
            SchedulerConfig {
                worker_count: snapshot.discovery.worker_count,
                probe_timeout: Duration::from_millis(snapshot.discovery.probe_timeout_ms),
                shutdown_deadline: Duration::from_millis(snapshot.discovery.shutdown_deadline_ms),
            },
        );

        Arc::new(Self {
            config,
            registry,
            hub,
            scheduler,
            repository,
            authenticator,
            shutdown: CancellationToken::new(),
        })
    }

    /// Apply a freshly reloaded config snapshot to the subsystems that
    /// support hot-reload (§4.5). The hub and scheduler's fixed-size pools
    /// are not re-sized at runtime; only the registry's reloadable knobs
    /// take effect immediately, matching what `RegistryConfig::reload`
    /// documents.
    pub fn apply_reloaded_config(&self) {
        let snapshot = self.config.current();
        self.registry.reload_config(RegistryConfig {
            poll_interval: Duration::from_millis(snapshot.registry.poll_interval_ms),
            breaker_failure_threshold: snapshot.registry.breaker_failure_threshold,
            breaker_cooldown: Duration::from_millis(snapshot.registry.breaker_cooldown_ms),
            max_in_flight: snapshot.registry.max_in_flight,
        });
    }
}
