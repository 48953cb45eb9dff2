// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event hub (§4.3): single-writer fan-out of `StateDelta`s to subscribed
//! WebSocket sessions.
//!
//! The subscriber set is mutated only inside `run`'s central loop. Every
//! other caller talks to the hub through channels, never through a shared
//! lock taken for writing.

use crate::error::HubError;
use crate::frame::ServerFrame;
use crate::subscriber::{Subscriber, OUTBOUND_QUEUE_DEPTH};
use ccp_core::{AgentName, Clock, PublishSink, StateDelta, SubscriberId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct RegisterRequest {
    pub id: SubscriberId,
    pub outbound: mpsc::Sender<ServerFrame>,
    pub reply: oneshot::Sender<Result<(), HubError>>,
}

#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    pub max_connections: usize,
    pub heartbeat_interval: Duration,
    pub violation_limit: u32,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 500,
            heartbeat_interval: Duration::from_secs(30),
            violation_limit: 10,
        }
    }
}

pub struct Hub {
    subscribers: RwLock<HashMap<SubscriberId, Arc<Subscriber>>>,
    connection_count: AtomicUsize,
    config: HubConfig,
    clock: Arc<dyn Clock>,

    register_tx: mpsc::Sender<RegisterRequest>,
    register_rx: tokio::sync::Mutex<mpsc::Receiver<RegisterRequest>>,
    unregister_tx: mpsc::Sender<SubscriberId>,
    unregister_rx: tokio::sync::Mutex<mpsc::Receiver<SubscriberId>>,
    broadcast_tx: mpsc::UnboundedSender<StateDelta>,
    broadcast_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<StateDelta>>,
    cleanup_tx: mpsc::Sender<SubscriberId>,
    cleanup_rx: tokio::sync::Mutex<mpsc::Receiver<SubscriberId>>,

    cancel: CancellationToken,
}

impl Hub {
    pub fn new(config: HubConfig, clock: Arc<dyn Clock>) -> Arc<Self> {
        let (register_tx, register_rx) = mpsc::channel(64);
        let (unregister_tx, unregister_rx) = mpsc::channel(64);
        let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();
        let (cleanup_tx, cleanup_rx) = mpsc::channel(256);

        Arc::new(Self {
            subscribers: RwLock::new(HashMap::new()),
            connection_count: AtomicUsize::new(0),
            config,
            clock,
            register_tx,
            register_rx: tokio::sync::Mutex::new(register_rx),
            unregister_tx,
            unregister_rx: tokio::sync::Mutex::new(unregister_rx),
            broadcast_tx,
            broadcast_rx: tokio::sync::Mutex::new(broadcast_rx),
            cleanup_tx,
            cleanup_rx: tokio::sync::Mutex::new(cleanup_rx),
            cancel: CancellationToken::new(),
        })
    }

    /// Register a new subscriber session. Rejected before any structural
    /// change if it would exceed `max_connections` (§4.3 Connection cap).
    pub async fn register(&self, outbound: mpsc::Sender<ServerFrame>) -> Result<SubscriberId, HubError> {
        let id = SubscriberId::new();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.register_tx
            .send(RegisterRequest { id, outbound, reply: reply_tx })
            .await
            .map_err(|_| HubError::ShuttingDown)?;
        reply_rx.await.map_err(|_| HubError::ShuttingDown)??;
        Ok(id)
    }

    pub async fn unregister(&self, id: SubscriberId) {
        let _ = self.unregister_tx.send(id).await;
    }

    pub fn set_interests(&self, id: SubscriberId, interests: Vec<AgentName>) {
        if let Some(sub) = self.subscribers.read().get(&id) {
            sub.set_interests(interests);
        }
    }

    pub fn record_pong(&self, id: SubscriberId) {
        if let Some(sub) = self.subscribers.read().get(&id) {
            sub.record_pong(self.clock.epoch_ms());
        }
    }

    /// A malformed frame or rate-limit breach. Forces disconnection once the
    /// per-subscriber violation count exceeds the configured limit.
    pub async fn record_violation(&self, id: SubscriberId) {
        let exceeded = self
            .subscribers
            .read()
            .get(&id)
            .map(|sub| sub.record_violation() > self.config.violation_limit)
            .unwrap_or(false);
        if exceeded {
            let _ = self.cleanup_tx.send(id).await;
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::SeqCst)
    }

    /// Central dispatch loop (§4.3). Selects one message per iteration from
    /// the four inbound channels plus the heartbeat ticker, and processes it
    /// to completion before the next select — this is the single writer of
    /// the subscriber set.
    pub async fn run(self: Arc<Self>) {
        let mut register_rx = self.register_rx.lock().await;
        let mut unregister_rx = self.unregister_rx.lock().await;
        let mut broadcast_rx = self.broadcast_rx.lock().await;
        let mut cleanup_rx = self.cleanup_rx.lock().await;
        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.shutdown_broadcast("server shutting down").await;
                    break;
                }
                Some(req) = register_rx.recv() => self.handle_register(req),
                Some(id) = unregister_rx.recv() => self.handle_cleanup(id).await,
                Some(delta) = broadcast_rx.recv() => self.dispatch(delta).await,
                Some(id) = cleanup_rx.recv() => self.handle_cleanup(id).await,
                _ = heartbeat.tick() => self.send_heartbeat().await,
            }
        }
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn handle_register(&self, req: RegisterRequest) {
        let current = self.connection_count.load(Ordering::SeqCst);
        if current >= self.config.max_connections {
            let _ = req.reply.send(Err(HubError::ConnectionLimitReached));
            return;
        }
        self.connection_count.fetch_add(1, Ordering::SeqCst);
        let subscriber = Arc::new(Subscriber::new(req.id, req.outbound, self.clock.epoch_ms()));
        self.subscribers.write().insert(req.id, subscriber);
        let _ = req.reply.send(Ok(()));
    }

    /// Shared by explicit client unsubscribe and the laggard/heartbeat
    /// cleanup path. Decrements the connection counter by exactly one, and
    /// only if the subscriber was actually present (idempotent against a
    /// subscriber queued for cleanup twice).
    async fn handle_cleanup(&self, id: SubscriberId) {
        let removed = self.subscribers.write().remove(&id);
        if removed.is_some() {
            self.connection_count.fetch_sub(1, Ordering::SeqCst);
            debug!(subscriber = %id, "subscriber removed");
        }
    }

    /// Dispatch one delta to every interested subscriber (§4.3 Dispatch).
    async fn dispatch(&self, delta: StateDelta) {
        let agent = delta.agent().cloned();
        let frame = ServerFrame::Delta(delta);
        let mut laggards = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for subscriber in subscribers.values() {
                if !subscriber.interested_in(agent.as_ref()) {
                    continue;
                }
                if subscriber.try_send(frame.clone()).is_err() {
                    laggards.push(subscriber.id);
                }
            }
        }
        for id in laggards {
            if self.cleanup_tx.try_send(id).is_err() {
                // cleanup channel itself saturated: force-close directly,
                // the documented last resort (§4.3).
                warn!(subscriber = %id, "cleanup channel saturated, forcing close");
                self.handle_cleanup(id).await;
            }
        }
    }

    async fn send_heartbeat(&self) {
        let now = self.clock.epoch_ms();
        let deadline_ms = self.config.heartbeat_interval.as_millis() as u64 * 3;
        let nonce = now;
        let mut laggards = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for subscriber in subscribers.values() {
                if now.saturating_sub(subscriber.last_pong_epoch_ms()) > deadline_ms {
                    laggards.push(subscriber.id);
                    continue;
                }
                let _ = subscriber.try_send(ServerFrame::Ping { nonce });
            }
        }
        for id in laggards {
            let _ = self.cleanup_tx.try_send(id);
        }
    }

    async fn shutdown_broadcast(&self, reason: &str) {
        let subscribers = self.subscribers.read();
        for subscriber in subscribers.values() {
            let _ = subscriber.try_send(ServerFrame::ServerClosing { reason: reason.to_string() });
        }
    }
}

impl PublishSink for Hub {
    fn publish(&self, delta: StateDelta) {
        let _ = self.broadcast_tx.send(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccp_core::FakeClock;

    async fn spawn_hub(config: HubConfig) -> (Arc<Hub>, Arc<FakeClock>) {
        let clock = Arc::new(FakeClock::new());
        let hub = Hub::new(config, clock.clone());
        let run_hub = hub.clone();
        tokio::spawn(async move { run_hub.run().await });
        (hub, clock)
    }

    #[tokio::test]
    async fn dispatch_delivers_to_interested_subscriber() {
        let (hub, _clock) = spawn_hub(HubConfig::default()).await;
        let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        hub.register(tx).await.unwrap();
        hub.publish(StateDelta::AgentConnected { agent: AgentName::new("a") });
        let frame = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert!(matches!(frame, ServerFrame::Delta(StateDelta::AgentConnected { .. })));
    }

    #[tokio::test]
    async fn connection_cap_rejects_over_limit() {
        let (hub, _clock) = spawn_hub(HubConfig { max_connections: 1, ..HubConfig::default() }).await;
        let (tx1, _rx1) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        hub.register(tx1).await.unwrap();
        let (tx2, _rx2) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        assert!(matches!(hub.register(tx2).await, Err(HubError::ConnectionLimitReached)));
    }

    #[tokio::test]
    async fn full_outbound_queue_marks_subscriber_as_laggard_and_it_is_dropped() {
        let (hub, _clock) = spawn_hub(HubConfig::default()).await;
        let (tx, rx) = mpsc::channel(1);
        hub.register(tx).await.unwrap();
        // Fill the queue so the next publish cannot enqueue.
        hub.publish(StateDelta::AgentConnected { agent: AgentName::new("a") });
        hub.publish(StateDelta::AgentConnected { agent: AgentName::new("b") });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hub.connection_count(), 0);
        drop(rx);
    }

    #[tokio::test]
    async fn explicit_unregister_decrements_connection_count() {
        let (hub, _clock) = spawn_hub(HubConfig::default()).await;
        let (tx, _rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let id = hub.register(tx).await.unwrap();
        assert_eq!(hub.connection_count(), 1);
        hub.unregister(id).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(hub.connection_count(), 0);
    }
}
