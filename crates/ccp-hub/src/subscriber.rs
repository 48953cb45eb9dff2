// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::frame::ServerFrame;
use ccp_core::{AgentName, SubscriberId};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tokio::sync::mpsc;

/// The hub's bounded per-subscriber outbound queue (§4.3). Full means the
/// subscriber is too slow; it gets dropped rather than blocking dispatch.
pub const OUTBOUND_QUEUE_DEPTH: usize = 256;

pub struct Subscriber {
    pub id: SubscriberId,
    outbound: mpsc::Sender<ServerFrame>,
    interests: parking_lot::RwLock<HashSet<AgentName>>,
    last_pong_epoch_ms: AtomicU64,
    violations: AtomicU32,
}

impl Subscriber {
    pub fn new(id: SubscriberId, outbound: mpsc::Sender<ServerFrame>, now_epoch_ms: u64) -> Self {
        Self {
            id,
            outbound,
            interests: parking_lot::RwLock::new(HashSet::new()),
            last_pong_epoch_ms: AtomicU64::new(now_epoch_ms),
            violations: AtomicU32::new(0),
        }
    }

    /// Non-blocking enqueue. `Err` means the outbound queue is full (or the
    /// subscriber's session already dropped its receiver) and the caller
    /// should treat this subscriber as a laggard.
    pub fn try_send(&self, frame: ServerFrame) -> Result<(), ()> {
        self.outbound.try_send(frame).map_err(|_| ())
    }

    pub fn set_interests(&self, interests: Vec<AgentName>) {
        *self.interests.write() = interests.into_iter().collect();
    }

    /// An empty interest set means "subscribed to everything" (§4.3).
    pub fn interested_in(&self, agent: Option<&AgentName>) -> bool {
        match agent {
            None => true,
            Some(name) => {
                let interests = self.interests.read();
                interests.is_empty() || interests.contains(name)
            }
        }
    }

    pub fn record_pong(&self, epoch_ms: u64) {
        self.last_pong_epoch_ms.store(epoch_ms, Ordering::SeqCst);
    }

    pub fn last_pong_epoch_ms(&self) -> u64 {
        self.last_pong_epoch_ms.load(Ordering::SeqCst)
    }

    /// Returns the violation count after incrementing.
    pub fn record_violation(&self) -> u32 {
        self.violations.fetch_add(1, Ordering::SeqCst) + 1
    }
}
