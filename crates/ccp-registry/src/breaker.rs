// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent circuit breaker (§4.2).
//!
//! After `failure_threshold` consecutive transport failures the breaker
//! opens for `cooldown`. One trial call is let through after the cooldown
//! elapses; it either closes the breaker (success) or reopens it (failure).

use ccp_core::Clock;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

pub struct CircuitBreaker {
    clock: Arc<dyn Clock>,
    failure_threshold: u32,
    cooldown: Duration,
    inner: parking_lot::Mutex<Inner>,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Outcome of asking whether a call may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Proceed normally.
    Allowed,
    /// Proceed, but this is the single trial probe for a half-open breaker.
    Trial,
    /// Short-circuit: do not occupy a semaphore slot or call the transport.
    Rejected,
}

impl CircuitBreaker {
    pub fn new(clock: Arc<dyn Clock>, failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            clock,
            failure_threshold,
            cooldown,
            inner: parking_lot::Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, 5, Duration::from_secs(30))
    }

    pub fn admit(&self) -> Admission {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Closed => Admission::Allowed,
            State::HalfOpen => Admission::Rejected,
            State::Open => match inner.opened_at {
                Some(opened_at) if self.clock.now().duration_since(opened_at) >= self.cooldown => {
                    inner.state = State::HalfOpen;
                    Admission::Trial
                }
                Some(_) => Admission::Rejected,
                // Open with no opened_at should never happen, but treat it as
                // cooldown-elapsed rather than panic: let one trial through.
                None => {
                    inner.state = State::HalfOpen;
                    Admission::Trial
                }
            },
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.state = State::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            State::HalfOpen => {
                inner.state = State::Open;
                inner.opened_at = Some(self.clock.now());
            }
            State::Closed | State::Open => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = State::Open;
                    inner.opened_at = Some(self.clock.now());
                }
            }
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.inner.lock().state, State::Open)
    }
}
