// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide transport counters, cheap enough to bump on every call.
#[derive(Debug, Default)]
pub struct TransportMetrics {
    pub calls_total: AtomicU64,
    pub calls_ok: AtomicU64,
    pub calls_timeout: AtomicU64,
    pub calls_fault: AtomicU64,
    pub calls_parse_error: AtomicU64,
}

impl TransportMetrics {
    pub fn record_ok(&self) {
        self.calls_total.fetch_add(1, Ordering::Relaxed);
        self.calls_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.calls_total.fetch_add(1, Ordering::Relaxed);
        self.calls_timeout.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fault(&self) {
        self.calls_total.fetch_add(1, Ordering::Relaxed);
        self.calls_fault.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_error(&self) {
        self.calls_total.fetch_add(1, Ordering::Relaxed);
        self.calls_parse_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TransportMetricsSnapshot {
        TransportMetricsSnapshot {
            calls_total: self.calls_total.load(Ordering::Relaxed),
            calls_ok: self.calls_ok.load(Ordering::Relaxed),
            calls_timeout: self.calls_timeout.load(Ordering::Relaxed),
            calls_fault: self.calls_fault.load(Ordering::Relaxed),
            calls_parse_error: self.calls_parse_error.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportMetricsSnapshot {
    pub calls_total: u64,
    pub calls_ok: u64,
    pub calls_timeout: u64,
    pub calls_fault: u64,
    pub calls_parse_error: u64,
}
