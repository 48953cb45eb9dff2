// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped work context: the deadline and cancellation signal threaded
//! through every Transport/Registry/Discovery call (§5 Concurrency model).
//!
//! Deadline resolution order is caller-supplied, then the component
//! default, then the process ceiling — whichever is smallest wins, so a
//! misbehaving caller can never outlive the server's own shutdown budget.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Hard upper bound no single operation may exceed regardless of what a
/// caller asks for.
pub const PROCESS_CEILING: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct WorkCtx {
    pub deadline: Duration,
    pub cancel: CancellationToken,
}

impl WorkCtx {
    /// Resolve a deadline from `requested` (caller-supplied, if any), a
    /// `component_default`, and the process ceiling, taking the smallest.
    pub fn new(requested: Option<Duration>, component_default: Duration, parent: &CancellationToken) -> Self {
        let mut deadline = component_default.min(PROCESS_CEILING);
        if let Some(requested) = requested {
            deadline = deadline.min(requested);
        }
        Self { deadline, cancel: parent.child_token() }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_deadline_cannot_exceed_process_ceiling() {
        let root = CancellationToken::new();
        let ctx = WorkCtx::new(Some(Duration::from_secs(99999)), Duration::from_secs(30), &root);
        assert!(ctx.deadline <= PROCESS_CEILING);
    }

    #[test]
    fn no_requested_deadline_falls_back_to_component_default() {
        let root = CancellationToken::new();
        let ctx = WorkCtx::new(None, Duration::from_secs(10), &root);
        assert_eq!(ctx.deadline, Duration::from_secs(10));
    }

    #[test]
    fn cancelling_parent_cancels_child_ctx() {
        let root = CancellationToken::new();
        let ctx = WorkCtx::new(None, Duration::from_secs(10), &root);
        root.cancel();
        assert!(ctx.is_cancelled());
    }
}
