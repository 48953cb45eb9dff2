// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Panic containment for spawned background tasks (§7). A panicking poll
//! sweep, discovery worker, or hub loop must not bring down the process; it
//! gets logged with a correlation id instead.

use futures_util::FutureExt;
use std::future::Future;
use tracing::error;
use uuid::Uuid;

/// Spawn `future` under `tokio::spawn`, catching a panic so it becomes a log
/// line instead of an unhandled task termination. `label` identifies which
/// background loop this was, for the log line.
pub fn spawn_guarded<F>(label: &'static str, future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let correlation_id = Uuid::new_v4();
        if let Err(panic) = std::panic::AssertUnwindSafe(future).catch_unwind().await {
            let detail = panic_message(&panic);
            error!(%correlation_id, task = label, %detail, "background task panicked");
        }
    });
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn panicking_task_does_not_abort_process() {
        let notify = Arc::new(Notify::new());
        let waiter = notify.clone();
        spawn_guarded("test-task", async move {
            notify.notify_one();
            panic!("boom");
        });
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter.notified())
            .await
            .unwrap();
    }
}
