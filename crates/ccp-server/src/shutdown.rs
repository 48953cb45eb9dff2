// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal handling: SIGHUP reloads config, SIGTERM/SIGINT drive a
//! coordinated shutdown in the order fixed by §6 — stop accepting new
//! connections, cancel the registry poll loop, close the hub, cancel
//! discovery, then join background tasks under a deadline.

use crate::app::App;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

pub async fn run(app: Arc<App>) {
    let mut sighup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(err) => {
            warn!(%err, "failed to install SIGHUP handler");
            return;
        }
    };
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(err) => {
            warn!(%err, "failed to install SIGTERM handler");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = sighup.recv() => {
                info!("SIGHUP received, reloading config");
                match app.config.reload().await {
                    Ok(()) => app.apply_reloaded_config(),
                    Err(err) => warn!(%err, "config reload failed, keeping previous snapshot"),
                }
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down");
                coordinated_shutdown(&app).await;
                return;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("SIGINT received, shutting down");
                coordinated_shutdown(&app).await;
                return;
            }
        }
    }
}

async fn coordinated_shutdown(app: &Arc<App>) {
    app.shutdown.cancel();
    app.registry.shutdown(Duration::from_secs(10)).await;
    app.hub.shutdown();
    app.scheduler.cancel_all();
    info!("shutdown sequence complete");
}
