// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control Plane Daemon (ccpd)
//!
//! Supervises a fleet of remote process-management agents: polls them over
//! XML-RPC, fans out state changes to subscribed operators, and runs
//! CIDR-range discovery scans on demand.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use ccp_auth::StaticTokenAuthenticator;
use ccp_config::{ConfigHandle, ConfigLoader};
use ccp_core::SystemClock;
use ccp_repository::InMemoryRepository;
use ccp_server::{panic_guard, router, shutdown, App};
use ccp_transport::HttpTransport;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logging();

    let config_path =
        std::env::var("CCPD_CONFIG_PATH").unwrap_or_else(|_| "/etc/ccpd/config.toml".to_string());
    let loader = ConfigLoader::new(config_path);
    let config = ConfigHandle::load_initial(ConfigLoader::new(loader.base_path.clone()))?;
    let agent_credentials = loader.load_agent_credentials(&config.current().agents)?;

    let transport = Arc::new(HttpTransport::new()?);
    let clock = Arc::new(SystemClock);
    let repository = Arc::new(InMemoryRepository::new());
    let token = std::env::var("CCPD_AUTH_TOKEN").unwrap_or_else(|_| "dev-token".to_string());
    let authenticator = Arc::new(StaticTokenAuthenticator::new(token));

    let app = App::new(config, transport, clock, repository, authenticator, agent_credentials);

    let hub = app.hub.clone();
    panic_guard::spawn_guarded("hub-run", async move { hub.clone().run().await });
    app.registry.spawn_poll_loop(std::time::Duration::from_secs(15));

    let listen_addr = app.config.current().server.listen_addr.clone();
    let router = router::build_router(app.clone());
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!(addr = %listen_addr, "ccpd listening");

    tokio::select! {
        result = axum::serve(listener, router) => {
            if let Err(err) = result {
                tracing::error!(%err, "server exited with error");
            }
        }
        () = shutdown::run(app) => {}
    }

    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
}
