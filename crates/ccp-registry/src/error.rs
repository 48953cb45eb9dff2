// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ccp_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("agent not found: {0}")]
    NotFound(String),

    #[error("agent already registered: {0}")]
    AlreadyExists(String),

    #[error("breaker open for {0}")]
    BreakerOpen(String),

    #[error("registry is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<&RegistryError> for ccp_core::CoreError {
    fn from(err: &RegistryError) -> Self {
        match err {
            RegistryError::NotFound(name) => ccp_core::CoreError::NotFound(name.clone()),
            RegistryError::AlreadyExists(name) => {
                ccp_core::CoreError::Conflict(format!("agent already registered: {name}"))
            }
            RegistryError::BreakerOpen(name) => {
                ccp_core::CoreError::Unavailable(format!("breaker open for {name}"))
            }
            RegistryError::ShuttingDown => ccp_core::CoreError::Unavailable("shutting down".into()),
            RegistryError::Transport(t) => ccp_core::CoreError::from(t),
        }
    }
}
