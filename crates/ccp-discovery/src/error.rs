// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("a scan for {cidr}:{port} is already running")]
    AlreadyScanning { cidr: String, port: u16 },

    #[error("task not found: {0}")]
    TaskNotFound(String),
}

impl From<&DiscoveryError> for ccp_core::CoreError {
    fn from(err: &DiscoveryError) -> Self {
        match err {
            DiscoveryError::InvalidCidr(msg) => ccp_core::CoreError::InvalidInput(msg.clone()),
            DiscoveryError::AlreadyScanning { cidr, port } => {
                ccp_core::CoreError::Conflict(format!("scan already running for {cidr}:{port}"))
            }
            DiscoveryError::TaskNotFound(id) => ccp_core::CoreError::NotFound(id.clone()),
        }
    }
}
