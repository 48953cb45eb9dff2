// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum HubError {
    #[error("connection limit reached")]
    ConnectionLimitReached,

    #[error("hub is shutting down")]
    ShuttingDown,
}

impl From<&HubError> for ccp_core::CoreError {
    fn from(err: &HubError) -> Self {
        match err {
            HubError::ConnectionLimitReached => {
                ccp_core::CoreError::Unavailable("connection limit reached".into())
            }
            HubError::ShuttingDown => ccp_core::CoreError::Unavailable("shutting down".into()),
        }
    }
}
