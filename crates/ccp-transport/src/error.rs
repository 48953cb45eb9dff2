// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors a remote call can fail with (§4.1, §7).
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("operation rejected")]
    Rejected,

    #[error("remote fault {fault_code}: {fault_string}")]
    Fault { fault_code: i32, fault_string: String },

    #[error("malformed response: {0}")]
    ParseError(String),
}

impl From<&TransportError> for ccp_core::CoreError {
    fn from(err: &TransportError) -> Self {
        match err {
            TransportError::Timeout => ccp_core::CoreError::Timeout,
            TransportError::ConnectFailed(msg) => ccp_core::CoreError::Unavailable(msg.clone()),
            TransportError::Rejected => ccp_core::CoreError::Conflict("operation rejected".into()),
            TransportError::Fault { fault_code, fault_string } => {
                ccp_core::CoreError::TransportFault { code: *fault_code, message: fault_string.clone() }
            }
            TransportError::ParseError(msg) => ccp_core::CoreError::ParseError(msg.clone()),
        }
    }
}
