// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared across the control plane (spec §7).
//!
//! Every subsystem keeps its own leaf error enum (`TransportError`,
//! `DiscoveryError`, ...) and converts into `CoreError` at its boundary, the
//! same way the daemon this was adapted from keeps `ConnectionError` and
//! `LifecycleError` local to their modules and only unifies them where a
//! caller outside the module needs one error type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error code, stable across releases (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidInput,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    Timeout,
    Cancelled,
    Unavailable,
    TransportFault,
    ParseError,
    Internal,
}

impl ErrorCode {
    /// The HTTP status class this code maps to at the boundary (§7), for
    /// callers that need it; the core itself never returns an HTTP response.
    pub fn status_class(self) -> u16 {
        match self {
            ErrorCode::InvalidInput => 400,
            ErrorCode::Unauthenticated => 401,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::Conflict => 409,
            ErrorCode::Timeout
            | ErrorCode::Cancelled
            | ErrorCode::Unavailable
            | ErrorCode::TransportFault
            | ErrorCode::ParseError => 502,
            ErrorCode::Internal => 500,
        }
    }
}

/// Unified error type for cross-subsystem boundaries.
///
/// Every variant carries a short machine code and a human string;
/// `Internal` additionally carries a correlation id so an operator can find
/// the matching log line without the error body leaking anything sensitive.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("timed out")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("transport fault {code}: {message}")]
    TransportFault { code: i32, message: String },

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("internal error (correlation_id={correlation_id})")]
    Internal { correlation_id: String, detail: String },
}

impl CoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::InvalidInput(_) => ErrorCode::InvalidInput,
            CoreError::Unauthenticated => ErrorCode::Unauthenticated,
            CoreError::Forbidden => ErrorCode::Forbidden,
            CoreError::NotFound(_) => ErrorCode::NotFound,
            CoreError::Conflict(_) => ErrorCode::Conflict,
            CoreError::Timeout => ErrorCode::Timeout,
            CoreError::Cancelled => ErrorCode::Cancelled,
            CoreError::Unavailable(_) => ErrorCode::Unavailable,
            CoreError::TransportFault { .. } => ErrorCode::TransportFault,
            CoreError::ParseError(_) => ErrorCode::ParseError,
            CoreError::Internal { .. } => ErrorCode::Internal,
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal { correlation_id: uuid::Uuid::new_v4().to_string(), detail: detail.into() }
    }
}

/// User-visible response envelope (§7). Never contains credentials, tokens,
/// or stack traces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    pub code: ErrorCode,
    pub request_id: Option<String>,
}

impl From<&CoreError> for ErrorResponse {
    fn from(err: &CoreError) -> Self {
        let request_id = match err {
            CoreError::Internal { correlation_id, .. } => Some(correlation_id.clone()),
            _ => None,
        };
        Self { status: "error", message: err.to_string(), code: err.code(), request_id }
    }
}
