// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote XML-RPC client (§4.1).
//!
//! One `reqwest::Client` is shared across every call so the underlying
//! connection pool is reused instead of reconnecting per request, the same
//! discipline the daemon this was adapted from applies to its Unix socket
//! transport.

use crate::error::TransportError;
use crate::metrics::TransportMetrics;
use crate::xmlrpc::{self, MethodResponse, Value};
use async_trait::async_trait;
use ccp_core::process::ProcessSnapshot;
use std::sync::Arc;
use std::time::Duration;

/// Minimal agent identification + process list, as returned by a discovery
/// probe's `get_state` call.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentState {
    pub version: Option<String>,
    pub processes: Vec<ProcessSnapshot>,
}

/// Outcome of a `start`/`stop`/`restart` invocation once idempotency rules
/// have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Ok,
    Rejected,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(
        &self,
        endpoint: &str,
        method: &str,
        args: &[Value],
        deadline: Duration,
    ) -> Result<Value, TransportError>;

    async fn start(
        &self,
        endpoint: &str,
        process_name: &str,
        deadline: Duration,
    ) -> Result<CallOutcome, TransportError>;

    async fn stop(
        &self,
        endpoint: &str,
        process_name: &str,
        deadline: Duration,
    ) -> Result<CallOutcome, TransportError>;

    async fn restart(
        &self,
        endpoint: &str,
        process_name: &str,
        deadline: Duration,
    ) -> Result<CallOutcome, TransportError>;

    async fn get_state(&self, endpoint: &str, deadline: Duration) -> Result<AgentState, TransportError>;

    async fn list_processes(
        &self,
        endpoint: &str,
        deadline: Duration,
    ) -> Result<Vec<ProcessSnapshot>, TransportError>;
}

/// `reqwest`-backed implementation dialing real XML-RPC endpoints over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
    metrics: Arc<TransportMetrics>,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        Ok(Self { client, metrics: Arc::new(TransportMetrics::default()) })
    }

    pub fn metrics(&self) -> Arc<TransportMetrics> {
        self.metrics.clone()
    }

    /// Send the whole request/response round trip under a single deadline
    /// covering connect, write, and read, mirroring the "one timeout wraps
    /// the entire operation" idiom used elsewhere in this codebase.
    async fn send(
        &self,
        endpoint: &str,
        method: &str,
        args: &[Value],
        deadline: Duration,
    ) -> Result<MethodResponse, TransportError> {
        let body = xmlrpc::encode_call(method, args)?;
        let result = tokio::time::timeout(deadline, async {
            let resp = self
                .client
                .post(endpoint)
                .header("Content-Type", "text/xml")
                .body(body)
                .send()
                .await
                .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
            let text = resp.text().await.map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
            xmlrpc::parse_response(&text)
        })
        .await
        .map_err(|_| TransportError::Timeout)?;

        match &result {
            Ok(_) => self.metrics.record_ok(),
            Err(TransportError::ParseError(_)) => self.metrics.record_parse_error(),
            Err(_) => {}
        }
        result
    }

    fn idempotent_call(
        response: Result<MethodResponse, TransportError>,
        idempotent_substring: &str,
    ) -> Result<CallOutcome, TransportError> {
        match response? {
            MethodResponse::Value(v) => match v.as_bool() {
                Some(true) => Ok(CallOutcome::Ok),
                Some(false) => Ok(CallOutcome::Rejected),
                None => Err(TransportError::ParseError("expected scalar boolean".into())),
            },
            MethodResponse::Fault { fault_code, fault_string } => {
                if fault_string.contains(idempotent_substring) {
                    Ok(CallOutcome::Ok)
                } else {
                    Err(TransportError::Fault { fault_code, fault_string })
                }
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        endpoint: &str,
        method: &str,
        args: &[Value],
        deadline: Duration,
    ) -> Result<Value, TransportError> {
        match self.send(endpoint, method, args, deadline).await? {
            MethodResponse::Value(v) => Ok(v),
            MethodResponse::Fault { fault_code, fault_string } => {
                self.metrics.record_fault();
                Err(TransportError::Fault { fault_code, fault_string })
            }
        }
    }

    async fn start(
        &self,
        endpoint: &str,
        process_name: &str,
        deadline: Duration,
    ) -> Result<CallOutcome, TransportError> {
        let response = self
            .send(endpoint, "supervisor.startProcess", &[Value::String(process_name.into())], deadline)
            .await;
        let outcome = Self::idempotent_call(response, "ALREADY_STARTED");
        if outcome.is_err() {
            self.metrics.record_fault();
        }
        outcome
    }

    async fn stop(
        &self,
        endpoint: &str,
        process_name: &str,
        deadline: Duration,
    ) -> Result<CallOutcome, TransportError> {
        let response = self
            .send(endpoint, "supervisor.stopProcess", &[Value::String(process_name.into())], deadline)
            .await;
        let outcome = Self::idempotent_call(response, "NOT_RUNNING");
        if outcome.is_err() {
            self.metrics.record_fault();
        }
        outcome
    }

    async fn restart(
        &self,
        endpoint: &str,
        process_name: &str,
        deadline: Duration,
    ) -> Result<CallOutcome, TransportError> {
        // restart has no idempotency carve-out (§4.1): all faults propagate.
        match self
            .send(endpoint, "supervisor.restartProcess", &[Value::String(process_name.into())], deadline)
            .await?
        {
            MethodResponse::Value(v) => match v.as_bool() {
                Some(true) => Ok(CallOutcome::Ok),
                Some(false) => Ok(CallOutcome::Rejected),
                None => Err(TransportError::ParseError("expected scalar boolean".into())),
            },
            MethodResponse::Fault { fault_code, fault_string } => {
                self.metrics.record_fault();
                Err(TransportError::Fault { fault_code, fault_string })
            }
        }
    }

    async fn get_state(&self, endpoint: &str, deadline: Duration) -> Result<AgentState, TransportError> {
        let version = match self.send(endpoint, "supervisor.getVersion", &[], deadline).await? {
            MethodResponse::Value(v) => v.as_str().map(str::to_string),
            MethodResponse::Fault { fault_code, fault_string } => {
                self.metrics.record_fault();
                return Err(TransportError::Fault { fault_code, fault_string });
            }
        };
        let processes = self.list_processes(endpoint, deadline).await?;
        Ok(AgentState { version, processes })
    }

    async fn list_processes(
        &self,
        endpoint: &str,
        deadline: Duration,
    ) -> Result<Vec<ProcessSnapshot>, TransportError> {
        let value = match self.send(endpoint, "supervisor.getAllProcessInfo", &[], deadline).await? {
            MethodResponse::Value(v) => v,
            MethodResponse::Fault { fault_code, fault_string } => {
                self.metrics.record_fault();
                return Err(TransportError::Fault { fault_code, fault_string });
            }
        };
        let items = value
            .as_array()
            .ok_or_else(|| TransportError::ParseError("expected array of process structs".into()))?;
        items.iter().map(process_snapshot_from_value).collect()
    }
}

fn process_snapshot_from_value(value: &Value) -> Result<ProcessSnapshot, TransportError> {
    let name = value
        .field("name")
        .and_then(Value::as_str)
        .ok_or_else(|| TransportError::ParseError("process struct missing name".into()))?
        .to_string();
    let group = value.field("group").and_then(Value::as_str).unwrap_or(&name).to_string();
    let state_ordinal = match value.field("state") {
        Some(Value::Int(i)) => *i,
        _ => return Err(TransportError::ParseError("process struct missing state".into())),
    };
    let pid = match value.field("pid") {
        Some(Value::Int(i)) if *i > 0 => Some(*i as u32),
        _ => None,
    };
    let description = value.field("description").and_then(Value::as_str).unwrap_or("").to_string();
    let start_time = match value.field("start") {
        Some(Value::Int(i)) if *i > 0 => chrono::DateTime::from_timestamp(*i, 0),
        _ => None,
    };
    let exit_status = match value.field("exitstatus") {
        Some(Value::Int(i)) => Some(*i as i32),
        _ => None,
    };
    Ok(ProcessSnapshot {
        name,
        group,
        state: ccp_core::ProcessState::from_ordinal(state_ordinal),
        pid,
        start_time,
        exit_status,
        description,
    })
}
