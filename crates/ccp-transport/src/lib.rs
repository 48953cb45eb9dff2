// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! XML-RPC transport: request encoding, response parsing, and the client
//! that turns `(endpoint, method, args)` into a typed outcome (§4.1).

pub mod client;
pub mod error;
pub mod metrics;
pub mod xmlrpc;

pub use client::{AgentState, CallOutcome, HttpTransport, Transport};
pub use error::TransportError;
pub use metrics::{TransportMetrics, TransportMetricsSnapshot};
pub use xmlrpc::{MethodResponse, Value};
