// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire frames exchanged with subscribers over the WebSocket session (§4.3).

use ccp_core::{AgentName, StateDelta};
use serde::{Deserialize, Serialize};

/// A frame the hub writes to a subscriber's socket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "delta")]
    Delta(StateDelta),
    #[serde(rename = "ping")]
    Ping { nonce: u64 },
    #[serde(rename = "server_closing")]
    ServerClosing { reason: String },
}

/// A frame a subscriber sends to the hub.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Replace the subscriber's interest set. An empty list means "all agents".
    #[serde(rename = "subscribe")]
    Subscribe { interests: Vec<AgentName> },
    #[serde(rename = "pong")]
    Pong { nonce: u64 },
}
