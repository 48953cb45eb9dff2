// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Event hub: single-writer fan-out of state changes to subscribed
//! WebSocket sessions (§4.3).

pub mod error;
pub mod frame;
pub mod hub;
pub mod subscriber;

pub use error::HubError;
pub use frame::{ClientFrame, ServerFrame};
pub use hub::{Hub, HubConfig, RegisterRequest};
pub use subscriber::{Subscriber, OUTBOUND_QUEUE_DEPTH};
