// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ccp-core: shared data model and error taxonomy for the control plane.
//!
//! Nothing in this crate performs I/O. It exists so that every other crate
//! in the workspace (transport, registry, hub, discovery, config,
//! repository, auth, server) can agree on the same `Agent`, `ProcessState`,
//! `StateDelta` and `CoreError` without a cyclic dependency between them.

pub mod clock;
pub mod delta;
pub mod discovery;
pub mod error;
pub mod ids;
pub mod process;
pub mod publish;

pub use clock::{Clock, FakeClock, SystemClock};
pub use delta::StateDelta;
pub use discovery::{DiscoveryResult, DiscoveryResultStatus, DiscoveryTask, DiscoveryTaskStatus};
pub use error::{CoreError, ErrorCode, ErrorResponse};
pub use ids::{AgentName, SubscriberId, TaskId};
pub use process::{Agent, ProcessSnapshot, ProcessState};
pub use publish::{PublishSink, RecordingSink};
