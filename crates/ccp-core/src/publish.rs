// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Narrow interface producers of `StateDelta` depend on instead of the hub
//! itself, so the registry and discovery scheduler don't need a dependency
//! on `ccp-hub` just to publish events into it.

use crate::delta::StateDelta;

pub trait PublishSink: Send + Sync {
    fn publish(&self, delta: StateDelta);
}

/// Test double that records every published delta in order.
#[derive(Default)]
pub struct RecordingSink {
    deltas: parking_lot::Mutex<Vec<StateDelta>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<StateDelta> {
        self.deltas.lock().clone()
    }
}

impl PublishSink for RecordingSink {
    fn publish(&self, delta: StateDelta) {
        self.deltas.lock().push(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AgentName;

    #[test]
    fn recording_sink_preserves_publish_order() {
        let sink = RecordingSink::new();
        sink.publish(StateDelta::AgentConnected { agent: AgentName::new("a") });
        sink.publish(StateDelta::AgentConnected { agent: AgentName::new("b") });
        let recorded = sink.snapshot();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].agent().unwrap().as_str(), "a");
        assert_eq!(recorded[1].agent().unwrap().as_str(), "b");
    }
}
