//! A lifecycle bridge that records every hook invocation.

use crate::context::ContextValue;
use crate::lifecycle::LifecycleBridge;
use crate::tree::{GuardBehavior, NodeId};
use parking_lot::Mutex;

/// One recorded lifecycle hook invocation.
///
/// The context argument is captured as JSON (`None` for `Undefined`) so
/// tests can assert exact call sequences with plain equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookCall {
    /// The update guard ran.
    UpdateGuard {
        /// Component type name.
        component: String,
        /// The next-context argument.
        context: Option<serde_json::Value>,
    },
    /// The will-receive hook ran.
    WillReceive {
        /// Component type name.
        component: String,
        /// The next-context argument.
        context: Option<serde_json::Value>,
    },
    /// The will-update hook ran.
    WillUpdate {
        /// Component type name.
        component: String,
        /// The next-context argument.
        context: Option<serde_json::Value>,
    },
}

impl HookCall {
    /// The component the hook ran for.
    #[must_use]
    pub fn component(&self) -> &str {
        match self {
            Self::UpdateGuard { component, .. }
            | Self::WillReceive { component, .. }
            | Self::WillUpdate { component, .. } => component,
        }
    }
}

fn snapshot(context: &ContextValue) -> Option<serde_json::Value> {
    context.as_json().cloned()
}

/// A bridge that records calls and reports each component's declared guard
/// decision.
#[derive(Debug, Default)]
pub struct RecordingBridge {
    calls: Mutex<Vec<HookCall>>,
}

impl RecordingBridge {
    /// Creates an empty recording bridge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded calls in invocation order.
    #[must_use]
    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// True when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Clears the recording.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Recorded calls for a single component, in order.
    #[must_use]
    pub fn calls_for(&self, component: &str) -> Vec<HookCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.component() == component)
            .cloned()
            .collect()
    }
}

impl LifecycleBridge for RecordingBridge {
    fn invoke_update_guard(
        &self,
        _node: NodeId,
        component: &str,
        guard: GuardBehavior,
        _next_props: &serde_json::Value,
        _next_state: &serde_json::Value,
        next_context: &ContextValue,
    ) -> bool {
        self.calls.lock().push(HookCall::UpdateGuard {
            component: component.to_string(),
            context: snapshot(next_context),
        });
        guard.allows_update()
    }

    fn invoke_will_receive(
        &self,
        _node: NodeId,
        component: &str,
        _next_props: &serde_json::Value,
        next_context: &ContextValue,
    ) {
        self.calls.lock().push(HookCall::WillReceive {
            component: component.to_string(),
            context: snapshot(next_context),
        });
    }

    fn invoke_will_update(
        &self,
        _node: NodeId,
        component: &str,
        _next_props: &serde_json::Value,
        _next_state: &serde_json::Value,
        next_context: &ContextValue,
    ) {
        self.calls.lock().push(HookCall::WillUpdate {
            component: component.to_string(),
            context: snapshot(next_context),
        });
    }
}
