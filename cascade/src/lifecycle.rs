//! Bridge to the surrounding component-update machinery.
//!
//! The engine does not own lifecycle hooks; it computes the correct
//! next-context value per propagation policy and hands it to the bridge,
//! which runs the component's pre-update hooks. Props and state diffing are
//! owned by the embedding reconciler, so this subsystem forwards them as
//! opaque JSON (null when the embedding supplies nothing).

use crate::context::ContextValue;
use crate::tree::{GuardBehavior, NodeId};

/// The surrounding component-update machinery.
///
/// `invoke_update_guard` runs the component's update guard and returns its
/// decision; the engine may override a `false` decision when a context
/// change forces the update (policy-dependent, see the engine docs).
pub trait LifecycleBridge: Send + Sync {
    /// Runs the component's update guard with the supplied next values.
    fn invoke_update_guard(
        &self,
        node: NodeId,
        component: &str,
        guard: GuardBehavior,
        next_props: &serde_json::Value,
        next_state: &serde_json::Value,
        next_context: &ContextValue,
    ) -> bool;

    /// Runs the will-receive hook with the supplied next values.
    fn invoke_will_receive(
        &self,
        node: NodeId,
        component: &str,
        next_props: &serde_json::Value,
        next_context: &ContextValue,
    );

    /// Runs the will-update hook with the supplied next values.
    fn invoke_will_update(
        &self,
        node: NodeId,
        component: &str,
        next_props: &serde_json::Value,
        next_state: &serde_json::Value,
        next_context: &ContextValue,
    );
}

/// A bridge that runs no hook bodies and reports the declared guard decision.
///
/// Used as the default when the embedding registers no lifecycle machinery.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpBridge;

impl LifecycleBridge for NoOpBridge {
    fn invoke_update_guard(
        &self,
        _node: NodeId,
        _component: &str,
        guard: GuardBehavior,
        _next_props: &serde_json::Value,
        _next_state: &serde_json::Value,
        _next_context: &ContextValue,
    ) -> bool {
        guard.allows_update()
    }

    fn invoke_will_receive(
        &self,
        _node: NodeId,
        _component: &str,
        _next_props: &serde_json::Value,
        _next_context: &ContextValue,
    ) {
        // Intentionally empty
    }

    fn invoke_will_update(
        &self,
        _node: NodeId,
        _component: &str,
        _next_props: &serde_json::Value,
        _next_state: &serde_json::Value,
        _next_context: &ContextValue,
    ) {
        // Intentionally empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_bridge_reports_declared_decision() {
        let bridge = NoOpBridge;
        let node = NodeId(0);
        let null = serde_json::Value::Null;
        let ctx = ContextValue::undefined();

        assert!(bridge.invoke_update_guard(
            node,
            "C",
            GuardBehavior::Update,
            &null,
            &null,
            &ctx
        ));
        assert!(!bridge.invoke_update_guard(
            node,
            "C",
            GuardBehavior::Skip,
            &null,
            &null,
            &ctx
        ));
    }
}
