//! Warn-and-no-op shim for the removed legacy context mechanism.
//!
//! The legacy ambient-value API no longer functions. This module specifies
//! its observable contract: a single diagnostic per offending component type
//! for the life of the process, plus defined fallback values (an empty
//! child-context object on the producer side, `Undefined` on the consumer
//! side). Declaring the legacy API is configuration misuse, never an error.

use crate::context::ContextValue;
use crate::diagnostics::{DiagnosticSink, LegacyKind, LegacyWarning};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

/// Renders the fixed warning text for a legacy child-context producer.
#[must_use]
pub fn legacy_provider_warning(type_name: &str) -> String {
    format!(
        "{type_name} declares legacy child context, which is no longer supported \
         and will not be passed to descendants. Declare a context cell and render \
         a Provider instead."
    )
}

/// Renders the fixed warning text for a legacy class-based consumer.
#[must_use]
pub fn legacy_class_consumer_warning(type_name: &str) -> String {
    format!(
        "{type_name} declares legacy context types, which are no longer supported. \
         Subscribe the class to a context cell via contextType instead."
    )
}

/// Renders the fixed warning text for a legacy function-based consumer.
#[must_use]
pub fn legacy_function_consumer_warning(type_name: &str) -> String {
    format!(
        "{type_name} declares legacy context types, which are no longer supported. \
         Read the context cell with use_context from the render body instead."
    )
}

/// Process-scoped registry of component types that have already warned.
///
/// Keyed by type identity, not instance: remounting the same type must not
/// re-warn. The registry is threaded explicitly through renderer
/// configuration rather than referenced as an ambient global; `reset` exists
/// only for defined test/process boundaries.
#[derive(Debug, Default)]
pub struct WarnedTypes {
    warned: RwLock<HashSet<String>>,
}

impl WarnedTypes {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a type as warned. Returns true the first time the type is seen.
    pub fn mark(&self, type_name: &str) -> bool {
        self.warned.write().insert(type_name.to_string())
    }

    /// Whether the type has already warned.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.warned.read().contains(type_name)
    }

    /// Number of types that have warned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.warned.read().len()
    }

    /// True when no type has warned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warned.read().is_empty()
    }

    /// Clears the registry. Only valid at test/process boundaries.
    pub fn reset(&self) {
        self.warned.write().clear();
    }
}

/// Intercepts the deprecated ambient-value API.
///
/// Each interception emits at most one diagnostic per component type (in
/// first-render order) and reports the defined fallback value.
pub struct LegacyContextAdapter {
    warned: Arc<WarnedTypes>,
    sink: Arc<dyn DiagnosticSink>,
}

impl LegacyContextAdapter {
    /// Creates an adapter over a shared warn registry and sink.
    #[must_use]
    pub fn new(warned: Arc<WarnedTypes>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { warned, sink }
    }

    /// Intercepts a legacy child-context producer.
    ///
    /// The declared values are not propagated; the child-context bag the
    /// subtree observes is always the empty object.
    #[must_use]
    pub fn intercept_provider(&self, type_name: &str) -> serde_json::Value {
        self.warn_once(type_name, LegacyKind::Provider, legacy_provider_warning);
        serde_json::Value::Object(serde_json::Map::new())
    }

    /// Intercepts a legacy consumer (class- or function-based).
    ///
    /// The consumer observes `Undefined` on every render, with no change
    /// notifications and never a second warning.
    #[must_use]
    pub fn intercept_consumer(&self, type_name: &str, kind: LegacyKind) -> ContextValue {
        match kind {
            LegacyKind::ConsumerClass => {
                self.warn_once(type_name, kind, legacy_class_consumer_warning);
            }
            LegacyKind::ConsumerFunction => {
                self.warn_once(type_name, kind, legacy_function_consumer_warning);
            }
            LegacyKind::Provider => {
                debug_assert!(false, "provider kind routed to intercept_consumer");
            }
        }
        ContextValue::Undefined
    }

    fn warn_once(&self, type_name: &str, kind: LegacyKind, template: fn(&str) -> String) {
        if self.warned.mark(type_name) {
            let warning = LegacyWarning::new(type_name, kind);
            self.sink.emit(&warning, &template(type_name));
        }
    }
}
