//! Diagnostic sink trait and implementations.

use super::LegacyWarning;
use tracing::warn;

/// Trait for sinks that receive structured deprecation warnings.
///
/// Emission must never raise and never interrupt rendering; sinks that fail
/// internally are expected to swallow their own errors.
pub trait DiagnosticSink: Send + Sync {
    /// Emits a warning with its rendered message text.
    fn emit(&self, warning: &LegacyWarning, message: &str);
}

/// A sink that discards all warnings.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl DiagnosticSink for NoOpSink {
    fn emit(&self, _warning: &LegacyWarning, _message: &str) {
        // Intentionally empty - discards all warnings
    }
}

/// A sink that logs warnings through the tracing framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, warning: &LegacyWarning, message: &str) {
        warn!(
            component = %warning.component_type_name,
            kind = %warning.kind,
            "{message}"
        );
    }
}

/// A collecting sink for tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: parking_lot::RwLock<Vec<(LegacyWarning, String)>>,
}

impl CollectingSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected warnings in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<(LegacyWarning, String)> {
        self.events.read().clone()
    }

    /// Returns just the rendered message texts, in emission order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.events.read().iter().map(|(_, m)| m.clone()).collect()
    }

    /// Number of collected warnings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// True when nothing has been emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected warnings.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, warning: &LegacyWarning, message: &str) {
        self.events
            .write()
            .push((warning.clone(), message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::LegacyKind;

    #[test]
    fn test_noop_sink() {
        let sink = NoOpSink;
        sink.emit(&LegacyWarning::new("X", LegacyKind::Provider), "msg");
        // Should not panic
    }

    #[test]
    fn test_collecting_sink_preserves_order() {
        let sink = CollectingSink::new();
        assert!(sink.is_empty());

        sink.emit(&LegacyWarning::new("A", LegacyKind::Provider), "first");
        sink.emit(&LegacyWarning::new("B", LegacyKind::ConsumerClass), "second");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0.component_type_name, "A");
        assert_eq!(events[1].0.component_type_name, "B");
        assert_eq!(sink.messages(), vec!["first", "second"]);
    }

    #[test]
    fn test_collecting_sink_clear() {
        let sink = CollectingSink::new();
        sink.emit(&LegacyWarning::new("A", LegacyKind::Provider), "msg");
        assert_eq!(sink.len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }
}
