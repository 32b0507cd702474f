//! Structured warning channel for deprecation diagnostics.
//!
//! Warnings are surfaced to the embedding environment through a sink trait
//! and never interrupt rendering.

mod sink;

pub use sink::{CollectingSink, DiagnosticSink, NoOpSink, TracingSink};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which deprecated capability a component type declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegacyKind {
    /// The component declares legacy child-context producer keys.
    #[serde(rename = "legacy-provider")]
    Provider,
    /// A class-based component declares legacy consumer keys.
    #[serde(rename = "legacy-consumer-class")]
    ConsumerClass,
    /// A function-based component declares legacy consumer keys.
    #[serde(rename = "legacy-consumer-function")]
    ConsumerFunction,
}

impl LegacyKind {
    /// Stable wire-level tag for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provider => "legacy-provider",
            Self::ConsumerClass => "legacy-consumer-class",
            Self::ConsumerFunction => "legacy-consumer-function",
        }
    }
}

impl fmt::Display for LegacyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured deprecation warning event.
///
/// Emitted at most once per offending component type for the life of the
/// process, in the order the types are first rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyWarning {
    /// Name of the offending component type.
    pub component_type_name: String,
    /// Which deprecated capability was declared.
    pub kind: LegacyKind,
}

impl LegacyWarning {
    /// Creates a new warning event.
    #[must_use]
    pub fn new(component_type_name: impl Into<String>, kind: LegacyKind) -> Self {
        Self {
            component_type_name: component_type_name.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(LegacyKind::Provider.as_str(), "legacy-provider");
        assert_eq!(LegacyKind::ConsumerClass.as_str(), "legacy-consumer-class");
        assert_eq!(
            LegacyKind::ConsumerFunction.as_str(),
            "legacy-consumer-function"
        );
    }

    #[test]
    fn test_warning_equality() {
        let a = LegacyWarning::new("Header", LegacyKind::Provider);
        let b = LegacyWarning::new("Header", LegacyKind::Provider);
        assert_eq!(a, b);
    }

    #[test]
    fn test_warning_serializes_with_wire_tags() {
        let warning = LegacyWarning::new("Header", LegacyKind::ConsumerClass);
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "component_type_name": "Header",
                "kind": "legacy-consumer-class",
            })
        );
    }
}
