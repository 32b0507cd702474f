//! Error types for the cascade engine.
//!
//! The taxonomy is deliberately small: configuration misuse (legacy context
//! declarations) never errors and is handled by the warn-once shim, and a
//! missing provider resolves to the cell default. What remains is internal
//! invariant violations and cooperative cancellation of a render pass.

use thiserror::Error;

/// The main error type for cascade operations.
#[derive(Debug, Error)]
pub enum CascadeError {
    /// A context stack imbalance was detected.
    ///
    /// This is a programming error inside the engine, not a user-recoverable
    /// condition. It aborts the current render pass.
    #[error("{0}")]
    StackImbalance(#[from] StackImbalanceError),

    /// The render pass was cancelled before completing.
    #[error("Render pass aborted: {0}")]
    RenderAborted(String),

    /// A node id did not resolve to a live node in the tree.
    #[error("Node not found in tree: {id}")]
    NodeNotFound {
        /// The missing node id.
        id: usize,
    },

    /// A staged value was addressed to a node that is not a provider.
    #[error("Node {id} is not a provider")]
    NotAProvider {
        /// The offending node id.
        id: usize,
    },

    /// The tree has no root to render.
    #[error("Tree has no root node")]
    MissingRoot,
}

/// Error raised when a pop does not match the top-of-stack binding.
///
/// Bindings are scoped acquisitions: every push is paired with exactly one
/// pop in reverse order. A mismatch means the engine corrupted its own walk.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Context stack imbalance: expected to pop '{expected}', found {}", found.as_deref().unwrap_or("empty stack"))]
pub struct StackImbalanceError {
    /// Name of the cell whose binding was expected on top.
    pub expected: String,
    /// Name of the cell actually on top, if any.
    pub found: Option<String>,
}

impl StackImbalanceError {
    /// Creates a new stack imbalance error.
    #[must_use]
    pub fn new(expected: impl Into<String>, found: Option<String>) -> Self {
        Self {
            expected: expected.into(),
            found,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_imbalance_display() {
        let err = StackImbalanceError::new("theme", Some("locale".to_string()));
        assert!(err.to_string().contains("theme"));
        assert!(err.to_string().contains("locale"));

        let err = StackImbalanceError::new("theme", None);
        assert!(err.to_string().contains("empty stack"));
    }

    #[test]
    fn test_render_aborted_display() {
        let err = CascadeError::RenderAborted("external cancel".to_string());
        assert_eq!(err.to_string(), "Render pass aborted: external cancel");
    }

    #[test]
    fn test_not_a_provider_display() {
        let err = CascadeError::NotAProvider { id: 7 };
        assert_eq!(err.to_string(), "Node 7 is not a provider");
    }
}
