//! The render walk and change-propagation engine.
//!
//! This module provides:
//! - The [`Renderer`] owning one render tree and its per-pass state
//! - The two propagation policies (eager and lazy)
//! - Cooperative cancellation of in-progress render passes

mod cancellation;
mod renderer;

pub use cancellation::CancellationToken;
pub use renderer::Renderer;

/// When changed-context forcing is applied relative to a consumer's own
/// update-skip decision.
///
/// The final delivered values are identical under both policies; they differ
/// in how many times, and with what arguments, the pre-update lifecycle
/// hooks fire. Selection is a process-wide build-time switch; the engine
/// stays policy-parametric so tests can pin either one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationPolicy {
    /// Force matching consumers dirty at the moment the provider's value
    /// changes. Forced consumers re-render even when their own guard skips;
    /// a skipping guard suppresses only the will-update hook.
    Eager,
    /// Defer to render time: each consumer re-reads and compares when it is
    /// about to render, and forcing is applied only after its guard's
    /// decision, so a confirmed change runs the full hook sequence.
    Lazy,
}

impl PropagationPolicy {
    /// The process-wide configured policy.
    ///
    /// Selected by the `eager-propagation` (default) and `lazy-propagation`
    /// cargo features; lazy wins when both are enabled.
    #[must_use]
    pub fn configured() -> Self {
        if cfg!(feature = "lazy-propagation") {
            Self::Lazy
        } else {
            Self::Eager
        }
    }
}

/// Per-node state during one update pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisitState {
    /// Not reached by this pass.
    #[default]
    Unvisited,
    /// Currently being processed.
    Visiting,
    /// Skipped by its own guard (or an ancestor's) with no dirty
    /// descendants requiring a walk-through.
    BailedOut,
    /// Force-marked by eager propagation, pending its render.
    MarkedDirty,
    /// Fully processed.
    Done,
}
