//! # Cascade
//!
//! A context propagation engine for component-tree renderers.
//!
//! Cascade implements the ambient-value ("context") subsystem of a tree
//! rendering engine:
//!
//! - **Context cells**: identity-bearing value channels with defaults
//! - **Scoped bindings**: strictly nested provider bindings with guaranteed
//!   release on every exit path, including aborted render passes
//! - **Change propagation**: eager and lazy policies for re-delivering
//!   changed values to subscribed consumers without revisiting unaffected
//!   subtrees
//! - **Legacy shim**: warn-once interception of the removed ambient-value
//!   mechanism
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cascade::prelude::*;
//!
//! let theme = declare_cell("theme", ContextValue::defined("light".into()));
//!
//! let mut tree = Tree::new();
//! let consumer = tree.consumer(theme.clone(), render_text);
//! let provider = tree.provider(theme.clone(), ContextValue::defined("dark".into()), vec![consumer]);
//! tree.set_root(provider);
//!
//! let output = Renderer::new(tree).mount()?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod context;
pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod legacy;
pub mod lifecycle;
pub mod testing;
pub mod tree;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::{
        declare_cell, ContextCell, ContextStack, ContextValue, DependencyRecord,
        ProviderScope,
    };
    pub use crate::diagnostics::{
        CollectingSink, DiagnosticSink, LegacyKind, LegacyWarning, NoOpSink,
        TracingSink,
    };
    pub use crate::engine::{
        CancellationToken, PropagationPolicy, Renderer, VisitState,
    };
    pub use crate::errors::{CascadeError, StackImbalanceError};
    pub use crate::legacy::{LegacyContextAdapter, WarnedTypes};
    pub use crate::lifecycle::{LifecycleBridge, NoOpBridge};
    pub use crate::tree::{
        Component, ConsumerKind, GuardBehavior, LegacyConsumerStyle, NodeId,
        Output, RenderFn, Tree,
    };
}
