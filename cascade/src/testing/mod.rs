//! Testing utilities for cascade trees.
//!
//! This module provides:
//! - A recording lifecycle bridge capturing exact hook call sequences
//! - Tree fixtures for the canonical propagation scenarios
//! - Small render-function helpers

mod fixtures;
mod recording;

pub use fixtures::{
    collect_texts, counting_text_render, string_value, text_render, ThreeConsumers,
};
pub use recording::{HookCall, RecordingBridge};

pub use crate::diagnostics::CollectingSink;
