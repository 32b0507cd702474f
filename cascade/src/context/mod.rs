//! Context cells, the binding stack, and per-consumer dependency records.
//!
//! This module provides:
//! - Identity-bearing context cells with default values
//! - A LIFO binding stack with scoped acquisition guards
//! - Per-consumer records of observed values for change detection

mod cell;
mod dependencies;
mod stack;

pub use cell::{declare_cell, CellId, ContextCell, ContextValue};
pub use dependencies::DependencyRecord;
pub use stack::{ContextStack, ProviderScope};
