//! Per-consumer dependency records.

use super::{CellId, ContextCell, ContextValue};
use std::collections::HashMap;

/// What a consumer node observed the last time it rendered.
///
/// One entry per read cell; single-subscription consumers hold one entry,
/// legacy-style multi-subscription consumers may hold several. Change
/// detection is reference equality against the new value at the same stack
/// position, never deep equality.
#[derive(Debug, Default, Clone)]
pub struct DependencyRecord {
    observed: HashMap<CellId, ContextValue>,
}

impl DependencyRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the value observed for `cell` during the consumer's render.
    pub fn record(&mut self, cell: &ContextCell, value: ContextValue) {
        self.observed.insert(cell.id(), value);
    }

    /// The value observed on the previous render, if the cell was read.
    #[must_use]
    pub fn observed(&self, cell: &ContextCell) -> Option<&ContextValue> {
        self.observed.get(&cell.id())
    }

    /// Whether `new` differs by reference from the recorded observation.
    ///
    /// An unread cell counts as changed: the consumer has never observed a
    /// value, so it must be delivered one.
    #[must_use]
    pub fn changed(&self, cell: &ContextCell, new: &ContextValue) -> bool {
        self.observed
            .get(&cell.id())
            .map_or(true, |prev| !ContextValue::same(prev, new))
    }

    /// Clears all observations, e.g. on unmount.
    pub fn clear(&mut self) {
        self.observed.clear();
    }

    /// True when no cell has been read yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::declare_cell;

    fn val(s: &str) -> ContextValue {
        ContextValue::defined(serde_json::json!(s))
    }

    #[test]
    fn test_unread_cell_counts_as_changed() {
        let cell = declare_cell("theme", ContextValue::undefined());
        let record = DependencyRecord::new();

        assert!(record.changed(&cell, &val("a")));
        assert!(record.observed(&cell).is_none());
    }

    #[test]
    fn test_same_reference_is_unchanged() {
        let cell = declare_cell("theme", ContextValue::undefined());
        let mut record = DependencyRecord::new();

        let v = val("a");
        record.record(&cell, v.clone());

        assert!(!record.changed(&cell, &v));
        // Structurally equal but freshly allocated counts as a change.
        assert!(record.changed(&cell, &val("a")));
    }

    #[test]
    fn test_default_observed_twice_is_unchanged() {
        // A consumer with no provider observes the default; if the default
        // was also the previous observation, that is "no change".
        let cell = declare_cell("theme", val("light"));
        let mut record = DependencyRecord::new();

        record.record(&cell, cell.default_value().clone());
        assert!(!record.changed(&cell, cell.default_value()));
    }

    #[test]
    fn test_multiple_cells_tracked_independently() {
        let theme = declare_cell("theme", ContextValue::undefined());
        let locale = declare_cell("locale", ContextValue::undefined());
        let mut record = DependencyRecord::new();

        let t = val("dark");
        record.record(&theme, t.clone());

        assert!(!record.changed(&theme, &t));
        assert!(record.changed(&locale, &val("fr")));
    }

    #[test]
    fn test_clear() {
        let cell = declare_cell("theme", ContextValue::undefined());
        let mut record = DependencyRecord::new();

        record.record(&cell, val("a"));
        assert!(!record.is_empty());

        record.clear();
        assert!(record.is_empty());
    }
}
