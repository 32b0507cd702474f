//! The LIFO binding stack and its scoped acquisition guard.

use super::{ContextCell, ContextValue};
use crate::errors::StackImbalanceError;
use parking_lot::RwLock;
use tracing::trace;

/// The stack of active `(cell, value)` bindings during a tree walk.
///
/// One entry is pushed per active provider on the descending walk and popped
/// on exit, strictly LIFO. Entries for different cells do not interact. The
/// stack is exclusively owned by the active render pass; the interior lock
/// only serves the scoped-guard pattern, never cross-pass sharing.
#[derive(Debug, Default)]
pub struct ContextStack {
    entries: RwLock<Vec<(ContextCell, ContextValue)>>,
    poison: RwLock<Option<StackImbalanceError>>,
}

impl ContextStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a new top-of-stack binding for `cell`.
    ///
    /// Prefer [`ContextStack::enter`], which guarantees the matching pop on
    /// every exit path.
    pub fn push(&self, cell: ContextCell, value: ContextValue) {
        trace!(cell = %cell.name(), "push context binding");
        self.entries.write().push((cell, value));
    }

    /// Pops the top binding, which must belong to `cell`.
    ///
    /// # Errors
    ///
    /// Returns [`StackImbalanceError`] when the top entry does not match.
    /// That is a fatal engine invariant violation, not a user error.
    pub fn pop(&self, cell: &ContextCell) -> Result<(), StackImbalanceError> {
        let mut entries = self.entries.write();
        match entries.last() {
            Some((top, _)) if top == cell => {
                entries.pop();
                trace!(cell = %cell.name(), "pop context binding");
                Ok(())
            }
            Some((top, _)) => Err(StackImbalanceError::new(
                cell.name(),
                Some(top.name().to_string()),
            )),
            None => Err(StackImbalanceError::new(cell.name(), None)),
        }
    }

    /// Reads the current binding for `cell`, falling back to its default.
    ///
    /// Resolution is pure and deterministic given the stack state: the
    /// nearest active binding wins, and a missing provider is not an error.
    #[must_use]
    pub fn read(&self, cell: &ContextCell) -> ContextValue {
        let entries = self.entries.read();
        entries
            .iter()
            .rev()
            .find(|(c, _)| c == cell)
            .map_or_else(|| cell.default_value().clone(), |(_, v)| v.clone())
    }

    /// Enters a provider scope, returning a guard that pops on drop.
    ///
    /// The guard releases the binding on every exit path out of the subtree
    /// visit, including unwinds and cancelled passes.
    #[must_use]
    pub fn enter(&self, cell: ContextCell, value: ContextValue) -> ProviderScope<'_> {
        self.push(cell.clone(), value);
        ProviderScope {
            stack: self,
            cell,
            active: true,
        }
    }

    /// Number of active bindings.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.entries.read().len()
    }

    /// True when no bindings remain and no imbalance was recorded.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.entries.read().is_empty() && self.poison.read().is_none()
    }

    /// Takes the recorded imbalance, if a guard detected one during drop.
    pub fn take_poison(&self) -> Option<StackImbalanceError> {
        self.poison.write().take()
    }

    fn record_poison(&self, err: StackImbalanceError) {
        let mut poison = self.poison.write();
        if poison.is_none() {
            *poison = Some(err);
        }
    }
}

/// Scoped acquisition of a provider binding.
///
/// Popping happens exactly once: either explicitly through
/// [`ProviderScope::exit`] (which surfaces imbalance as an error) or
/// implicitly on drop (which records the imbalance on the stack for the
/// engine to surface after unwinding).
#[derive(Debug)]
pub struct ProviderScope<'a> {
    stack: &'a ContextStack,
    cell: ContextCell,
    active: bool,
}

impl ProviderScope<'_> {
    /// Explicitly exits the scope, popping the binding.
    pub fn exit(mut self) -> Result<(), StackImbalanceError> {
        self.active = false;
        self.stack.pop(&self.cell)
    }

    /// The cell this scope binds.
    #[must_use]
    pub fn cell(&self) -> &ContextCell {
        &self.cell
    }
}

impl Drop for ProviderScope<'_> {
    fn drop(&mut self) {
        if self.active {
            if let Err(err) = self.stack.pop(&self.cell) {
                self.stack.record_poison(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::declare_cell;
    use pretty_assertions::assert_eq;

    fn val(s: &str) -> ContextValue {
        ContextValue::defined(serde_json::json!(s))
    }

    #[test]
    fn test_read_without_provider_returns_default() {
        let cell = declare_cell("theme", val("light"));
        let stack = ContextStack::new();

        let read = stack.read(&cell);
        assert_eq!(read.as_json(), Some(&serde_json::json!("light")));
    }

    #[test]
    fn test_nearest_binding_wins() {
        let cell = declare_cell("theme", val("light"));
        let stack = ContextStack::new();

        stack.push(cell.clone(), val("outer"));
        stack.push(cell.clone(), val("inner"));
        assert_eq!(stack.read(&cell).as_json(), Some(&serde_json::json!("inner")));

        stack.pop(&cell).unwrap();
        assert_eq!(stack.read(&cell).as_json(), Some(&serde_json::json!("outer")));

        stack.pop(&cell).unwrap();
        assert_eq!(stack.read(&cell).as_json(), Some(&serde_json::json!("light")));
        assert!(stack.is_balanced());
    }

    #[test]
    fn test_independent_cells_do_not_interact() {
        let theme = declare_cell("theme", val("light"));
        let locale = declare_cell("locale", val("en"));
        let stack = ContextStack::new();

        stack.push(theme.clone(), val("dark"));
        stack.push(locale.clone(), val("fr"));

        assert_eq!(stack.read(&theme).as_json(), Some(&serde_json::json!("dark")));
        assert_eq!(stack.read(&locale).as_json(), Some(&serde_json::json!("fr")));
    }

    #[test]
    fn test_pop_wrong_cell_is_imbalance() {
        let theme = declare_cell("theme", ContextValue::undefined());
        let locale = declare_cell("locale", ContextValue::undefined());
        let stack = ContextStack::new();

        stack.push(theme, val("dark"));
        let err = stack.pop(&locale).unwrap_err();
        assert_eq!(err.expected, "locale");
        assert_eq!(err.found, Some("theme".to_string()));
    }

    #[test]
    fn test_pop_empty_is_imbalance() {
        let theme = declare_cell("theme", ContextValue::undefined());
        let stack = ContextStack::new();

        let err = stack.pop(&theme).unwrap_err();
        assert_eq!(err.found, None);
    }

    #[test]
    fn test_scope_pops_on_drop() {
        let cell = declare_cell("theme", val("light"));
        let stack = ContextStack::new();

        {
            let _scope = stack.enter(cell.clone(), val("dark"));
            assert_eq!(stack.depth(), 1);
            assert_eq!(stack.read(&cell).as_json(), Some(&serde_json::json!("dark")));
        }

        assert_eq!(stack.depth(), 0);
        assert!(stack.is_balanced());
    }

    #[test]
    fn test_scope_pops_on_unwind() {
        let cell = declare_cell("theme", val("light"));
        let stack = ContextStack::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = stack.enter(cell.clone(), val("dark"));
            panic!("abort the walk");
        }));

        assert!(result.is_err());
        assert!(stack.is_balanced());
    }

    #[test]
    fn test_undefined_binding_shadows_default() {
        let cell = declare_cell("theme", val("light"));
        let stack = ContextStack::new();

        let scope = stack.enter(cell.clone(), ContextValue::undefined());
        assert!(stack.read(&cell).is_undefined());
        scope.exit().unwrap();
    }

    #[test]
    fn test_drop_with_corrupted_top_poisons_stack() {
        let cell = declare_cell("theme", val("light"));
        let stack = ContextStack::new();

        {
            let _scope = stack.enter(cell.clone(), val("dark"));
            // Simulate an engine bug stealing the binding out from under
            // the guard.
            stack.pop(&cell).unwrap();
        }

        assert!(!stack.is_balanced());
        let poison = stack.take_poison().unwrap();
        assert_eq!(poison.expected, "theme");
    }

    #[test]
    fn test_explicit_exit_surfaces_imbalance() {
        let cell = declare_cell("theme", val("light"));
        let stack = ContextStack::new();

        let scope = stack.enter(cell.clone(), val("dark"));
        stack.pop(&cell).unwrap();
        assert!(scope.exit().is_err());
    }
}
