//! Context cells and the values bound to them.

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A value bound to a context cell.
///
/// Values are compared by reference, never by structure: two renders that
/// bind structurally equal but distinct allocations count as a change, and
/// re-binding the same allocation counts as no change. `Undefined` is a
/// first-class bindable value, distinct from "no provider present".
#[derive(Debug, Clone)]
pub enum ContextValue {
    /// An explicitly absent value. Distinguishable from a missing provider.
    Undefined,
    /// A present value, shared by reference.
    Defined(Arc<serde_json::Value>),
}

impl ContextValue {
    /// Wraps a JSON value in a fresh shared allocation.
    #[must_use]
    pub fn defined(value: serde_json::Value) -> Self {
        Self::Defined(Arc::new(value))
    }

    /// The explicitly absent value.
    #[must_use]
    pub const fn undefined() -> Self {
        Self::Undefined
    }

    /// Reference equality between two bound values.
    ///
    /// `Undefined` is equal only to `Undefined`; defined values compare by
    /// allocation identity, not structure.
    #[must_use]
    pub fn same(a: &Self, b: &Self) -> bool {
        match (a, b) {
            (Self::Undefined, Self::Undefined) => true,
            (Self::Defined(x), Self::Defined(y)) => Arc::ptr_eq(x, y),
            _ => false,
        }
    }

    /// Returns the underlying JSON value, if defined.
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Undefined => None,
            Self::Defined(v) => Some(v),
        }
    }

    /// Returns true if this is the explicitly absent value.
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        Self::defined(value)
    }
}

/// Unique identity of a context cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(Uuid);

#[derive(Debug)]
struct CellInner {
    id: CellId,
    name: String,
    default: ContextValue,
}

/// An identity-bearing ambient-value channel.
///
/// A cell is created once at declaration time and lives for the process
/// lifetime. Identity is the cell itself: two cells with equal names and
/// defaults are still distinct channels. Handles are cheap to clone.
#[derive(Clone)]
pub struct ContextCell(Arc<CellInner>);

impl ContextCell {
    /// The cell's unique identity.
    #[must_use]
    pub fn id(&self) -> CellId {
        self.0.id
    }

    /// Human-readable name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The value observed when no provider is active for this cell.
    #[must_use]
    pub fn default_value(&self) -> &ContextValue {
        &self.0.default
    }
}

impl PartialEq for ContextCell {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ContextCell {}

impl std::hash::Hash for ContextCell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for ContextCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextCell")
            .field("name", &self.0.name)
            .field("id", &self.0.id)
            .finish()
    }
}

/// Declares a new context cell with a default value.
#[must_use]
pub fn declare_cell(name: impl Into<String>, default: ContextValue) -> ContextCell {
    ContextCell(Arc::new(CellInner {
        id: CellId(Uuid::new_v4()),
        name: name.into(),
        default,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_identity_is_not_structural() {
        let a = declare_cell("theme", ContextValue::undefined());
        let b = declare_cell("theme", ContextValue::undefined());

        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_value_reference_equality() {
        let v1 = ContextValue::defined(serde_json::json!("a"));
        let v2 = v1.clone();
        let v3 = ContextValue::defined(serde_json::json!("a"));

        assert!(ContextValue::same(&v1, &v2));
        assert!(!ContextValue::same(&v1, &v3));
    }

    #[test]
    fn test_undefined_distinct_from_defined() {
        let undef = ContextValue::undefined();
        let null = ContextValue::defined(serde_json::Value::Null);

        assert!(ContextValue::same(&undef, &ContextValue::Undefined));
        assert!(!ContextValue::same(&undef, &null));
        assert!(undef.is_undefined());
        assert!(!null.is_undefined());
    }

    #[test]
    fn test_default_value_access() {
        let cell = declare_cell("locale", ContextValue::defined(serde_json::json!("en")));
        assert_eq!(
            cell.default_value().as_json(),
            Some(&serde_json::json!("en"))
        );
        assert_eq!(cell.name(), "locale");
    }
}
