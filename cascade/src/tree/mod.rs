//! The component tree model.
//!
//! Trees are arena-stored: nodes live in a flat vector and refer to their
//! children by id. The tree owns component declarations only; all per-pass
//! render state (dependency records, visit states, cached outputs) belongs
//! to the renderer and is torn down with it.

mod subscribers;

pub use subscribers::SubscriberIndex;

use crate::context::{ContextCell, ContextValue};
use crate::errors::CascadeError;
use std::fmt;
use std::sync::Arc;

/// Identifier of a node within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The logical rendered value of a subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Nothing rendered.
    Empty,
    /// A text leaf.
    Text(String),
    /// A host element with rendered children.
    Element {
        /// Host tag name.
        tag: String,
        /// Rendered children in tree order.
        children: Vec<Output>,
    },
    /// Multiple rendered children with no host wrapper.
    Fragment(Vec<Output>),
}

impl Output {
    /// A text leaf.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// A host element.
    #[must_use]
    pub fn element(tag: impl Into<String>, children: Vec<Self>) -> Self {
        Self::Element {
            tag: tag.into(),
            children,
        }
    }

    /// Collapses a child list into a single output.
    ///
    /// Zero children render as `Empty` and a single child is returned
    /// unwrapped, so transparent nodes do not perturb the output shape.
    #[must_use]
    pub fn fragment(mut children: Vec<Self>) -> Self {
        match children.len() {
            0 => Self::Empty,
            1 => children.remove(0),
            _ => Self::Fragment(children),
        }
    }
}

/// A consumer render function: receives the delivered value, returns output.
pub type RenderFn = Arc<dyn Fn(&ContextValue) -> Output + Send + Sync>;

/// What an update guard reports when props and state are unchanged.
///
/// Props/state diffing belongs to the embedding reconciler; within this
/// subsystem a component's guard behavior is declared statically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardBehavior {
    /// The guard approves the update.
    Update,
    /// The guard skips the update (a pure component with unchanged props).
    Skip,
}

impl GuardBehavior {
    /// The guard's decision as a boolean.
    #[must_use]
    pub const fn allows_update(self) -> bool {
        matches!(self, Self::Update)
    }
}

/// How a legacy consumer declared itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyConsumerStyle {
    /// A class instance with legacy consumer keys.
    Class,
    /// A function component with legacy consumer keys.
    Function,
}

/// The closed set of consumer shapes, each with a uniform deliver capability.
#[derive(Clone)]
pub enum ConsumerKind {
    /// A render-prop consumer. No lifecycle hooks; always re-renders when
    /// visited.
    RenderProp {
        /// The subscribed cell.
        cell: ContextCell,
        /// Render function receiving the delivered value.
        render: RenderFn,
    },
    /// A function component reading the cell through the hook-based API.
    HookSubscription {
        /// The subscribed cell.
        cell: ContextCell,
        /// Render function receiving the delivered value.
        render: RenderFn,
    },
    /// A class instance with a registered cell subscription. Participates in
    /// the pre-update lifecycle hooks.
    SubscribedClass {
        /// Component type name, used in hook invocations and diagnostics.
        name: String,
        /// The subscribed cell.
        cell: ContextCell,
        /// Guard behavior when props/state are unchanged.
        guard: GuardBehavior,
        /// Render function receiving the delivered value.
        render: RenderFn,
    },
}

impl ConsumerKind {
    /// The cell this consumer subscribes to.
    #[must_use]
    pub fn cell(&self) -> &ContextCell {
        match self {
            Self::RenderProp { cell, .. }
            | Self::HookSubscription { cell, .. }
            | Self::SubscribedClass { cell, .. } => cell,
        }
    }

    /// Delivers a value to the consumer, producing its output.
    #[must_use]
    pub fn deliver(&self, value: &ContextValue) -> Output {
        match self {
            Self::RenderProp { render, .. }
            | Self::HookSubscription { render, .. }
            | Self::SubscribedClass { render, .. } => render(value),
        }
    }
}

impl fmt::Debug for ConsumerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RenderProp { cell, .. } => f
                .debug_struct("RenderProp")
                .field("cell", &cell.name())
                .finish(),
            Self::HookSubscription { cell, .. } => f
                .debug_struct("HookSubscription")
                .field("cell", &cell.name())
                .finish(),
            Self::SubscribedClass { name, cell, guard, .. } => f
                .debug_struct("SubscribedClass")
                .field("name", name)
                .field("cell", &cell.name())
                .field("guard", guard)
                .finish(),
        }
    }
}

/// A node's component declaration.
#[derive(Clone)]
pub enum Component {
    /// A host element. Re-renders its children whenever visited.
    Host {
        /// Host tag name.
        tag: String,
    },
    /// Binds `value` to `cell` for the subtree. A staged `pending` value is
    /// committed on the next update pass.
    Provider {
        /// The bound cell.
        cell: ContextCell,
        /// The currently committed value.
        value: ContextValue,
        /// Value staged for the next update pass, if any.
        pending: Option<ContextValue>,
    },
    /// A context consumer.
    Consumer(ConsumerKind),
    /// An intermediate class-like component with an update guard. May bail
    /// out its subtree on update passes.
    Class {
        /// Component type name.
        name: String,
        /// Guard behavior when props/state are unchanged.
        guard: GuardBehavior,
    },
    /// A component type declaring the removed child-context producer API.
    LegacyProvider {
        /// Component type name, used for the one-time diagnostic.
        type_name: String,
        /// The declared child-context values. Never propagated.
        declared: serde_json::Map<String, serde_json::Value>,
    },
    /// A component type declaring the removed consumer API.
    LegacyConsumer {
        /// Component type name, used for the one-time diagnostic.
        type_name: String,
        /// Class- or function-style declaration (changes the warning text).
        style: LegacyConsumerStyle,
        /// Render function; always receives `Undefined`.
        render: RenderFn,
    },
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host { tag } => f.debug_struct("Host").field("tag", tag).finish(),
            Self::Provider { cell, value, pending } => f
                .debug_struct("Provider")
                .field("cell", &cell.name())
                .field("value", value)
                .field("pending", pending)
                .finish(),
            Self::Consumer(kind) => f.debug_tuple("Consumer").field(kind).finish(),
            Self::Class { name, guard } => f
                .debug_struct("Class")
                .field("name", name)
                .field("guard", guard)
                .finish(),
            Self::LegacyProvider { type_name, declared } => f
                .debug_struct("LegacyProvider")
                .field("type_name", type_name)
                .field("declared", declared)
                .finish(),
            Self::LegacyConsumer { type_name, style, .. } => f
                .debug_struct("LegacyConsumer")
                .field("type_name", type_name)
                .field("style", style)
                .finish(),
        }
    }
}

/// A tree node: component plus child ids.
#[derive(Debug, Clone)]
pub struct Node {
    /// This node's id.
    pub id: NodeId,
    /// The component declaration.
    pub component: Component,
    /// Children in render order.
    pub children: Vec<NodeId>,
}

/// An arena-stored component tree with a single root.
#[derive(Debug, Default, Clone)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    root: Option<NodeId>,
}

impl Tree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, component: Component, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            id,
            component,
            children,
        }));
        id
    }

    /// Adds a host element node.
    pub fn host(&mut self, tag: impl Into<String>, children: Vec<NodeId>) -> NodeId {
        self.insert(Component::Host { tag: tag.into() }, children)
    }

    /// Adds a provider node binding `value` to `cell` for `children`.
    pub fn provider(
        &mut self,
        cell: ContextCell,
        value: ContextValue,
        children: Vec<NodeId>,
    ) -> NodeId {
        self.insert(
            Component::Provider {
                cell,
                value,
                pending: None,
            },
            children,
        )
    }

    /// Adds a render-prop consumer of `cell`.
    pub fn consumer(&mut self, cell: ContextCell, render: RenderFn) -> NodeId {
        self.insert(
            Component::Consumer(ConsumerKind::RenderProp { cell, render }),
            Vec::new(),
        )
    }

    /// Adds a function component reading `cell` through the hook-based API.
    pub fn hook_consumer(&mut self, cell: ContextCell, render: RenderFn) -> NodeId {
        self.insert(
            Component::Consumer(ConsumerKind::HookSubscription { cell, render }),
            Vec::new(),
        )
    }

    /// Adds a class instance subscribed to `cell`.
    pub fn class_consumer(
        &mut self,
        name: impl Into<String>,
        cell: ContextCell,
        guard: GuardBehavior,
        render: RenderFn,
    ) -> NodeId {
        self.insert(
            Component::Consumer(ConsumerKind::SubscribedClass {
                name: name.into(),
                cell,
                guard,
                render,
            }),
            Vec::new(),
        )
    }

    /// Adds an intermediate class component with an update guard.
    pub fn class(
        &mut self,
        name: impl Into<String>,
        guard: GuardBehavior,
        children: Vec<NodeId>,
    ) -> NodeId {
        self.insert(
            Component::Class {
                name: name.into(),
                guard,
            },
            children,
        )
    }

    /// Adds a component declaring the removed child-context producer API.
    pub fn legacy_provider(
        &mut self,
        type_name: impl Into<String>,
        declared: serde_json::Map<String, serde_json::Value>,
        children: Vec<NodeId>,
    ) -> NodeId {
        self.insert(
            Component::LegacyProvider {
                type_name: type_name.into(),
                declared,
            },
            children,
        )
    }

    /// Adds a component declaring the removed consumer API.
    pub fn legacy_consumer(
        &mut self,
        type_name: impl Into<String>,
        style: LegacyConsumerStyle,
        render: RenderFn,
    ) -> NodeId {
        self.insert(
            Component::LegacyConsumer {
                type_name: type_name.into(),
                style,
                render,
            },
            Vec::new(),
        )
    }

    /// Sets the root node.
    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    /// The root node, if set.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Looks up a live node.
    pub fn node(&self, id: NodeId) -> Result<&Node, CascadeError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(CascadeError::NodeNotFound { id: id.0 })
    }

    /// Looks up a live node mutably.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, CascadeError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(CascadeError::NodeNotFound { id: id.0 })
    }

    /// Stages a new value on a provider node for the next update pass.
    pub fn set_provider_value(
        &mut self,
        id: NodeId,
        value: ContextValue,
    ) -> Result<(), CascadeError> {
        let node = self.node_mut(id)?;
        match &mut node.component {
            Component::Provider { pending, .. } => {
                *pending = Some(value);
                Ok(())
            }
            _ => Err(CascadeError::NotAProvider { id: id.0 }),
        }
    }

    /// Removes a subtree from the tree, returning the removed node ids.
    ///
    /// Children are removed before their parent, mirroring the reverse-order
    /// teardown the binding stack requires during a walk.
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<Vec<NodeId>, CascadeError> {
        let node = self.node(id)?.clone();
        let mut removed = Vec::new();
        for child in node.children.iter().rev() {
            removed.extend(self.remove_subtree(*child)?);
        }
        self.nodes[id.0] = None;
        removed.push(id);
        if self.root == Some(id) {
            self.root = None;
        }
        Ok(removed)
    }

    /// Detaches a child from a parent's child list.
    pub fn detach_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), CascadeError> {
        let node = self.node_mut(parent)?;
        node.children.retain(|c| *c != child);
        Ok(())
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// True when the tree has no live nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over live nodes.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter_map(Option::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::declare_cell;

    fn text_render() -> RenderFn {
        Arc::new(|value: &ContextValue| {
            Output::text(
                value
                    .as_json()
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("<undefined>"),
            )
        })
    }

    #[test]
    fn test_build_and_lookup() {
        let cell = declare_cell("theme", ContextValue::undefined());
        let mut tree = Tree::new();

        let consumer = tree.consumer(cell.clone(), text_render());
        let provider = tree.provider(
            cell,
            ContextValue::defined(serde_json::json!("dark")),
            vec![consumer],
        );
        tree.set_root(provider);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.root(), Some(provider));
        assert_eq!(tree.node(provider).unwrap().children, vec![consumer]);
    }

    #[test]
    fn test_set_provider_value_stages_pending() {
        let cell = declare_cell("theme", ContextValue::undefined());
        let mut tree = Tree::new();
        let provider = tree.provider(cell, ContextValue::undefined(), Vec::new());

        tree.set_provider_value(provider, ContextValue::defined(serde_json::json!("b")))
            .unwrap();

        match &tree.node(provider).unwrap().component {
            Component::Provider { pending, .. } => assert!(pending.is_some()),
            other => panic!("unexpected component: {other:?}"),
        }
    }

    #[test]
    fn test_set_provider_value_rejects_non_provider() {
        let mut tree = Tree::new();
        let host = tree.host("div", Vec::new());

        let err = tree
            .set_provider_value(host, ContextValue::undefined())
            .unwrap_err();
        assert!(matches!(err, CascadeError::NotAProvider { id } if id == host.0));
    }

    #[test]
    fn test_component_debug_elides_render_fn() {
        let cell = declare_cell("theme", ContextValue::undefined());
        let consumer = Component::Consumer(ConsumerKind::RenderProp {
            cell,
            render: text_render(),
        });
        let legacy = Component::LegacyConsumer {
            type_name: "OldSidebar".to_string(),
            style: LegacyConsumerStyle::Class,
            render: text_render(),
        };

        let rendered = format!("{consumer:?} {legacy:?}");
        assert!(rendered.contains("RenderProp"));
        assert!(rendered.contains("OldSidebar"));
    }

    #[test]
    fn test_remove_subtree_children_first() {
        let mut tree = Tree::new();
        let leaf = tree.host("span", Vec::new());
        let mid = tree.host("div", vec![leaf]);
        let root = tree.host("body", vec![mid]);
        tree.set_root(root);

        let removed = tree.remove_subtree(mid).unwrap();
        assert_eq!(removed, vec![leaf, mid]);
        assert!(tree.node(mid).is_err());
        assert!(tree.node(root).is_ok());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_output_fragment_collapse() {
        assert_eq!(Output::fragment(Vec::new()), Output::Empty);
        assert_eq!(
            Output::fragment(vec![Output::text("a")]),
            Output::text("a")
        );
        assert_eq!(
            Output::fragment(vec![Output::text("a"), Output::text("b")]),
            Output::Fragment(vec![Output::text("a"), Output::text("b")])
        );
    }

    #[test]
    fn test_consumer_kind_deliver_uniform() {
        let cell = declare_cell("theme", ContextValue::undefined());
        let kinds = [
            ConsumerKind::RenderProp {
                cell: cell.clone(),
                render: text_render(),
            },
            ConsumerKind::HookSubscription {
                cell: cell.clone(),
                render: text_render(),
            },
            ConsumerKind::SubscribedClass {
                name: "Themed".to_string(),
                cell,
                guard: GuardBehavior::Skip,
                render: text_render(),
            },
        ];

        let value = ContextValue::defined(serde_json::json!("x"));
        for kind in &kinds {
            assert_eq!(kind.deliver(&value), Output::text("x"));
        }
    }
}
