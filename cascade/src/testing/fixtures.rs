//! Tree fixtures for propagation tests.

use crate::context::{ContextCell, ContextValue};
use crate::tree::{GuardBehavior, NodeId, Output, RenderFn, Tree};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A defined string context value.
#[must_use]
pub fn string_value(s: &str) -> ContextValue {
    ContextValue::defined(serde_json::json!(s))
}

/// A render function producing a text leaf from the delivered value.
///
/// `Undefined` renders as `"<undefined>"`.
#[must_use]
pub fn text_render() -> RenderFn {
    Arc::new(|value: &ContextValue| {
        Output::text(
            value
                .as_json()
                .and_then(serde_json::Value::as_str)
                .unwrap_or("<undefined>"),
        )
    })
}

/// Like [`text_render`], but counts invocations so tests can assert that a
/// skipped subtree's render functions never ran.
#[must_use]
pub fn counting_text_render(counter: Arc<AtomicUsize>) -> RenderFn {
    Arc::new(move |value: &ContextValue| {
        counter.fetch_add(1, Ordering::SeqCst);
        Output::text(
            value
                .as_json()
                .and_then(serde_json::Value::as_str)
                .unwrap_or("<undefined>"),
        )
    })
}

/// Flattens an output tree into its text leaves, in tree order.
#[must_use]
pub fn collect_texts(output: &Output) -> Vec<String> {
    let mut texts = Vec::new();
    fn walk(out: &Output, texts: &mut Vec<String>) {
        match out {
            Output::Empty => {}
            Output::Text(s) => texts.push(s.clone()),
            Output::Element { children, .. } | Output::Fragment(children) => {
                for child in children {
                    walk(child, texts);
                }
            }
        }
    }
    walk(output, &mut texts);
    texts
}

/// The canonical three-consumer-kinds tree:
///
/// ```text
/// host "app"
/// └── Provider(cell, initial)
///     ├── render-prop consumer
///     ├── hook consumer
///     └── subscribed class consumer (guard skips on unchanged props)
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ThreeConsumers {
    /// The provider node.
    pub provider: NodeId,
    /// The render-prop consumer.
    pub render_prop: NodeId,
    /// The hook-subscription consumer.
    pub hook: NodeId,
    /// The subscribed class consumer (type name `"ThemedClass"`).
    pub class: NodeId,
}

impl ThreeConsumers {
    /// Builds the fixture tree.
    pub fn build(tree: &mut Tree, cell: &ContextCell, initial: ContextValue) -> Self {
        let render_prop = tree.consumer(cell.clone(), text_render());
        let hook = tree.hook_consumer(cell.clone(), text_render());
        let class = tree.class_consumer(
            "ThemedClass",
            cell.clone(),
            GuardBehavior::Skip,
            text_render(),
        );
        let provider = tree.provider(cell.clone(), initial, vec![render_prop, hook, class]);
        let root = tree.host("app", vec![provider]);
        tree.set_root(root);
        Self {
            provider,
            render_prop,
            hook,
            class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::declare_cell;

    #[test]
    fn test_collect_texts_flattens_in_order() {
        let out = Output::element(
            "app",
            vec![Output::Fragment(vec![
                Output::text("a"),
                Output::Empty,
                Output::text("b"),
            ])],
        );
        assert_eq!(collect_texts(&out), vec!["a", "b"]);
    }

    #[test]
    fn test_three_consumers_shape() {
        let cell = declare_cell("theme", ContextValue::undefined());
        let mut tree = Tree::new();
        let fixture = ThreeConsumers::build(&mut tree, &cell, string_value("a"));

        assert_eq!(tree.len(), 5);
        assert_eq!(
            tree.node(fixture.provider).unwrap().children,
            vec![fixture.render_prop, fixture.hook, fixture.class]
        );
    }
}
