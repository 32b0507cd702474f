//! The renderer: mount, update, and static render passes over one tree.

use super::{CancellationToken, PropagationPolicy, VisitState};
use crate::context::{CellId, ContextCell, ContextStack, ContextValue, DependencyRecord};
use crate::diagnostics::{DiagnosticSink, LegacyKind, NoOpSink};
use crate::errors::{CascadeError, StackImbalanceError};
use crate::legacy::{LegacyContextAdapter, WarnedTypes};
use crate::lifecycle::{LifecycleBridge, NoOpBridge};
use crate::tree::{
    Component, ConsumerKind, GuardBehavior, LegacyConsumerStyle, NodeId, Output,
    SubscriberIndex, Tree,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

/// Owns one render tree and drives context delivery through it.
///
/// A renderer executes at most one pass at a time on one logical thread of
/// control; the binding stack and dependency records are exclusively owned
/// by the active pass. Passes may be cancelled cooperatively, in which case
/// all pushed bindings unwind before the abort surfaces.
pub struct Renderer {
    tree: Tree,
    stack: Arc<ContextStack>,
    deps: HashMap<usize, DependencyRecord>,
    cache: HashMap<usize, Output>,
    subscribers: SubscriberIndex,
    states: HashMap<usize, VisitState>,
    /// Eager policy: consumers force-marked by a changed provider (sticky).
    forced: HashSet<usize>,
    /// Eager policy: nodes with force-marked descendants.
    dirty_paths: HashSet<usize>,
    /// Lazy policy: changed cells currently in scope during the walk,
    /// counted to survive nested providers of the same cell.
    active_changed: HashMap<CellId, u32>,
    /// Nodes with a staged provider value somewhere below, recomputed per
    /// pass. Bailed ancestors must still walk down to commit it.
    pending_paths: HashSet<usize>,
    sink: Arc<dyn DiagnosticSink>,
    bridge: Arc<dyn LifecycleBridge>,
    warned: Arc<WarnedTypes>,
    cancel: Arc<CancellationToken>,
    policy: PropagationPolicy,
    mounted: bool,
}

impl Renderer {
    /// Creates a renderer over a tree with the configured default policy.
    #[must_use]
    pub fn new(tree: Tree) -> Self {
        Self {
            tree,
            stack: Arc::new(ContextStack::new()),
            deps: HashMap::new(),
            cache: HashMap::new(),
            subscribers: SubscriberIndex::new(),
            states: HashMap::new(),
            forced: HashSet::new(),
            dirty_paths: HashSet::new(),
            active_changed: HashMap::new(),
            pending_paths: HashSet::new(),
            sink: Arc::new(NoOpSink),
            bridge: Arc::new(NoOpBridge),
            warned: Arc::new(WarnedTypes::new()),
            cancel: Arc::new(CancellationToken::new()),
            policy: PropagationPolicy::configured(),
            mounted: false,
        }
    }

    /// Sets the propagation policy (tests pin both explicitly).
    #[must_use]
    pub fn with_policy(mut self, policy: PropagationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the diagnostic sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the lifecycle bridge.
    #[must_use]
    pub fn with_bridge(mut self, bridge: Arc<dyn LifecycleBridge>) -> Self {
        self.bridge = bridge;
        self
    }

    /// Shares a warn-once registry across renderers (remount scenarios).
    #[must_use]
    pub fn with_warned_types(mut self, warned: Arc<WarnedTypes>) -> Self {
        self.warned = warned;
        self
    }

    /// Attaches a cancellation token checked between node visits.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: Arc<CancellationToken>) -> Self {
        self.cancel = cancel;
        self
    }

    /// The active propagation policy.
    #[must_use]
    pub fn policy(&self) -> PropagationPolicy {
        self.policy
    }

    /// Read access to the tree.
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The visit state a node reached in the most recent pass.
    #[must_use]
    pub fn visit_state(&self, id: NodeId) -> VisitState {
        self.states.get(&id.0).copied().unwrap_or_default()
    }

    /// True when no bindings are left over from the last pass.
    #[must_use]
    pub fn stack_balanced(&self) -> bool {
        self.stack.is_balanced()
    }

    /// Stages a new provider value for the next update pass.
    pub fn set_provider_value(
        &mut self,
        id: NodeId,
        value: ContextValue,
    ) -> Result<(), CascadeError> {
        self.tree.set_provider_value(id, value)
    }

    /// Unmounts a subtree: detaches it, drops its render state, and
    /// recomputes the subscriber index before any sibling work proceeds.
    pub fn unmount(&mut self, parent: NodeId, child: NodeId) -> Result<(), CascadeError> {
        self.tree.detach_child(parent, child)?;
        let removed = self.tree.remove_subtree(child)?;
        for id in &removed {
            self.deps.remove(&id.0);
            self.cache.remove(&id.0);
            self.forced.remove(&id.0);
            self.dirty_paths.remove(&id.0);
            self.pending_paths.remove(&id.0);
            self.states.remove(&id.0);
        }
        self.subscribers.rebuild(&self.tree);
        debug!(removed = removed.len(), "unmounted subtree");
        Ok(())
    }

    /// Initial client render: records dependencies, caches outputs, fires no
    /// update hooks.
    pub fn mount(&mut self) -> Result<Output, CascadeError> {
        self.begin_pass();
        let root = self.tree.root().ok_or(CascadeError::MissingRoot)?;
        debug!(policy = ?self.policy, "mount pass");
        let out = self.first_render(root, true)?;
        self.finish_pass()?;
        self.mounted = true;
        Ok(out)
    }

    /// Server-style single-pass render.
    ///
    /// Produces the same logical values as [`Renderer::mount`] for an
    /// equivalent tree, but records nothing and fires no client lifecycle
    /// hooks. Legacy warnings still dedupe through the shared registry.
    pub fn render_static(&mut self) -> Result<Output, CascadeError> {
        let root = self.tree.root().ok_or(CascadeError::MissingRoot)?;
        debug!("static pass");
        let out = self.first_render(root, false)?;
        if let Some(poison) = self.stack.take_poison() {
            return Err(poison.into());
        }
        Ok(out)
    }

    /// Re-render pass: commits staged provider values and propagates changes
    /// per the active policy. Mounts first when never mounted.
    pub fn update(&mut self) -> Result<Output, CascadeError> {
        if !self.mounted {
            return self.mount();
        }
        self.begin_pass();
        let root = self.tree.root().ok_or(CascadeError::MissingRoot)?;
        debug!(policy = ?self.policy, "update pass");
        let out = self.update_node(root, false)?;
        self.finish_pass()?;
        Ok(out)
    }

    fn begin_pass(&mut self) {
        self.subscribers.rebuild(&self.tree);
        self.states.clear();
        self.forced.clear();
        self.dirty_paths.clear();
        self.active_changed.clear();
        self.pending_paths.clear();
        if let Some(root) = self.tree.root() {
            scan_pending(&self.tree, root, &mut self.pending_paths);
        }
    }

    fn finish_pass(&mut self) -> Result<(), CascadeError> {
        if let Some(poison) = self.stack.take_poison() {
            return Err(poison.into());
        }
        if self.stack.depth() != 0 {
            return Err(StackImbalanceError::new("<end of pass>", None).into());
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), CascadeError> {
        if self.cancel.is_cancelled() {
            return Err(CascadeError::RenderAborted(
                self.cancel
                    .reason()
                    .unwrap_or_else(|| "cancelled".to_string()),
            ));
        }
        Ok(())
    }

    fn adapter(&self) -> LegacyContextAdapter {
        LegacyContextAdapter::new(self.warned.clone(), self.sink.clone())
    }

    fn record_dep(&mut self, id: NodeId, cell: &ContextCell, value: ContextValue) {
        self.deps.entry(id.0).or_default().record(cell, value);
    }

    fn commit(&mut self, id: NodeId, out: Output, persist: bool) -> Output {
        if persist {
            self.cache.insert(id.0, out.clone());
            self.states.insert(id.0, VisitState::Done);
        }
        out
    }

    fn cached(&mut self, id: NodeId) -> Output {
        self.states.insert(id.0, VisitState::BailedOut);
        self.cache.get(&id.0).cloned().unwrap_or(Output::Empty)
    }

    /// Whether a bailed-out node must still be walked through because the
    /// pass has confirmed (or suspected) dirty consumers below it.
    fn subtree_needs_visit(&self, id: NodeId) -> bool {
        // A staged provider value below must always be reached so it commits
        // this pass, independent of ancestor update decisions.
        if self.pending_paths.contains(&id.0) {
            return true;
        }
        match self.policy {
            PropagationPolicy::Eager => self.dirty_paths.contains(&id.0),
            PropagationPolicy::Lazy => self
                .subscribers
                .subtree_subscribes_any(id, self.active_changed.keys()),
        }
    }

    // --- first render (mount / static) -----------------------------------

    fn first_render(&mut self, id: NodeId, persist: bool) -> Result<Output, CascadeError> {
        self.check_cancelled()?;
        if persist {
            self.states.insert(id.0, VisitState::Visiting);
        }
        let node = self.tree.node(id)?.clone();

        let out = match node.component {
            Component::Host { tag } => {
                let mut outs = Vec::with_capacity(node.children.len());
                for child in &node.children {
                    outs.push(self.first_render(*child, persist)?);
                }
                Output::element(tag, outs)
            }
            Component::Provider { cell, value, pending } => {
                // A value staged before the first render is committed here:
                // push happens before the subtree's own render, so the
                // subtree observes the newest binding.
                let value = pending.map_or(value, |p| {
                    if let Ok(n) = self.tree.node_mut(id) {
                        if let Component::Provider { value, pending, .. } = &mut n.component {
                            *value = p.clone();
                            *pending = None;
                        }
                    }
                    p
                });
                let stack = Arc::clone(&self.stack);
                let scope = stack.enter(cell, value);
                let result = self.render_children_first(&node.children, persist);
                match result {
                    Ok(outs) => {
                        scope.exit()?;
                        Output::fragment(outs)
                    }
                    Err(err) => return Err(err),
                }
            }
            Component::Consumer(kind) => {
                let cell = kind.cell().clone();
                let value = self.stack.read(&cell);
                trace!(cell = %cell.name(), node = %id, "consumer read");
                if persist {
                    self.record_dep(id, &cell, value.clone());
                }
                kind.deliver(&value)
            }
            Component::Class { .. } => {
                let outs = self.render_children_first(&node.children, persist)?;
                Output::fragment(outs)
            }
            Component::LegacyProvider { type_name, .. } => {
                let _empty = self.adapter().intercept_provider(&type_name);
                let outs = self.render_children_first(&node.children, persist)?;
                Output::fragment(outs)
            }
            Component::LegacyConsumer { type_name, style, render } => {
                let value = self
                    .adapter()
                    .intercept_consumer(&type_name, legacy_kind(style));
                render(&value)
            }
        };

        Ok(self.commit(id, out, persist))
    }

    fn render_children_first(
        &mut self,
        children: &[NodeId],
        persist: bool,
    ) -> Result<Vec<Output>, CascadeError> {
        let mut outs = Vec::with_capacity(children.len());
        for child in children {
            outs.push(self.first_render(*child, persist)?);
        }
        Ok(outs)
    }

    // --- update pass ------------------------------------------------------

    fn update_node(&mut self, id: NodeId, ancestor_bailed: bool) -> Result<Output, CascadeError> {
        self.check_cancelled()?;
        let node = self.tree.node(id)?.clone();

        match node.component {
            Component::Host { tag } => {
                if ancestor_bailed && !self.subtree_needs_visit(id) {
                    return Ok(self.cached(id));
                }
                self.states.insert(id.0, VisitState::Visiting);
                let mut outs = Vec::with_capacity(node.children.len());
                for child in &node.children {
                    outs.push(self.update_node(*child, ancestor_bailed)?);
                }
                Ok(self.commit(id, Output::element(tag, outs), true))
            }

            Component::Provider { ref cell, ref value, ref pending } => {
                let has_pending = pending.is_some();
                if ancestor_bailed && !has_pending && !self.subtree_needs_visit(id) {
                    return Ok(self.cached(id));
                }
                self.states.insert(id.0, VisitState::Visiting);

                // Commit the staged value; the change is detected by
                // reference inequality against the previous push.
                let (cell, new_value, changed) = {
                    let cell = cell.clone();
                    match pending.clone() {
                        Some(p) => {
                            let changed = !ContextValue::same(&p, value);
                            if let Component::Provider { value, pending, .. } =
                                &mut self.tree.node_mut(id)?.component
                            {
                                *value = p.clone();
                                *pending = None;
                            }
                            (cell, p, changed)
                        }
                        None => (cell, value.clone(), false),
                    }
                };

                if changed {
                    debug!(cell = %cell.name(), node = %id, policy = ?self.policy, "provider value changed");
                }

                let stack = Arc::clone(&self.stack);
                let scope = stack.enter(cell.clone(), new_value.clone());

                if changed {
                    match self.policy {
                        PropagationPolicy::Eager => {
                            self.propagate_eager(id, &cell, &new_value)?;
                        }
                        PropagationPolicy::Lazy => {
                            *self.active_changed.entry(cell.id()).or_insert(0) += 1;
                        }
                    }
                }

                let mut outs = Vec::with_capacity(node.children.len());
                let mut walk = || -> Result<(), CascadeError> {
                    for child in &node.children {
                        outs.push(self.update_node(*child, ancestor_bailed)?);
                    }
                    Ok(())
                };
                let result = walk();

                if changed && self.policy == PropagationPolicy::Lazy {
                    if let Some(count) = self.active_changed.get_mut(&cell.id()) {
                        *count -= 1;
                        if *count == 0 {
                            self.active_changed.remove(&cell.id());
                        }
                    }
                }

                result?;
                scope.exit()?;
                Ok(self.commit(id, Output::fragment(outs), true))
            }

            Component::Consumer(ref kind) => self.update_consumer(id, kind, ancestor_bailed),

            Component::Class { ref name, guard } => {
                self.update_class(id, name, guard, &node.children, ancestor_bailed)
            }

            Component::LegacyProvider { ref type_name, .. } => {
                if ancestor_bailed && !self.subtree_needs_visit(id) {
                    return Ok(self.cached(id));
                }
                self.states.insert(id.0, VisitState::Visiting);
                let _empty = self.adapter().intercept_provider(type_name);
                let mut outs = Vec::with_capacity(node.children.len());
                for child in &node.children {
                    outs.push(self.update_node(*child, ancestor_bailed)?);
                }
                Ok(self.commit(id, Output::fragment(outs), true))
            }

            Component::LegacyConsumer { ref type_name, style, ref render } => {
                // Legacy consumers receive no change notifications; they
                // only re-render when their parent does.
                if ancestor_bailed {
                    return Ok(self.cached(id));
                }
                self.states.insert(id.0, VisitState::Visiting);
                let value = self.adapter().intercept_consumer(type_name, legacy_kind(style));
                if style == LegacyConsumerStyle::Class {
                    let null = serde_json::Value::Null;
                    self.bridge.invoke_will_receive(id, type_name, &null, &value);
                    let _ = self.bridge.invoke_update_guard(
                        id,
                        type_name,
                        GuardBehavior::Update,
                        &null,
                        &null,
                        &value,
                    );
                    self.bridge
                        .invoke_will_update(id, type_name, &null, &null, &value);
                }
                Ok(self.commit(id, render(&value), true))
            }
        }
    }

    fn update_consumer(
        &mut self,
        id: NodeId,
        kind: &ConsumerKind,
        ancestor_bailed: bool,
    ) -> Result<Output, CascadeError> {
        let cell = kind.cell().clone();
        let new = self.stack.read(&cell);
        let dep_changed = self
            .deps
            .get(&id.0)
            .map_or(true, |d| d.changed(&cell, &new));
        let ctx_forced = match self.policy {
            PropagationPolicy::Eager => self.forced.contains(&id.0),
            PropagationPolicy::Lazy => {
                self.active_changed.contains_key(&cell.id()) && dep_changed
            }
        };

        if ancestor_bailed && !ctx_forced {
            return Ok(self.cached(id));
        }
        self.states.insert(id.0, VisitState::Visiting);

        match kind {
            ConsumerKind::RenderProp { .. } | ConsumerKind::HookSubscription { .. } => {
                // No guard hooks: always re-renders when visited.
                self.record_dep(id, &cell, new.clone());
                Ok(self.commit(id, kind.deliver(&new), true))
            }
            ConsumerKind::SubscribedClass { name, guard, .. } => {
                let null = serde_json::Value::Null;
                self.bridge.invoke_will_receive(id, name, &null, &new);
                let decision =
                    self.bridge
                        .invoke_update_guard(id, name, *guard, &null, &null, &new);

                let renders = match self.policy {
                    PropagationPolicy::Eager => {
                        // A skipping guard suppresses will-update, but the
                        // context-driven need is sticky: the re-render
                        // happens regardless.
                        if decision {
                            self.bridge.invoke_will_update(id, name, &null, &null, &new);
                        }
                        decision || ctx_forced
                    }
                    PropagationPolicy::Lazy => {
                        // Forcing is applied only after the guard's
                        // decision; a confirmed change runs the full hook
                        // sequence.
                        let renders = decision || ctx_forced;
                        if renders {
                            self.bridge.invoke_will_update(id, name, &null, &null, &new);
                        }
                        renders
                    }
                };

                if renders {
                    self.record_dep(id, &cell, new.clone());
                    Ok(self.commit(id, kind.deliver(&new), true))
                } else {
                    Ok(self.cached(id))
                }
            }
        }
    }

    fn update_class(
        &mut self,
        id: NodeId,
        name: &str,
        guard: GuardBehavior,
        children: &[NodeId],
        ancestor_bailed: bool,
    ) -> Result<Output, CascadeError> {
        if ancestor_bailed {
            if !self.subtree_needs_visit(id) {
                return Ok(self.cached(id));
            }
            // On a dirty path below a bailed ancestor: the class itself is
            // not receiving an update, so no hooks fire; the walk only
            // carries context through to the confirmed consumers.
            let mut outs = Vec::with_capacity(children.len());
            for child in children {
                outs.push(self.update_node(*child, true)?);
            }
            let out = Output::fragment(outs);
            self.cache.insert(id.0, out.clone());
            self.states.insert(id.0, VisitState::BailedOut);
            return Ok(out);
        }

        self.states.insert(id.0, VisitState::Visiting);
        let null = serde_json::Value::Null;
        // An unsubscribed class observes no context; its hooks receive the
        // undefined value.
        let next_context = ContextValue::Undefined;
        self.bridge.invoke_will_receive(id, name, &null, &next_context);
        let decision =
            self.bridge
                .invoke_update_guard(id, name, guard, &null, &null, &next_context);

        if decision {
            self.bridge
                .invoke_will_update(id, name, &null, &null, &next_context);
            let mut outs = Vec::with_capacity(children.len());
            for child in children {
                outs.push(self.update_node(*child, false)?);
            }
            return Ok(self.commit(id, Output::fragment(outs), true));
        }

        if self.subtree_needs_visit(id) {
            trace!(node = %id, "bailout with dirty descendants, walking through");
            let mut outs = Vec::with_capacity(children.len());
            for child in children {
                outs.push(self.update_node(*child, true)?);
            }
            let out = Output::fragment(outs);
            self.cache.insert(id.0, out.clone());
            self.states.insert(id.0, VisitState::BailedOut);
            return Ok(out);
        }

        Ok(self.cached(id))
    }

    // --- eager propagation -------------------------------------------------

    /// Walks the subtree below a changed provider, force-marking consumers
    /// whose recorded value differs by reference from the new binding.
    fn propagate_eager(
        &mut self,
        provider: NodeId,
        cell: &ContextCell,
        new: &ContextValue,
    ) -> Result<(), CascadeError> {
        let children = self.tree.node(provider)?.children.clone();
        let mut any = false;
        for child in children {
            any |= self.mark_subtree(child, cell, new)?;
        }
        if any {
            self.dirty_paths.insert(provider.0);
        }
        Ok(())
    }

    fn mark_subtree(
        &mut self,
        id: NodeId,
        cell: &ContextCell,
        new: &ContextValue,
    ) -> Result<bool, CascadeError> {
        let node = self.tree.node(id)?.clone();
        let mut any = false;

        match &node.component {
            // A nested provider for the same cell shadows this change.
            Component::Provider { cell: inner, .. } if inner == cell => return Ok(false),
            Component::Consumer(kind) if kind.cell() == cell => {
                let changed = self
                    .deps
                    .get(&id.0)
                    .map_or(true, |d| d.changed(cell, new));
                if changed {
                    trace!(node = %id, cell = %cell.name(), "force-marking consumer");
                    self.forced.insert(id.0);
                    self.states.insert(id.0, VisitState::MarkedDirty);
                    any = true;
                }
            }
            Component::Class { guard: GuardBehavior::Skip, .. } => {
                // A would-bail ancestor that neither depends on the cell nor
                // has matching subscriptions below it ends the descent. This
                // is the main optimization; the subscriber index keeps it
                // from skipping deep consumers.
                if !self.subscribers.subtree_subscribes(id, cell) {
                    return Ok(false);
                }
            }
            // Legacy consumers receive no change notifications.
            Component::LegacyConsumer { .. } => return Ok(false),
            _ => {}
        }

        for child in node.children {
            any |= self.mark_subtree(child, cell, new)?;
        }
        if any {
            self.dirty_paths.insert(id.0);
        }
        Ok(any)
    }
}

/// Collects, bottom-up, every node whose subtree holds a provider with a
/// staged value. Returns whether the subtree at `id` holds one.
fn scan_pending(tree: &Tree, id: NodeId, paths: &mut HashSet<usize>) -> bool {
    let Ok(node) = tree.node(id) else {
        return false;
    };
    let mut any = matches!(
        node.component,
        Component::Provider { pending: Some(_), .. }
    );
    for child in &node.children {
        any |= scan_pending(tree, *child, paths);
    }
    if any {
        paths.insert(id.0);
    }
    any
}

const fn legacy_kind(style: LegacyConsumerStyle) -> LegacyKind {
    match style {
        LegacyConsumerStyle::Class => LegacyKind::ConsumerClass,
        LegacyConsumerStyle::Function => LegacyKind::ConsumerFunction,
    }
}
