#![forbid(unsafe_code)]

//! The enhancement pass.
//!
//! One pass walks every node of the current tree and brings it to the
//! reconciled state: parent nodes get a classification marker, a toggle
//! control (created or reused), a click handler bound exactly once, and
//! their persisted expanded state applied without animation. The pass is
//! cheap and idempotent by construction; it is rerun in full whenever
//! the renderer replaces content, rather than diffing against what a
//! previous pass saw.
//!
//! Derived per-node state (key, parent/leaf classification, expanded
//! flag, toggle-bound flag) is recomputed every pass from the handles
//! themselves. Nothing is cached across passes, because the renderer may
//! have swapped any node for a fresh object in the meantime.

use navfold_core::contract::{
    ClickEvent, Container, NavNode, NavTree, NodeMarkers, Toggle, ToggleHandler,
};
use navfold_core::identity::node_key;
use navfold_core::motion::MotionController;
use navfold_core::store::{KeyValueStore, StateStore};
use std::rc::Rc;
use web_time::Instant;

/// Counters from one enhancement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnhanceSummary {
    /// Nodes visited.
    pub nodes: usize,
    /// Nodes classified as parents (non-empty sublist).
    pub parents: usize,
    /// Toggles that received a new click-handler binding.
    pub bound: usize,
    /// Parents restored to expanded from persisted state.
    pub restored_expanded: usize,
}

/// Walks the tree and applies reconciled collapse state.
pub struct TreeEnhancer<S: KeyValueStore + 'static> {
    motion: Rc<MotionController>,
    store: Rc<StateStore<S>>,
}

impl<S: KeyValueStore + 'static> TreeEnhancer<S> {
    /// Create an enhancer sharing `motion` and `store` with its click
    /// handlers.
    pub fn new(motion: Rc<MotionController>, store: Rc<StateStore<S>>) -> Self {
        Self { motion, store }
    }

    /// The controller driving state changes.
    #[must_use]
    pub fn motion(&self) -> &Rc<MotionController> {
        &self.motion
    }

    /// Run one pass over `tree`.
    ///
    /// Animations are suspended for the duration of the pass (gate plus
    /// tree marker) and stay suspended when it returns; the caller
    /// re-enables them once layout has settled, so the pass itself never
    /// animates.
    pub fn enhance<T: NavTree>(&self, tree: &T) -> EnhanceSummary {
        let started = Instant::now();
        let span = tracing::debug_span!(
            "navfold.enhance",
            nodes = tracing::field::Empty,
            parents = tracing::field::Empty,
            bound = tracing::field::Empty,
            restored_expanded = tracing::field::Empty,
            pass_duration_us = tracing::field::Empty,
        );
        let _guard = span.enter();

        self.motion.gate().suspend();
        tree.set_motion_suspended(true);

        let persisted = self.store.load();
        let mut summary = EnhanceSummary::default();

        for node in tree.nodes() {
            summary.nodes += 1;
            let Some(container) = node.child_container() else {
                continue;
            };
            if container.child_count() == 0 {
                // Expected a sublist but found none worth toggling;
                // leave the node as a plain leaf.
                continue;
            }
            summary.parents += 1;

            node.set_marker(NodeMarkers::HAS_CHILDREN, true);
            let key = node_key(&node);
            let toggle = node.toggle().unwrap_or_else(|| node.attach_toggle());

            let expanded = persisted.get(&key).unwrap_or(false);
            if expanded {
                summary.restored_expanded += 1;
            }
            self.motion.set_expanded(&node, expanded, false);

            if !toggle.is_bound() {
                toggle.bind(self.click_handler(node.clone(), key));
                summary.bound += 1;
            }
        }

        let pass_duration_us = started.elapsed().as_micros() as u64;
        span.record("nodes", summary.nodes as u64);
        span.record("parents", summary.parents as u64);
        span.record("bound", summary.bound as u64);
        span.record("restored_expanded", summary.restored_expanded as u64);
        span.record("pass_duration_us", pass_duration_us);
        tracing::debug!(
            target: "navfold.enhance",
            nodes = summary.nodes,
            parents = summary.parents,
            bound = summary.bound,
            restored_expanded = summary.restored_expanded,
            pass_duration_us,
            "enhancement pass applied"
        );

        summary
    }

    /// Build the click handler for one toggle.
    ///
    /// The handler reads the node's current marker to decide direction,
    /// animates the change, merges the new flag into the persisted
    /// state, and swallows the click so the surrounding link never
    /// navigates.
    fn click_handler<N: NavNode>(&self, node: N, key: String) -> ToggleHandler {
        let motion = Rc::clone(&self.motion);
        let store = Rc::clone(&self.store);
        Rc::new(move |event: &mut ClickEvent| {
            event.prevent_default();
            event.stop_propagation();
            let will_expand = node.markers().contains(NodeMarkers::COLLAPSED);
            motion.set_expanded(&node, will_expand, true);
            store.record(&key, will_expand);
            tracing::debug!(
                target: "navfold.enhance",
                key = %key,
                expanded = will_expand,
                "toggle clicked"
            );
        })
    }
}
