#![forbid(unsafe_code)]

//! Height/opacity transition coordination.
//!
//! The controller never paints anything. It resolves a node's sublist
//! container, commits numeric height and opacity targets plus the
//! collapsed marker, and leaves the actual animation to the external
//! transition engine. Its job is sequencing:
//!
//! - a transition can only run between two pixel heights, so an
//!   unconstrained container is pinned to a measured value before the
//!   target is committed
//! - after an animated expand completes, the pixel height is cleared
//!   back to natural (if the node is still expanded) so later content
//!   changes reflow without another measurement pass
//! - the non-animated path commits old and new values inside the
//!   container's instant section, so reconciliation never flashes the
//!   wrong state
//!
//! # Invariants
//!
//! - Repeated calls with the same target state are visually inert and
//!   never stack completion callbacks (the listener slot holds one).
//! - While the process-wide [`MotionGate`] is suspended, every call
//!   behaves as if `animate` were false.

use crate::contract::{Container, Height, NavNode, NodeMarkers};
use std::cell::Cell;
use std::rc::Rc;

/// Process-scoped animation suspension flag.
///
/// Shared between the enhancement pass, the controller, and (mirrored
/// onto the tree handle) the external transition engine. Exactly one
/// navigation tree exists at a time, which is why one process-wide flag
/// is enough; see the coordinator docs for the lifecycle.
#[derive(Debug, Clone, Default)]
pub struct MotionGate {
    suspended: Rc<Cell<bool>>,
}

impl MotionGate {
    /// Create a gate with animations enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend animations process-wide.
    pub fn suspend(&self) {
        self.suspended.set(true);
    }

    /// Re-enable animations.
    pub fn resume(&self) {
        self.suspended.set(false);
    }

    /// Whether animations are currently suspended.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended.get()
    }
}

/// Drives a node's sublist between expanded and collapsed.
pub struct MotionController {
    gate: MotionGate,
}

impl MotionController {
    /// Create a controller honoring `gate`.
    #[must_use]
    pub fn new(gate: MotionGate) -> Self {
        Self { gate }
    }

    /// The suspension gate this controller honors.
    #[must_use]
    pub fn gate(&self) -> &MotionGate {
        &self.gate
    }

    /// Apply `expanded` to `node`'s sublist.
    ///
    /// A node without a sublist (or with an empty one) is a leaf and
    /// this is a no-op. With `animate`, numeric targets are committed
    /// for the transition engine; without it (or while the gate is
    /// suspended), the final state is snapped in with no visible
    /// in-between frame.
    pub fn set_expanded<N: NavNode>(&self, node: &N, expanded: bool, animate: bool) {
        let Some(container) = node.child_container() else {
            return;
        };
        if container.child_count() == 0 {
            return;
        }
        let animate = animate && !self.gate.is_suspended();
        if expanded {
            self.expand(node, &container, animate);
        } else {
            self.collapse(node, &container, animate);
        }
    }

    fn expand<N: NavNode>(&self, node: &N, container: &N::Container, animate: bool) {
        node.set_marker(NodeMarkers::COLLAPSED, false);
        container.set_opacity(1.0);
        if animate {
            if container.height().is_natural() {
                // A transition cannot start from an unconstrained height.
                let pinned = container.content_height();
                container.commit_instant(&mut || container.set_height(Height::Px(pinned)));
            }
            container.set_height(Height::Px(container.content_height()));
            let done_node = node.clone();
            let done = container.clone();
            container.set_transition_listener(Some(Box::new(move || {
                // Only unpin if nothing collapsed the node mid-flight.
                if !done_node.markers().contains(NodeMarkers::COLLAPSED) {
                    done.set_height(Height::Natural);
                }
            })));
            tracing::debug!(target: "navfold.motion", animate, "expand committed");
        } else {
            container.set_transition_listener(None);
            container.commit_instant(&mut || container.set_height(Height::Natural));
        }
    }

    fn collapse<N: NavNode>(&self, node: &N, container: &N::Container, animate: bool) {
        let current = container.height();
        let at_zero = matches!(current, Height::Px(px) if px <= f64::EPSILON);
        if node.markers().contains(NodeMarkers::COLLAPSED) && at_zero {
            // Already collapsed and at rest.
            return;
        }
        if current.is_natural() || at_zero {
            // Guarantee a nonzero starting point for the transition.
            let pinned = container.content_height();
            container.commit_instant(&mut || container.set_height(Height::Px(pinned)));
        }
        if animate {
            node.set_marker(NodeMarkers::COLLAPSED, true);
            container.set_height(Height::Px(0.0));
            tracing::debug!(target: "navfold.motion", animate, "collapse committed");
        } else {
            container.set_transition_listener(None);
            container.commit_instant(&mut || {
                node.set_marker(NodeMarkers::COLLAPSED, true);
                container.set_height(Height::Px(0.0));
            });
        }
        container.set_opacity(0.0);
    }

    /// Refresh a pinned container after a layout change.
    ///
    /// Containers holding a pixel height (mid-transition or pinned by a
    /// reconciliation pass) are re-measured so the pixel value matches
    /// the new content height. Natural-height containers are untouched.
    pub fn repin<C: Container>(&self, container: &C) {
        if let Height::Px(_) = container.height() {
            container.set_height(Height::Px(container.content_height()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Toggle, ToggleHandler, TransitionListener};
    use proptest::prelude::*;
    use std::cell::RefCell;

    #[derive(Clone)]
    struct FakeToggle;

    impl Toggle for FakeToggle {
        fn is_bound(&self) -> bool {
            false
        }
        fn bind(&self, _handler: ToggleHandler) {}
    }

    #[derive(Clone)]
    struct FakeContainer {
        inner: Rc<FakeContainerInner>,
    }

    struct FakeContainerInner {
        children: Cell<usize>,
        height: Cell<Height>,
        opacity: Cell<f64>,
        content: Cell<f64>,
        instant_depth: Cell<u32>,
        listener: RefCell<Option<TransitionListener>>,
        // (height, committed inside the instant section)
        commits: RefCell<Vec<(Height, bool)>>,
        listener_installs: Cell<usize>,
    }

    impl FakeContainer {
        fn new(children: usize, content: f64) -> Self {
            Self {
                inner: Rc::new(FakeContainerInner {
                    children: Cell::new(children),
                    height: Cell::new(Height::Natural),
                    opacity: Cell::new(1.0),
                    content: Cell::new(content),
                    instant_depth: Cell::new(0),
                    listener: RefCell::new(None),
                    commits: RefCell::new(Vec::new()),
                    listener_installs: Cell::new(0),
                }),
            }
        }

        fn complete_transition(&self) -> bool {
            let listener = self.inner.listener.borrow_mut().take();
            match listener {
                Some(listener) => {
                    listener();
                    true
                }
                None => false,
            }
        }

        fn has_listener(&self) -> bool {
            self.inner.listener.borrow().is_some()
        }

        fn commits(&self) -> Vec<(Height, bool)> {
            self.inner.commits.borrow().clone()
        }
    }

    impl Container for FakeContainer {
        fn child_count(&self) -> usize {
            self.inner.children.get()
        }
        fn height(&self) -> Height {
            self.inner.height.get()
        }
        fn set_height(&self, height: Height) {
            self.inner.height.set(height);
            self.inner
                .commits
                .borrow_mut()
                .push((height, self.inner.instant_depth.get() > 0));
        }
        fn set_opacity(&self, opacity: f64) {
            self.inner.opacity.set(opacity);
        }
        fn content_height(&self) -> f64 {
            self.inner.content.get()
        }
        fn set_transition_listener(&self, listener: Option<TransitionListener>) {
            if listener.is_some() {
                self.inner
                    .listener_installs
                    .set(self.inner.listener_installs.get() + 1);
            }
            *self.inner.listener.borrow_mut() = listener;
        }
        fn commit_instant(&self, apply: &mut dyn FnMut()) {
            self.inner.instant_depth.set(self.inner.instant_depth.get() + 1);
            apply();
            self.inner.instant_depth.set(self.inner.instant_depth.get() - 1);
        }
    }

    #[derive(Clone)]
    struct FakeNode {
        markers: Rc<Cell<NodeMarkers>>,
        container: Option<FakeContainer>,
    }

    impl FakeNode {
        fn parent(children: usize, content: f64) -> Self {
            Self {
                markers: Rc::new(Cell::new(NodeMarkers::empty())),
                container: Some(FakeContainer::new(children, content)),
            }
        }

        fn leaf() -> Self {
            Self {
                markers: Rc::new(Cell::new(NodeMarkers::empty())),
                container: None,
            }
        }

        fn container(&self) -> &FakeContainer {
            self.container.as_ref().unwrap()
        }
    }

    impl NavNode for FakeNode {
        type Container = FakeContainer;
        type Toggle = FakeToggle;

        fn child_container(&self) -> Option<FakeContainer> {
            self.container.clone()
        }
        fn link_target(&self) -> Option<String> {
            None
        }
        fn text_content(&self) -> String {
            String::new()
        }
        fn toggle(&self) -> Option<FakeToggle> {
            None
        }
        fn attach_toggle(&self) -> FakeToggle {
            FakeToggle
        }
        fn markers(&self) -> NodeMarkers {
            self.markers.get()
        }
        fn set_marker(&self, marker: NodeMarkers, on: bool) {
            let mut m = self.markers.get();
            m.set(marker, on);
            self.markers.set(m);
        }
    }

    fn controller() -> MotionController {
        MotionController::new(MotionGate::new())
    }

    #[test]
    fn leaf_node_is_a_no_op() {
        let node = FakeNode::leaf();
        controller().set_expanded(&node, true, true);
        assert!(node.markers().is_empty());
    }

    #[test]
    fn empty_container_is_a_no_op() {
        let node = FakeNode::parent(0, 0.0);
        controller().set_expanded(&node, false, false);
        assert!(node.markers().is_empty());
        assert!(node.container().commits().is_empty());
    }

    #[test]
    fn snap_collapse_sets_zero_height_and_marker() {
        let node = FakeNode::parent(3, 120.0);
        controller().set_expanded(&node, false, false);
        assert!(node.markers().contains(NodeMarkers::COLLAPSED));
        assert_eq!(node.container().height(), Height::Px(0.0));
        assert_eq!(node.container().inner.opacity.get(), 0.0);
        // Every height commit happened inside the instant section.
        assert!(node.container().commits().iter().all(|(_, instant)| *instant));
    }

    #[test]
    fn snap_expand_restores_natural_height() {
        let node = FakeNode::parent(3, 120.0);
        controller().set_expanded(&node, false, false);
        controller().set_expanded(&node, true, false);
        assert!(!node.markers().contains(NodeMarkers::COLLAPSED));
        assert!(node.container().height().is_natural());
        assert_eq!(node.container().inner.opacity.get(), 1.0);
        assert!(!node.container().has_listener());
    }

    #[test]
    fn animated_expand_pins_then_targets_content_height() {
        let node = FakeNode::parent(2, 80.0);
        controller().set_expanded(&node, false, false);
        controller().set_expanded(&node, true, true);
        // Collapsed at 0px, so no pin is needed; target goes straight to content.
        assert_eq!(node.container().height(), Height::Px(80.0));
        assert!(node.container().has_listener());
    }

    #[test]
    fn animated_expand_from_natural_pins_first() {
        let node = FakeNode::parent(2, 80.0);
        controller().set_expanded(&node, true, true);
        let commits = node.container().commits();
        // First commit is the instant pin, then the animated target.
        assert_eq!(commits[0], (Height::Px(80.0), true));
        assert_eq!(commits[1], (Height::Px(80.0), false));
    }

    #[test]
    fn expand_completion_unpins_height() {
        let node = FakeNode::parent(2, 80.0);
        controller().set_expanded(&node, false, false);
        controller().set_expanded(&node, true, true);
        assert!(node.container().complete_transition());
        assert!(node.container().height().is_natural());
    }

    #[test]
    fn stale_completion_after_collapse_leaves_height_alone() {
        let node = FakeNode::parent(2, 80.0);
        let motion = controller();
        motion.set_expanded(&node, false, false);
        motion.set_expanded(&node, true, true);
        // Collapse before the expand transition finishes.
        motion.set_expanded(&node, false, true);
        assert!(node.container().complete_transition());
        assert_eq!(node.container().height(), Height::Px(0.0));
    }

    #[test]
    fn animated_collapse_from_natural_pins_nonzero_start() {
        let node = FakeNode::parent(4, 200.0);
        controller().set_expanded(&node, false, true);
        let commits = node.container().commits();
        assert_eq!(commits[0], (Height::Px(200.0), true));
        assert_eq!(commits[1], (Height::Px(0.0), false));
        assert!(node.markers().contains(NodeMarkers::COLLAPSED));
    }

    #[test]
    fn collapse_when_already_collapsed_is_inert() {
        let node = FakeNode::parent(2, 80.0);
        let motion = controller();
        motion.set_expanded(&node, false, false);
        let before = node.container().commits().len();
        motion.set_expanded(&node, false, true);
        motion.set_expanded(&node, false, false);
        assert_eq!(node.container().commits().len(), before);
    }

    #[test]
    fn repeated_expand_never_stacks_listeners() {
        let node = FakeNode::parent(2, 80.0);
        let motion = controller();
        motion.set_expanded(&node, false, false);
        motion.set_expanded(&node, true, true);
        motion.set_expanded(&node, true, true);
        motion.set_expanded(&node, true, true);
        // Three installs, but replacing the single slot means exactly
        // one completion fires.
        assert_eq!(node.container().inner.listener_installs.get(), 3);
        assert!(node.container().complete_transition());
        assert!(!node.container().complete_transition());
    }

    #[test]
    fn suspended_gate_forces_snap() {
        let gate = MotionGate::new();
        let motion = MotionController::new(gate.clone());
        gate.suspend();
        let node = FakeNode::parent(2, 80.0);
        motion.set_expanded(&node, false, true);
        // All commits ran inside the instant section despite animate=true.
        assert!(node.container().commits().iter().all(|(_, instant)| *instant));
        gate.resume();
        assert!(!gate.is_suspended());
    }

    #[test]
    fn repin_updates_only_pixel_heights() {
        let motion = controller();
        let pinned = FakeContainer::new(2, 80.0);
        pinned.set_height(Height::Px(80.0));
        pinned.inner.content.set(140.0);
        motion.repin(&pinned);
        assert_eq!(pinned.height(), Height::Px(140.0));

        let natural = FakeContainer::new(2, 80.0);
        motion.repin(&natural);
        assert!(natural.height().is_natural());
    }

    proptest! {
        /// Any call sequence leaves marker, opacity, and height telling
        /// the same story as the last requested state.
        #[test]
        fn state_tracks_last_request(ops in proptest::collection::vec((any::<bool>(), any::<bool>()), 1..24)) {
            let node = FakeNode::parent(3, 96.0);
            let motion = controller();
            for (expanded, animate) in &ops {
                motion.set_expanded(&node, *expanded, *animate);
            }
            let (last_expanded, _) = ops[ops.len() - 1];
            let collapsed = node.markers().contains(NodeMarkers::COLLAPSED);
            prop_assert_eq!(collapsed, !last_expanded);
            let opacity = node.container().inner.opacity.get();
            prop_assert_eq!(opacity, if last_expanded { 1.0 } else { 0.0 });
            if collapsed {
                prop_assert_eq!(node.container().height(), Height::Px(0.0));
            }
        }
    }
}
