#![forbid(unsafe_code)]

//! In-memory navigation tree with a journaling transition engine.

use navfold_core::contract::{
    ClickEvent, Container, Height, NavNode, NavTree, NodeMarkers, Toggle, ToggleHandler,
    TransitionListener,
};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Simulated row height used to derive container content heights.
pub const ROW_HEIGHT: f64 = 24.0;

/// One style commit observed by the simulated transition engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRecord {
    /// Label of the node owning the container.
    pub node: String,
    /// `"height"` or `"opacity"`.
    pub property: &'static str,
    /// Whether the engine would have animated this commit.
    pub animated: bool,
}

/// Shared engine state: the tree-wide suspension marker, the commit
/// journal, and containers with a height transition in flight.
struct EngineState {
    suspended: Cell<bool>,
    journal: RefCell<Vec<TransitionRecord>>,
    pending: RefCell<Vec<Weak<ContainerInner>>>,
}

impl EngineState {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            suspended: Cell::new(false),
            journal: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
        })
    }
}

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

struct ContainerInner {
    node_label: String,
    child_count: Cell<usize>,
    height: Cell<Height>,
    opacity: Cell<f64>,
    content_height: Cell<f64>,
    instant_depth: Cell<u32>,
    listener: RefCell<Option<TransitionListener>>,
    engine: Rc<EngineState>,
}

/// Sublist container handle.
#[derive(Clone)]
pub struct MemContainer {
    inner: Rc<ContainerInner>,
}

impl MemContainer {
    fn new(node_label: &str, child_count: usize, engine: Rc<EngineState>) -> Self {
        Self {
            inner: Rc::new(ContainerInner {
                node_label: node_label.to_owned(),
                child_count: Cell::new(child_count),
                height: Cell::new(Height::Natural),
                opacity: Cell::new(1.0),
                content_height: Cell::new(child_count as f64 * ROW_HEIGHT),
                instant_depth: Cell::new(0),
                listener: RefCell::new(None),
                engine,
            }),
        }
    }

    /// Current opacity.
    #[must_use]
    pub fn opacity(&self) -> f64 {
        self.inner.opacity.get()
    }

    /// Override the measured content height (simulates a layout change).
    pub fn set_content_height(&self, height: f64) {
        self.inner.content_height.set(height);
    }

    /// Whether a completion listener is installed.
    #[must_use]
    pub fn has_transition_listener(&self) -> bool {
        self.inner.listener.borrow().is_some()
    }
}

impl Container for MemContainer {
    fn child_count(&self) -> usize {
        self.inner.child_count.get()
    }

    fn height(&self) -> Height {
        self.inner.height.get()
    }

    fn set_height(&self, height: Height) {
        let prev = self.inner.height.get();
        self.inner.height.set(height);
        if prev == height {
            return;
        }
        // The engine animates only pixel-to-pixel changes committed
        // outside the instant section while the tree is not suspended.
        let numeric = !prev.is_natural() && !height.is_natural();
        let animated = numeric
            && self.inner.instant_depth.get() == 0
            && !self.inner.engine.suspended.get();
        self.inner.engine.journal.borrow_mut().push(TransitionRecord {
            node: self.inner.node_label.clone(),
            property: "height",
            animated,
        });
        if animated {
            self.inner
                .engine
                .pending
                .borrow_mut()
                .push(Rc::downgrade(&self.inner));
        }
    }

    fn set_opacity(&self, opacity: f64) {
        let prev = self.inner.opacity.get();
        self.inner.opacity.set(opacity);
        if (prev - opacity).abs() < f64::EPSILON {
            return;
        }
        let animated =
            self.inner.instant_depth.get() == 0 && !self.inner.engine.suspended.get();
        self.inner.engine.journal.borrow_mut().push(TransitionRecord {
            node: self.inner.node_label.clone(),
            property: "opacity",
            animated,
        });
    }

    fn content_height(&self) -> f64 {
        self.inner.content_height.get()
    }

    fn set_transition_listener(&self, listener: Option<TransitionListener>) {
        *self.inner.listener.borrow_mut() = listener;
    }

    fn commit_instant(&self, apply: &mut dyn FnMut()) {
        self.inner.instant_depth.set(self.inner.instant_depth.get() + 1);
        apply();
        self.inner.instant_depth.set(self.inner.instant_depth.get() - 1);
    }
}

// ---------------------------------------------------------------------------
// Toggle
// ---------------------------------------------------------------------------

struct ToggleInner {
    handler: RefCell<Option<ToggleHandler>>,
    bind_count: Cell<usize>,
    clicks: Cell<usize>,
}

/// Toggle control handle.
#[derive(Clone)]
pub struct MemToggle {
    inner: Rc<ToggleInner>,
}

impl MemToggle {
    fn new() -> Self {
        Self {
            inner: Rc::new(ToggleInner {
                handler: RefCell::new(None),
                bind_count: Cell::new(0),
                clicks: Cell::new(0),
            }),
        }
    }

    /// Deliver a click to the bound handler, returning the event so
    /// callers can inspect the suppression flags.
    pub fn click(&self) -> ClickEvent {
        self.inner.clicks.set(self.inner.clicks.get() + 1);
        let mut event = ClickEvent::new();
        let handler = self.inner.handler.borrow().clone();
        if let Some(handler) = handler {
            handler(&mut event);
        }
        event
    }

    /// How many times a handler was bound to this control.
    #[must_use]
    pub fn bind_count(&self) -> usize {
        self.inner.bind_count.get()
    }

    /// How many clicks were delivered.
    #[must_use]
    pub fn clicks(&self) -> usize {
        self.inner.clicks.get()
    }
}

impl Toggle for MemToggle {
    fn is_bound(&self) -> bool {
        self.inner.handler.borrow().is_some()
    }

    fn bind(&self, handler: ToggleHandler) {
        self.inner.bind_count.set(self.inner.bind_count.get() + 1);
        *self.inner.handler.borrow_mut() = Some(handler);
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

struct NodeInner {
    label: String,
    link: Option<String>,
    markers: Cell<NodeMarkers>,
    children: RefCell<Vec<MemNode>>,
    container: RefCell<Option<MemContainer>>,
    toggle: RefCell<Option<MemToggle>>,
    engine: Rc<EngineState>,
}

/// Navigation node handle.
#[derive(Clone)]
pub struct MemNode {
    inner: Rc<NodeInner>,
}

impl MemNode {
    fn new(label: &str, link: Option<&str>, engine: Rc<EngineState>) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                label: label.to_owned(),
                link: link.map(str::to_owned),
                markers: Cell::new(NodeMarkers::empty()),
                children: RefCell::new(Vec::new()),
                container: RefCell::new(None),
                toggle: RefCell::new(None),
                engine,
            }),
        }
    }

    /// The node's label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Give this node a sublist holding `children` (simulates the
    /// renderer injecting content under an existing node).
    pub fn adopt(&self, children: Vec<MemNode>) {
        let count = {
            let mut own = self.inner.children.borrow_mut();
            own.extend(children);
            own.len()
        };
        let mut slot = self.inner.container.borrow_mut();
        let container = slot.get_or_insert_with(|| {
            MemContainer::new(&self.inner.label, count, Rc::clone(&self.inner.engine))
        });
        container.inner.child_count.set(count);
        container.inner.content_height.set(count as f64 * ROW_HEIGHT);
    }

    /// The attached toggle, if any (same handle the enhancer sees).
    #[must_use]
    pub fn toggle_handle(&self) -> Option<MemToggle> {
        self.inner.toggle.borrow().clone()
    }

    /// The sublist container, if any.
    #[must_use]
    pub fn container_handle(&self) -> Option<MemContainer> {
        self.inner.container.borrow().clone()
    }
}

impl NavNode for MemNode {
    type Container = MemContainer;
    type Toggle = MemToggle;

    fn child_container(&self) -> Option<MemContainer> {
        self.inner.container.borrow().clone()
    }

    fn link_target(&self) -> Option<String> {
        self.inner.link.clone()
    }

    fn text_content(&self) -> String {
        self.inner.label.clone()
    }

    fn toggle(&self) -> Option<MemToggle> {
        self.inner.toggle.borrow().clone()
    }

    fn attach_toggle(&self) -> MemToggle {
        self.inner
            .toggle
            .borrow_mut()
            .get_or_insert_with(MemToggle::new)
            .clone()
    }

    fn markers(&self) -> NodeMarkers {
        self.inner.markers.get()
    }

    fn set_marker(&self, marker: NodeMarkers, on: bool) {
        let mut markers = self.inner.markers.get();
        markers.set(marker, on);
        self.inner.markers.set(markers);
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

struct TreeInner {
    roots: RefCell<Vec<MemNode>>,
    engine: Rc<EngineState>,
}

/// Navigation tree handle.
#[derive(Clone)]
pub struct MemTree {
    inner: Rc<TreeInner>,
}

impl Default for MemTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemTree {
    /// An empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(TreeInner {
                roots: RefCell::new(Vec::new()),
                engine: EngineState::new(),
            }),
        }
    }

    /// Create a leaf node belonging to this tree.
    #[must_use]
    pub fn leaf(&self, label: &str, link: Option<&str>) -> MemNode {
        MemNode::new(label, link, Rc::clone(&self.inner.engine))
    }

    /// Create a parent node with a sublist holding `children`.
    #[must_use]
    pub fn parent(&self, label: &str, link: Option<&str>, children: Vec<MemNode>) -> MemNode {
        let node = MemNode::new(label, link, Rc::clone(&self.inner.engine));
        node.adopt(children);
        node
    }

    /// Append a top-level node.
    pub fn push_root(&self, node: MemNode) {
        self.inner.roots.borrow_mut().push(node);
    }

    /// Drop all nodes (simulates the renderer tearing the tree down).
    pub fn clear(&self) {
        self.inner.roots.borrow_mut().clear();
    }

    /// Find a node by label, depth-first.
    #[must_use]
    pub fn find(&self, label: &str) -> Option<MemNode> {
        fn walk(nodes: &[MemNode], label: &str) -> Option<MemNode> {
            for node in nodes {
                if node.label() == label {
                    return Some(node.clone());
                }
                if let Some(found) = walk(&node.inner.children.borrow(), label) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.inner.roots.borrow(), label)
    }

    /// Snapshot of the commit journal.
    #[must_use]
    pub fn journal(&self) -> Vec<TransitionRecord> {
        self.inner.engine.journal.borrow().clone()
    }

    /// Number of journal entries the engine would have animated.
    #[must_use]
    pub fn animated_commits(&self) -> usize {
        self.inner
            .engine
            .journal
            .borrow()
            .iter()
            .filter(|record| record.animated)
            .count()
    }

    /// Forget the journal so far.
    pub fn clear_journal(&self) {
        self.inner.engine.journal.borrow_mut().clear();
    }

    /// Deliver completion for every height transition currently in
    /// flight. Returns how many listeners fired.
    pub fn complete_transitions(&self) -> usize {
        let pending: Vec<Weak<ContainerInner>> =
            self.inner.engine.pending.borrow_mut().drain(..).collect();
        let mut fired = 0;
        for weak in pending {
            let Some(container) = weak.upgrade() else {
                continue;
            };
            let listener = container.listener.borrow_mut().take();
            if let Some(listener) = listener {
                listener();
                fired += 1;
            }
        }
        tracing::debug!(target: "navfold.harness", fired, "transition completions delivered");
        fired
    }
}

impl NavTree for MemTree {
    type Node = MemNode;

    fn nodes(&self) -> Vec<MemNode> {
        fn walk(nodes: &[MemNode], out: &mut Vec<MemNode>) {
            for node in nodes {
                out.push(node.clone());
                walk(&node.inner.children.borrow(), out);
            }
        }
        let mut out = Vec::new();
        walk(&self.inner.roots.borrow(), &mut out);
        out
    }

    fn set_motion_suspended(&self, suspended: bool) {
        self.inner.engine.suspended.set(suspended);
    }

    fn motion_suspended(&self) -> bool {
        self.inner.engine.suspended.get()
    }
}
