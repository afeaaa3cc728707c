#![forbid(unsafe_code)]

//! Borrowed-handle contracts for the externally owned navigation tree.
//!
//! The renderer builds, mutates, and tears down the tree; navfold only
//! annotates it. Every trait here is a non-owning view: handles must be
//! cheap to clone, and implementations are expected to use interior
//! mutability so that `&self` setters work from shared handles.
//!
//! Derived state is never cached against handle identity. The renderer
//! may discard and recreate nodes at any time, so anything navfold needs
//! to know about a node is either recomputed per pass or stored on the
//! handle itself as a marker the next pass can observe.

use bitflags::bitflags;
use std::rc::Rc;

bitflags! {
    /// Classification flags attached to a node handle.
    ///
    /// These are what the external transition engine styles against, and
    /// what click handlers read to decide the next state. Keeping them on
    /// the handle (rather than in a registry keyed by node) means a
    /// rebuilt node starts clean instead of inheriting stale state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeMarkers: u8 {
        /// The node owns a non-empty sublist.
        const HAS_CHILDREN = 0b01;
        /// The node's sublist is collapsed.
        const COLLAPSED = 0b10;
    }
}

/// Height applied to a sublist container.
///
/// `Natural` is the unconstrained state: the container sizes to its
/// content and cannot be animated from or to. Transitions only run
/// between two `Px` values, which is why the motion controller pins a
/// measured pixel value before starting one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Height {
    /// Unconstrained; the container tracks its content.
    #[default]
    Natural,
    /// An explicit pixel value.
    Px(f64),
}

impl Height {
    /// Whether this is the unconstrained state.
    #[must_use]
    pub fn is_natural(&self) -> bool {
        matches!(self, Self::Natural)
    }

    /// The pixel value, if pinned.
    #[must_use]
    pub fn px(&self) -> Option<f64> {
        match self {
            Self::Natural => None,
            Self::Px(px) => Some(*px),
        }
    }
}

/// A click delivered to a toggle control.
///
/// Mirrors the two outcomes a handler controls: whether the host
/// performs the default action for the click (following the surrounding
/// link) and whether the click continues to outer handlers.
#[derive(Debug, Default)]
pub struct ClickEvent {
    default_prevented: bool,
    propagation_stopped: bool,
}

impl ClickEvent {
    /// Create a fresh event with neither flag set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress the host's default action for this click.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Stop the click from reaching enclosing handlers.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Whether the default action was suppressed.
    #[must_use]
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Whether propagation was stopped.
    #[must_use]
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Handler bound to a toggle control.
pub type ToggleHandler = Rc<dyn Fn(&mut ClickEvent)>;

/// One-shot notification that a container's height transition finished.
pub type TransitionListener = Box<dyn FnOnce()>;

/// The sublist container of a parent node.
///
/// Exposes exactly what the motion controller needs: numeric height and
/// opacity setters, a content-height measurement, a single-slot
/// completion listener, and a way to commit changes without the
/// transition engine painting an intermediate frame.
pub trait Container: Clone + 'static {
    /// Number of direct entries in the sublist.
    fn child_count(&self) -> usize;

    /// The currently applied height.
    fn height(&self) -> Height;

    /// Apply a height target. Outside [`Container::commit_instant`], a
    /// change between two pixel values is animated by the external
    /// transition engine.
    fn set_height(&self, height: Height);

    /// Apply an opacity target in `[0.0, 1.0]`.
    fn set_opacity(&self, opacity: f64);

    /// Measure the natural height of the current content.
    fn content_height(&self) -> f64;

    /// Install (or clear) the completion listener for the next height
    /// transition. The slot holds at most one listener; installing
    /// replaces whatever was there, so a caller can never stack
    /// duplicate completions.
    fn set_transition_listener(&self, listener: Option<TransitionListener>);

    /// Run `apply` with transitions disabled, so old and new values are
    /// committed without a visible in-between frame.
    fn commit_instant(&self, apply: &mut dyn FnMut());
}

/// The per-parent toggle control.
///
/// The bound flag lives on the control itself: re-enhancement passes
/// consult it instead of any process-wide registry, so a control that
/// survived a re-render keeps its one handler and a rebuilt control
/// starts unbound.
pub trait Toggle: Clone + 'static {
    /// Whether a click handler has been bound to this control.
    fn is_bound(&self) -> bool;

    /// Bind the click handler and mark the control bound.
    fn bind(&self, handler: ToggleHandler);
}

/// A node in the externally owned tree.
pub trait NavNode: Clone + 'static {
    /// Sublist container handle type.
    type Container: Container;
    /// Toggle control handle type.
    type Toggle: Toggle;

    /// The node's sublist container, if it has one.
    fn child_container(&self) -> Option<Self::Container>;

    /// The target of the node's primary link, if any.
    fn link_target(&self) -> Option<String>;

    /// Concatenated text content of the node's direct children.
    fn text_content(&self) -> String;

    /// The toggle control already attached to this node, if any.
    fn toggle(&self) -> Option<Self::Toggle>;

    /// Attach a toggle control to this node and return it.
    fn attach_toggle(&self) -> Self::Toggle;

    /// The node's current classification markers.
    fn markers(&self) -> NodeMarkers;

    /// Set or clear one marker.
    fn set_marker(&self, marker: NodeMarkers, on: bool);
}

/// The navigation tree root.
pub trait NavTree: Clone + 'static {
    /// Node handle type.
    type Node: NavNode;

    /// Every node in the tree, in a fixed full-coverage order.
    fn nodes(&self) -> Vec<Self::Node>;

    /// Set the tree-wide animations-suspended marker. The external
    /// transition engine honors this by snapping instead of animating.
    fn set_motion_suspended(&self, suspended: bool);

    /// Whether the animations-suspended marker is set.
    fn motion_suspended(&self) -> bool;
}
