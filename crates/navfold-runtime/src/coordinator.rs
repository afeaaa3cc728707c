#![forbid(unsafe_code)]

//! Navigation coordination.
//!
//! The renderer owns navigation; this module decides when enhancement
//! passes run in response. It subscribes to the renderer's three
//! lifecycle signals and the viewport resize signal, coalesces bursts
//! through depth-one debounce slots, and keeps animations suspended
//! across renderer-driven content swaps so only explicit user toggles
//! ever animate.
//!
//! # Scheduling model
//!
//! The coordinator is a state machine (`Idle -> Scheduled -> Running ->
//! Idle`) advanced by [`NavigationCoordinator::on_frame`], which the
//! host calls once per animation-frame tick. A scheduled pass always
//! runs to completion before another can start; superseded schedules
//! are replaced, never queued.
//!
//! # Single-instance lifecycle
//!
//! Exactly one navigation tree exists at a time, so the debounce slots,
//! the settle ladder, and the resize-subscription guard are deliberately
//! process-scoped singletons owned by the one coordinator. Per-node
//! idempotency (toggle bound flags, markers) lives on the handles
//! themselves. The persisted state is read-modify-written by click
//! handlers; that cannot race because every handler runs to completion
//! on the one logical thread before the next event is processed.

use crate::enhance::{EnhanceSummary, TreeEnhancer};
use crate::schedule::{DebounceSlot, FrameClock, SettleLadder};
use navfold_core::contract::{NavNode, NavTree, NodeMarkers};
use navfold_core::motion::{MotionController, MotionGate};
use navfold_core::store::{KeyValueStore, StateStore};
use std::cell::RefCell;
use std::rc::Rc;

/// Lifecycle signals consumed from the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// First render is in place.
    Ready,
    /// New content is about to replace the current tree.
    BeforeNavigate,
    /// New content is in place.
    NavigationComplete,
}

/// Renderer plugin contract: registration of the three lifecycle
/// callbacks. Registration must not block the renderer.
pub trait LifecycleHooks {
    /// Called once after the first render.
    fn ready(&mut self, callback: Box<dyn FnMut()>);
    /// Called before each navigation replaces content.
    fn before_each(&mut self, callback: Box<dyn FnMut()>);
    /// Called after each navigation once content is in place.
    fn done_each(&mut self, callback: Box<dyn FnMut()>);
}

/// Viewport contract: resize notification.
pub trait ViewportSignal {
    /// Register a resize callback.
    fn on_resize(&mut self, callback: Box<dyn FnMut()>);
}

/// Coordinator scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatorPhase {
    /// Nothing pending.
    #[default]
    Idle,
    /// A pass is armed for an upcoming frame.
    Scheduled,
    /// A pass is executing (transient within one frame).
    Running,
}

/// Tunable frame delays.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Frames between a pass and its late-node follow-up pass.
    pub follow_up_frames: u64,
    /// Frames a resize burst is coalesced over.
    pub resize_debounce_frames: u64,
    /// Frames per settle stage before animations re-enable.
    pub settle_frames: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            follow_up_frames: 5,
            resize_debounce_frames: 1,
            settle_frames: 1,
        }
    }
}

impl CoordinatorConfig {
    /// Default delays.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the follow-up pass delay.
    #[must_use]
    pub fn with_follow_up_frames(mut self, frames: u64) -> Self {
        self.follow_up_frames = frames;
        self
    }

    /// Set the resize debounce window.
    #[must_use]
    pub fn with_resize_debounce_frames(mut self, frames: u64) -> Self {
        self.resize_debounce_frames = frames;
        self
    }

    /// Set the per-stage settle delay.
    #[must_use]
    pub fn with_settle_frames(mut self, frames: u64) -> Self {
        self.settle_frames = frames;
        self
    }
}

/// Debounces enhancement passes and resize fixups against the renderer
/// lifecycle.
pub struct NavigationCoordinator<T: NavTree, S: KeyValueStore + 'static> {
    tree_source: Box<dyn Fn() -> Option<T>>,
    enhancer: TreeEnhancer<S>,
    motion: Rc<MotionController>,
    config: CoordinatorConfig,
    clock: FrameClock,
    phase: CoordinatorPhase,
    enhance_slot: DebounceSlot<()>,
    follow_up_slot: DebounceSlot<()>,
    resize_slot: DebounceSlot<()>,
    settle: SettleLadder,
    resize_attached: bool,
    last_summary: EnhanceSummary,
}

impl<T: NavTree, S: KeyValueStore + 'static> NavigationCoordinator<T, S> {
    /// Create a coordinator.
    ///
    /// `tree_source` re-resolves the current tree on every pass, because
    /// the renderer may have torn the previous one down; returning
    /// `None` makes the pass a no-op.
    pub fn new(
        tree_source: impl Fn() -> Option<T> + 'static,
        store: StateStore<S>,
        config: CoordinatorConfig,
    ) -> Self {
        let motion = Rc::new(MotionController::new(MotionGate::new()));
        let enhancer = TreeEnhancer::new(Rc::clone(&motion), Rc::new(store));
        Self {
            tree_source: Box::new(tree_source),
            enhancer,
            motion,
            config,
            clock: FrameClock::new(),
            phase: CoordinatorPhase::Idle,
            enhance_slot: DebounceSlot::new(),
            follow_up_slot: DebounceSlot::new(),
            resize_slot: DebounceSlot::new(),
            settle: SettleLadder::new(),
            resize_attached: false,
            last_summary: EnhanceSummary::default(),
        }
    }

    /// Current scheduling phase.
    #[must_use]
    pub fn phase(&self) -> CoordinatorPhase {
        self.phase
    }

    /// Counters from the most recent pass.
    #[must_use]
    pub fn last_summary(&self) -> EnhanceSummary {
        self.last_summary
    }

    /// The controller shared with click handlers.
    #[must_use]
    pub fn motion(&self) -> &Rc<MotionController> {
        &self.motion
    }

    /// React to a renderer lifecycle signal.
    pub fn handle(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Ready | LifecycleEvent::NavigationComplete => {
                self.schedule_pass();
            }
            LifecycleEvent::BeforeNavigate => {
                // Suppress eagerly: the swap must never animate, even
                // before the post-navigation pass gets to run.
                self.motion.gate().suspend();
                if let Some(tree) = (self.tree_source)() {
                    tree.set_motion_suspended(true);
                }
                tracing::debug!(
                    target: "navfold.coord",
                    "motion suspended ahead of navigation"
                );
            }
        }
    }

    /// React to a viewport resize. Bursts coalesce into one fixup.
    pub fn handle_resize(&mut self) {
        let due = self.clock.now() + self.config.resize_debounce_frames.max(1);
        self.resize_slot.arm(due, ());
    }

    /// Advance one animation-frame tick.
    pub fn on_frame(&mut self) {
        let now = self.clock.advance();

        if self.enhance_slot.take_due(now).is_some() {
            self.run_pass(now, true);
        }
        if self.follow_up_slot.take_due(now).is_some() {
            self.run_pass(now, false);
        }
        if self.resize_slot.take_due(now).is_some() {
            self.refresh_pinned_heights();
        }
        if self.settle.step(now, self.config.settle_frames) {
            self.motion.gate().resume();
            if let Some(tree) = (self.tree_source)() {
                tree.set_motion_suspended(false);
            }
            tracing::debug!(target: "navfold.coord", "motion re-enabled");
        }
    }

    fn schedule_pass(&mut self) {
        if self.phase == CoordinatorPhase::Scheduled {
            tracing::debug!(target: "navfold.coord", "superseding scheduled pass");
        }
        self.phase = CoordinatorPhase::Scheduled;
        self.enhance_slot.arm(self.clock.now() + 1, ());
    }

    fn run_pass(&mut self, now: u64, with_follow_up: bool) {
        self.phase = CoordinatorPhase::Running;
        if let Some(tree) = (self.tree_source)() {
            self.last_summary = self.enhancer.enhance(&tree);
        } else {
            tracing::debug!(target: "navfold.coord", "no tree to enhance");
        }
        if with_follow_up {
            // Catch nodes the renderer injects shortly after the
            // navigation signal.
            self.follow_up_slot
                .arm(now + self.config.follow_up_frames.max(1), ());
        }
        self.settle.start(now, self.config.settle_frames);
        self.phase = CoordinatorPhase::Idle;
    }

    /// Re-measure expanded containers that hold a pixel height so their
    /// pinned value matches post-resize content. Collapsed nodes are
    /// untouched and nothing is re-persisted.
    fn refresh_pinned_heights(&self) {
        let Some(tree) = (self.tree_source)() else {
            return;
        };
        let mut refreshed = 0usize;
        for node in tree.nodes() {
            let markers = node.markers();
            if !markers.contains(NodeMarkers::HAS_CHILDREN)
                || markers.contains(NodeMarkers::COLLAPSED)
            {
                continue;
            }
            if let Some(container) = node.child_container() {
                self.motion.repin(&container);
                refreshed += 1;
            }
        }
        tracing::debug!(
            target: "navfold.coord",
            refreshed,
            "resize fixup applied"
        );
    }
}

/// Wire a coordinator to the renderer and viewport.
///
/// Registers the three lifecycle callbacks and, exactly once per
/// coordinator, the resize callback. The host remains responsible for
/// driving [`NavigationCoordinator::on_frame`] from its animation-frame
/// tick.
pub fn install<T, S, H, V>(
    hooks: &mut H,
    viewport: &mut V,
    coordinator: Rc<RefCell<NavigationCoordinator<T, S>>>,
) where
    T: NavTree,
    S: KeyValueStore + 'static,
    H: LifecycleHooks,
    V: ViewportSignal,
{
    {
        let coord = Rc::clone(&coordinator);
        hooks.ready(Box::new(move || {
            coord.borrow_mut().handle(LifecycleEvent::Ready);
        }));
    }
    {
        let coord = Rc::clone(&coordinator);
        hooks.before_each(Box::new(move || {
            coord.borrow_mut().handle(LifecycleEvent::BeforeNavigate);
        }));
    }
    {
        let coord = Rc::clone(&coordinator);
        hooks.done_each(Box::new(move || {
            coord.borrow_mut().handle(LifecycleEvent::NavigationComplete);
        }));
    }

    let attach = {
        let mut coord = coordinator.borrow_mut();
        if coord.resize_attached {
            false
        } else {
            coord.resize_attached = true;
            true
        }
    };
    if attach {
        let coord = Rc::clone(&coordinator);
        viewport.on_resize(Box::new(move || {
            coord.borrow_mut().handle_resize();
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_the_frame_timings() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.follow_up_frames, 5);
        assert_eq!(config.resize_debounce_frames, 1);
        assert_eq!(config.settle_frames, 1);
    }

    #[test]
    fn config_builders_override_each_delay() {
        let config = CoordinatorConfig::new()
            .with_follow_up_frames(9)
            .with_resize_debounce_frames(3)
            .with_settle_frames(2);
        assert_eq!(config.follow_up_frames, 9);
        assert_eq!(config.resize_debounce_frames, 3);
        assert_eq!(config.settle_frames, 2);
    }

    #[test]
    fn phase_defaults_to_idle() {
        assert_eq!(CoordinatorPhase::default(), CoordinatorPhase::Idle);
    }
}
