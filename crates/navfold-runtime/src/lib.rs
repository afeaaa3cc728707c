#![forbid(unsafe_code)]

//! navfold runtime
//!
//! The orchestration layer over `navfold-core`: it owns when work
//! happens, while core owns what the work is.
//!
//! # Key Components
//!
//! - [`TreeEnhancer`] - one idempotent pass over the current tree:
//!   classify nodes, attach/reuse toggles, bind click handlers exactly
//!   once, apply reconciled expanded state without animating
//! - [`NavigationCoordinator`] - subscribes to the renderer lifecycle
//!   and viewport resize, debounces passes, and re-enables animation
//!   only after a pass's layout has settled
//! - [`schedule`] - the frame clock, depth-one debounce slots, and the
//!   named settle stages the coordinator runs on
//!
//! # How it fits in the system
//!
//! The external renderer fires lifecycle callbacks; the host forwards
//! them (see [`coordinator::install`]) and drives
//! [`NavigationCoordinator::on_frame`] from its animation-frame tick.
//! Everything runs on one logical thread; a scheduled pass always
//! completes before the next can begin.

pub mod coordinator;
pub mod enhance;
pub mod schedule;

pub use coordinator::{
    install, CoordinatorConfig, CoordinatorPhase, LifecycleEvent, LifecycleHooks,
    NavigationCoordinator, ViewportSignal,
};
pub use enhance::{EnhanceSummary, TreeEnhancer};
pub use schedule::{DebounceSlot, FrameClock, SettleLadder, SettleStage};
