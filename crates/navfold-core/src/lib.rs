#![forbid(unsafe_code)]

//! Core building blocks for navfold.
//!
//! navfold augments a navigation tree owned by an external renderer with
//! collapse/expand behavior. This crate holds the pieces with no
//! scheduling concerns:
//!
//! - [`contract`] - borrowed-handle traits for the externally owned tree,
//!   container, and toggle controls
//! - [`identity`] - content-derived node keys that survive tree rebuilds
//! - [`store`] - best-effort persistence of the expanded/collapsed map
//! - [`motion`] - the controller that drives height/opacity targets for
//!   the external transition engine
//!
//! Everything here is single-threaded and event-driven: handles are
//! cheaply clonable, shared state is `Rc`/`Cell`, and there are no locks.

pub mod contract;
pub mod identity;
pub mod motion;
pub mod store;

pub use contract::{
    ClickEvent, Container, Height, NavNode, NavTree, NodeMarkers, Toggle, ToggleHandler,
    TransitionListener,
};
pub use identity::node_key;
pub use motion::{MotionController, MotionGate};
pub use store::{ExpandedState, FileStore, KeyValueStore, StateStore, StorageError, STATE_SLOT};
