#![forbid(unsafe_code)]

//! Deterministic in-memory host for navfold.
//!
//! Implements every contract navfold consumes, so the full stack can be
//! driven end-to-end in tests without a real renderer:
//!
//! - [`tree`] - an in-memory navigation tree whose containers journal
//!   every height/opacity commit, including whether the simulated
//!   transition engine would have animated it
//! - [`storage`] - a key-value substrate with switchable fault injection
//! - [`hooks`] - lifecycle and viewport buses that replay the renderer's
//!   callback contract
//!
//! The simulated transition engine follows the real one's rules: a
//! commit animates only when it changes one pixel height to another
//! while neither the instant section nor the tree-wide suspension
//! marker is active. Completions are delivered explicitly via
//! [`tree::MemTree::complete_transitions`], which lets tests interleave
//! them with frames however they like.

pub mod hooks;
pub mod storage;
pub mod tree;

pub use hooks::{HookBus, ViewportBus};
pub use storage::MemoryStore;
pub use tree::{MemContainer, MemNode, MemToggle, MemTree, TransitionRecord};
