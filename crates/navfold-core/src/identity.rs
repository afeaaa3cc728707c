#![forbid(unsafe_code)]

//! Content-derived node identity.
//!
//! Persisted state has to survive tree rebuilds, but the renderer hands
//! out fresh node objects on every rebuild. Identity is therefore
//! derived from what the user sees: the node's primary link target, or
//! failing that its visible text. Two passes over nodes with equal
//! label/link content produce the same key even when the underlying
//! handles changed.

use crate::contract::NavNode;

/// Derive the persistence key for a node.
///
/// Prefers the primary link target; a node without one (or with an empty
/// one) falls back to the trimmed, concatenated text of its direct
/// children.
///
/// Sibling nodes with identical labels collapse to one key. For lookups
/// and writes the last-processed node wins; this is an accepted
/// limitation of content-derived identity, not something callers should
/// work around with positional disambiguation.
#[must_use]
pub fn node_key<N: NavNode>(node: &N) -> String {
    match node.link_target() {
        Some(target) if !target.is_empty() => target,
        _ => node.text_content().trim().to_owned(),
    }
}
