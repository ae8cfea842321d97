//! Synchronous extraction with reference following
//!
//! The walk is iterative: when a reference is met, the consumed prefix of the
//! path is replaced by the reference target and the walk restarts from the
//! root. Each restart costs one hop; past [`MAX_REF_HOPS`] the read resolves to
//! [`Resolution::Unavailable`], so a cyclic cache can never hang a reader.

use crate::model::{Node, Resolution};
use crate::path::Key;
use std::borrow::Cow;

/// Reference hops one extraction may follow before giving up.
pub const MAX_REF_HOPS: usize = 32;

/// Where one pass over the keys ended.
pub(crate) enum Walk<'g> {
    /// Reached the end of the path on a non-reference node.
    Terminal(&'g Node),
    /// Met a reference at `index`; resume at `target ++ keys[index + 1..]`.
    Redirect { target: &'g [Key], index: usize },
    /// Missing key, or a leaf with keys left over.
    Missing,
}

pub(crate) fn walk<'g>(root: &'g Node, keys: &[Key]) -> Walk<'g> {
    let mut node = root;
    for (index, key) in keys.iter().enumerate() {
        let Some(child) = node.child(key) else {
            return Walk::Missing;
        };
        if let Node::Ref(target) = child {
            return Walk::Redirect {
                target: target.keys(),
                index,
            };
        }
        node = child;
    }
    Walk::Terminal(node)
}

/// Splice a reference target in place of the consumed prefix.
pub(crate) fn redirect(target: &[Key], keys: &[Key], index: usize) -> Vec<Key> {
    let rest = &keys[index + 1..];
    let mut next = Vec::with_capacity(target.len() + rest.len());
    next.extend_from_slice(target);
    next.extend_from_slice(rest);
    next
}

/// Resolve `path` against the graph rooted at `root`.
///
/// Never fails: missing data, leaves with keys left over and reference cycles
/// all come back as [`Resolution::Unavailable`].
pub fn extract(root: &Node, path: &[Key]) -> Resolution {
    let mut keys: Cow<'_, [Key]> = Cow::Borrowed(path);
    let mut hops = 0;
    loop {
        match walk(root, &keys) {
            Walk::Terminal(node) => return Resolution::of_terminal(node),
            Walk::Missing => return Resolution::Unavailable,
            Walk::Redirect { target, index } => {
                hops += 1;
                if hops > MAX_REF_HOPS {
                    tracing::debug!(hops, "Reference hop limit reached while extracting {:?}", path);
                    return Resolution::Unavailable;
                }
                keys = Cow::Owned(redirect(target, &keys, index));
            }
        }
    }
}
