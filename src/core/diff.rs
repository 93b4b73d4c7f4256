//! The transition diff: minimal enter/exit staging between two branches.
//!
//! Given the branch for the current path and the branch for a requested
//! path, the diff keeps the longest retained prefix, exits every old leaf
//! below it deepest-first, and enters every new leaf from there
//! root-to-leaf. All functions here are pure: they only stage work into a
//! [`TransitionBatch`].

use super::address;
use super::batch::TransitionBatch;
use super::branch::{Branch, Leaf};

/// Number of leading leaves shared between the old and new branch.
///
/// Scans the old leaves from the deepest toward the root and stops at the
/// first whose address occurs anywhere in the new branch; the retained
/// prefix is that index plus one. Addresses accumulate their full level
/// chain, so a match pins the same depth in both branches and the scan is
/// equivalent to a longest-common-prefix walk. No match (or an empty old
/// branch) retains nothing.
pub fn retained_depth(old: &Branch, new: &Branch) -> usize {
    for (i, leaf) in old.leaves().iter().enumerate().rev() {
        if new.leaves().iter().any(|n| n.address() == leaf.address()) {
            return i + 1;
        }
    }
    0
}

/// Stage the leaf-level work for a transition from `old` to `new`.
///
/// Exits run deepest-first, enters root-to-leaf, with every currently
/// active context layered onto each leaf.
pub fn stage_transition(
    batch: &mut TransitionBatch,
    old: &Branch,
    new: &Branch,
    contexts: &[String],
) {
    let keep = retained_depth(old, new);
    for leaf in old.leaves()[keep..].iter().rev() {
        stage_exit(batch, leaf, contexts);
    }
    for leaf in new.leaves().iter().skip(keep) {
        stage_enter(batch, leaf, contexts);
    }
}

/// Stage entry into one leaf: indicator write first, then the leaf's own
/// action, then its context actions in context insertion order.
pub fn stage_enter(batch: &mut TransitionBatch, leaf: &Leaf, contexts: &[String]) {
    batch.write_flag(leaf.indicator(), true);
    batch.push_action(leaf.action());
    for context in contexts {
        batch.push_action(address::context_id(leaf.action(), context, true));
    }
}

/// Stage exit from one leaf: context exit actions in reverse insertion
/// order, then the leaf's exit action, then the indicator write. The
/// write lands after the context teardown so the indicator reflects the
/// final truth once context side effects have run.
pub fn stage_exit(batch: &mut TransitionBatch, leaf: &Leaf, contexts: &[String]) {
    for context in contexts.iter().rev() {
        batch.push_action(address::context_id(leaf.action(), context, false));
    }
    batch.push_action(address::exit_id(leaf.action()));
    batch.write_flag(leaf.indicator(), false);
}

/// Stage one context's actions across every leaf of the current branch:
/// root-to-leaf when entering, leaf-to-root when exiting.
pub fn stage_context_change(
    batch: &mut TransitionBatch,
    branch: &Branch,
    context: &str,
    entering: bool,
) {
    if entering {
        for leaf in branch.leaves() {
            batch.push_action(address::context_id(leaf.action(), context, true));
        }
    } else {
        for leaf in branch.leaves().iter().rev() {
            batch.push_action(address::context_id(leaf.action(), context, false));
        }
    }
}
