//! Fragment placement.

use std::sync::Arc;
use crate::fragment::Fragment;
use crate::node::Node;

/// Fragment-to-node assignment produced by [`distribute`].
#[derive(Debug)]
pub struct Placement {
    pub assignments: Vec<(Fragment, Arc<Node>)>,
    /// Some node holds more than one fragment of the same secret.
    pub degraded: bool,
}

/// Assigns fragments to nodes.
///
/// With at least as many nodes as fragments every fragment gets its own node,
/// least-loaded nodes first, so a single compromised node exposes at most one
/// fragment. With fewer nodes the assignment wraps round-robin and is marked
/// `degraded`. Returns `None` when there are no nodes.
pub fn distribute(fragments: Vec<Fragment>, nodes: &[Arc<Node>]) -> Option<Placement> {
    if nodes.is_empty() {
        return None;
    }

    let mut order: Vec<&Arc<Node>> = nodes.iter().collect();
    order.sort_by(|a, b| a.load().cmp(&b.load()).then_with(|| a.id().cmp(b.id())));

    let degraded = nodes.len() < fragments.len();
    if degraded {
        log::warn!(
            "Only {} nodes for {} fragments; placement is degraded",
            nodes.len(),
            fragments.len()
        );
    }

    let assignments = fragments
        .into_iter()
        .enumerate()
        .map(|(i, fragment)| (fragment, order[i % order.len()].clone()))
        .collect();

    Some(Placement { assignments, degraded })
}
