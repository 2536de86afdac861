//! Entering/changed/leaving classification between two snapshots.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::types::EntityId;

use super::layer::Layer;
use super::Graph;

/// Ordered ids whose resolution differs by reference between `a` and `b`.
///
/// Candidates are the ids touched in the overlay chains of both graphs above
/// their lowest shared ancestor (the full chains when the graphs are
/// unrelated), so the scan is bounded by the changed layers, never the full
/// population. Candidates are taken oldest layer first, in first-touch order
/// within a layer, `a`'s side before `b`'s, deduplicated keep-first.
///
/// Each differing id is classified by its resolutions: present in `a` only
/// (entering), present in both as different references (changed), present in
/// `b` only (leaving). The three groups are concatenated in that order,
/// which makes the result deterministic regardless of raw overlay insertion
/// order. Id form (locally-created or not) plays no part.
pub(crate) fn difference(a: &Graph, b: &Graph) -> Vec<EntityId> {
    let b_chain = chain(b);
    let b_ptrs: Vec<*const Layer> = b_chain.iter().map(Graph::layer_ptr).collect();

    // a's layers above the shared ancestor, newest first.
    let mut a_above = Vec::new();
    let mut ancestor: Option<*const Layer> = None;
    for graph in chain(a) {
        if b_ptrs.contains(&graph.layer_ptr()) {
            ancestor = Some(graph.layer_ptr());
            break;
        }
        a_above.push(graph);
    }

    // b's layers above the same ancestor, newest first.
    let mut b_above = Vec::new();
    for graph in b_chain {
        if ancestor == Some(graph.layer_ptr()) {
            break;
        }
        b_above.push(graph);
    }

    let mut candidates: Vec<EntityId> = Vec::new();
    let mut seen: BTreeSet<EntityId> = BTreeSet::new();
    for graph in a_above.iter().rev().chain(b_above.iter().rev()) {
        for id in &graph.layer().touched {
            if seen.insert(id.clone()) {
                candidates.push(id.clone());
            }
        }
    }

    let mut entering = Vec::new();
    let mut changed = Vec::new();
    let mut leaving = Vec::new();
    for id in candidates {
        match (a.entity(&id), b.entity(&id)) {
            (Some(va), Some(vb)) => {
                if !Arc::ptr_eq(&va, &vb) {
                    changed.push(id);
                }
            }
            (Some(_), None) => entering.push(id),
            (None, Some(_)) => leaving.push(id),
            (None, None) => {}
        }
    }

    entering.extend(changed);
    entering.extend(leaving);
    entering
}

/// The graph and its ancestors, newest first.
fn chain(graph: &Graph) -> Vec<Graph> {
    let mut graphs = vec![graph.clone()];
    let mut current = graph.clone();
    while let Some(base) = current.layer().base.clone() {
        graphs.push(base.clone());
        current = base;
    }
    graphs
}
