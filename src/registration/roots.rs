//! Pairing of root spots by label.

use super::branch::does_branch_divide;
use crate::graph::{LineageGraph, SpotId};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Root label -> (root in A, root in B), ordered by label
pub type RootPairs = BTreeMap<String, (SpotId, SpotId)>;

/// Roots keyed by label. When two roots share a label the one with the lower
/// id is kept.
pub fn roots_by_label(graph: &LineageGraph) -> BTreeMap<String, SpotId> {
    let mut roots = BTreeMap::new();
    for root in graph.roots() {
        let Some(label) = graph.label(root) else {
            continue;
        };
        if let Some(kept) = roots.get(label) {
            warn!(
                "Duplicate root label '{}': keeping {}, ignoring {}",
                label, kept, root
            );
            continue;
        }
        roots.insert(label.to_string(), root);
    }
    roots
}

/// Equally labelled roots of two graphs, solitary lineages included
pub fn common_roots(graph_a: &LineageGraph, graph_b: &LineageGraph) -> RootPairs {
    let roots_b = roots_by_label(graph_b);
    roots_by_label(graph_a)
        .into_iter()
        .filter_map(|(label, root_a)| {
            let root_b = *roots_b.get(&label)?;
            Some((label, (root_a, root_b)))
        })
        .collect()
}

/// Pairs equally labelled roots of two graphs.
///
/// A label is dropped when its lineage does not reach a division in one of the
/// graphs.
pub fn pair_roots(graph_a: &LineageGraph, graph_b: &LineageGraph) -> RootPairs {
    let roots_a = roots_by_label(graph_a);
    let roots_b = roots_by_label(graph_b);
    let mut pairs = RootPairs::new();
    for (label, &root_a) in &roots_a {
        let Some(&root_b) = roots_b.get(label) else {
            continue;
        };
        if !does_branch_divide(graph_a, root_a) || !does_branch_divide(graph_b, root_b) {
            debug!("Skipping solitary lineage '{}'", label);
            continue;
        }
        pairs.insert(label.clone(), (root_a, root_b));
    }
    pairs
}
