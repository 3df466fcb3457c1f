//! Child-order flips.
//!
//! A flip removes a spot's first outgoing link and re-creates it as the last
//! one, carrying over the link's tag under every tag set. A batch of flips
//! notifies the graph's observers once, after the last flip.

use crate::error::GraphError;
use crate::graph::{GraphHandle, LineageGraph, SpotId};
use log::debug;
use std::collections::BTreeSet;

/// Flips the children of every given spot. Spots with fewer than two
/// children are left alone. Returns the number of spots flipped.
pub fn flip_children(
    graph: &mut LineageGraph,
    spots: impl IntoIterator<Item = SpotId>,
) -> Result<usize, GraphError> {
    let spots: BTreeSet<SpotId> = spots.into_iter().collect();
    let mut flipped = 0;
    for spot in spots {
        if flip_one(graph, spot)? {
            flipped += 1;
        }
    }
    if flipped > 0 {
        debug!("Flipped {} divisions", flipped);
        graph.notify_graph_changed();
    }
    Ok(flipped)
}

/// `flip_children` under the graph's write lock, held for the whole batch.
pub fn flip_children_locked(
    handle: &GraphHandle,
    spots: impl IntoIterator<Item = SpotId>,
) -> Result<usize, GraphError> {
    let mut graph = handle.write()?;
    flip_children(&mut graph, spots)
}

fn flip_one(graph: &mut LineageGraph, spot: SpotId) -> Result<bool, GraphError> {
    if graph.out_degree(spot) < 2 {
        return Ok(false);
    }
    let Some(&first) = graph.spot(spot).and_then(|s| s.outgoing().first()) else {
        return Ok(false);
    };
    let tags = graph.tags().link_tags_of(first);
    let removed = graph.remove_link(first)?;
    let link = graph.add_link(spot, removed.target)?;
    for (set, tag) in tags {
        if tag.is_some() {
            graph.set_link_tag(set, link, tag)?;
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;
    use crate::graph::{GraphListener, GraphSnapshot, TagSetId};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter(AtomicUsize);

    impl GraphListener for Counter {
        fn graph_changed(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Two divisions, one with a tagged first link, plus a single-child chain
    fn tagged_forest() -> (LineageGraph, Vec<SpotId>, TagSetId) {
        let mut g = LineageGraph::new();
        let set = g.create_tag_set("fate", [("neural", 0xff0000ffu32), ("gut", 0xff00ff00)]);
        let other = g.create_tag_set("quality", [("checked", 0xffffffffu32)]);
        let neural = g.tags().tag_set(set).unwrap().tag("neural");
        let gut = g.tags().tag_set(set).unwrap().tag("gut");
        let checked = g.tags().tag_set(other).unwrap().tag("checked");

        let mut divisions = Vec::new();
        for k in 0..2 {
            let root = g.add_spot(format!("r{k}"), 0, Vec3::new(k as f64, 0.0, 0.0));
            let c0 = g.add_spot("c0", 1, Vec3::new(k as f64, 1.0, 0.0));
            let c1 = g.add_spot("c1", 1, Vec3::new(k as f64, -1.0, 0.0));
            let l0 = g.add_link(root, c0).unwrap();
            let l1 = g.add_link(root, c1).unwrap();
            if k == 0 {
                g.set_link_tag(set, l0, neural).unwrap();
                g.set_link_tag(other, l0, checked).unwrap();
                g.set_link_tag(set, l1, gut).unwrap();
            }
            divisions.push(root);
        }
        let chain = g.add_spot("chain", 0, Vec3::zeros());
        let next = g.add_spot("chain", 1, Vec3::zeros());
        g.add_link(chain, next).unwrap();
        divisions.push(chain);
        (g, divisions, set)
    }

    #[test]
    fn test_flip_swaps_order_and_keeps_tags() {
        let (mut g, spots, set) = tagged_forest();
        let root = spots[0];
        let before = g.children(root);
        let neural = g.tags().tag_set(set).unwrap().tag("neural");

        assert_eq!(flip_children(&mut g, [root]).unwrap(), 1);

        assert_eq!(g.children(root), vec![before[1], before[0]]);
        let moved = g.find_link(root, before[0]).unwrap();
        assert_eq!(g.link_tag(set, moved), neural);
        let quality = g.tags().tag_set_by_name("quality").unwrap();
        assert_eq!(g.link_tag(quality.id, moved), quality.tag("checked"));
    }

    #[test]
    fn test_flip_is_involutive() {
        let (mut g, spots, _) = tagged_forest();
        let original = GraphSnapshot::from_graph(&g);

        flip_children(&mut g, spots.clone()).unwrap();
        assert_ne!(GraphSnapshot::from_graph(&g), original);
        flip_children(&mut g, spots).unwrap();
        assert_eq!(GraphSnapshot::from_graph(&g), original);
    }

    #[test]
    fn test_single_child_and_unknown_spots_are_noops() {
        let (mut g, spots, _) = tagged_forest();
        let original = GraphSnapshot::from_graph(&g);
        let leaf = g.children(spots[0])[0];
        let gone = g.add_spot("gone", 0, Vec3::zeros());
        g.remove_spot(gone).unwrap();

        assert_eq!(flip_children(&mut g, [spots[2], leaf, gone]).unwrap(), 0);
        assert_eq!(GraphSnapshot::from_graph(&g), original);
    }

    #[test]
    fn test_batch_notifies_once() {
        let (mut g, spots, _) = tagged_forest();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        g.add_listener(counter.clone());

        flip_children(&mut g, spots.clone()).unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        flip_children(&mut g, [spots[2]]).unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicates_in_batch_flip_once() {
        let (mut g, spots, _) = tagged_forest();
        let before = g.children(spots[1]);
        assert_eq!(flip_children(&mut g, [spots[1], spots[1]]).unwrap(), 1);
        assert_eq!(g.children(spots[1]), vec![before[1], before[0]]);
    }

    #[test]
    fn test_locked_flip() {
        let (g, spots, _) = tagged_forest();
        let handle = GraphHandle::new(g);
        let before = handle.read().unwrap().children(spots[0]);
        assert_eq!(flip_children_locked(&handle, [spots[0]]).unwrap(), 1);
        assert_eq!(handle.read().unwrap().children(spots[0]), vec![before[1], before[0]]);
    }
}
