//! Branch and division navigation.
//!
//! A branch runs from its start (a root or a child of a division) through
//! single-child spots to its end, the first spot whose child count is not 1.

use crate::geometry::{subtract, Vec3};
use crate::graph::{LineageGraph, SpotId};
use std::collections::BTreeSet;

/// Follows single children from `spot` until a division or a leaf.
pub fn branch_end(graph: &LineageGraph, spot: SpotId) -> SpotId {
    let mut current = spot;
    // bounded so a malformed cyclic chain cannot loop forever
    for _ in 0..=graph.spot_count() {
        if graph.out_degree(current) != 1 {
            return current;
        }
        match graph.child(current, 0) {
            Some(next) => current = next,
            None => return current,
        }
    }
    current
}

/// Whether the branch starting at `spot` ends in a division
pub fn does_branch_divide(graph: &LineageGraph, spot: SpotId) -> bool {
    graph.out_degree(branch_end(graph, spot)) == 2
}

/// Spindle direction `child[1] - child[0]` of a division.
///
/// Zero when `spot` does not have exactly two children; callers check the
/// child count before relying on it.
pub fn division_direction(graph: &LineageGraph, spot: SpotId) -> Vec3 {
    if graph.out_degree(spot) != 2 {
        return Vec3::zeros();
    }
    let first = graph.child(spot, 0).and_then(|c| graph.position(c));
    let second = graph.child(spot, 1).and_then(|c| graph.position(c));
    match (first, second) {
        (Some(a), Some(b)) => subtract(&b, &a),
        _ => Vec3::zeros(),
    }
}

/// Spots of the branch starting at `start`, from start to end inclusive
pub fn branch_spots(graph: &LineageGraph, start: SpotId) -> Vec<SpotId> {
    let end = branch_end(graph, start);
    let mut spots = vec![start];
    let mut current = start;
    while current != end {
        match graph.child(current, 0) {
            Some(next) => {
                spots.push(next);
                current = next;
            }
            None => break,
        }
    }
    spots
}

/// Every branch start: roots and spots whose parent does not have exactly one child
pub fn branch_starts(graph: &LineageGraph) -> BTreeSet<SpotId> {
    graph
        .spots()
        .filter(|(id, spot)| {
            spot.is_root() || graph.parent(*id).map_or(true, |p| graph.out_degree(p) != 1)
        })
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root -> a -> b, b divides into c (+x) and d (-x); c -> e
    fn chain_then_division() -> (LineageGraph, [SpotId; 6]) {
        let mut g = LineageGraph::new();
        let root = g.add_spot("r", 0, Vec3::zeros());
        let a = g.add_spot("r", 1, Vec3::zeros());
        let b = g.add_spot("r", 2, Vec3::zeros());
        let c = g.add_spot("r1", 3, Vec3::new(1.0, 0.0, 0.0));
        let d = g.add_spot("r2", 3, Vec3::new(-1.0, 0.0, 0.0));
        let e = g.add_spot("r1", 4, Vec3::new(1.0, 1.0, 0.0));
        g.add_link(root, a).unwrap();
        g.add_link(a, b).unwrap();
        g.add_link(b, c).unwrap();
        g.add_link(b, d).unwrap();
        g.add_link(c, e).unwrap();
        (g, [root, a, b, c, d, e])
    }

    #[test]
    fn test_branch_end_stops_at_division() {
        let (g, [root, a, b, c, d, e]) = chain_then_division();
        assert_eq!(branch_end(&g, root), b);
        assert_eq!(branch_end(&g, a), b);
        assert_eq!(branch_end(&g, b), b);
        assert_eq!(branch_end(&g, c), e);
        assert_eq!(branch_end(&g, d), d);
    }

    #[test]
    fn test_does_branch_divide() {
        let (g, [root, _, _, c, d, _]) = chain_then_division();
        assert!(does_branch_divide(&g, root));
        assert!(!does_branch_divide(&g, c));
        assert!(!does_branch_divide(&g, d));
    }

    #[test]
    fn test_division_direction() {
        let (g, [root, _, b, ..]) = chain_then_division();
        assert_eq!(division_direction(&g, b), Vec3::new(-2.0, 0.0, 0.0));
        assert_eq!(division_direction(&g, root), Vec3::zeros());
    }

    #[test]
    fn test_branch_spots_and_starts() {
        let (g, [root, a, b, c, d, e]) = chain_then_division();
        assert_eq!(branch_spots(&g, root), vec![root, a, b]);
        assert_eq!(branch_spots(&g, c), vec![c, e]);
        assert_eq!(branch_spots(&g, d), vec![d]);
        let starts: Vec<_> = branch_starts(&g).into_iter().collect();
        assert_eq!(starts, vec![root, c, d]);
    }
}
