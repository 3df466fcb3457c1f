//! Lock-step matching of two lineage forests.
//!
//! Starting from each pair of roots, the matcher compares the branches of
//! both embryos. Where both branches end in a division, the spindle
//! direction of A is mapped into B's frame and compared with B's spindle:
//! a negative scalar product means A's first child corresponds to B's second
//! child. Matching continues on both child pairs and stops on any subtree
//! where one side fails to divide.

use super::branch::{branch_end, division_direction};
use super::roots::RootPairs;
use super::transform::SimilarityTransform;
use crate::geometry::dot;
use crate::graph::{LineageGraph, SpotId};
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Result of comparing one pair of branches
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchStep {
    /// Both branches end in a division.
    Matched {
        division_a: SpotId,
        division_b: SpotId,
        /// A's first child corresponds to B's second child
        flip: bool,
    },
    /// Exactly one of the branches divides; matching stops below this pair.
    PartialMatch { end_a: SpotId, end_b: SpotId },
    /// Neither branch divides.
    NoMatch { end_a: SpotId, end_b: SpotId },
}

/// Compares the branches starting at `start_a` and `start_b`.
///
/// `direction_ab` maps directions of A into B's frame; its translation is
/// ignored.
pub fn match_step(
    graph_a: &LineageGraph,
    graph_b: &LineageGraph,
    direction_ab: &SimilarityTransform,
    start_a: SpotId,
    start_b: SpotId,
) -> MatchStep {
    let end_a = branch_end(graph_a, start_a);
    let end_b = branch_end(graph_b, start_b);
    let divides_a = graph_a.out_degree(end_a) == 2;
    let divides_b = graph_b.out_degree(end_b) == 2;
    match (divides_a, divides_b) {
        (true, true) => {
            let direction_a = direction_ab.apply_direction(&division_direction(graph_a, end_a));
            let direction_b = division_direction(graph_b, end_b);
            MatchStep::Matched {
                division_a: end_a,
                division_b: end_b,
                flip: dot(&direction_a, &direction_b) < 0.0,
            }
        }
        (false, false) => MatchStep::NoMatch { end_a, end_b },
        _ => MatchStep::PartialMatch { end_a, end_b },
    }
}

/// Injective correspondence between branch starts of A and of B
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    a_to_b: BTreeMap<SpotId, SpotId>,
    b_to_a: BTreeMap<SpotId, SpotId>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `a ↔ b`. Refused (returns `false`) if either side is already mapped.
    pub fn insert(&mut self, a: SpotId, b: SpotId) -> bool {
        if self.a_to_b.contains_key(&a) || self.b_to_a.contains_key(&b) {
            return false;
        }
        self.a_to_b.insert(a, b);
        self.b_to_a.insert(b, a);
        true
    }

    /// Branch start in B corresponding to `a`
    pub fn get(&self, a: SpotId) -> Option<SpotId> {
        self.a_to_b.get(&a).copied()
    }

    /// Branch start in A corresponding to `b`
    pub fn get_inverse(&self, b: SpotId) -> Option<SpotId> {
        self.b_to_a.get(&b).copied()
    }

    pub fn contains_a(&self, a: SpotId) -> bool {
        self.a_to_b.contains_key(&a)
    }

    pub fn len(&self) -> usize {
        self.a_to_b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a_to_b.is_empty()
    }

    /// Pairs `(a, b)` ordered by `a`
    pub fn iter(&self) -> impl Iterator<Item = (SpotId, SpotId)> + '_ {
        self.a_to_b.iter().map(|(a, b)| (*a, *b))
    }

    pub fn inverse(&self) -> Mapping {
        Mapping {
            a_to_b: self.b_to_a.clone(),
            b_to_a: self.a_to_b.clone(),
        }
    }
}

/// A pair of divisions matched during the walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivisionMatch {
    pub division_a: SpotId,
    pub division_b: SpotId,
    /// Geometric decision: A's first child belongs to B's second child
    pub flip: bool,
}

/// How the branch comparisons of one run ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub matched: usize,
    pub partial: usize,
    pub unmatched: usize,
}

/// Result of registering graph A against graph B
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    /// Anchor roots by label
    pub roots: RootPairs,
    /// Maps positions of A onto B
    pub transform_ab: SimilarityTransform,
    pub mapping: Mapping,
    pub divisions: Vec<DivisionMatch>,
    /// Divisions of A whose child order disagrees with B
    pub flips_a: BTreeSet<SpotId>,
    /// Divisions of B whose child order disagrees with A
    pub flips_b: BTreeSet<SpotId>,
    pub stats: MatchStats,
}

impl Registration {
    /// The flip set: divisions of B to reorder so B's child order follows A
    pub fn flip_set(&self) -> &BTreeSet<SpotId> {
        &self.flips_b
    }

    /// Divisions of B flipped by the geometric decision during the walk
    pub fn geometric_flips_b(&self) -> BTreeSet<SpotId> {
        self.divisions
            .iter()
            .filter(|d| d.flip)
            .map(|d| d.division_b)
            .collect()
    }

    /// The same registration seen from B
    pub fn swap(&self) -> Registration {
        Registration {
            roots: self
                .roots
                .iter()
                .map(|(label, &(a, b))| (label.clone(), (b, a)))
                .collect(),
            transform_ab: self.transform_ab.inverse(),
            mapping: self.mapping.inverse(),
            divisions: self
                .divisions
                .iter()
                .map(|d| DivisionMatch {
                    division_a: d.division_b,
                    division_b: d.division_a,
                    flip: d.flip,
                })
                .collect(),
            flips_a: self.flips_b.clone(),
            flips_b: self.flips_a.clone(),
            stats: self.stats,
        }
    }
}

/// Walks every root pair with a known transform and derives the flip sets.
pub fn register_with_transform(
    graph_a: &LineageGraph,
    graph_b: &LineageGraph,
    roots: RootPairs,
    transform_ab: SimilarityTransform,
) -> Registration {
    let direction_ab = transform_ab.without_translation();
    let mut mapping = Mapping::new();
    let mut divisions = Vec::new();
    let mut stats = MatchStats::default();

    for &(root_a, root_b) in roots.values() {
        let mut pending = vec![(root_a, root_b)];
        while let Some((start_a, start_b)) = pending.pop() {
            if !mapping.insert(start_a, start_b) {
                warn!(
                    "Branch {} or {} is already mapped, skipping its subtree",
                    start_a, start_b
                );
                continue;
            }
            match match_step(graph_a, graph_b, &direction_ab, start_a, start_b) {
                MatchStep::Matched {
                    division_a,
                    division_b,
                    flip,
                } => {
                    stats.matched += 1;
                    debug!("{} ~ {} (flip: {})", division_a, division_b, flip);
                    divisions.push(DivisionMatch {
                        division_a,
                        division_b,
                        flip,
                    });
                    let (Some(a0), Some(a1), Some(b0), Some(b1)) = (
                        graph_a.child(division_a, 0),
                        graph_a.child(division_a, 1),
                        graph_b.child(division_b, 0),
                        graph_b.child(division_b, 1),
                    ) else {
                        continue;
                    };
                    let (first_b, second_b) = if flip { (b1, b0) } else { (b0, b1) };
                    // popped in child order
                    pending.push((a1, second_b));
                    pending.push((a0, first_b));
                }
                MatchStep::PartialMatch { end_a, end_b } => {
                    stats.partial += 1;
                    debug!("{} / {}: only one side divides", end_a, end_b);
                }
                MatchStep::NoMatch { .. } => stats.unmatched += 1,
            }
        }
    }

    let (flips_a, flips_b) = structural_flips(graph_a, graph_b, &mapping);
    let registration = Registration {
        roots,
        transform_ab,
        mapping,
        divisions,
        flips_a,
        flips_b,
        stats,
    };

    let geometric = registration.geometric_flips_b();
    if geometric != registration.flips_b {
        warn!(
            "Geometric flip decisions ({}) disagree with the mapping ({})",
            geometric.len(),
            registration.flips_b.len()
        );
    }
    registration
}

/// Whether the mapping pairs A's first child with B's second child
pub fn requires_flip(
    graph_a: &LineageGraph,
    graph_b: &LineageGraph,
    mapping: &Mapping,
    division_a: SpotId,
    division_b: SpotId,
) -> bool {
    if graph_a.out_degree(division_a) != 2 || graph_b.out_degree(division_b) != 2 {
        return false;
    }
    let first_a = graph_a.child(division_a, 0);
    let second_b = graph_b.child(division_b, 1);
    match (first_a.and_then(|c| mapping.get(c)), second_b) {
        (Some(mapped), Some(second)) => mapped == second,
        _ => false,
    }
}

/// Re-scans the mapping for divisions whose child order disagrees.
fn structural_flips(
    graph_a: &LineageGraph,
    graph_b: &LineageGraph,
    mapping: &Mapping,
) -> (BTreeSet<SpotId>, BTreeSet<SpotId>) {
    let mut flips_a = BTreeSet::new();
    let mut flips_b = BTreeSet::new();
    for (start_a, start_b) in mapping.iter() {
        let division_a = branch_end(graph_a, start_a);
        let division_b = branch_end(graph_b, start_b);
        if requires_flip(graph_a, graph_b, mapping, division_a, division_b) {
            flips_a.insert(division_a);
            flips_b.insert(division_b);
        }
    }
    (flips_a, flips_b)
}
