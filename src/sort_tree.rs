//! Sorting child order against anchor cells.
//!
//! Two groups of anchor spots define, per timepoint, a sorting direction from
//! the "left" group's mean position to the "right" group's. A division whose
//! spindle points against that direction is flipped, so the child closer to
//! the left anchors comes first.

use crate::error::GraphError;
use crate::geometry::{average, dot, interpolate, subtract, Vec3};
use crate::graph::{GraphHandle, LineageGraph, SpotId};
use crate::registration::{division_direction, flip_children};
use log::debug;
use std::collections::BTreeMap;

/// Flips every spot in `spots` whose division points from right to left.
/// Returns the number flipped.
pub fn sort_tree(
    graph: &mut LineageGraph,
    spots: impl IntoIterator<Item = SpotId>,
    left_anchors: &[SpotId],
    right_anchors: &[SpotId],
) -> Result<usize, GraphError> {
    let timepoints = graph.timepoint_count();
    let left = anchor_track(graph, timepoints, left_anchors)?;
    let right = anchor_track(graph, timepoints, right_anchors)?;
    let directions: Vec<Vec3> = right
        .iter()
        .zip(&left)
        .map(|(r, l)| subtract(r, l))
        .collect();

    let wrong: Vec<SpotId> = spots
        .into_iter()
        .filter(|&spot| is_sorting_wrong(graph, spot, &directions))
        .collect();
    debug!("{} divisions point against the sorting direction", wrong.len());
    flip_children(graph, wrong)
}

/// `sort_tree` under the graph's write lock
pub fn sort_tree_locked(
    handle: &GraphHandle,
    spots: impl IntoIterator<Item = SpotId>,
    left_anchors: &[SpotId],
    right_anchors: &[SpotId],
) -> Result<usize, GraphError> {
    let mut graph = handle.write()?;
    sort_tree(&mut graph, spots, left_anchors, right_anchors)
}

fn is_sorting_wrong(graph: &LineageGraph, spot: SpotId, directions: &[Vec3]) -> bool {
    if graph.out_degree(spot) != 2 {
        return false;
    }
    let Some(direction) = graph
        .spot(spot)
        .and_then(|s| directions.get(s.timepoint as usize))
    else {
        return false;
    };
    dot(direction, &division_direction(graph, spot)) < 0.0
}

/// Mean anchor position for every timepoint in `0..timepoints`.
///
/// Timepoints before the first and after the last observation take the
/// nearest mean; gaps in between are interpolated linearly.
pub fn anchor_track(
    graph: &LineageGraph,
    timepoints: usize,
    anchors: &[SpotId],
) -> Result<Vec<Vec3>, GraphError> {
    let mut by_time: BTreeMap<usize, Vec<Vec3>> = BTreeMap::new();
    for &anchor in anchors {
        if let Some(spot) = graph.spot(anchor) {
            by_time
                .entry(spot.timepoint as usize)
                .or_default()
                .push(spot.position);
        }
    }
    let observed: Vec<(usize, Vec3)> = by_time
        .iter()
        .filter_map(|(&t, points)| average(points).map(|mean| (t, mean)))
        .collect();
    let (Some(&(_, first)), Some(&(last_t, last))) = (observed.first(), observed.last())
    else {
        return Err(GraphError::EmptyAnchors);
    };

    let mut track = vec![first; timepoints.max(last_t + 1)];
    for slot in track.iter_mut().skip(last_t) {
        *slot = last;
    }
    for pair in observed.windows(2) {
        let (t0, p0) = pair[0];
        let (t1, p1) = pair[1];
        for (t, slot) in track.iter_mut().enumerate().take(t1 + 1).skip(t0) {
            let weight = (t - t0) as f64 / (t1 - t0) as f64;
            *slot = interpolate(&p0, &p1, weight);
        }
    }
    Ok(track)
}
