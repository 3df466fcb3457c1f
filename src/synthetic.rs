//! Synthetic embryos for demos, tests and benchmarks.
//!
//! `generate_embryo` grows a forest of founder lineages with random spindle
//! directions. `transformed_copy` and `flip_randomly` then produce a second
//! "embryo" with known correspondence: same topology, moved in space, with
//! some child orders swapped.

use crate::error::GraphError;
use crate::geometry::Vec3;
use crate::graph::{LineageGraph, SpotId};
use crate::registration::{flip_children, SimilarityTransform};
use rand::Rng;

const FOUNDER_NAMES: [&str; 10] = ["AB", "P1", "EMS", "P2", "MS", "E", "C", "D", "P3", "P4"];

/// Shape of a generated embryo
#[derive(Debug, Clone)]
pub struct EmbryoParams {
    /// Number of root lineages
    pub founders: usize,
    /// Division rounds below each founder
    pub generations: u32,
    /// Spots per cell cycle (a branch)
    pub frames_per_cycle: u32,
    /// Founders are placed uniformly in a cube of this half-width
    pub spread: f64,
    /// Distance between the two daughters of a division
    pub spindle_length: f64,
}

impl Default for EmbryoParams {
    fn default() -> Self {
        Self {
            founders: 6,
            generations: 4,
            frames_per_cycle: 3,
            spread: 50.0,
            spindle_length: 4.0,
        }
    }
}

/// Label of the `index`-th founder
pub fn founder_label(index: usize) -> String {
    FOUNDER_NAMES
        .get(index)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("F{index}"))
}

pub fn generate_embryo<R: Rng>(
    rng: &mut R,
    params: &EmbryoParams,
) -> Result<LineageGraph, GraphError> {
    let mut graph = LineageGraph::new();
    for i in 0..params.founders {
        let position = Vec3::new(
            rng.gen_range(-params.spread..=params.spread),
            rng.gen_range(-params.spread..=params.spread),
            rng.gen_range(-params.spread..=params.spread),
        );
        grow_cell(&mut graph, rng, params, founder_label(i), position, 0, 0, None)?;
    }
    Ok(graph)
}

#[allow(clippy::too_many_arguments)]
fn grow_cell<R: Rng>(
    graph: &mut LineageGraph,
    rng: &mut R,
    params: &EmbryoParams,
    label: String,
    position: Vec3,
    timepoint: u32,
    generation: u32,
    parent: Option<SpotId>,
) -> Result<(), GraphError> {
    let mut current = graph.add_spot(label.clone(), timepoint, position);
    if let Some(parent) = parent {
        graph.add_link(parent, current)?;
    }
    let mut position = position;
    let mut t = timepoint;
    for _ in 1..params.frames_per_cycle.max(1) {
        t += 1;
        position += Vec3::new(
            rng.gen_range(-0.2..0.2),
            rng.gen_range(-0.2..0.2),
            rng.gen_range(-0.2..0.2),
        );
        let next = graph.add_spot(label.clone(), t, position);
        graph.add_link(current, next)?;
        current = next;
    }
    if generation >= params.generations {
        return Ok(());
    }
    let offset = random_unit(rng) * (params.spindle_length / 2.0);
    for (suffix, daughter) in [("a", position + offset), ("p", position - offset)] {
        grow_cell(
            graph,
            rng,
            params,
            format!("{label}{suffix}"),
            daughter,
            t + 1,
            generation + 1,
            Some(current),
        )?;
    }
    Ok(())
}

fn random_unit<R: Rng>(rng: &mut R) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let norm = v.norm();
        if norm > 1e-3 && norm <= 1.0 {
            return v / norm;
        }
    }
}

/// Copy of `graph` with every position mapped through `transform`
pub fn transformed_copy(
    graph: &LineageGraph,
    transform: &SimilarityTransform,
) -> Result<LineageGraph, GraphError> {
    let mut copy = graph.clone();
    let moved: Vec<(SpotId, Vec3)> = copy
        .spots()
        .map(|(id, spot)| (id, transform.apply(&spot.position)))
        .collect();
    for (id, position) in moved {
        copy.set_position(id, position)?;
    }
    Ok(copy)
}

/// Spots with exactly two children
pub fn dividing_spots(graph: &LineageGraph) -> Vec<SpotId> {
    graph
        .spots()
        .filter(|(_, s)| s.out_degree() == 2)
        .map(|(id, _)| id)
        .collect()
}

/// Flips each division with probability 1/2. Returns the number flipped.
pub fn flip_randomly<R: Rng>(graph: &mut LineageGraph, rng: &mut R) -> Result<usize, GraphError> {
    let chosen: Vec<SpotId> = dividing_spots(graph)
        .into_iter()
        .filter(|_| rng.gen_bool(0.5))
        .collect();
    flip_children(graph, chosen)
}

/// Mirrors all positions about the mean x coordinate
pub fn mirror_x(graph: &mut LineageGraph) -> Result<(), GraphError> {
    let count = graph.spot_count();
    if count == 0 {
        return Ok(());
    }
    let mean_x = graph.spots().map(|(_, s)| s.position.x).sum::<f64>() / count as f64;
    let mirrored: Vec<(SpotId, Vec3)> = graph
        .spots()
        .map(|(id, s)| (id, Vec3::new(2.0 * mean_x - s.position.x, s.position.y, s.position.z)))
        .collect();
    for (id, position) in mirrored {
        graph.set_position(id, position)?;
    }
    Ok(())
}
