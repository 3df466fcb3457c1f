//! Lineage registration engine
//!
//! Pipeline: root pairing -> transform estimation -> lock-step tree matching
//! -> (optionally) flipping B's divisions so its child order follows A.
//!
//! The functions taking `&LineageGraph` expect the caller to hold read
//! access to both graphs for the whole call; the `GraphHandle` variants take
//! the locks themselves, in the global handle order.

mod algorithm;
mod branch;
mod flip;
mod roots;
mod transform;

pub use algorithm::{
    match_step, register_with_transform, requires_flip, DivisionMatch, Mapping, MatchStats,
    MatchStep, Registration,
};
pub use branch::{branch_end, branch_spots, branch_starts, division_direction, does_branch_divide};
pub use flip::{flip_children, flip_children_locked};
pub use roots::{common_roots, pair_roots, roots_by_label, RootPairs};
pub use transform::{estimate_from_roots, estimate_transform, SimilarityTransform};

use crate::config::RegistrationConfig;
use crate::error::RegistrationError;
use crate::graph::{GraphHandle, LineageGraph};
use log::info;

/// Registers graph A against graph B.
///
/// Fails only when the paired roots do not determine a transform.
pub fn register_lineages(
    graph_a: &LineageGraph,
    graph_b: &LineageGraph,
    config: &RegistrationConfig,
) -> Result<Registration, RegistrationError> {
    let roots = pair_roots(graph_a, graph_b);
    info!("Paired {} dividing root lineages", roots.len());
    let transform_ab = estimate_from_roots(graph_a, graph_b, &roots, config)?;
    info!("Estimated transform A->B with scale {:.4}", transform_ab.scale);

    let registration = register_with_transform(graph_a, graph_b, roots, transform_ab);
    info!(
        "Mapped {} branches ({} divisions matched, {} partial), {} divisions of B to flip",
        registration.mapping.len(),
        registration.stats.matched,
        registration.stats.partial,
        registration.flips_b.len()
    );
    Ok(registration)
}

/// `register_lineages` with both graphs read-locked.
pub fn register_handles(
    graph_a: &GraphHandle,
    graph_b: &GraphHandle,
    config: &RegistrationConfig,
) -> Result<Registration, RegistrationError> {
    GraphHandle::with_read_pair(graph_a, graph_b, |a, b| register_lineages(a, b, config))?
}

/// Registers A against B and flips B's flip set in one batch, so B's child
/// order follows A. A is read-locked and B write-locked for the whole run.
///
/// The returned registration describes B before the flips; spot ids and the
/// mapping stay valid afterwards.
pub fn sort_second_to_match(
    graph_a: &GraphHandle,
    graph_b: &GraphHandle,
    config: &RegistrationConfig,
) -> Result<Registration, RegistrationError> {
    GraphHandle::with_read_write(
        graph_a,
        graph_b,
        |a, b| -> Result<Registration, RegistrationError> {
            let registration = register_lineages(a, b, config)?;
            let flipped = flip_children(b, registration.flips_b.iter().copied())?;
            info!("Reordered {} divisions of B", flipped);
            Ok(registration)
        },
    )?
}
