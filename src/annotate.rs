//! Writing registration results back into the graphs as tags.
//!
//! Tagging helpers work "for graph A"; pass `Registration::swap()` to apply
//! them to graph B.

use crate::config::{AnnotationConfig, RegistrationConfig};
use crate::error::{GraphError, RegistrationError};
use crate::graph::{GraphHandle, LineageGraph, SpotId, TagId, TagSetId};
use crate::registration::{branch_end, branch_spots, branch_starts, register_lineages, Mapping, Registration};
use log::{debug, info};
use std::collections::BTreeSet;

/// Branch starts of A that have no counterpart in B
pub fn unmatched_branch_starts(graph: &LineageGraph, mapping: &Mapping) -> BTreeSet<SpotId> {
    branch_starts(graph)
        .into_iter()
        .filter(|s| !mapping.contains_a(*s))
        .collect()
}

/// Tags every spot of the branch starting at `start`, and the links between them.
pub fn tag_branch(
    graph: &mut LineageGraph,
    set: TagSetId,
    tag: Option<TagId>,
    start: SpotId,
) -> Result<(), GraphError> {
    let spots = branch_spots(graph, start);
    for pair in spots.windows(2) {
        if let Some(link) = graph.find_link(pair[0], pair[1]) {
            graph.set_link_tag(set, link, tag)?;
        }
    }
    for spot in spots {
        graph.set_spot_tag(set, spot, tag)?;
    }
    Ok(())
}

/// Tag of a branch, read from its first spot
pub fn branch_tag(graph: &LineageGraph, set: TagSetId, start: SpotId) -> Option<TagId> {
    graph.spot_tag(set, start)
}

/// Tag set and tags created by `tag_registration`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationTags {
    pub set: TagSetId,
    pub not_mapped: TagId,
    pub flipped: TagId,
}

/// Tags graph A with the outcome of `registration`.
///
/// Unmatched branches get "not mapped" on their spots, inner links and
/// incoming link. For each division of A whose child order disagrees with B,
/// both outgoing links and both child branches get "flipped".
pub fn tag_registration(
    graph: &mut LineageGraph,
    registration: &Registration,
    config: &AnnotationConfig,
) -> Result<RegistrationTags, GraphError> {
    let set = graph.create_tag_set(
        config.tag_set_name.clone(),
        [
            (config.not_mapped_label.clone(), config.not_mapped_color),
            (config.flipped_label.clone(), config.flipped_color),
        ],
    );
    let tags = RegistrationTags {
        set,
        not_mapped: TagId { set, index: 0 },
        flipped: TagId { set, index: 1 },
    };

    let unmatched = unmatched_branch_starts(graph, &registration.mapping);
    for &start in &unmatched {
        tag_branch(graph, set, Some(tags.not_mapped), start)?;
        let incoming = graph
            .spot(start)
            .map(|s| s.incoming().to_vec())
            .unwrap_or_default();
        for link in incoming {
            graph.set_link_tag(set, link, Some(tags.not_mapped))?;
        }
    }

    for &division in &registration.flips_a {
        for child in graph.children(division) {
            if let Some(link) = graph.find_link(division, child) {
                graph.set_link_tag(set, link, Some(tags.flipped))?;
            }
            tag_branch(graph, set, Some(tags.flipped), child)?;
        }
    }
    debug!(
        "Tagged {} unmatched branches and {} flipped divisions",
        unmatched.len(),
        registration.flips_a.len()
    );
    Ok(tags)
}

/// Tags A, B or both. Each modified graph gets its own tag set.
pub fn tag_cells(
    graph_a: &mut LineageGraph,
    graph_b: &mut LineageGraph,
    registration: &Registration,
    modify_a: bool,
    modify_b: bool,
    config: &RegistrationConfig,
) -> Result<(Option<RegistrationTags>, Option<RegistrationTags>), GraphError> {
    let tags_a = if modify_a {
        Some(tag_registration(graph_a, registration, &config.annotation)?)
    } else {
        None
    };
    let tags_b = if modify_b {
        Some(tag_registration(graph_b, &registration.swap(), &config.annotation)?)
    } else {
        None
    };
    Ok((tags_a, tags_b))
}

/// Registers two shared graphs and tags them, both write-locked for the whole run.
pub fn tag_cells_locked(
    graph_a: &GraphHandle,
    graph_b: &GraphHandle,
    modify_a: bool,
    modify_b: bool,
    config: &RegistrationConfig,
) -> Result<Registration, RegistrationError> {
    GraphHandle::with_write_pair(
        graph_a,
        graph_b,
        |a, b| -> Result<Registration, RegistrationError> {
            let registration = register_lineages(a, b, config)?;
            tag_cells(a, b, &registration, modify_a, modify_b, config)?;
            Ok(registration)
        },
    )?
}

/// Copies a tag set of A onto B along the mapping.
///
/// B gets a new tag set `name` with the same tags. Each mapped branch of B
/// takes the branch tag of its counterpart in A, and the outgoing links of
/// B's branch end take the tags of the matching links of A. Links with no
/// counterpart in B are skipped.
pub fn copy_tag_set(
    graph_a: &LineageGraph,
    graph_b: &mut LineageGraph,
    registration: &Registration,
    set_a: TagSetId,
    name: &str,
) -> Result<TagSetId, GraphError> {
    let source = graph_a
        .tags()
        .tag_set(set_a)
        .ok_or(GraphError::UnknownTagSet(set_a))?;
    let set_b = graph_b.create_tag_set(
        name,
        source.tags.iter().map(|t| (t.label.clone(), t.color)),
    );
    let to_b = |tag: Option<TagId>| tag.map(|t| TagId { set: set_b, index: t.index });

    for (spot_a, spot_b) in registration.mapping.iter() {
        let tag = to_b(branch_tag(graph_a, set_a, spot_a));
        tag_branch(graph_b, set_b, tag, spot_b)?;
    }

    for (spot_a, spot_b) in registration.mapping.iter() {
        let end_a = branch_end(graph_a, spot_a);
        let end_b = branch_end(graph_b, spot_b);
        let Some(outgoing) = graph_a.spot(end_a).map(|s| s.outgoing()) else {
            continue;
        };
        for &link_a in outgoing {
            let Some(target_a) = graph_a.link(link_a).map(|l| l.target) else {
                continue;
            };
            let Some(target_b) = registration.mapping.get(target_a) else {
                continue;
            };
            let Some(link_b) = graph_b.find_link(end_b, target_b) else {
                continue;
            };
            graph_b.set_link_tag(set_b, link_b, to_b(graph_a.link_tag(set_a, link_a)))?;
        }
    }
    info!(
        "Copied tag set '{}' onto {} branches as '{}'",
        source.name,
        registration.mapping.len(),
        name
    );
    Ok(set_b)
}

/// Registers two shared graphs and copies A's tag set `source_name` onto B.
pub fn copy_tag_set_locked(
    graph_a: &GraphHandle,
    graph_b: &GraphHandle,
    source_name: &str,
    name: &str,
    config: &RegistrationConfig,
) -> Result<TagSetId, RegistrationError> {
    GraphHandle::with_read_write(
        graph_a,
        graph_b,
        |a, b| -> Result<TagSetId, RegistrationError> {
            let set_a = a
                .tags()
                .tag_set_by_name(source_name)
                .map(|s| s.id)
                .ok_or_else(|| GraphError::UnknownTagSetName(source_name.to_string()))?;
            let registration = register_lineages(a, b, config)?;
            Ok(copy_tag_set(a, b, &registration, set_a, name)?)
        },
    )?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;
    use crate::registration::{flip_children, roots_by_label, SimilarityTransform};
    use crate::synthetic::{generate_embryo, transformed_copy, EmbryoParams};
    use nalgebra::Rotation3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        a: LineageGraph,
        b: LineageGraph,
        /// Division flipped in B (same id in A)
        flipped: SpotId,
        /// Leaf of A given two extra children
        extended: SpotId,
        /// Root of B with no partner in A
        stray: SpotId,
    }

    fn fixture() -> Fixture {
        let mut rng = StdRng::seed_from_u64(11);
        let params = EmbryoParams {
            founders: 4,
            generations: 2,
            frames_per_cycle: 2,
            ..Default::default()
        };
        let mut a = generate_embryo(&mut rng, &params).unwrap();
        let transform = SimilarityTransform::new(
            Rotation3::from_euler_angles(0.3, 0.2, -0.5),
            0.8,
            Vec3::new(5.0, 5.0, -5.0),
        );
        let mut b = transformed_copy(&a, &transform).unwrap();

        let roots = roots_by_label(&a);
        let flipped = branch_end(&b, roots["AB"]);
        flip_children(&mut b, [flipped]).unwrap();

        let extended = a
            .spots()
            .find(|(_, s)| s.label == "P1aa" && s.out_degree() == 0)
            .map(|(id, _)| id)
            .unwrap();
        let (t, p) = {
            let s = a.spot(extended).unwrap();
            (s.timepoint, s.position)
        };
        for dx in [1.0, -1.0] {
            let child = a.add_spot("extra", t + 1, p + Vec3::new(dx, 0.0, 0.0));
            a.add_link(extended, child).unwrap();
        }

        let stray = b.add_spot("X", 0, Vec3::zeros());
        Fixture {
            a,
            b,
            flipped,
            extended,
            stray,
        }
    }

    #[test]
    fn test_unmatched_branch_starts() {
        let f = fixture();
        let r = register_lineages(&f.a, &f.b, &RegistrationConfig::default()).unwrap();
        let unmatched_a = unmatched_branch_starts(&f.a, &r.mapping);
        assert_eq!(unmatched_a, f.a.children(f.extended).into_iter().collect::<BTreeSet<_>>());
        let unmatched_b = unmatched_branch_starts(&f.b, &r.mapping.inverse());
        assert_eq!(unmatched_b, BTreeSet::from([f.stray]));
    }

    #[test]
    fn test_tag_branch_tags_spots_and_inner_links() {
        let f = fixture();
        let mut a = f.a;
        let set = a.create_tag_set("s", [("t", 0xffffffffu32)]);
        let tag = Some(TagId { set, index: 0 });
        let root = roots_by_label(&a)["EMS"];
        tag_branch(&mut a, set, tag, root).unwrap();

        let spots = branch_spots(&a, root);
        assert_eq!(spots.len(), 2);
        assert!(spots.iter().all(|s| a.spot_tag(set, *s) == tag));
        let inner = a.find_link(spots[0], spots[1]).unwrap();
        assert_eq!(a.link_tag(set, inner), tag);
        assert_eq!(branch_tag(&a, set, root), tag);
        // the division's outgoing links belong to the child branches
        for child in a.children(spots[1]) {
            let link = a.find_link(spots[1], child).unwrap();
            assert_eq!(a.link_tag(set, link), None);
            assert_eq!(a.spot_tag(set, child), None);
        }
    }

    #[test]
    fn test_tag_cells_marks_unmatched_and_flipped() {
        let mut f = fixture();
        let config = RegistrationConfig::default();
        let r = register_lineages(&f.a, &f.b, &config).unwrap();
        assert_eq!(r.flips_b, BTreeSet::from([f.flipped]));

        let (tags_a, tags_b) = tag_cells(&mut f.a, &mut f.b, &r, true, true, &config).unwrap();
        let tags_a = tags_a.unwrap();
        let tags_b = tags_b.unwrap();
        assert_eq!(
            f.a.tags().tag_set(tags_a.set).unwrap().name,
            "lineage registration"
        );

        for child in f.a.children(f.extended) {
            assert_eq!(f.a.spot_tag(tags_a.set, child), Some(tags_a.not_mapped));
            let incoming = f.a.find_link(f.extended, child).unwrap();
            assert_eq!(f.a.link_tag(tags_a.set, incoming), Some(tags_a.not_mapped));
        }
        assert_eq!(f.a.spot_tag(tags_a.set, f.extended), None);

        // the same division is flipped relative to the other graph on both sides
        for (graph, tags) in [(&f.a, tags_a), (&f.b, tags_b)] {
            for child in graph.children(f.flipped) {
                assert_eq!(graph.spot_tag(tags.set, child), Some(tags.flipped));
                let link = graph.find_link(f.flipped, child).unwrap();
                assert_eq!(graph.link_tag(tags.set, link), Some(tags.flipped));
            }
            assert_eq!(graph.spot_tag(tags.set, f.flipped), None);
        }

        assert_eq!(f.b.spot_tag(tags_b.set, f.stray), Some(tags_b.not_mapped));
    }

    #[test]
    fn test_tag_cells_respects_modify_flags() {
        let mut f = fixture();
        let config = RegistrationConfig::default();
        let r = register_lineages(&f.a, &f.b, &config).unwrap();
        let (tags_a, tags_b) = tag_cells(&mut f.a, &mut f.b, &r, false, true, &config).unwrap();
        assert!(tags_a.is_none());
        assert!(tags_b.is_some());
        assert!(f.a.tags().tag_sets().is_empty());
    }

    #[test]
    fn test_copy_tag_set_follows_mapping() {
        let mut f = fixture();
        let set_a = f.a.create_tag_set("fate", [("neural", 0xff0000ffu32), ("gut", 0xff00ff00)]);
        let neural = TagId { set: set_a, index: 0 };
        let gut = TagId { set: set_a, index: 1 };

        let children = f.a.children(f.flipped);
        tag_branch(&mut f.a, set_a, Some(neural), children[0]).unwrap();
        tag_branch(&mut f.a, set_a, Some(gut), children[1]).unwrap();
        let first_link = f.a.find_link(f.flipped, children[0]).unwrap();
        f.a.set_link_tag(set_a, first_link, Some(neural)).unwrap();

        let r = register_lineages(&f.a, &f.b, &RegistrationConfig::default()).unwrap();
        let set_b = copy_tag_set(&f.a, &mut f.b, &r, set_a, "fate (copied)").unwrap();

        let copied = f.b.tags().tag_set(set_b).unwrap();
        assert_eq!(copied.name, "fate (copied)");
        assert_eq!(copied.tags, f.a.tags().tag_set(set_a).unwrap().tags);

        let neural_b = Some(TagId { set: set_b, index: 0 });
        let gut_b = Some(TagId { set: set_b, index: 1 });
        let child0_b = r.mapping.get(children[0]).unwrap();
        let child1_b = r.mapping.get(children[1]).unwrap();
        // B's child order is flipped, the tags follow the cells
        assert_eq!(f.b.children(f.flipped), vec![child1_b, child0_b]);
        assert!(branch_spots(&f.b, child0_b)
            .iter()
            .all(|s| f.b.spot_tag(set_b, *s) == neural_b));
        assert!(branch_spots(&f.b, child1_b)
            .iter()
            .all(|s| f.b.spot_tag(set_b, *s) == gut_b));
        let link_b = f.b.find_link(f.flipped, child0_b).unwrap();
        assert_eq!(f.b.link_tag(set_b, link_b), neural_b);
    }

    #[test]
    fn test_copy_tag_set_unknown_set() {
        let f = fixture();
        let handle_a = GraphHandle::new(f.a);
        let handle_b = GraphHandle::new(f.b);
        let err = copy_tag_set_locked(
            &handle_a,
            &handle_b,
            "missing",
            "copy",
            &RegistrationConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::Graph(GraphError::UnknownTagSetName(_))
        ));
    }

    #[test]
    fn test_tag_cells_locked() {
        let f = fixture();
        let flipped = f.flipped;
        let handle_a = GraphHandle::new(f.a);
        let handle_b = GraphHandle::new(f.b);
        let r = tag_cells_locked(&handle_b, &handle_a, false, true, &RegistrationConfig::default())
            .unwrap();
        assert_eq!(r.flips_a, BTreeSet::from([flipped]));
        let a = handle_a.read().unwrap();
        let set = a.tags().tag_set_by_name("lineage registration").unwrap();
        let child = a.children(flipped)[0];
        assert_eq!(a.spot_tag(set.id, child), set.tag("flipped"));
    }
}
