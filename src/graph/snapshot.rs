//! Plain-data copy of a lineage graph, serialisable with serde.
//!
//! Used by the CLI to read and write graphs as JSON and by tests to compare
//! whole graphs, child order and tags included.

use super::{ArenaId, LineageGraph, SpotId, Tag, TagSetId};
use crate::error::GraphError;
use crate::geometry::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub tag_sets: Vec<TagSetRecord>,
    pub spots: Vec<SpotRecord>,
    /// Grouped by source spot, each group in child order
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSetRecord {
    pub name: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotRecord {
    pub id: u32,
    pub label: String,
    pub timepoint: u32,
    pub position: [f64; 3],
    /// Position in `tag_sets` -> tag label. Names may repeat, positions do not.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<usize, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: u32,
    pub target: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<usize, String>,
}

impl GraphSnapshot {
    pub fn from_graph(graph: &LineageGraph) -> Self {
        let positions: HashMap<TagSetId, usize> = graph
            .tags()
            .tag_sets()
            .iter()
            .enumerate()
            .map(|(pos, s)| (s.id, pos))
            .collect();
        let tag_names = |tags: Vec<(TagSetId, Option<super::TagId>)>| -> BTreeMap<usize, String> {
            tags.into_iter()
                .filter_map(|(set, tag)| {
                    let tag_set = graph.tags().tag_set(set)?;
                    let tag = tag_set.get(tag?)?;
                    Some((*positions.get(&set)?, tag.label.clone()))
                })
                .collect()
        };

        let tag_sets = graph
            .tags()
            .tag_sets()
            .iter()
            .map(|s| TagSetRecord {
                name: s.name.clone(),
                tags: s.tags.clone(),
            })
            .collect();

        let mut spots = Vec::with_capacity(graph.spot_count());
        let mut links = Vec::with_capacity(graph.link_count());
        for (id, spot) in graph.spots() {
            spots.push(SpotRecord {
                id: id.index(),
                label: spot.label.clone(),
                timepoint: spot.timepoint,
                position: [spot.position.x, spot.position.y, spot.position.z],
                tags: tag_names(graph.tags().spot_tags_of(id)),
            });
            for &link_id in spot.outgoing() {
                if let Some(link) = graph.link(link_id) {
                    links.push(LinkRecord {
                        source: link.source.index(),
                        target: link.target.index(),
                        tags: tag_names(graph.tags().link_tags_of(link_id)),
                    });
                }
            }
        }

        Self {
            tag_sets,
            spots,
            links,
        }
    }

    /// Rebuilds a graph. Returns it with the mapping from record ids to spots.
    pub fn into_graph(&self) -> Result<(LineageGraph, HashMap<u32, SpotId>), GraphError> {
        let mut graph = LineageGraph::new();
        let sets: Vec<TagSetId> = self
            .tag_sets
            .iter()
            .map(|record| {
                graph.create_tag_set(
                    record.name.clone(),
                    record.tags.iter().map(|t| (t.label.clone(), t.color)),
                )
            })
            .collect();

        let lookup = |graph: &LineageGraph, pos: usize, label: &str| {
            let set = *sets
                .get(pos)
                .ok_or(GraphError::UnknownSnapshotTagSet(pos))?;
            graph
                .tags()
                .tag_set(set)
                .and_then(|s| s.tag(label).map(|tag| (set, tag)))
                .ok_or_else(|| GraphError::UnknownTag {
                    set: self.tag_sets[pos].name.clone(),
                    tag: label.to_string(),
                })
        };

        let mut ids = HashMap::with_capacity(self.spots.len());
        for record in &self.spots {
            let [x, y, z] = record.position;
            let spot = graph.add_spot(record.label.clone(), record.timepoint, Vec3::new(x, y, z));
            ids.insert(record.id, spot);
            for (&pos, label) in &record.tags {
                let (set, tag) = lookup(&graph, pos, label)?;
                graph.set_spot_tag(set, spot, Some(tag))?;
            }
        }

        for record in &self.links {
            let source = *ids
                .get(&record.source)
                .ok_or(GraphError::UnknownSnapshotSpot(record.source))?;
            let target = *ids
                .get(&record.target)
                .ok_or(GraphError::UnknownSnapshotSpot(record.target))?;
            let link = graph.add_link(source, target)?;
            for (&pos, label) in &record.tags {
                let (set, tag) = lookup(&graph, pos, label)?;
                graph.set_link_tag(set, link, Some(tag))?;
            }
        }

        Ok((graph, ids))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
