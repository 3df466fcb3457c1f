//! The lineage graph: spots connected by parent-to-child links.
//!
//! Each spot has at most one incoming link (none for roots) and at most two
//! outgoing links. The order of the outgoing links is significant: it is the
//! child order shown to the user, and the thing registration reorders.

use super::arena::{Arena, LinkId, SpotId};
use super::tags::{TagId, TagSetId, TagSetModel};
use crate::error::GraphError;
use crate::geometry::Vec3;
use std::fmt;
use std::sync::Arc;

/// Maximum number of children of a spot
pub const MAX_CHILDREN: usize = 2;

/// A tracked cell at one timepoint
#[derive(Debug, Clone, PartialEq)]
pub struct Spot {
    pub label: String,
    pub timepoint: u32,
    pub position: Vec3,
    incoming: Vec<LinkId>,
    outgoing: Vec<LinkId>,
}

impl Spot {
    pub fn incoming(&self) -> &[LinkId] {
        &self.incoming
    }

    /// Outgoing links in child order
    pub fn outgoing(&self) -> &[LinkId] {
        &self.outgoing
    }

    pub fn out_degree(&self) -> usize {
        self.outgoing.len()
    }

    pub fn is_root(&self) -> bool {
        self.incoming.is_empty()
    }
}

/// A directed parent-to-child tracking edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub source: SpotId,
    pub target: SpotId,
}

/// Observer of structural changes
pub trait GraphListener: Send + Sync {
    fn graph_changed(&self);
}

/// Lineage forest of one embryo
#[derive(Default)]
pub struct LineageGraph {
    spots: Arena<SpotId, Spot>,
    links: Arena<LinkId, Link>,
    tags: TagSetModel,
    listeners: Vec<Arc<dyn GraphListener>>,
}

impl fmt::Debug for LineageGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineageGraph")
            .field("spots", &self.spots.len())
            .field("links", &self.links.len())
            .field("tag_sets", &self.tags.tag_sets().len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Copies spots, links and tags with their ids. Observers stay with the original.
impl Clone for LineageGraph {
    fn clone(&self) -> Self {
        Self {
            spots: self.spots.clone(),
            links: self.links.clone(),
            tags: self.tags.clone(),
            listeners: Vec::new(),
        }
    }
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_spot(&mut self, label: impl Into<String>, timepoint: u32, position: Vec3) -> SpotId {
        self.spots.allocate(Spot {
            label: label.into(),
            timepoint,
            position,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        })
    }

    /// Appends a link as the last child of `source`. `target` must not have a parent yet.
    pub fn add_link(&mut self, source: SpotId, target: SpotId) -> Result<LinkId, GraphError> {
        let parent = self.spots.get(source).ok_or(GraphError::UnknownSpot(source))?;
        let child = self.spots.get(target).ok_or(GraphError::UnknownSpot(target))?;
        if parent.outgoing.len() >= MAX_CHILDREN {
            return Err(GraphError::TooManyChildren(source));
        }
        if !child.incoming.is_empty() {
            return Err(GraphError::AlreadyHasParent(target));
        }
        let link = self.links.allocate(Link { source, target });
        if let Some(s) = self.spots.get_mut(source) {
            s.outgoing.push(link);
        }
        if let Some(t) = self.spots.get_mut(target) {
            t.incoming.push(link);
        }
        Ok(link)
    }

    /// Removes a link together with all of its tags.
    pub fn remove_link(&mut self, link: LinkId) -> Result<Link, GraphError> {
        let removed = self.links.deallocate(link).ok_or(GraphError::UnknownLink(link))?;
        if let Some(s) = self.spots.get_mut(removed.source) {
            s.outgoing.retain(|l| *l != link);
        }
        if let Some(t) = self.spots.get_mut(removed.target) {
            t.incoming.retain(|l| *l != link);
        }
        self.tags.forget_link(link);
        Ok(removed)
    }

    /// Removes a spot, its incident links and all of their tags.
    pub fn remove_spot(&mut self, spot: SpotId) -> Result<Spot, GraphError> {
        let incident: Vec<LinkId> = {
            let s = self.spots.get(spot).ok_or(GraphError::UnknownSpot(spot))?;
            s.incoming.iter().chain(s.outgoing.iter()).copied().collect()
        };
        for link in incident {
            self.remove_link(link)?;
        }
        self.tags.forget_spot(spot);
        self.spots.deallocate(spot).ok_or(GraphError::UnknownSpot(spot))
    }

    pub fn spot(&self, id: SpotId) -> Option<&Spot> {
        self.spots.get(id)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn contains_spot(&self, id: SpotId) -> bool {
        self.spots.contains(id)
    }

    pub fn spots(&self) -> impl Iterator<Item = (SpotId, &Spot)> {
        self.spots.iter()
    }

    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links.iter()
    }

    pub fn spot_count(&self) -> usize {
        self.spots.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn set_position(&mut self, id: SpotId, position: Vec3) -> Result<(), GraphError> {
        let spot = self.spots.get_mut(id).ok_or(GraphError::UnknownSpot(id))?;
        spot.position = position;
        Ok(())
    }

    pub fn position(&self, id: SpotId) -> Option<Vec3> {
        self.spots.get(id).map(|s| s.position)
    }

    pub fn label(&self, id: SpotId) -> Option<&str> {
        self.spots.get(id).map(|s| s.label.as_str())
    }

    /// Spots without incoming links, in id order
    pub fn roots(&self) -> impl Iterator<Item = SpotId> + '_ {
        self.spots
            .iter()
            .filter(|(_, s)| s.is_root())
            .map(|(id, _)| id)
    }

    /// Number of children; 0 for unknown spots
    pub fn out_degree(&self, id: SpotId) -> usize {
        self.spots.get(id).map_or(0, Spot::out_degree)
    }

    /// The `index`-th child in child order
    pub fn child(&self, id: SpotId, index: usize) -> Option<SpotId> {
        let link = *self.spots.get(id)?.outgoing.get(index)?;
        self.links.get(link).map(|l| l.target)
    }

    /// Children in child order
    pub fn children(&self, id: SpotId) -> Vec<SpotId> {
        self.spots
            .get(id)
            .map(|s| {
                s.outgoing
                    .iter()
                    .filter_map(|l| self.links.get(*l))
                    .map(|l| l.target)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn parent(&self, id: SpotId) -> Option<SpotId> {
        let link = *self.spots.get(id)?.incoming.first()?;
        self.links.get(link).map(|l| l.source)
    }

    pub fn find_link(&self, source: SpotId, target: SpotId) -> Option<LinkId> {
        self.spots
            .get(source)?
            .outgoing
            .iter()
            .copied()
            .find(|l| self.links.get(*l).is_some_and(|link| link.target == target))
    }

    /// Number of timepoints covered by the graph (highest timepoint + 1)
    pub fn timepoint_count(&self) -> usize {
        self.spots
            .iter()
            .map(|(_, s)| s.timepoint as usize + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn tags(&self) -> &TagSetModel {
        &self.tags
    }

    pub fn create_tag_set<S: Into<String>>(
        &mut self,
        name: impl Into<String>,
        tags: impl IntoIterator<Item = (S, u32)>,
    ) -> TagSetId {
        self.tags.create_tag_set(name, tags)
    }

    pub fn spot_tag(&self, set: TagSetId, spot: SpotId) -> Option<TagId> {
        self.tags.spot_tag(set, spot)
    }

    pub fn link_tag(&self, set: TagSetId, link: LinkId) -> Option<TagId> {
        self.tags.link_tag(set, link)
    }

    /// Sets or clears the tag of a spot under `set`.
    pub fn set_spot_tag(
        &mut self,
        set: TagSetId,
        spot: SpotId,
        tag: Option<TagId>,
    ) -> Result<(), GraphError> {
        if !self.spots.contains(spot) {
            return Err(GraphError::UnknownSpot(spot));
        }
        self.tags.assign_spot(set, spot, tag)
    }

    /// Sets or clears the tag of a link under `set`.
    pub fn set_link_tag(
        &mut self,
        set: TagSetId,
        link: LinkId,
        tag: Option<TagId>,
    ) -> Result<(), GraphError> {
        if !self.links.contains(link) {
            return Err(GraphError::UnknownLink(link));
        }
        self.tags.assign_link(set, link, tag)
    }

    pub fn add_listener(&mut self, listener: Arc<dyn GraphListener>) {
        self.listeners.push(listener);
    }

    /// Tells every observer that the structure changed.
    pub fn notify_graph_changed(&self) {
        for listener in &self.listeners {
            listener.graph_changed();
        }
    }
}
