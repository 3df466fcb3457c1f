//! Tag sets and per-object tag assignments.
//!
//! A tag set is a named, ordered list of tags. Every spot and every link
//! carries at most one tag per tag set.

use super::{LinkId, SpotId};
use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagSetId(u32);

impl fmt::Display for TagSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tagset#{}", self.0)
    }
}

/// A tag, identified by its tag set and its position in that set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagId {
    pub set: TagSetId,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub label: String,
    /// ARGB
    pub color: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagSet {
    pub id: TagSetId,
    pub name: String,
    pub tags: Vec<Tag>,
}

impl TagSet {
    /// Looks up a tag by label
    pub fn tag(&self, label: &str) -> Option<TagId> {
        self.tags
            .iter()
            .position(|t| t.label == label)
            .map(|index| TagId {
                set: self.id,
                index: index as u32,
            })
    }

    pub fn get(&self, tag: TagId) -> Option<&Tag> {
        if tag.set != self.id {
            return None;
        }
        self.tags.get(tag.index as usize)
    }
}

/// All tag sets of one graph plus the spot and link assignments
#[derive(Debug, Clone, Default)]
pub struct TagSetModel {
    sets: Vec<TagSet>,
    spot_tags: HashMap<TagSetId, HashMap<SpotId, TagId>>,
    link_tags: HashMap<TagSetId, HashMap<LinkId, TagId>>,
}

impl TagSetModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag set. Names need not be unique; lookups by name return the first.
    pub fn create_tag_set<S: Into<String>>(
        &mut self,
        name: impl Into<String>,
        tags: impl IntoIterator<Item = (S, u32)>,
    ) -> TagSetId {
        let id = TagSetId(self.sets.len() as u32);
        let tags = tags
            .into_iter()
            .map(|(label, color)| Tag {
                label: label.into(),
                color,
            })
            .collect();
        self.sets.push(TagSet {
            id,
            name: name.into(),
            tags,
        });
        id
    }

    pub fn tag_sets(&self) -> &[TagSet] {
        &self.sets
    }

    pub fn tag_set(&self, id: TagSetId) -> Option<&TagSet> {
        self.sets.get(id.0 as usize)
    }

    pub fn tag_set_by_name(&self, name: &str) -> Option<&TagSet> {
        self.sets.iter().find(|s| s.name == name)
    }

    pub fn spot_tag(&self, set: TagSetId, spot: SpotId) -> Option<TagId> {
        self.spot_tags.get(&set)?.get(&spot).copied()
    }

    pub fn link_tag(&self, set: TagSetId, link: LinkId) -> Option<TagId> {
        self.link_tags.get(&set)?.get(&link).copied()
    }

    /// Tag of `link` under every defined tag set, `None` where untagged
    pub fn link_tags_of(&self, link: LinkId) -> Vec<(TagSetId, Option<TagId>)> {
        self.sets
            .iter()
            .map(|s| (s.id, self.link_tag(s.id, link)))
            .collect()
    }

    pub fn spot_tags_of(&self, spot: SpotId) -> Vec<(TagSetId, Option<TagId>)> {
        self.sets
            .iter()
            .map(|s| (s.id, self.spot_tag(s.id, spot)))
            .collect()
    }

    pub(crate) fn assign_spot(
        &mut self,
        set: TagSetId,
        spot: SpotId,
        tag: Option<TagId>,
    ) -> Result<(), GraphError> {
        self.check(set, tag)?;
        let map = self.spot_tags.entry(set).or_default();
        match tag {
            Some(tag) => map.insert(spot, tag),
            None => map.remove(&spot),
        };
        Ok(())
    }

    pub(crate) fn assign_link(
        &mut self,
        set: TagSetId,
        link: LinkId,
        tag: Option<TagId>,
    ) -> Result<(), GraphError> {
        self.check(set, tag)?;
        let map = self.link_tags.entry(set).or_default();
        match tag {
            Some(tag) => map.insert(link, tag),
            None => map.remove(&link),
        };
        Ok(())
    }

    /// Drops every assignment of a removed spot
    pub(crate) fn forget_spot(&mut self, spot: SpotId) {
        for map in self.spot_tags.values_mut() {
            map.remove(&spot);
        }
    }

    /// Drops every assignment of a removed link
    pub(crate) fn forget_link(&mut self, link: LinkId) {
        for map in self.link_tags.values_mut() {
            map.remove(&link);
        }
    }

    fn check(&self, set: TagSetId, tag: Option<TagId>) -> Result<(), GraphError> {
        let tag_set = self.tag_set(set).ok_or(GraphError::UnknownTagSet(set))?;
        if let Some(tag) = tag {
            if tag_set.get(tag).is_none() {
                return Err(GraphError::UnknownTag {
                    set: tag_set.name.clone(),
                    tag: format!("#{}", tag.index),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ArenaId;

    #[test]
    fn test_create_and_lookup() {
        let mut model = TagSetModel::new();
        let set = model.create_tag_set("fate", [("neural", 0xff0000ffu32), ("gut", 0xff00ff00)]);
        let tag_set = model.tag_set(set).unwrap();
        assert_eq!(tag_set.tags.len(), 2);
        let gut = tag_set.tag("gut").unwrap();
        assert_eq!(gut.index, 1);
        assert_eq!(tag_set.get(gut).unwrap().color, 0xff00ff00);
        assert!(tag_set.tag("muscle").is_none());
        assert_eq!(model.tag_set_by_name("fate").unwrap().id, set);
    }

    #[test]
    fn test_assign_and_forget() {
        let mut model = TagSetModel::new();
        let set = model.create_tag_set("fate", [("neural", 1u32)]);
        let neural = model.tag_set(set).unwrap().tag("neural").unwrap();
        let link = LinkId::from_index(4);

        model.assign_link(set, link, Some(neural)).unwrap();
        assert_eq!(model.link_tag(set, link), Some(neural));
        assert_eq!(model.link_tags_of(link), vec![(set, Some(neural))]);

        model.forget_link(link);
        assert_eq!(model.link_tag(set, link), None);
    }

    #[test]
    fn test_rejects_foreign_tag() {
        let mut model = TagSetModel::new();
        let a = model.create_tag_set("a", [("x", 1u32)]);
        let b = model.create_tag_set("b", [("y", 2u32)]);
        let x = model.tag_set(a).unwrap().tag("x").unwrap();
        let spot = SpotId::from_index(0);
        assert!(matches!(
            model.assign_spot(b, spot, Some(x)),
            Err(GraphError::UnknownTag { .. })
        ));
        assert!(model.assign_spot(a, spot, Some(x)).is_ok());
    }
}
