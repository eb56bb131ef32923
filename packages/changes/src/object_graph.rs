//! # Object Graph
//!
//! The nodes and ways loaded into the editor, kept in step with the changes
//! made locally so later actions (and feature filters) see the edited map.

use crate::change_description::{ChangeDescription, GeometryChange, TagDelta};
use crate::errors::GraphError;
use crate::osm_id::{IdRewrites, OsmId, OsmObjectType};
use crate::osm_object::{OsmNode, OsmWay, Tags};
use mapedit_geometry::Coordinate;
use mapedit_tags::TagsFilter;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    nodes: HashMap<i64, OsmNode>,
    ways: HashMap<i64, OsmWay>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_node(&mut self, node: OsmNode) {
        self.nodes.insert(node.id, node);
    }

    pub fn insert_way(&mut self, way: OsmWay) {
        self.ways.insert(way.id, way);
    }

    pub fn node(&self, id: i64) -> Option<&OsmNode> {
        self.nodes.get(&id)
    }

    pub fn way(&self, id: i64) -> Option<&OsmWay> {
        self.ways.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len() + self.ways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty()
    }

    /// Apply one change. The graph is left untouched when it fails.
    pub fn apply(&mut self, change: &ChangeDescription) -> Result<(), GraphError> {
        let target = change.target();

        match (change.object_type, &change.changes) {
            (OsmObjectType::Node, Some(GeometryChange::Node { lat, lon })) => {
                let node = self
                    .nodes
                    .entry(change.id)
                    .or_insert_with(|| OsmNode::new(change.id, *lat, *lon));
                node.lat = *lat;
                node.lon = *lon;
                apply_tags(&mut node.tags, change.tags.as_ref());
            }

            (OsmObjectType::Way, Some(GeometryChange::Way { nodes, coordinates })) => {
                if nodes.len() != coordinates.len() {
                    return Err(GraphError::MismatchedWay {
                        way: target.to_string(),
                        nodes: nodes.len(),
                        coordinates: coordinates.len(),
                    });
                }

                let coordinates = coordinates
                    .iter()
                    .map(|&pair| Coordinate::from_lon_lat(pair).to_lat_lon())
                    .collect();
                let way = self
                    .ways
                    .entry(change.id)
                    .or_insert_with(|| OsmWay::new(change.id, vec![], vec![]));
                way.nodes = nodes.clone();
                way.coordinates = coordinates;
                apply_tags(&mut way.tags, change.tags.as_ref());
            }

            (_, Some(_)) => {
                return Err(GraphError::MissingGeometry {
                    target: target.to_string(),
                })
            }

            (_, None) => {
                let tags = self.tags_mut(target).ok_or_else(|| GraphError::NotFound(target.to_string()))?;
                apply_tags(tags, change.tags.as_ref());
            }
        }

        debug!(target = %target, "Applied change to object graph");
        Ok(())
    }

    pub fn apply_all<'a>(&mut self, changes: impl IntoIterator<Item = &'a ChangeDescription>) -> Result<(), GraphError> {
        for change in changes {
            self.apply(change)?;
        }
        Ok(())
    }

    /// Re-key uploaded objects and the way references pointing at them
    pub fn rewrite_ids(&mut self, rewrites: &IdRewrites) {
        self.nodes = std::mem::take(&mut self.nodes)
            .into_values()
            .map(|mut node| {
                node.id = rewrites.resolve(OsmObjectType::Node, node.id);
                (node.id, node)
            })
            .collect();

        self.ways = std::mem::take(&mut self.ways)
            .into_values()
            .map(|mut way| {
                way.id = rewrites.resolve(OsmObjectType::Way, way.id);
                for node in way.nodes.iter_mut() {
                    *node = rewrites.resolve(OsmObjectType::Node, *node);
                }
                (way.id, way)
            })
            .collect();
    }

    /// Ids of all objects whose tags match `filter`, sorted
    pub fn matching(&self, filter: &TagsFilter) -> Vec<OsmId> {
        let nodes = self.nodes.values().map(|node| (node.osm_id(), &node.tags));
        let ways = self.ways.values().map(|way| (way.osm_id(), &way.tags));

        let mut matched: Vec<OsmId> = nodes
            .chain(ways)
            .filter(|(id, tags)| {
                let mut properties = (*tags).clone();
                properties.insert("id".to_string(), id.to_string());
                filter.matches(&properties)
            })
            .map(|(id, _)| id)
            .collect();

        matched.sort();
        matched
    }

    fn tags_mut(&mut self, target: OsmId) -> Option<&mut Tags> {
        match target.object_type {
            OsmObjectType::Node => self.nodes.get_mut(&target.id).map(|node| &mut node.tags),
            OsmObjectType::Way => self.ways.get_mut(&target.id).map(|way| &mut way.tags),
            OsmObjectType::Relation => None,
        }
    }
}

fn apply_tags(tags: &mut Tags, delta: Option<&TagDelta>) {
    let Some(delta) = delta else {
        return;
    };

    for (key, value) in delta {
        match value {
            Some(value) => {
                tags.insert(key.clone(), value.clone());
            }
            None => {
                tags.remove(key);
            }
        }
    }
}
