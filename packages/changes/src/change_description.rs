//! # Change Descriptions
//!
//! One record per touched object. An action that touches several objects
//! (a new node spliced into a way) emits several records, in the order the
//! upload has to apply them: creations before the records that reference the
//! created ids.
//!
//! Records are values: once produced they are never edited. Id rewriting
//! returns a new record.

use crate::osm_id::{IdRewrites, OsmId, OsmObjectType};
use mapedit_geometry::Coordinate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// New value per key; `None` removes the key.
pub type TagDelta = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create,
    Modify,
    Import,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMeta {
    pub change_type: ChangeType,
    pub theme: String,
}

impl ChangeMeta {
    pub fn new(change_type: ChangeType, theme: impl Into<String>) -> Self {
        Self {
            change_type,
            theme: theme.into(),
        }
    }
}

/// Geometry part of a change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeometryChange {
    Node { lat: f64, lon: f64 },

    /// Full replacement of the node list; `coordinates` are `[lon, lat]`
    Way { nodes: Vec<i64>, coordinates: Vec<[f64; 2]> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDescription {
    #[serde(rename = "type")]
    pub object_type: OsmObjectType,

    pub id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<TagDelta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<GeometryChange>,

    pub meta: ChangeMeta,
}

impl ChangeDescription {
    /// A new node at `position` carrying `tags`
    pub fn create_node(id: i64, position: Coordinate, tags: TagDelta, meta: ChangeMeta) -> Self {
        Self {
            object_type: OsmObjectType::Node,
            id,
            tags: Some(tags),
            changes: Some(GeometryChange::Node {
                lat: position.lat,
                lon: position.lon,
            }),
            meta,
        }
    }

    /// Tag-only change of an existing object
    pub fn retag(target: OsmId, tags: TagDelta, meta: ChangeMeta) -> Self {
        Self {
            object_type: target.object_type,
            id: target.id,
            tags: Some(tags),
            changes: None,
            meta,
        }
    }

    /// Replace the node list of a way; `coordinates` are `[lon, lat]`
    pub fn modify_way(id: i64, nodes: Vec<i64>, coordinates: Vec<[f64; 2]>, meta: ChangeMeta) -> Self {
        Self {
            object_type: OsmObjectType::Way,
            id,
            tags: None,
            changes: Some(GeometryChange::Way { nodes, coordinates }),
            meta,
        }
    }

    pub fn target(&self) -> OsmId {
        OsmId::new(self.object_type, self.id)
    }

    /// Turn an `as_change` result into a delta: an empty value deletes the key.
    pub fn tag_delta(change: BTreeMap<String, String>) -> TagDelta {
        change
            .into_iter()
            .map(|(key, value)| {
                let value = if value.is_empty() { None } else { Some(value) };
                (key, value)
            })
            .collect()
    }

    /// Ids of other objects this change points at
    pub fn references(&self) -> Vec<OsmId> {
        match &self.changes {
            Some(GeometryChange::Way { nodes, .. }) => nodes.iter().map(|&id| OsmId::node(id)).collect(),
            _ => vec![],
        }
    }

    /// Same change with placeholder ids replaced by their server ids
    pub fn rewrite_ids(&self, rewrites: &IdRewrites) -> Self {
        let changes = match &self.changes {
            Some(GeometryChange::Way { nodes, coordinates }) => Some(GeometryChange::Way {
                nodes: nodes
                    .iter()
                    .map(|&id| rewrites.resolve(OsmObjectType::Node, id))
                    .collect(),
                coordinates: coordinates.clone(),
            }),
            other => other.clone(),
        };

        Self {
            object_type: self.object_type,
            id: rewrites.resolve(self.object_type, self.id),
            tags: self.tags.clone(),
            changes,
            meta: self.meta.clone(),
        }
    }
}
