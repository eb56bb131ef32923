//! Nodes and ways as they are held in memory while editing.

use crate::osm_id::OsmId;
use mapedit_geometry::Coordinate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsmNode {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tags: Tags,
}

impl OsmNode {
    pub fn new(id: i64, lat: f64, lon: f64) -> Self {
        Self {
            id,
            lat,
            lon,
            tags: Tags::new(),
        }
    }

    pub fn osm_id(&self) -> OsmId {
        OsmId::node(self.id)
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// A way with its resolved vertex positions.
///
/// `coordinates[i]` is the position of `nodes[i]`, stored as `[lat, lon]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsmWay {
    pub id: i64,
    pub nodes: Vec<i64>,
    pub coordinates: Vec<[f64; 2]>,
    #[serde(default)]
    pub tags: Tags,
}

impl OsmWay {
    pub fn new(id: i64, nodes: Vec<i64>, coordinates: Vec<[f64; 2]>) -> Self {
        Self {
            id,
            nodes,
            coordinates,
            tags: Tags::new(),
        }
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn osm_id(&self) -> OsmId {
        OsmId::way(self.id)
    }

    /// Vertex positions for the geometry collaborator
    pub fn line(&self) -> Vec<Coordinate> {
        self.coordinates.iter().map(|&pair| Coordinate::from_lat_lon(pair)).collect()
    }

    /// Vertex positions in GeoJSON `[lon, lat]` order
    pub fn lon_lat_coordinates(&self) -> Vec<[f64; 2]> {
        self.line().into_iter().map(Coordinate::to_lon_lat).collect()
    }
}
