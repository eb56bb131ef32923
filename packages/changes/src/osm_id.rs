//! Object identifiers in the `type/id` form, and the old → new id mapping
//! returned by an upload.

use crate::errors::ChangesError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsmObjectType {
    Node,
    Way,
    Relation,
}

impl OsmObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsmObjectType::Node => "node",
            OsmObjectType::Way => "way",
            OsmObjectType::Relation => "relation",
        }
    }
}

impl fmt::Display for OsmObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsmObjectType {
    type Err = ChangesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(OsmObjectType::Node),
            "way" => Ok(OsmObjectType::Way),
            "relation" => Ok(OsmObjectType::Relation),
            other => Err(ChangesError::InvalidId(format!("unknown object type '{}'", other))),
        }
    }
}

/// `node/-1`, `way/42`, ...
///
/// Negative ids are placeholders for objects that were not uploaded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OsmId {
    pub object_type: OsmObjectType,
    pub id: i64,
}

impl OsmId {
    pub fn new(object_type: OsmObjectType, id: i64) -> Self {
        Self { object_type, id }
    }

    pub fn node(id: i64) -> Self {
        Self::new(OsmObjectType::Node, id)
    }

    pub fn way(id: i64) -> Self {
        Self::new(OsmObjectType::Way, id)
    }

    pub fn relation(id: i64) -> Self {
        Self::new(OsmObjectType::Relation, id)
    }

    pub fn is_placeholder(&self) -> bool {
        self.id < 0
    }
}

impl fmt::Display for OsmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.object_type, self.id)
    }
}

impl FromStr for OsmId {
    type Err = ChangesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, number) = s
            .split_once('/')
            .ok_or_else(|| ChangesError::InvalidId(format!("'{}' is not of the form type/id", s)))?;
        let id = number
            .parse::<i64>()
            .map_err(|_| ChangesError::InvalidId(format!("'{}' has no numeric id", s)))?;

        Ok(OsmId::new(kind.parse()?, id))
    }
}

impl Serialize for OsmId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OsmId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Server-assigned ids for objects uploaded with placeholder ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdRewrites {
    mapping: HashMap<OsmId, OsmId>,
}

impl IdRewrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `"type/old" -> "type/new"` pairs as reported by the upload
    pub fn from_strings<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self, ChangesError> {
        let mut rewrites = Self::new();
        for (old, new) in pairs {
            rewrites.insert(old.parse()?, new.parse()?)?;
        }
        Ok(rewrites)
    }

    pub fn insert(&mut self, old: OsmId, new: OsmId) -> Result<(), ChangesError> {
        if old.object_type != new.object_type {
            return Err(ChangesError::InvalidId(format!(
                "cannot rewrite {} into an object of another type ({})",
                old, new
            )));
        }
        self.mapping.insert(old, new);
        Ok(())
    }

    pub fn get(&self, old: &OsmId) -> Option<OsmId> {
        self.mapping.get(old).copied()
    }

    /// The new numeric id for `id` of the given type, or `id` itself
    pub fn resolve(&self, object_type: OsmObjectType, id: i64) -> i64 {
        self.get(&OsmId::new(object_type, id)).map_or(id, |new| new.id)
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsmId, &OsmId)> {
        self.mapping.iter()
    }
}
