//! # Point Registry
//!
//! Remembers which node was created for an exact `"lat,lon"` position, so that
//! adding the same untagged point again (in this session or a later one)
//! reuses that node instead of creating a duplicate.
//!
//! One registry is shared by every session of the application (`Arc`), and
//! tests inject their own. Access goes through a `tokio` `RwLock`:
//!
//! - a lookup that misses and the insertion that follows happen under one
//!   write guard, and only the id the creation finally settles on is
//!   inserted, so a concurrent creation at the same position either waits or
//!   adopts an id that really ends up in the log;
//! - rewriting placeholder ids builds the new table aside and swaps it in,
//!   so a reader sees either the old or the new id, never a partial table.

use crate::osm_id::{IdRewrites, OsmId};
use mapedit_geometry::Coordinate;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Outcome of [`PointRegistry::get_or_insert_with`]
#[derive(Debug, Clone, PartialEq)]
pub enum PointLookup<T> {
    /// A node was already registered for the position
    Existing(i64),
    /// The position was new; `id` is now registered for it
    Inserted { id: i64, value: T },
}

impl<T> PointLookup<T> {
    pub fn id(&self) -> i64 {
        match self {
            PointLookup::Existing(id) | PointLookup::Inserted { id, .. } => *id,
        }
    }
}

#[derive(Debug, Default)]
pub struct PointRegistry {
    points: RwLock<HashMap<String, i64>>,
}

impl PointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry key: exact float text of both coordinates.
    ///
    /// `-0.0` is written as `0`, the same key as `0.0`.
    pub fn key(position: Coordinate) -> String {
        Coordinate::new(unsigned_zero(position.lat), unsigned_zero(position.lon)).to_string()
    }

    pub async fn get(&self, key: &str) -> Option<i64> {
        self.points.read().await.get(key).copied()
    }

    pub async fn register(&self, key: impl Into<String>, id: i64) {
        let key = key.into();
        debug!(key = %key, id, "Registering created point");
        self.points.write().await.insert(key, id);
    }

    /// Look the key up and, on a miss, run `create` and register the id it
    /// returns, all under one write guard. Nothing is registered when
    /// `create` fails.
    pub async fn get_or_insert_with<T, E>(
        &self,
        key: &str,
        create: impl FnOnce() -> Result<(i64, T), E>,
    ) -> Result<PointLookup<T>, E> {
        let mut points = self.points.write().await;

        if let Some(&existing) = points.get(key) {
            return Ok(PointLookup::Existing(existing));
        }

        let (id, value) = create()?;
        points.insert(key.to_string(), id);
        debug!(key, id, "Registered new point");
        Ok(PointLookup::Inserted { id, value })
    }

    /// Point entries holding an uploaded placeholder id at the server id.
    ///
    /// Returns how many entries changed.
    pub async fn rewrite_ids(&self, rewrites: &IdRewrites) -> usize {
        let mut points = self.points.write().await;

        let mut changed = 0;
        let rewritten: HashMap<String, i64> = points
            .iter()
            .map(|(key, &old)| match rewrites.get(&OsmId::node(old)) {
                Some(new) => {
                    changed += 1;
                    (key.clone(), new.id)
                }
                None => (key.clone(), old),
            })
            .collect();

        *points = rewritten;
        debug!(changed, "Rewrote point registry ids");
        changed
    }

    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }

    pub async fn snapshot(&self) -> HashMap<String, i64> {
        self.points.read().await.clone()
    }
}

fn unsigned_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}
