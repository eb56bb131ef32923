//! # Mapedit Changes
//!
//! Turns editing intents into ordered change descriptions and keeps them
//! until they are uploaded.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ actions: user intent → ChangeDescriptions   │
//! │  - CreateNewNodeAction (dedup, snap, splice)│
//! │  - ChangeTagAction (answer → tag delta)     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ PendingChangeSet                            │
//! │  - placeholder ids (-1, -2, ...)            │
//! │  - shared PointRegistry ("lat,lon" → id)    │
//! │  - pending log, flushed to an Uploader      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ Uploader → IdRewrites (placeholder → real)  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mapedit_changes::{CreateNewNodeAction, CreateNodeOptions, PendingChangeSet};
//! use mapedit_tags::Tag;
//!
//! let changes = PendingChangeSet::new(registry.clone());
//!
//! let mut action = CreateNewNodeAction::new(
//!     vec![Tag::new("amenity", "bench")],
//!     Some(51.05),
//!     Some(3.72),
//!     CreateNodeOptions::new().theme("benches").snap_onto(way),
//! )?;
//! changes.apply_action(&mut action).await?;
//!
//! changes.flush(&uploader).await?;
//! ```

pub mod actions;
pub mod change_description;
pub mod changes;
pub mod config;
pub mod errors;
pub mod object_graph;
pub mod osm_id;
pub mod osm_object;
pub mod placeholder_ids;
pub mod point_registry;
pub mod upload;

pub use actions::{ChangeAction, ChangeTagAction, CreateNewNodeAction, CreateNodeOptions};
pub use change_description::{ChangeDescription, ChangeMeta, ChangeType, GeometryChange, TagDelta};
pub use changes::PendingChangeSet;
pub use config::{ChangesConfig, DEFAULT_CONFIG_NAME};
pub use errors::{ActionError, ChangesError, GraphError, UploadError};
pub use object_graph::ObjectGraph;
pub use osm_id::{IdRewrites, OsmId, OsmObjectType};
pub use osm_object::{OsmNode, OsmWay, Tags};
pub use placeholder_ids::PlaceholderIds;
pub use point_registry::{PointLookup, PointRegistry};
pub use upload::Uploader;
