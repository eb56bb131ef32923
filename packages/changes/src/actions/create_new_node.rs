use super::ChangeAction;
use crate::change_description::{ChangeDescription, ChangeMeta, ChangeType};
use crate::changes::PendingChangeSet;
use crate::errors::ActionError;
use crate::osm_id::OsmId;
use crate::osm_object::OsmWay;
use crate::point_registry::{PointLookup, PointRegistry};
use async_trait::async_trait;
use mapedit_geometry::{Coordinate, GeoOperations, Geometry};
use mapedit_tags::{Tag, TagValue, TagsFilter};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Optional behaviour of [`CreateNewNodeAction`]
#[derive(Debug, Clone, Default)]
pub struct CreateNodeOptions {
    /// Reuse a node created earlier at exactly the same position.
    /// Defaults to true for untagged points only.
    pub allow_reuse_of_previously_created_points: Option<bool>,

    /// Insert the new node into this way
    pub snap_onto: Option<OsmWay>,

    /// Defaults to the session's `reusePointWithinMeters`
    pub reuse_point_within_meters: Option<f64>,

    /// Defaults to the session's theme
    pub theme: Option<String>,

    /// `Create` or `Import`; defaults to `Create`
    pub change_type: Option<ChangeType>,
}

impl CreateNodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_reuse(mut self, allow: bool) -> Self {
        self.allow_reuse_of_previously_created_points = Some(allow);
        self
    }

    pub fn snap_onto(mut self, way: OsmWay) -> Self {
        self.snap_onto = Some(way);
        self
    }

    pub fn reuse_point_within_meters(mut self, meters: f64) -> Self {
        self.reuse_point_within_meters = Some(meters);
        self
    }

    pub fn theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    pub fn change_type(mut self, change_type: ChangeType) -> Self {
        self.change_type = Some(change_type);
        self
    }
}

/// Creates a point, optionally spliced into an existing way.
///
/// Depending on what is already there the outcome is one of:
///
/// - nothing, when an untagged point was already created at this position;
/// - a new node;
/// - a retag of an existing way vertex close to the snapped position;
/// - a new node followed by the way with the node inserted.
#[derive(Debug)]
pub struct CreateNewNodeAction {
    tags: Vec<Tag>,
    position: Coordinate,
    reuse_previously_created: bool,
    snap_onto: Option<OsmWay>,
    reuse_point_within_meters: Option<f64>,
    theme: Option<String>,
    change_type: ChangeType,
    geometry: Arc<dyn Geometry>,
    new_element_id_number: Option<i64>,
}

impl CreateNewNodeAction {
    pub fn new(tags: Vec<Tag>, lat: Option<f64>, lon: Option<f64>, options: CreateNodeOptions) -> Result<Self, ActionError> {
        let position = match (lat, lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Coordinate::new(lat, lon),
            _ => return Err(ActionError::InvalidCoordinate { lat, lon }),
        };

        let reuse_previously_created = options
            .allow_reuse_of_previously_created_points
            .unwrap_or(tags.is_empty());

        Ok(Self {
            tags,
            position,
            reuse_previously_created,
            snap_onto: options.snap_onto,
            reuse_point_within_meters: options.reuse_point_within_meters,
            theme: options.theme,
            change_type: options.change_type.unwrap_or(ChangeType::Create),
            geometry: Arc::new(GeoOperations),
            new_element_id_number: None,
        })
    }

    /// Replace the geometry used for snapping
    pub fn with_geometry(mut self, geometry: Arc<dyn Geometry>) -> Self {
        self.geometry = geometry;
        self
    }

    /// `node/<id>` of the created or reused node, once the action ran
    pub fn new_element_id(&self) -> Option<String> {
        self.new_element_id_number.map(|id| OsmId::node(id).to_string())
    }

    pub fn new_element_id_number(&self) -> Option<i64> {
        self.new_element_id_number
    }

    fn validate_tags(&self) -> Result<(), ActionError> {
        for tag in &self.tags {
            if let TagValue::Regex(pattern) = &tag.value {
                return Err(ActionError::InvalidTagValue {
                    key: tag.key.clone(),
                    pattern: pattern.as_str().to_string(),
                });
            }
        }
        Ok(())
    }

    fn meta(&self, changes: &PendingChangeSet, change_type: ChangeType) -> ChangeMeta {
        let theme = self.theme.clone().unwrap_or_else(|| changes.config().theme.clone());
        ChangeMeta::new(change_type, theme)
    }

    /// Everything after the id is known. The outcome id is returned with
    /// the descriptions; it differs from `id` when a way vertex is reused.
    fn describe(&self, changes: &PendingChangeSet, id: i64) -> Result<(i64, Vec<ChangeDescription>), ActionError> {
        let mut properties: BTreeMap<String, String> = BTreeMap::new();
        properties.insert("id".to_string(), OsmId::node(id).to_string());
        for tag in &self.tags {
            if let Some(value) = tag.value.as_literal() {
                properties.insert(tag.key.clone(), value.to_string());
            }
        }

        let change = TagsFilter::all_of(self.tags.iter().cloned()).as_change(&properties)?;
        let tags = ChangeDescription::tag_delta(change);
        let create = ChangeDescription::create_node(id, self.position, tags.clone(), self.meta(changes, self.change_type));

        let Some(way) = &self.snap_onto else {
            return Ok((id, vec![create]));
        };

        if way.nodes.len() != way.coordinates.len() {
            return Err(ActionError::InvalidWay {
                way: way.id,
                nodes: way.nodes.len(),
                coordinates: way.coordinates.len(),
            });
        }

        let line = way.line();
        let projected = self.geometry.nearest_point_on_line(&line, self.position)?;
        let index = projected.segment_index;
        let threshold = self
            .reuse_point_within_meters
            .unwrap_or(changes.config().reuse_point_within_meters);

        let (Some(&start), Some(&end)) = (line.get(index), line.get(index + 1)) else {
            return Err(ActionError::SegmentOutOfRange {
                way: way.id,
                segment: index,
                vertices: line.len(),
            });
        };

        let mut reused = None;
        if self.geometry.distance(start, projected.point) < threshold {
            reused = Some(way.nodes[index]);
        }
        if self.geometry.distance(end, projected.point) < threshold {
            reused = Some(way.nodes[index + 1]);
        }

        if let Some(vertex) = reused {
            debug!(vertex, way = way.id, "Reusing existing way vertex");
            let retag = ChangeDescription::retag(OsmId::node(vertex), tags, self.meta(changes, self.change_type));
            return Ok((vertex, vec![retag]));
        }

        let mut coordinates = way.lon_lat_coordinates();
        let mut nodes = way.nodes.clone();
        coordinates.insert(index + 1, self.position.to_lon_lat());
        nodes.insert(index + 1, id);

        debug!(id, way = way.id, after = way.nodes[index], "Splicing new node into way");
        let modify = ChangeDescription::modify_way(way.id, nodes, coordinates, self.meta(changes, self.change_type));
        Ok((id, vec![create, modify]))
    }
}

#[async_trait]
impl ChangeAction for CreateNewNodeAction {
    #[instrument(skip_all)]
    async fn create_change_descriptions(
        &mut self,
        changes: &PendingChangeSet,
    ) -> Result<Vec<ChangeDescription>, ActionError> {
        self.validate_tags()?;
        debug!(position = %self.position, tags = self.tags.len(), "Creating node");

        if !self.reuse_previously_created {
            let id = changes.get_new_id();
            let (element, descriptions) = self.describe(changes, id)?;
            self.new_element_id_number = Some(element);
            return Ok(descriptions);
        }

        // only the id this action settles on becomes visible to other creations
        let key = PointRegistry::key(self.position);
        let lookup = changes
            .registry()
            .get_or_insert_with(&key, || self.describe(changes, changes.get_new_id()))
            .await?;

        match lookup {
            PointLookup::Existing(existing) => {
                debug!(key = %key, id = existing, "Point already created");
                self.new_element_id_number = Some(existing);
                Ok(vec![])
            }
            PointLookup::Inserted { id, value } => {
                self.new_element_id_number = Some(id);
                Ok(value)
            }
        }
    }
}
