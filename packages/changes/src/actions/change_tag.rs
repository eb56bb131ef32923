use super::ChangeAction;
use crate::change_description::{ChangeDescription, ChangeMeta, TagDelta};
use crate::changes::PendingChangeSet;
use crate::errors::ActionError;
use crate::osm_id::OsmId;
use crate::osm_object::Tags;
use async_trait::async_trait;
use mapedit_tags::TagsFilter;
use tracing::{debug, instrument};

/// Applies an answer (a tag expression) to an existing object.
///
/// Only keys whose value really changes end up in the description.
#[derive(Debug, Clone)]
pub struct ChangeTagAction {
    element: OsmId,
    tags: TagsFilter,
    current_tags: Tags,
    meta: ChangeMeta,
}

impl ChangeTagAction {
    pub fn new(element: OsmId, tags: TagsFilter, current_tags: Tags, meta: ChangeMeta) -> Self {
        Self {
            element,
            tags,
            current_tags,
            meta,
        }
    }

    fn delta(&self) -> Result<TagDelta, ActionError> {
        let mut properties = self.current_tags.clone();
        properties.insert("id".to_string(), self.element.to_string());

        let change = self.tags.as_change(&properties)?;

        let delta = change
            .into_iter()
            .filter_map(|(key, value)| {
                let current = self.current_tags.get(&key);
                if value.is_empty() {
                    current.map(|_| (key, None))
                } else if current == Some(&value) {
                    None
                } else {
                    Some((key, Some(value)))
                }
            })
            .collect();

        Ok(delta)
    }
}

#[async_trait]
impl ChangeAction for ChangeTagAction {
    #[instrument(skip_all)]
    async fn create_change_descriptions(
        &mut self,
        _changes: &PendingChangeSet,
    ) -> Result<Vec<ChangeDescription>, ActionError> {
        let delta = self.delta()?;

        if delta.is_empty() {
            debug!(element = %self.element, "Tags already up to date");
            return Ok(vec![]);
        }

        debug!(element = %self.element, keys = delta.len(), "Changing tags");
        Ok(vec![ChangeDescription::retag(self.element, delta, self.meta.clone())])
    }
}
