//! # Pending Changes
//!
//! The editing session's log of changes that were made locally but not yet
//! uploaded, together with the placeholder id counter and a handle to the
//! shared point registry.
//!
//! Actions never write to the log themselves. `apply_action` runs an action
//! and appends everything it produced, or nothing when it fails.
//!
//! ```text
//! action ──► apply_action ──► pending log ──► flush ──► Uploader
//!                 │                                        │
//!                 └── PlaceholderIds / PointRegistry ◄─────┘ id rewrites
//! ```

use crate::actions::ChangeAction;
use crate::change_description::ChangeDescription;
use crate::config::ChangesConfig;
use crate::errors::{ActionError, ChangesError};
use crate::osm_id::IdRewrites;
use crate::placeholder_ids::PlaceholderIds;
use crate::point_registry::PointRegistry;
use crate::upload::Uploader;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub struct PendingChangeSet {
    ids: PlaceholderIds,
    registry: Arc<PointRegistry>,
    pending: Mutex<Vec<ChangeDescription>>,
    config: ChangesConfig,
}

impl PendingChangeSet {
    /// Change set sharing `registry` with other sessions
    pub fn new(registry: Arc<PointRegistry>) -> Self {
        Self::with_config(ChangesConfig::default(), registry)
    }

    pub fn with_config(config: ChangesConfig, registry: Arc<PointRegistry>) -> Self {
        Self {
            ids: PlaceholderIds::starting_at(config.first_placeholder_id),
            registry,
            pending: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Change set with a registry of its own
    pub fn isolated() -> Self {
        Self::new(Arc::new(PointRegistry::new()))
    }

    /// Allocate a placeholder id for an object created in this session
    pub fn get_new_id(&self) -> i64 {
        self.ids.new_id()
    }

    pub fn registry(&self) -> &Arc<PointRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ChangesConfig {
        &self.config
    }

    /// Run an action and append its descriptions to the log
    #[instrument(skip_all)]
    pub async fn apply_action(&self, action: &mut dyn ChangeAction) -> Result<Vec<ChangeDescription>, ActionError> {
        let descriptions = match action.create_change_descriptions(self).await {
            Ok(descriptions) => descriptions,
            Err(err) => {
                warn!(error = %err, "Action failed, nothing appended");
                return Err(err);
            }
        };

        let mut pending = self.pending.lock().await;
        pending.extend(descriptions.iter().cloned());
        debug!(appended = descriptions.len(), pending = pending.len(), "Applied action");

        Ok(descriptions)
    }

    /// Copy of the log, oldest first
    pub async fn pending(&self) -> Vec<ChangeDescription> {
        self.pending.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }

    /// Drain the log
    pub async fn take_pending(&self) -> Vec<ChangeDescription> {
        std::mem::take(&mut *self.pending.lock().await)
    }

    /// Switch placeholder ids over to the ids the server assigned.
    ///
    /// The point registry swaps in a rebuilt table, and entries still
    /// waiting in the log are rewritten so later uploads refer to real ids.
    #[instrument(skip_all, fields(rewrites = rewrites.len()))]
    pub async fn register_id_rewrites(&self, rewrites: &IdRewrites) {
        if rewrites.is_empty() {
            return;
        }

        let points = self.registry.rewrite_ids(rewrites).await;

        let mut pending = self.pending.lock().await;
        let rewritten: Vec<ChangeDescription> = pending.iter().map(|change| change.rewrite_ids(rewrites)).collect();
        *pending = rewritten;

        info!(points, pending = pending.len(), "Registered id rewrites");
    }

    /// Upload everything pending.
    ///
    /// On failure the batch goes back to the front of the log, ahead of
    /// anything appended while the upload was running.
    #[instrument(skip_all)]
    pub async fn flush(&self, uploader: &dyn Uploader) -> Result<IdRewrites, ChangesError> {
        let batch = self.take_pending().await;
        if batch.is_empty() {
            return Ok(IdRewrites::new());
        }

        match uploader.upload(&batch).await {
            Ok(rewrites) => {
                info!(uploaded = batch.len(), rewrites = rewrites.len(), "Uploaded pending changes");
                self.register_id_rewrites(&rewrites).await;
                Ok(rewrites)
            }
            Err(err) => {
                warn!(error = %err, count = batch.len(), "Upload failed, changes kept");
                let mut pending = self.pending.lock().await;
                let newer = std::mem::replace(&mut *pending, batch);
                pending.extend(newer);
                Err(err.into())
            }
        }
    }
}
