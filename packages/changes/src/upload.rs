use crate::change_description::ChangeDescription;
use crate::errors::UploadError;
use crate::osm_id::IdRewrites;
use async_trait::async_trait;

/// Writes a batch of changes to the map server.
///
/// The batch is applied in order. On success the uploader reports which
/// server id each created placeholder received. Retries are the uploader's
/// own business.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, changes: &[ChangeDescription]) -> Result<IdRewrites, UploadError>;
}
