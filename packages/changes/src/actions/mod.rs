//! # Change Actions
//!
//! An action is a user intent ("add a bench here", "mark this shop as
//! closed") that turns into zero or more [`ChangeDescription`]s.
//!
//! Actions only describe changes. They read the session (ids, the point
//! registry, configuration) and hand their descriptions back to
//! [`PendingChangeSet::apply_action`], which appends them to the log.

mod change_tag;
mod create_new_node;

pub use change_tag::ChangeTagAction;
pub use create_new_node::{CreateNewNodeAction, CreateNodeOptions};

use crate::change_description::ChangeDescription;
use crate::changes::PendingChangeSet;
use crate::errors::ActionError;
use async_trait::async_trait;

#[async_trait]
pub trait ChangeAction: Send + Sync {
    /// Describe the changes this action makes, in upload order.
    ///
    /// On error nothing may be appended to the log.
    async fn create_change_descriptions(
        &mut self,
        changes: &PendingChangeSet,
    ) -> Result<Vec<ChangeDescription>, ActionError>;
}
