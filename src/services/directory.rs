use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::identity::UserDirectory;
use crate::models::Conversation;
use crate::services::fanout::FanoutCoordinator;
use crate::store::{to_fields, DocumentStore, Filter, OrderBy};

/// Resolves a pair of users to their single canonical direct conversation,
/// creating one on first contact.
pub struct ConversationDirectory {
    store: Arc<dyn DocumentStore>,
    users: Arc<dyn UserDirectory>,
    fanout: Arc<FanoutCoordinator>,
    config: Arc<Config>,
}

impl ConversationDirectory {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        users: Arc<dyn UserDirectory>,
        fanout: Arc<FanoutCoordinator>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            users,
            fanout,
            config,
        }
    }

    /// Idempotent in either argument order: repeated calls for the same pair
    /// return the same conversation id.
    ///
    /// Two callers racing past the lookup for the same pair can both create a
    /// conversation. Accepted relaxation: there is no lock, either record
    /// stays usable, and the inboxes converge on whichever one carries the
    /// next message.
    pub async fn create_or_get_direct_conversation(
        &self,
        current_user_id: &str,
        other_user_id: &str,
    ) -> AppResult<String> {
        if current_user_id == other_user_id {
            return Err(AppError::BadRequest(
                "cannot open a direct conversation with yourself".into(),
            ));
        }
        let me = self
            .users
            .get_user_by_id(current_user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let other = self
            .users
            .get_user_by_id(other_user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let pair_key = Conversation::direct_pair_key(current_user_id, other_user_id);
        let existing = self
            .store
            .query(
                &self.config.conversations_collection,
                &[Filter::eq("pair_key", pair_key)],
                Some(OrderBy::asc("created_at")),
            )
            .await?;
        if let Some(doc) = existing.first() {
            return Ok(doc.id.clone());
        }

        let mut conversation = Conversation::direct(&me, &other);
        let fields = to_fields(&conversation)?;
        let id = self
            .store
            .create(&self.config.conversations_collection, fields)
            .await?;
        conversation.id = id.clone();
        info!(conversation_id = %id, "created direct conversation");

        // Membership seeding is best-effort; the conversation record is the
        // source of truth and the next fan-out recreates a missing inbox entry.
        let report = self.fanout.bootstrap_memberships(&conversation).await;
        if !report.is_complete() {
            warn!(
                conversation_id = %id,
                failed = report.failed.len(),
                "membership bootstrap incomplete"
            );
        }
        Ok(id)
    }
}
