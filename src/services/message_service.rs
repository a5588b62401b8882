use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::identity::UserProfile;
use crate::models::{Conversation, Message, MessageType, OutgoingMessage};
use crate::services::fanout::FanoutCoordinator;
use crate::store::{to_fields, DocumentStore, OrderBy};

/// Append and read access to per-conversation message logs.
pub struct MessageService {
    store: Arc<dyn DocumentStore>,
    fanout: Arc<FanoutCoordinator>,
    config: Arc<Config>,
}

impl MessageService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        fanout: Arc<FanoutCoordinator>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            fanout,
            config,
        }
    }

    pub async fn conversation(&self, conversation_id: &str) -> AppResult<Conversation> {
        self.store
            .get(&self.config.conversations_collection, conversation_id)
            .await?
            .ok_or(AppError::NotFound)?
            .decode()
    }

    /// Appends a message to the conversation's log and fans it out to every
    /// participant's inbox. The append is the primary write; once it has
    /// succeeded, fan-out failures are logged but do not fail the send.
    pub async fn append(
        &self,
        conversation_id: &str,
        sender: &UserProfile,
        outgoing: OutgoingMessage,
    ) -> AppResult<Message> {
        let conversation = self.conversation(conversation_id).await?;
        if !conversation.is_participant(&sender.id) {
            return Err(AppError::Forbidden);
        }
        if outgoing.message_type == MessageType::Text && outgoing.content.trim().is_empty() {
            return Err(AppError::BadRequest("message content cannot be empty".into()));
        }

        let now = Utc::now();
        let mut message = Message {
            id: String::new(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender.id.clone(),
            sender_name: sender.display_name.clone(),
            sender_photo_url: sender.photo_url.clone(),
            content: outgoing.content,
            message_type: outgoing.message_type,
            reply_to: outgoing.reply_to,
            attachments: outgoing.attachments,
            created_at: now,
            updated_at: now,
        };
        let fields = to_fields(&message)?;
        let id = self
            .store
            .create(&self.config.messages_collection(conversation_id), fields)
            .await?;
        message.id = id;

        let report = self.fanout.on_message_appended(&conversation, &message).await;
        if report.is_complete() {
            debug!(
                message_id = %message.id,
                conversation_id = %conversation_id,
                "message fanned out to {} participant(s)",
                report.attempted
            );
        } else {
            warn!(
                message_id = %message.id,
                conversation_id = %conversation_id,
                failed = report.failed.len(),
                "message stored with incomplete fan-out"
            );
        }
        Ok(message)
    }

    /// Point-in-time ordered history, oldest first.
    pub async fn history(&self, conversation_id: &str) -> AppResult<Vec<Message>> {
        let docs = self
            .store
            .query(
                &self.config.messages_collection(conversation_id),
                &[],
                Some(OrderBy::asc("created_at")),
            )
            .await?;
        docs.iter().map(|doc| doc.decode()).collect()
    }
}
