//! Fan-out of canonical writes into the per-user inbox projections.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{Conversation, Message};
use crate::store::{DocumentStore, FieldOp};

/// Outcome of one fan-out pass. Every write is an independent failure
/// domain: a failed participant is recorded here and logged, never
/// propagated. Callers on the primary path are free to ignore the report.
#[derive(Debug, Clone)]
pub struct FanoutReport {
    pub attempted: usize,
    pub failed: Vec<String>,
    pub summary_updated: bool,
}

impl FanoutReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.summary_updated
    }

    /// For callers that want an incomplete fan-out to surface as an error.
    pub fn into_result(self) -> AppResult<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(AppError::PartialFanout {
                failed: self.failed.len(),
            })
        }
    }
}

pub struct FanoutCoordinator {
    store: Arc<dyn DocumentStore>,
    config: Arc<Config>,
}

impl FanoutCoordinator {
    pub fn new(store: Arc<dyn DocumentStore>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    /// Seeds one inbox record per participant of a freshly created
    /// conversation. Each participant is attempted independently; a failure
    /// is logged and left for the next message fan-out to repair.
    pub async fn bootstrap_memberships(&self, conversation: &Conversation) -> FanoutReport {
        let mut report = FanoutReport {
            attempted: conversation.participants.len(),
            failed: Vec::new(),
            summary_updated: true,
        };
        for participant in &conversation.participants {
            if let Err(e) = self.seed_membership(conversation, participant).await {
                warn!(
                    participant = %participant,
                    conversation_id = %conversation.id,
                    error = %e,
                    "membership bootstrap failed"
                );
                report.failed.push(participant.clone());
            }
        }
        report
    }

    /// Propagates a freshly appended message: updates the conversation's
    /// last-message summary, then merge-upserts every participant's inbox
    /// record, bumping the unread counter for everyone but the sender.
    pub async fn on_message_appended(
        &self,
        conversation: &Conversation,
        message: &Message,
    ) -> FanoutReport {
        let mut report = FanoutReport {
            attempted: conversation.participants.len(),
            failed: Vec::new(),
            summary_updated: true,
        };

        if let Err(e) = self.update_summary(conversation, message).await {
            warn!(
                conversation_id = %conversation.id,
                error = %e,
                "conversation summary update failed"
            );
            report.summary_updated = false;
        }

        for participant in &conversation.participants {
            if let Err(e) = self.upsert_membership(conversation, participant, message).await {
                warn!(
                    participant = %participant,
                    conversation_id = %conversation.id,
                    message_id = %message.id,
                    error = %e,
                    "membership fan-out failed"
                );
                report.failed.push(participant.clone());
            }
        }
        report
    }

    async fn update_summary(
        &self,
        conversation: &Conversation,
        message: &Message,
    ) -> AppResult<()> {
        let summary = crate::models::LastMessage {
            content: message.content.clone(),
            sender_id: message.sender_id.clone(),
            sender_name: message.sender_name.clone(),
            message_type: message.message_type,
            sent_at: message.created_at,
        };
        let ops = vec![
            set("last_message", &summary)?,
            set("updated_at", &Utc::now())?,
        ];
        self.store
            .update(&self.config.conversations_collection, &conversation.id, ops)
            .await
    }

    async fn seed_membership(
        &self,
        conversation: &Conversation,
        participant: &str,
    ) -> AppResult<()> {
        let now = Utc::now();
        let mut ops = vec![
            set("conversation_id", &conversation.id)?,
            set("conversation_type", &conversation.conversation_type)?,
            ("unread_count".to_string(), FieldOp::Set(Value::from(0))),
            set("joined_at", &now)?,
            set("updated_at", &now)?,
        ];
        ops.extend(self.display_ops(conversation, participant, None)?);
        self.store
            .update(
                &self.config.inbox_collection(participant),
                &conversation.id,
                ops,
            )
            .await
    }

    async fn upsert_membership(
        &self,
        conversation: &Conversation,
        participant: &str,
        message: &Message,
    ) -> AppResult<()> {
        let mut ops = vec![
            set("conversation_id", &conversation.id)?,
            set("conversation_type", &conversation.conversation_type)?,
            set("last_message", &message.content)?,
            set("last_message_sender_id", &message.sender_id)?,
            set("last_message_sender_name", &message.sender_name)?,
            set("last_message_at", &message.created_at)?,
            set("updated_at", &Utc::now())?,
        ];
        ops.extend(self.display_ops(conversation, participant, Some(message))?);
        if participant != message.sender_id {
            ops.push(("unread_count".to_string(), FieldOp::Increment(1)));
        }
        self.store
            .update(
                &self.config.inbox_collection(participant),
                &conversation.id,
                ops,
            )
            .await
    }

    /// Direct-chat display fields, recomputed at every upsert. When the
    /// counterpart is the message sender, the message carries their current
    /// name and photo, so a profile change reaches the recipient's inbox on
    /// the next exchange instead of staying frozen at creation time.
    fn display_ops(
        &self,
        conversation: &Conversation,
        participant: &str,
        message: Option<&Message>,
    ) -> AppResult<Vec<(String, FieldOp)>> {
        let mut ops = Vec::new();
        if let Some((other_id, info)) = conversation.other_participant(participant) {
            match message.filter(|m| m.sender_id == other_id) {
                Some(m) => {
                    ops.push(set("title", &m.sender_name)?);
                    ops.push(set("photo_url", &m.sender_photo_url)?);
                }
                None => {
                    ops.push(set("title", &info.name)?);
                    ops.push(set("photo_url", &info.photo_url)?);
                }
            }
            ops.push(set("subtitle", &info.email)?);
        }
        Ok(ops)
    }
}

fn set<T: Serialize>(field: &str, value: &T) -> AppResult<(String, FieldOp)> {
    Ok((
        field.to_string(),
        FieldOp::Set(serde_json::to_value(value)?),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_report_converts_to_ok() {
        let report = FanoutReport {
            attempted: 2,
            failed: Vec::new(),
            summary_updated: true,
        };
        assert!(report.is_complete());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn failed_participant_converts_to_partial_fanout() {
        let report = FanoutReport {
            attempted: 2,
            failed: vec!["bob".into()],
            summary_updated: true,
        };
        assert!(!report.is_complete());
        assert!(matches!(
            report.into_result(),
            Err(AppError::PartialFanout { failed: 1 })
        ));
    }
}
