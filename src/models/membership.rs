use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::conversation::ConversationType;

/// Per-user inbox entry for one conversation.
///
/// A best-effort denormalization maintained by fan-out; it can transiently
/// lag the conversation/message truth and is repaired by the next fan-out.
/// The record's document id is the conversation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipProjection {
    pub conversation_id: String,
    pub conversation_type: ConversationType,
    /// For direct conversations: the other participant's name.
    pub title: String,
    pub subtitle: Option<String>,
    pub photo_url: Option<String>,
    pub last_message: Option<String>,
    pub last_message_sender_id: Option<String>,
    pub last_message_sender_name: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unread_count: i64,
    pub last_read_at: Option<DateTime<Utc>>,
    /// Absent when the record was first materialized by a repair upsert
    /// rather than the creation-time bootstrap.
    pub joined_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl MembershipProjection {
    /// Unread counter clamped to zero; concurrent merge writes can never make
    /// it meaningfully negative, but the projection is not trusted blindly.
    pub fn unread(&self) -> i64 {
        self.unread_count.max(0)
    }
}
