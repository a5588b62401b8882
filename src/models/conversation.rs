use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::identity::UserProfile;
use crate::models::message::MessageType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    Direct,
    Group,
}

/// Participant display info frozen into the conversation at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub name: String,
    pub email: String,
    pub photo_url: Option<String>,
}

impl From<&UserProfile> for ParticipantInfo {
    fn from(profile: &UserProfile) -> Self {
        Self {
            name: profile.display_name.clone(),
            email: profile.email.clone(),
            photo_url: profile.photo_url.clone(),
        }
    }
}

/// Denormalized summary of the newest message, kept on the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub sender_id: String,
    pub sender_name: String,
    pub message_type: MessageType,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    pub id: String,
    pub conversation_type: ConversationType,
    /// Sorted for direct conversations.
    pub participants: Vec<String>,
    /// Canonical unordered-pair key; the system-wide uniqueness key for
    /// direct conversations.
    pub pair_key: Option<String>,
    pub participant_info: HashMap<String, ParticipantInfo>,
    pub last_message: Option<LastMessage>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Canonical key for an unordered participant pair.
    pub fn direct_pair_key(a: &str, b: &str) -> String {
        let mut pair = [a, b];
        pair.sort_unstable();
        format!("{}#{}", pair[0], pair[1])
    }

    /// Builds a new direct conversation between `creator` and `other`,
    /// freezing both participant snapshots.
    pub fn direct(creator: &UserProfile, other: &UserProfile) -> Self {
        let mut participants = vec![creator.id.clone(), other.id.clone()];
        participants.sort_unstable();
        let mut participant_info = HashMap::new();
        participant_info.insert(creator.id.clone(), ParticipantInfo::from(creator));
        participant_info.insert(other.id.clone(), ParticipantInfo::from(other));
        let now = Utc::now();
        Self {
            id: String::new(),
            conversation_type: ConversationType::Direct,
            pair_key: Some(Self::direct_pair_key(&creator.id, &other.id)),
            participants,
            participant_info,
            last_message: None,
            created_by: creator.id.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// For a direct conversation, the counterpart of `user_id` and its frozen
    /// display info. `None` for group conversations or unknown users.
    pub fn other_participant(&self, user_id: &str) -> Option<(&str, &ParticipantInfo)> {
        if self.conversation_type != ConversationType::Direct {
            return None;
        }
        self.participants
            .iter()
            .find(|p| p.as_str() != user_id)
            .and_then(|other| {
                self.participant_info
                    .get(other)
                    .map(|info| (other.as_str(), info))
            })
    }
}
