use dotenvy::dotenv;
use std::env;

/// Collection layout for the document store.
///
/// Messages live in a per-conversation subcollection; inbox entries live in a
/// per-user subcollection keyed by conversation id.
#[derive(Debug, Clone)]
pub struct Config {
    pub users_collection: String,
    pub conversations_collection: String,
    pub messages_subcollection: String,
    pub inbox_subcollection: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            users_collection: "users".into(),
            conversations_collection: "conversations".into(),
            messages_subcollection: "messages".into(),
            inbox_subcollection: "inbox".into(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let defaults = Config::default();
        Ok(Self {
            users_collection: env::var("CHAT_USERS_COLLECTION")
                .unwrap_or(defaults.users_collection),
            conversations_collection: env::var("CHAT_CONVERSATIONS_COLLECTION")
                .unwrap_or(defaults.conversations_collection),
            messages_subcollection: env::var("CHAT_MESSAGES_SUBCOLLECTION")
                .unwrap_or(defaults.messages_subcollection),
            inbox_subcollection: env::var("CHAT_INBOX_SUBCOLLECTION")
                .unwrap_or(defaults.inbox_subcollection),
        })
    }

    /// Path of the ordered message log for one conversation.
    pub fn messages_collection(&self, conversation_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.conversations_collection, conversation_id, self.messages_subcollection
        )
    }

    /// Path of one user's inbox projection collection.
    pub fn inbox_collection(&self, user_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.users_collection, user_id, self.inbox_subcollection
        )
    }
}
