use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;
use crate::store::{DocumentStore, FieldOp};

/// Clears a viewer's unread state when the open conversation delivers a
/// snapshot. Best-effort: callers log failures and move on; the next
/// successful view corrects any miss.
pub struct ReadStateTracker {
    store: Arc<dyn DocumentStore>,
    config: Arc<Config>,
}

impl ReadStateTracker {
    pub fn new(store: Arc<dyn DocumentStore>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    pub async fn mark_read(&self, user_id: &str, conversation_id: &str) -> AppResult<()> {
        let collection = self.config.inbox_collection(user_id);
        // Nothing to reset when the inbox entry is missing (e.g. its bootstrap
        // write failed); upserting here would materialize a skeleton record
        // with no display fields. The next fan-out creates it whole.
        if self.store.get(&collection, conversation_id).await?.is_none() {
            return Ok(());
        }
        let now = serde_json::to_value(Utc::now())?;
        let ops = vec![
            ("unread_count".to_string(), FieldOp::Set(Value::from(0))),
            ("last_read_at".to_string(), FieldOp::Set(now.clone())),
            ("updated_at".to_string(), FieldOp::Set(now)),
        ];
        self.store
            .update(&collection, conversation_id, ops)
            .await
    }
}
