//! Lifecycle management for the two live subscriptions a signed-in session
//! holds: the inbox list and the currently open conversation's message log.

use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{MembershipProjection, Message};
use crate::services::read_state::ReadStateTracker;
use crate::store::{Document, DocumentStore, OrderBy};

/// Owned handle for one forwarding task. Dropping it aborts the task, so a
/// replaced subscription can never deliver to stale consumers.
struct SubscriptionHandle {
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            task: tokio::spawn(fut),
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct ActiveConversation {
    conversation_id: String,
    _handle: SubscriptionHandle,
}

/// Holds at most one inbox subscription and at most one active-conversation
/// subscription; each slot tears down its previous occupant before a new one
/// is installed.
pub struct LiveSyncManager {
    store: Arc<dyn DocumentStore>,
    config: Arc<Config>,
    read_state: Arc<ReadStateTracker>,
    inbox_tx: watch::Sender<Vec<MembershipProjection>>,
    messages_tx: watch::Sender<Vec<Message>>,
    inbox: Mutex<Option<SubscriptionHandle>>,
    active: Mutex<Option<ActiveConversation>>,
}

impl LiveSyncManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: Arc<Config>,
        read_state: Arc<ReadStateTracker>,
    ) -> Self {
        let (inbox_tx, _) = watch::channel(Vec::new());
        let (messages_tx, _) = watch::channel(Vec::new());
        Self {
            store,
            config,
            read_state,
            inbox_tx,
            messages_tx,
            inbox: Mutex::new(None),
            active: Mutex::new(None),
        }
    }

    /// Reactive inbox list, most recent conversation first.
    pub fn inbox_updates(&self) -> watch::Receiver<Vec<MembershipProjection>> {
        self.inbox_tx.subscribe()
    }

    /// Reactive message list of the open conversation, oldest first. Empty
    /// while no conversation is open.
    pub fn conversation_updates(&self) -> watch::Receiver<Vec<Message>> {
        self.messages_tx.subscribe()
    }

    pub async fn active_conversation(&self) -> Option<String> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|a| a.conversation_id.clone())
    }

    /// Starts (or restarts) the inbox subscription for `user_id`.
    pub async fn start_inbox(&self, user_id: &str) -> AppResult<()> {
        let mut slot = self.inbox.lock().await;
        slot.take();

        let mut sub = self
            .store
            .subscribe(
                &self.config.inbox_collection(user_id),
                &[],
                Some(OrderBy::desc("last_message_at")),
            )
            .await?;
        let tx = self.inbox_tx.clone();
        *slot = Some(SubscriptionHandle::spawn(async move {
            while let Some(docs) = sub.next().await {
                tx.send_replace(decode_all(&docs));
            }
        }));
        Ok(())
    }

    /// Opens `conversation_id` for `viewer_id`, replacing any previously open
    /// conversation. Every delivered snapshot also clears the viewer's unread
    /// state, fire-and-forget.
    pub async fn open_conversation(&self, conversation_id: &str, viewer_id: &str) -> AppResult<()> {
        let mut slot = self.active.lock().await;
        // Previous subscription goes down before the new one is installed.
        slot.take();

        let mut sub = self
            .store
            .subscribe(
                &self.config.messages_collection(conversation_id),
                &[],
                Some(OrderBy::asc("created_at")),
            )
            .await?;
        let tx = self.messages_tx.clone();
        let read_state = self.read_state.clone();
        let viewer = viewer_id.to_string();
        let conversation = conversation_id.to_string();
        let handle = SubscriptionHandle::spawn(async move {
            while let Some(docs) = sub.next().await {
                tx.send_replace(decode_all(&docs));
                if let Err(e) = read_state.mark_read(&viewer, &conversation).await {
                    debug!(
                        viewer = %viewer,
                        conversation_id = %conversation,
                        error = %e,
                        "unread reset failed; next view will correct it"
                    );
                }
            }
        });
        *slot = Some(ActiveConversation {
            conversation_id: conversation_id.to_string(),
            _handle: handle,
        });
        Ok(())
    }

    /// Leaves the open conversation and clears the cached message list.
    pub async fn close_conversation(&self) {
        self.active.lock().await.take();
        self.messages_tx.send_replace(Vec::new());
    }

    /// Tears down both subscriptions and clears both cached lists.
    pub async fn shutdown(&self) {
        self.inbox.lock().await.take();
        self.active.lock().await.take();
        self.inbox_tx.send_replace(Vec::new());
        self.messages_tx.send_replace(Vec::new());
    }
}

fn decode_all<T: DeserializeOwned>(docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match doc.decode() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(document_id = %doc.id, error = %e, "skipping undecodable document");
                None
            }
        })
        .collect()
}
