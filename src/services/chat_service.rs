//! Composition root and the API surface the UI layer consumes.

use std::sync::Arc;
use tokio::sync::watch;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::identity::{IdentityProvider, UserDirectory, UserProfile};
use crate::models::{MembershipProjection, Message, OutgoingMessage};
use crate::services::directory::ConversationDirectory;
use crate::services::fanout::FanoutCoordinator;
use crate::services::message_service::MessageService;
use crate::services::read_state::ReadStateTracker;
use crate::store::DocumentStore;
use crate::sync::LiveSyncManager;

/// One per process, explicitly constructed with its collaborators injected;
/// there is no ambient global state.
pub struct ChatService {
    identity: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserDirectory>,
    directory: ConversationDirectory,
    messages: MessageService,
    sync: LiveSyncManager,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserDirectory>,
        config: Arc<Config>,
    ) -> Self {
        let fanout = Arc::new(FanoutCoordinator::new(store.clone(), config.clone()));
        let read_state = Arc::new(ReadStateTracker::new(store.clone(), config.clone()));
        let directory = ConversationDirectory::new(
            store.clone(),
            users.clone(),
            fanout.clone(),
            config.clone(),
        );
        let messages = MessageService::new(store.clone(), fanout, config.clone());
        let sync = LiveSyncManager::new(store, config, read_state);
        Self {
            identity,
            users,
            directory,
            messages,
            sync,
        }
    }

    fn require_user_id(&self) -> AppResult<String> {
        self.identity
            .current_user_id()
            .ok_or(AppError::Unauthenticated)
    }

    async fn require_profile(&self) -> AppResult<UserProfile> {
        let user_id = self.require_user_id()?;
        let mut profile = self
            .users
            .get_user_by_id(&user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        profile.id = user_id;
        Ok(profile)
    }

    /// Resolves the canonical direct conversation with `other_user_id`,
    /// creating it on first contact.
    pub async fn create_or_get_direct_conversation(
        &self,
        other_user_id: &str,
    ) -> AppResult<String> {
        let user_id = self.require_user_id()?;
        self.directory
            .create_or_get_direct_conversation(&user_id, other_user_id)
            .await
    }

    pub async fn send_message(
        &self,
        conversation_id: &str,
        outgoing: OutgoingMessage,
    ) -> AppResult<Message> {
        let sender = self.require_profile().await?;
        self.messages.append(conversation_id, &sender, outgoing).await
    }

    pub async fn history(&self, conversation_id: &str) -> AppResult<Vec<Message>> {
        self.messages.history(conversation_id).await
    }

    /// Starts live inbox delivery for the signed-in user.
    pub async fn start_inbox_sync(&self) -> AppResult<()> {
        let user_id = self.require_user_id()?;
        self.sync.start_inbox(&user_id).await
    }

    /// Opens a conversation for viewing: replaces any previously open one and
    /// begins clearing the viewer's unread state on each delivered snapshot.
    pub async fn open_conversation(&self, conversation_id: &str) -> AppResult<()> {
        let user_id = self.require_user_id()?;
        let conversation = self.messages.conversation(conversation_id).await?;
        if !conversation.is_participant(&user_id) {
            return Err(AppError::Forbidden);
        }
        self.sync.open_conversation(conversation_id, &user_id).await
    }

    pub async fn close_conversation(&self) {
        self.sync.close_conversation().await;
    }

    /// Tears down all live subscriptions and cached lists.
    pub async fn sign_out(&self) {
        self.sync.shutdown().await;
    }

    pub fn inbox_updates(&self) -> watch::Receiver<Vec<MembershipProjection>> {
        self.sync.inbox_updates()
    }

    pub fn conversation_updates(&self) -> watch::Receiver<Vec<Message>> {
        self.sync.conversation_updates()
    }

    pub async fn active_conversation(&self) -> Option<String> {
        self.sync.active_conversation().await
    }
}
