//! Identity and user-profile collaborators.
//!
//! The real app resolves the current principal and profile data from the
//! auth and user services; the messaging core only sees these two seams.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::error::AppResult;
use crate::store::DocumentStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub photo_url: Option<String>,
}

/// Current-principal lookup.
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<String>;
}

/// Process-local identity holder for tests and embedded use.
#[derive(Default)]
pub struct StaticIdentity {
    current: RwLock<Option<String>>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: impl Into<String>) -> Self {
        let identity = Self::new();
        identity.sign_in(user_id);
        identity
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        *self.current.write().expect("identity lock poisoned") = Some(user_id.into());
    }

    pub fn sign_out(&self) {
        *self.current.write().expect("identity lock poisoned") = None;
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.current.read().expect("identity lock poisoned").clone()
    }
}

/// Profile lookup by user id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user_by_id(&self, id: &str) -> AppResult<Option<UserProfile>>;
}

/// `UserDirectory` backed by the document store's users collection.
pub struct StoreUserDirectory {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl StoreUserDirectory {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl UserDirectory for StoreUserDirectory {
    async fn get_user_by_id(&self, id: &str) -> AppResult<Option<UserProfile>> {
        match self.store.get(&self.collection, id).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }
}
