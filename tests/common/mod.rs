#![allow(dead_code)]

use marketplace_messaging::{
    ChatService, Config, DocumentStore, FieldOp, MembershipProjection, MemoryStore,
    StaticIdentity, StoreUserDirectory,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub config: Arc<Config>,
}

/// Builds a shared in-memory backend seeded with `(id, name, email)` users.
pub async fn env_with_users(users: &[(&str, &str, &str)]) -> TestEnv {
    let store = Arc::new(MemoryStore::new());
    let config = Arc::new(Config::default());
    for (id, name, email) in users {
        store
            .update(
                &config.users_collection,
                id,
                vec![
                    ("display_name".into(), FieldOp::Set(json!(name))),
                    ("email".into(), FieldOp::Set(json!(email))),
                ],
            )
            .await
            .expect("seed user");
    }
    TestEnv { store, config }
}

/// A `ChatService` signed in as `user_id`, sharing the env's backend.
pub fn service_for(env: &TestEnv, user_id: &str) -> ChatService {
    let store: Arc<dyn DocumentStore> = env.store.clone();
    let identity = Arc::new(StaticIdentity::signed_in(user_id));
    let users = Arc::new(StoreUserDirectory::new(
        store.clone(),
        env.config.users_collection.clone(),
    ));
    ChatService::new(store, identity, users, env.config.clone())
}

/// Current inbox entry of `user_id` for `conversation_id`, if any.
pub async fn inbox_entry(
    env: &TestEnv,
    user_id: &str,
    conversation_id: &str,
) -> Option<MembershipProjection> {
    env.store
        .get(&env.config.inbox_collection(user_id), conversation_id)
        .await
        .expect("inbox read")
        .map(|doc| doc.decode().expect("inbox decode"))
}

/// Polls the inbox entry until `pred` holds or the deadline passes.
pub async fn wait_for_entry<F>(
    env: &TestEnv,
    user_id: &str,
    conversation_id: &str,
    mut pred: F,
) -> MembershipProjection
where
    F: FnMut(&MembershipProjection) -> bool,
{
    for _ in 0..100 {
        if let Some(entry) = inbox_entry(env, user_id, conversation_id).await {
            if pred(&entry) {
                return entry;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("inbox entry for {user_id}/{conversation_id} never satisfied the predicate");
}

/// Waits until a watch channel's value satisfies `pred`.
pub async fn wait_for_watch<T, F>(rx: &mut watch::Receiver<T>, mut pred: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    for _ in 0..100 {
        {
            let value = rx.borrow();
            if pred(&*value) {
                return (*value).clone();
            }
        }
        let _ = tokio::time::timeout(Duration::from_millis(50), rx.changed()).await;
    }
    panic!("watched value never satisfied the predicate");
}
