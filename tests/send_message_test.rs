mod common;

use common::{env_with_users, service_for};
use marketplace_messaging::{AppError, OutgoingMessage};

#[tokio::test]
async fn empty_text_is_rejected() {
    let env = env_with_users(&[
        ("alice", "Alice", "alice@example.com"),
        ("bob", "Bob", "bob@example.com"),
    ])
    .await;
    let alice = service_for(&env, "alice");
    let conv = alice.create_or_get_direct_conversation("bob").await.unwrap();

    let err = alice
        .send_message(&conv, OutgoingMessage::text("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(alice.history(&conv).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_conversation_is_not_found() {
    let env = env_with_users(&[("alice", "Alice", "alice@example.com")]).await;
    let alice = service_for(&env, "alice");

    let err = alice
        .send_message("no-such-conversation", OutgoingMessage::text("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn non_participants_cannot_post() {
    let env = env_with_users(&[
        ("alice", "Alice", "alice@example.com"),
        ("bob", "Bob", "bob@example.com"),
        ("mallory", "Mallory", "mallory@example.com"),
    ])
    .await;
    let alice = service_for(&env, "alice");
    let mallory = service_for(&env, "mallory");
    let conv = alice.create_or_get_direct_conversation("bob").await.unwrap();

    let err = mallory
        .send_message(&conv, OutgoingMessage::text("let me in"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = mallory.open_conversation(&conv).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[tokio::test]
async fn messages_carry_denormalized_sender_info() {
    let env = env_with_users(&[
        ("alice", "Alice", "alice@example.com"),
        ("bob", "Bob", "bob@example.com"),
    ])
    .await;
    let alice = service_for(&env, "alice");
    let conv = alice.create_or_get_direct_conversation("bob").await.unwrap();

    let sent = alice
        .send_message(&conv, OutgoingMessage::text("hello"))
        .await
        .unwrap();
    assert_eq!(sent.sender_id, "alice");
    assert_eq!(sent.sender_name, "Alice");
    assert!(!sent.id.is_empty(), "store assigns the message id");
    assert_eq!(sent.conversation_id, conv);
}
