mod common;

use common::{env_with_users, service_for, wait_for_entry};
use marketplace_messaging::OutgoingMessage;

#[tokio::test]
async fn opening_a_conversation_clears_unread() {
    let env = env_with_users(&[
        ("alice", "Alice", "alice@example.com"),
        ("bob", "Bob", "bob@example.com"),
    ])
    .await;
    let alice = service_for(&env, "alice");
    let bob = service_for(&env, "bob");
    let conv = alice.create_or_get_direct_conversation("bob").await.unwrap();

    alice
        .send_message(&conv, OutgoingMessage::text("hi"))
        .await
        .unwrap();
    wait_for_entry(&env, "bob", &conv, |e| e.unread() == 1).await;

    bob.open_conversation(&conv).await.unwrap();
    let entry = wait_for_entry(&env, "bob", &conv, |e| e.unread() == 0).await;
    assert!(entry.last_read_at.is_some(), "read timestamp advances");
}

#[tokio::test]
async fn unread_stays_zero_while_viewing_own_replies() {
    let env = env_with_users(&[
        ("alice", "Alice", "alice@example.com"),
        ("bob", "Bob", "bob@example.com"),
    ])
    .await;
    let alice = service_for(&env, "alice");
    let bob = service_for(&env, "bob");
    let conv = alice.create_or_get_direct_conversation("bob").await.unwrap();

    alice
        .send_message(&conv, OutgoingMessage::text("hi"))
        .await
        .unwrap();
    bob.open_conversation(&conv).await.unwrap();
    wait_for_entry(&env, "bob", &conv, |e| e.unread() == 0).await;

    bob.send_message(&conv, OutgoingMessage::text("hey"))
        .await
        .unwrap();
    let entry = wait_for_entry(&env, "bob", &conv, |e| e.last_message.as_deref() == Some("hey"))
        .await;
    assert_eq!(entry.unread(), 0, "own reply never counts as unread");

    // The counterpart accrues unread as usual.
    let alice_entry = wait_for_entry(&env, "alice", &conv, |e| e.unread() == 1).await;
    assert_eq!(alice_entry.last_message.as_deref(), Some("hey"));
}

#[tokio::test]
async fn a_message_arriving_mid_view_is_cleared_on_the_next_view() {
    let env = env_with_users(&[
        ("alice", "Alice", "alice@example.com"),
        ("bob", "Bob", "bob@example.com"),
    ])
    .await;
    let alice = service_for(&env, "alice");
    let bob = service_for(&env, "bob");
    let conv = alice.create_or_get_direct_conversation("bob").await.unwrap();

    bob.open_conversation(&conv).await.unwrap();
    wait_for_entry(&env, "bob", &conv, |e| e.last_read_at.is_some()).await;

    // Fan-out may land its increment after the snapshot-triggered reset, so
    // the counter can transiently read 1 here; the next delivered snapshot
    // clears it.
    alice
        .send_message(&conv, OutgoingMessage::text("still there?"))
        .await
        .unwrap();
    wait_for_entry(&env, "bob", &conv, |e| {
        e.last_message.as_deref() == Some("still there?")
    })
    .await;

    bob.open_conversation(&conv).await.unwrap();
    let entry = wait_for_entry(&env, "bob", &conv, |e| e.unread() == 0).await;
    assert_eq!(entry.unread(), 0);
}

#[tokio::test]
async fn viewing_without_an_inbox_entry_leaves_no_skeleton_record() {
    let env = env_with_users(&[
        ("alice", "Alice", "alice@example.com"),
        ("bob", "Bob", "bob@example.com"),
    ])
    .await;
    let alice = service_for(&env, "alice");
    let bob = service_for(&env, "bob");

    // Bob's bootstrap write fails, so he has no inbox entry at all.
    let bob_inbox = env.config.inbox_collection("bob");
    env.store.fail_writes(&bob_inbox, true).await;
    let conv = alice.create_or_get_direct_conversation("bob").await.unwrap();
    env.store.fail_writes(&bob_inbox, false).await;
    assert!(common::inbox_entry(&env, "bob", &conv).await.is_none());

    // Viewing must not upsert a title-less record the inbox cannot render.
    bob.open_conversation(&conv).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(common::inbox_entry(&env, "bob", &conv).await.is_none());

    // The next fan-out creates the entry whole.
    alice
        .send_message(&conv, OutgoingMessage::text("there you are"))
        .await
        .unwrap();
    let entry = wait_for_entry(&env, "bob", &conv, |e| {
        e.last_message.as_deref() == Some("there you are")
    })
    .await;
    assert_eq!(entry.title, "Alice");
}

#[tokio::test]
async fn unread_accrues_again_after_closing() {
    let env = env_with_users(&[
        ("alice", "Alice", "alice@example.com"),
        ("bob", "Bob", "bob@example.com"),
    ])
    .await;
    let alice = service_for(&env, "alice");
    let bob = service_for(&env, "bob");
    let conv = alice.create_or_get_direct_conversation("bob").await.unwrap();

    bob.open_conversation(&conv).await.unwrap();
    wait_for_entry(&env, "bob", &conv, |e| e.last_read_at.is_some()).await;
    bob.close_conversation().await;

    alice
        .send_message(&conv, OutgoingMessage::text("back again"))
        .await
        .unwrap();
    let entry = wait_for_entry(&env, "bob", &conv, |e| e.unread() == 1).await;
    assert_eq!(entry.last_message.as_deref(), Some("back again"));
}
