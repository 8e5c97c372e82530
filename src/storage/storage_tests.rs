use crate::analytics::ClientProfile;
use crate::models::Visit;
use crate::storage::{SqliteStorage, Storage, StorageError};
use std::sync::Arc;

async fn setup_sqlite() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

fn visit(clicked_at: i64, user_agent: &str) -> Visit {
    Visit {
        clicked_at,
        user_agent: Some(user_agent.to_string()),
        ip_address: Some("203.0.113.9".to_string()),
        referer: None,
        client: ClientProfile::from_user_agent(user_agent),
    }
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let storage = setup_sqlite().await;
    storage.create_account("a@example.com", "hash").await.unwrap();

    let err = storage
        .create_account("a@example.com", "other")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::DuplicateEmail));
}

#[tokio::test]
async fn test_duplicate_short_code_is_rejected() {
    let storage = setup_sqlite().await;
    let account = storage.create_account("a@example.com", "hash").await.unwrap();

    storage
        .create_link("abc1234", "https://example.com/1", account.id)
        .await
        .unwrap();
    let err = storage
        .create_link("abc1234", "https://example.com/2", account.id)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::DuplicateShortCode));

    // The first mapping is untouched
    let link = storage.get_link("abc1234").await.unwrap().unwrap();
    assert_eq!(link.original_url, "https://example.com/1");
}

#[tokio::test]
async fn test_record_click_appends_in_order() {
    let storage = setup_sqlite().await;
    let account = storage.create_account("a@example.com", "hash").await.unwrap();
    storage
        .create_link("clicky1", "https://example.com", account.id)
        .await
        .unwrap();

    for i in 0..3 {
        let target = storage
            .record_click("clicky1", &visit(1_000 + i, &format!("agent-{i}")))
            .await
            .unwrap();
        assert_eq!(target.as_deref(), Some("https://example.com"));
    }

    let link = storage.get_link("clicky1").await.unwrap().unwrap();
    assert_eq!(link.clicks, 3);
    assert_eq!(link.click_details.len(), 3);
    let agents: Vec<_> = link
        .click_details
        .iter()
        .map(|c| c.user_agent.clone().unwrap())
        .collect();
    assert_eq!(agents, vec!["agent-0", "agent-1", "agent-2"]);
    assert_eq!(link.click_details[0].clicked_at, 1_000);
}

#[tokio::test]
async fn test_record_click_unknown_code() {
    let storage = setup_sqlite().await;
    let target = storage
        .record_click("missing", &visit(1, "curl/8.0"))
        .await
        .unwrap();
    assert!(target.is_none());
}

#[tokio::test]
async fn test_delete_is_scoped_to_owner() {
    let storage = setup_sqlite().await;
    let owner = storage.create_account("owner@example.com", "hash").await.unwrap();
    let other = storage.create_account("other@example.com", "hash").await.unwrap();
    let link = storage
        .create_link("owned12", "https://example.com", owner.id)
        .await
        .unwrap();
    storage
        .record_click("owned12", &visit(1, "curl/8.0"))
        .await
        .unwrap();

    assert!(!storage.delete_link(link.id, other.id).await.unwrap());
    assert!(storage.get_link("owned12").await.unwrap().is_some());

    assert!(storage.delete_link(link.id, owner.id).await.unwrap());
    assert!(storage.get_link("owned12").await.unwrap().is_none());

    // Click rows went with the link, so a new link reusing the code starts clean
    let again = storage
        .create_link("owned12", "https://example.org", owner.id)
        .await
        .unwrap();
    let fetched = storage.get_link("owned12").await.unwrap().unwrap();
    assert_eq!(fetched.id, again.id);
    assert!(fetched.click_details.is_empty());
    assert_eq!(fetched.clicks, 0);
}

#[tokio::test]
async fn test_list_links_is_per_owner_and_filters_by_creation() {
    let storage = setup_sqlite().await;
    let owner = storage.create_account("owner@example.com", "hash").await.unwrap();
    let other = storage.create_account("other@example.com", "hash").await.unwrap();

    storage
        .create_link("first01", "https://example.com/1", owner.id)
        .await
        .unwrap();
    storage
        .create_link("second2", "https://example.com/2", owner.id)
        .await
        .unwrap();
    storage
        .create_link("theirs1", "https://example.com/3", other.id)
        .await
        .unwrap();
    storage
        .record_click("second2", &visit(5, "curl/8.0"))
        .await
        .unwrap();

    let links = storage.list_links(owner.id, None).await.unwrap();
    assert_eq!(links.len(), 2);
    // Newest first
    assert_eq!(links[0].short_code, "second2");
    assert_eq!(links[0].click_details.len(), 1);
    assert!(links[1].click_details.is_empty());

    let future = chrono::Utc::now().timestamp() + 3600;
    assert!(storage
        .list_links(owner.id, Some(future))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(storage.list_links(owner.id, Some(0)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_refresh_rotation_is_compare_and_swap() {
    let storage = setup_sqlite().await;
    let account = storage.create_account("a@example.com", "hash").await.unwrap();
    storage
        .set_refresh_token(account.id, Some("fp-1"))
        .await
        .unwrap();

    assert!(storage
        .rotate_refresh_token(account.id, "fp-1", "fp-2")
        .await
        .unwrap());
    // Replaying the old fingerprint loses
    assert!(!storage
        .rotate_refresh_token(account.id, "fp-1", "fp-3")
        .await
        .unwrap());

    let found = storage
        .find_account_by_refresh_token("fp-2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, account.id);
    assert!(storage
        .find_account_by_refresh_token("fp-1")
        .await
        .unwrap()
        .is_none());

    assert!(storage.clear_refresh_token("fp-2").await.unwrap());
    assert!(!storage.clear_refresh_token("fp-2").await.unwrap());
    let account = storage.get_account(account.id).await.unwrap().unwrap();
    assert!(account.refresh_token_hash.is_none());
}

#[tokio::test]
async fn test_update_account_rejects_taken_email() {
    let storage = setup_sqlite().await;
    let first = storage.create_account("first@example.com", "hash").await.unwrap();
    storage.create_account("second@example.com", "hash").await.unwrap();

    let err = storage
        .update_account(first.id, Some("second@example.com"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::DuplicateEmail));

    assert!(storage
        .update_account(first.id, None, Some("new-hash"))
        .await
        .unwrap());
    let updated = storage.get_account(first.id).await.unwrap().unwrap();
    assert_eq!(updated.email, "first@example.com");
    assert_eq!(updated.password_hash, "new-hash");
}

#[tokio::test]
async fn test_list_accounts_summarizes_links_and_sessions() {
    let storage = setup_sqlite().await;
    let busy = storage.create_account("busy@example.com", "hash").await.unwrap();
    storage.create_account("idle@example.com", "hash").await.unwrap();
    storage
        .create_link("busy001", "https://example.com/1", busy.id)
        .await
        .unwrap();
    storage
        .create_link("busy002", "https://example.com/2", busy.id)
        .await
        .unwrap();
    storage.set_refresh_token(busy.id, Some("fp")).await.unwrap();

    let accounts = storage.list_accounts().await.unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].email, "busy@example.com");
    assert_eq!(accounts[0].link_count, 2);
    assert!(accounts[0].has_session);
    assert_eq!(accounts[1].link_count, 0);
    assert!(!accounts[1].has_session);
}
