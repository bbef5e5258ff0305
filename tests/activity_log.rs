mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;
use sekolah_authz::events::chain_hash;

#[tokio::test]
async fn grant_changes_are_recorded_in_a_hash_chain() -> Result<()> {
    let t = TestApp::new().await?;
    let (admin_id, admin) = t.admin().await?;
    let (user, _) = t.user_with("guru@example.com", &[]).await?;

    let (status, _) = t
        .send("POST", &format!("/users/{user}/permissions"), Some(&admin), Some(json!({ "permission": "users.view" })))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    // the listener writes asynchronously
    let mut logs: Vec<(String, Option<i64>, Option<i64>, String)> = Vec::new();
    for _ in 0..15 {
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

        logs = sqlx::query_as(
            "SELECT event_name, actor_id, subject_id, severity FROM activity_log WHERE event_name = 'grant.added'",
        )
        .fetch_all(&t.pool)
        .await?;

        if !logs.is_empty() {
            break;
        }
    }

    assert_eq!(logs.len(), 1, "activity log should contain grant.added");
    let (_, actor, subject, severity) = &logs[0];
    assert_eq!(*actor, Some(admin_id));
    assert_eq!(*subject, Some(user));
    assert_eq!(severity, "critical");

    let chain: Vec<(String, Option<String>, String)> =
        sqlx::query_as("SELECT payload, prev_hash, hash FROM activity_log ORDER BY seq")
            .fetch_all(&t.pool)
            .await?;
    assert!(chain.len() >= 2, "logins and the grant should all be logged");

    let mut prev: Option<String> = None;
    for (payload, prev_hash, hash) in &chain {
        assert_eq!(prev_hash, &prev);
        assert_eq!(hash, &chain_hash(prev.as_deref(), payload));
        prev = Some(hash.clone());
    }

    Ok(())
}
