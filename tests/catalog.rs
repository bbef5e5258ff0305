mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn catalog_names_are_validated() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.admin().await?;

    let (status, body) = t
        .send(
            "POST",
            "/permissions",
            Some(&admin),
            Some(json!({ "name": "program.jurusan.TKR.view", "description": "View TKR" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["resource"], "program");

    let (status, _) = t
        .send("POST", "/permissions", Some(&admin), Some(json!({ "name": "program.jurusan.TKR.view" })))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    for bad in ["", "users", "users..view", "users.*.view", "a.b.c.d.e", "users.vi ew", "users.view*"] {
        let (status, body) = t
            .send("POST", "/permissions", Some(&admin), Some(json!({ "name": bad })))
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad:?} accepted: {body}");
    }

    let (status, body) = t
        .send("POST", "/permissions", Some(&admin), Some(json!({ "name": "ekskul.*", "resource": "ekskul" })))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    Ok(())
}

#[tokio::test]
async fn deleting_a_catalog_entry_revokes_it() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.admin().await?;
    let (_, token) = t.user_with("guru@example.com", &["program.jurusan.TJKT.edit"]).await?;

    assert!(t.check(&token, &["program.jurusan.TJKT.edit"]).await?);

    let id = t.permission_id("program.jurusan.TJKT.edit").await?;
    let (status, _) = t.send("DELETE", &format!("/permissions/{id}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(!t.check(&token, &["program.jurusan.TJKT.edit"]).await?);

    let (status, _) = t.send("DELETE", &format!("/permissions/{id}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn catalog_endpoints_need_their_own_permissions() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, token) = t.user_with("users-admin@example.com", &["users.*"]).await?;

    let (status, _) = t.send("GET", "/permissions", Some(&token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, viewer) = t.user_with("viewer@example.com", &["permissions.view"]).await?;
    let (status, body) = t.send("GET", "/permissions", Some(&viewer), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["name"] == "prestasi.siswa.nasional.create"));

    let (status, _) = t
        .send("POST", "/permissions", Some(&viewer), Some(json!({ "name": "ekskul.view" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}
