mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{names, TestApp};

#[tokio::test]
async fn user_endpoints_are_gated_by_permission() -> Result<()> {
    let t = TestApp::new().await?;
    let (viewer, viewer_token) = t.user_with("viewer@example.com", &["users.view"]).await?;

    let (status, body) = t.send("GET", "/users", Some(&viewer_token), None).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body) = t.send("GET", &format!("/users/{viewer}"), Some(&viewer_token), None).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(names(&body["permissions"]), vec!["users.view"]);

    // authenticated but not permitted is 403, not 401
    let (status, body) = t
        .send(
            "POST",
            "/users",
            Some(&viewer_token),
            Some(json!({ "name": "X", "email": "x@example.com", "password": "password123", "role": "teacher" })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = t
        .send("PUT", &format!("/users/{viewer}/permissions"), Some(&viewer_token), Some(json!({ "permissions": ["users.*"] })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.send("GET", "/users", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn created_user_gets_role_defaults_or_explicit_list() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.admin().await?;

    let (status, body) = t
        .send(
            "POST",
            "/users",
            Some(&admin),
            Some(json!({ "name": "Guru", "email": "guru@example.com", "password": "password123", "role": "teacher" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert!(names(&body["permissions"]).contains(&"prestasi.siswa.*".to_string()));

    let (status, body) = t
        .send(
            "POST",
            "/users",
            Some(&admin),
            Some(json!({
                "name": "Kepsek",
                "email": "kepsek@example.com",
                "password": "password123",
                "role": "principal",
                "permissions": ["users.view"]
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(names(&body["permissions"]), vec!["users.view"]);

    let (status, _) = t
        .send(
            "POST",
            "/users",
            Some(&admin),
            Some(json!({ "name": "Dup", "email": "guru@example.com", "password": "password123", "role": "teacher" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = t
        .send(
            "POST",
            "/users",
            Some(&admin),
            Some(json!({
                "name": "Typo",
                "email": "typo@example.com",
                "password": "password123",
                "role": "teacher",
                "permissions": ["users.veiw"]
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn grant_and_revoke_take_effect_on_the_next_request() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.admin().await?;
    let (user, token) = t.user_with("guru@example.com", &[]).await?;

    assert!(!t.check(&token, &["prestasi.guru.nasional.create"]).await?);

    let (status, body) = t
        .send("POST", &format!("/users/{user}/permissions"), Some(&admin), Some(json!({ "permission": "prestasi.guru.*" })))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["name"], "prestasi.guru.*");

    assert!(t.check(&token, &["prestasi.guru.nasional.create"]).await?);

    // granting twice is harmless
    let (status, _) = t
        .send("POST", &format!("/users/{user}/permissions"), Some(&admin), Some(json!({ "permission": "prestasi.guru.*" })))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = t.send("GET", &format!("/users/{user}/permissions"), Some(&admin), None).await?;
    assert_eq!(names(&body), vec!["prestasi.guru.*"]);

    let permission_id = t.permission_id("prestasi.guru.*").await?;
    let (status, _) = t
        .send("DELETE", &format!("/users/{user}/permissions/{permission_id}"), Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(!t.check(&token, &["prestasi.guru.nasional.create"]).await?);

    let (status, _) = t
        .send("DELETE", &format!("/users/{user}/permissions/{permission_id}"), Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .send("POST", &format!("/users/{user}/permissions"), Some(&admin), Some(json!({ "permission": "not.in.catalog" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .send("POST", "/users/9999/permissions", Some(&admin), Some(json!({ "permission": "users.view" })))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn bulk_replace_is_all_or_nothing() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.admin().await?;
    let (user, token) = t.user_with("guru@example.com", &["users.view"]).await?;

    let uri = format!("/users/{user}/permissions");

    let (status, body) = t
        .send("PUT", &uri, Some(&admin), Some(json!({ "permissions": ["prestasi.siswa.*", "program.jurusan.DKV.view"] })))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    // listed in name order
    assert_eq!(names(&body), vec!["prestasi.siswa.*", "program.jurusan.DKV.view"]);

    assert!(!t.check(&token, &["users.view"]).await?);
    assert!(t.check(&token, &["prestasi.siswa.kabupaten.edit"]).await?);

    // one unknown name rejects the whole list
    let (status, _) = t
        .send("PUT", &uri, Some(&admin), Some(json!({ "permissions": ["users.*", "users.teleport"] })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!t.check(&token, &["users.view"]).await?);
    assert!(t.check(&token, &["prestasi.siswa.kabupaten.edit"]).await?);

    let (status, body) = t.send("PUT", &uri, Some(&admin), Some(json!({ "permissions": [] }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(names(&body).is_empty());
    assert!(!t.check(&token, &["prestasi.siswa.kabupaten.edit"]).await?);

    Ok(())
}

#[tokio::test]
async fn role_change_leaves_grants_alone() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.admin().await?;
    let (user, token) = t.user_with("guru@example.com", &["program.jurusan.AKL.view"]).await?;

    let (status, body) = t
        .send("PUT", &format!("/users/{user}"), Some(&admin), Some(json!({ "role": "admin", "name": "Promoted" })))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["user"]["name"], "Promoted");
    assert_eq!(names(&body["permissions"]), vec!["program.jurusan.AKL.view"]);

    assert!(!t.check(&token, &["users.view"]).await?);
    assert!(t.check(&token, &["program.jurusan.AKL.view"]).await?);

    // an explicit list on update replaces grants
    let (status, body) = t
        .send("PUT", &format!("/users/{user}"), Some(&admin), Some(json!({ "permissions": ["users.*"] })))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(t.check(&token, &["users.delete"]).await?);
    assert!(!t.check(&token, &["program.jurusan.AKL.view"]).await?);

    Ok(())
}

#[tokio::test]
async fn admin_cannot_delete_own_account() -> Result<()> {
    let t = TestApp::new().await?;
    let (admin_id, admin) = t.admin().await?;

    let (status, _) = t.send("DELETE", &format!("/users/{admin_id}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t.send("DELETE", "/users/9999", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}
