mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn exact_grant_allows_only_itself() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, token) = t.user_with("exact@example.com", &["prestasi.siswa.provinsi.create"]).await?;

    assert!(t.check(&token, &["prestasi.siswa.provinsi.create"]).await?);
    assert!(!t.check(&token, &["prestasi.siswa.nasional.create"]).await?);
    assert!(!t.check(&token, &["prestasi.siswa.provinsi.edit"]).await?);

    Ok(())
}

#[tokio::test]
async fn family_grant_covers_its_subtree() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, token) = t.user_with("family@example.com", &["prestasi.siswa.*", "users.*"]).await?;

    assert!(t.check(&token, &["prestasi.siswa.nasional.delete"]).await?);
    assert!(t.check(&token, &["prestasi.siswa"]).await?);
    assert!(t.check(&token, &["users.view"]).await?);
    assert!(!t.check(&token, &["prestasi.guru.nasional.delete"]).await?);
    assert!(!t.check(&token, &["permissions.view"]).await?);

    Ok(())
}

#[tokio::test]
async fn no_grants_deny_everything() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, token) = t.user_with("empty@example.com", &[]).await?;

    assert!(!t.check(&token, &["anything.at.all"]).await?);
    assert!(!t.check(&token, &["users.view"]).await?);

    Ok(())
}

#[tokio::test]
async fn any_of_list_allows_when_one_entry_is_held() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, token) = t.user_with("any@example.com", &["program.jurusan.PPLG.view"]).await?;

    assert!(t.check(&token, &["program.jurusan.TJKT.view", "program.jurusan.PPLG.view"]).await?);
    assert!(!t.check(&token, &["program.jurusan.TJKT.view", "program.jurusan.DKV.view"]).await?);
    assert!(!t.check(&token, &[]).await?);

    Ok(())
}

#[tokio::test]
async fn matching_is_case_sensitive() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, token) = t.user_with("case@example.com", &["program.jurusan.PPLG.view"]).await?;

    assert!(!t.check(&token, &["program.jurusan.pplg.view"]).await?);

    Ok(())
}

#[tokio::test]
async fn blank_requirement_is_denied() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.admin().await?;

    assert!(!t.check(&admin, &[""]).await?);
    assert!(!t.check(&admin, &["   "]).await?);
    assert!(t.check(&admin, &["", "users.view"]).await?);

    Ok(())
}

#[tokio::test]
async fn check_requires_a_token() -> Result<()> {
    let t = TestApp::new().await?;

    let (status, _) = t
        .send("POST", "/authz/check", None, Some(json!({ "permissions": ["users.view"] })))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn study_program_family_is_grantable() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, token) = t.user_with("kaprog@example.com", &["program.jurusan.*"]).await?;

    assert!(t.check(&token, &["program.jurusan.AKL.edit"]).await?);
    assert!(t.check(&token, &["program.jurusan.PPLG.view"]).await?);
    assert!(!t.check(&token, &["program.create"]).await?);

    Ok(())
}

#[tokio::test]
async fn interior_wildcard_does_not_drop_a_segment() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.admin().await?;
    let (_, token) = t.user_with("viewer@example.com", &["users.view"]).await?;

    // the requirement side carries the wildcard here
    assert!(!t.check(&token, &["users.*.view"]).await?);
    assert!(t.check(&admin, &["users.*"]).await?);

    Ok(())
}
