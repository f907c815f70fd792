#![allow(clippy::unwrap_used)]
//! Policy selection, ticket sign-in and API token management.

use salvo::http::StatusCode;
use serde_json::json;

use arbor_service::auth::password::hash_password;
use arbor_test::{TestApp, TestRequest};

#[test_log::test(tokio::test)]
async fn token_header_selects_token_policy() {
    let app = TestApp::new();
    let alice = app.user("alice", &[]).await;

    let body = TestRequest::get("/app/whoami")
        .token(&alice.token)
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["policy"], "token");
    assert_eq!(body["user"]["user"]["user_name"], "alice");
    assert!(body["user"]["user"].get("password_hash").is_none());
}

#[test_log::test(tokio::test)]
async fn missing_header_falls_back_to_ticket_policy() {
    let app = TestApp::new();

    let body = TestRequest::get("/app/whoami")
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["policy"], "ticket");
    assert!(body["user"].is_null());

    let forged = TestRequest::get("/app/whoami")
        .token("no-such-token")
        .send(&app.service)
        .await
        .json();
    assert_eq!(forged["policy"], "token");
    assert!(forged["user"].is_null());
}

#[test_log::test(tokio::test)]
async fn sign_in_issues_a_ticket_that_authenticates() {
    let app = TestApp::new();
    let hash = hash_password("correct horse").unwrap();
    app.seed(|s| {
        let bob = s.add_user("bob", "bob@example.com", &hash);
        let staff = s.add_group("staff");
        s.add_membership(bob.id, staff.id);
    })
    .await;

    let signed_in = TestRequest::post("/auth/sign_in")
        .json(json!({ "user_name": "bob", "password": "correct horse" }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK);
    assert_eq!(signed_in.json()["group_ids"], json!([1]));
    let ticket = signed_in.ticket_cookie().unwrap();
    assert!(!ticket.is_empty());

    let body = TestRequest::get("/app/whoami")
        .ticket(&ticket)
        .send(&app.service)
        .await
        .json();
    assert_eq!(body["policy"], "ticket");
    assert_eq!(body["user"]["user"]["user_name"], "bob");

    let signed_out = TestRequest::post("/auth/sign_out")
        .ticket(&ticket)
        .send(&app.service)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert_eq!(signed_out.ticket_cookie().as_deref(), Some(""));
}

#[test_log::test(tokio::test)]
async fn wrong_password_is_rejected() {
    let app = TestApp::new();
    let hash = hash_password("correct horse").unwrap();
    app.seed(|s| {
        s.add_user("bob", "bob@example.com", &hash);
    })
    .await;

    TestRequest::post("/auth/sign_in")
        .json(json!({ "user_name": "bob", "password": "battery staple" }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::UNAUTHORIZED);

    TestRequest::post("/auth/sign_in")
        .json(json!({ "user_name": "nobody", "password": "correct horse" }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::UNAUTHORIZED);
}

#[test_log::test(tokio::test)]
async fn auth_tokens_are_managed_by_their_owner() {
    let app = TestApp::new();
    let alice = app.user("alice", &[]).await;

    TestRequest::get("/users/self/auth_tokens")
        .send(&app.service)
        .await
        .expect_status(StatusCode::UNAUTHORIZED);

    let created = TestRequest::post("/users/self/auth_tokens")
        .token(&alice.token)
        .json(json!({ "description": "ci" }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    assert_eq!(created["description"], "ci");
    assert_eq!(created["token"].as_str().unwrap().len(), 32);

    let fresh = created["token"].as_str().unwrap().to_string();
    let listed = TestRequest::get("/users/self/auth_tokens")
        .token(&fresh)
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(listed.as_array().unwrap().len(), 2);

    let token_id = created["id"].as_i64().unwrap();
    TestRequest::delete(&format!("/users/self/auth_tokens/{token_id}"))
        .token(&alice.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::NO_CONTENT);
    TestRequest::delete(&format!("/users/self/auth_tokens/{token_id}"))
        .token(&alice.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::NOT_FOUND);

    let whoami = TestRequest::get("/app/whoami")
        .token(&fresh)
        .send(&app.service)
        .await
        .json();
    assert!(whoami["user"].is_null());
}
