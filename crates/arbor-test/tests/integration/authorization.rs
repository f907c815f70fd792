#![allow(clippy::unwrap_used)]
//! ACL assembly as seen through route permission checks.

use salvo::http::StatusCode;
use serde_json::json;

use arbor_core::constants::permission;
use arbor_test::{TestApp, TestRequest};

#[test_log::test(tokio::test)]
async fn admin_permissions_need_admin_panel() {
    let app = TestApp::new();
    let without_panel = app.user("ungated", &[permission::ADMIN_ENTRIES]).await;
    let with_panel = app
        .user("gated", &[permission::ADMIN_ENTRIES, permission::ADMIN_PANEL])
        .await;

    TestRequest::get("/entries")
        .token(&without_panel.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::FORBIDDEN);
    TestRequest::get("/entries")
        .token(&with_panel.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::OK);
    TestRequest::get("/entries")
        .send(&app.service)
        .await
        .expect_status(StatusCode::FORBIDDEN);
}

#[test_log::test(tokio::test)]
async fn admin_permissions_through_a_group_count() {
    let app = TestApp::new();
    let member = app.user("member", &[]).await;
    app.seed(|s| {
        let admins = s.add_group("admins");
        s.add_membership(member.id, admins.id);
        s.grant_group_permission(admins.id, permission::ADMIN_PANEL);
        s.grant_group_permission(admins.id, permission::ADMIN_ENTRIES);
    })
    .await;

    TestRequest::post("/entries")
        .token(&member.token)
        .json(json!({ "resource_name": "via group" }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::CREATED);
}

#[test_log::test(tokio::test)]
async fn root_administration_grants_everything() {
    let app = TestApp::new();
    let owner = app.user("owner", &[]).await;
    let root = app.user("root", &[permission::ROOT_ADMINISTRATION]).await;
    let entry = app.entry("private", None, Some(owner.id)).await;

    TestRequest::get("/entries")
        .token(&root.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::OK);
    TestRequest::patch(&format!("/entries/{}", entry.resource_id))
        .token(&root.token)
        .json(json!({ "note": "audited" }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::OK);
}

#[test_log::test(tokio::test)]
async fn resource_grants_follow_the_owner() {
    let app = TestApp::new();
    let owner = app.user("owner", &[]).await;
    let reader = app.user("reader", &[]).await;
    let entry = app.entry("shared", None, Some(owner.id)).await;
    let path = format!("/entries/{}", entry.resource_id);
    let grants = format!("/resources/{}/user_permissions", entry.resource_id);

    TestRequest::get(&path)
        .token(&reader.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::FORBIDDEN);

    TestRequest::post(&grants)
        .token(&reader.token)
        .json(json!({ "user_name": "reader", "perm_name": "editor" }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::FORBIDDEN);

    let grant = TestRequest::post(&grants)
        .token(&owner.token)
        .json(json!({ "user_name": "reader", "perm_name": "editor" }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    assert_eq!(grant["user_id"], reader.id);

    let body = TestRequest::get(&path)
        .token(&reader.token)
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["resource_name"], "shared");

    TestRequest::delete(&path)
        .token(&reader.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::FORBIDDEN);

    TestRequest::delete(&grants)
        .token(&owner.token)
        .json(json!({ "user_name": "reader", "perm_name": "editor" }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::NO_CONTENT);
    TestRequest::get(&path)
        .token(&reader.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::FORBIDDEN);
}

#[test_log::test(tokio::test)]
async fn group_grants_reach_members() {
    let app = TestApp::new();
    let owner = app.user("owner", &[]).await;
    let member = app.user("member", &[]).await;
    let group_id = app
        .seed(|s| {
            let staff = s.add_group("staff");
            s.add_membership(member.id, staff.id);
            staff.id
        })
        .await;
    let entry = app.entry("team", None, Some(owner.id)).await;

    TestRequest::post(&format!("/resources/{}/group_permissions", entry.resource_id))
        .token(&owner.token)
        .json(json!({ "group_id": group_id, "perm_name": "editor" }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::CREATED);

    TestRequest::get(&format!("/entries/{}", entry.resource_id))
        .token(&member.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::OK);
}

#[test_log::test(tokio::test)]
async fn grants_are_validated_per_field() {
    let app = TestApp::new();
    let owner = app.user("owner", &[]).await;
    let entry = app.entry("doc", None, Some(owner.id)).await;

    let body = TestRequest::post(&format!("/resources/{}/user_permissions", entry.resource_id))
        .token(&owner.token)
        .json(json!({ "user_name": "ghost", "perm_name": "admin_panel" }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .json();
    assert_eq!(body["errors"]["user_name"], "user not found");
    assert!(body["errors"]["perm_name"].is_string());

    TestRequest::post(&format!("/resources/{}/group_permissions", entry.resource_id))
        .token(&owner.token)
        .json(json!({ "group_id": 77, "perm_name": "editor" }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[test_log::test(tokio::test)]
async fn missing_resource_is_404_without_acl_work() {
    let app = TestApp::new();
    let root = app.user("root", &[permission::ROOT_ADMINISTRATION]).await;

    let before = app.store.permission_query_count();
    TestRequest::get("/entries/4242")
        .token(&root.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::NOT_FOUND);
    TestRequest::post("/resources/4242/user_permissions")
        .token(&root.token)
        .json(json!({ "user_name": "root", "perm_name": "editor" }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::NOT_FOUND);
    assert_eq!(app.store.permission_query_count(), before);
}

#[test_log::test(tokio::test)]
async fn non_numeric_object_id_is_a_bad_request() {
    let app = TestApp::new();
    let root = app.user("root", &[permission::ROOT_ADMINISTRATION]).await;

    TestRequest::get("/entries/not-a-number")
        .token(&root.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::BAD_REQUEST);
}

#[test_log::test(tokio::test)]
async fn global_grant_through_the_api_opens_and_closes_the_gate() {
    let app = TestApp::new();
    let admin = app
        .user("useradmin", &[permission::ADMIN_PANEL, permission::ADMIN_USERS])
        .await;
    let target = app.user("target", &[permission::ADMIN_ENTRIES]).await;
    let path = format!("/users/{}/permissions", target.id);
    let panel = json!({ "perm_name": permission::ADMIN_PANEL });

    TestRequest::get("/entries")
        .token(&target.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::FORBIDDEN);

    let granted = TestRequest::post(&path)
        .token(&admin.token)
        .json(panel.clone())
        .send(&app.service)
        .await
        .assert_status(StatusCode::CREATED);
    assert_eq!(
        granted.json(),
        json!({ "user_id": target.id, "perm_name": "admin_panel" })
    );
    TestRequest::get("/entries")
        .token(&target.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::OK);

    TestRequest::delete(&path)
        .token(&admin.token)
        .json(panel.clone())
        .send(&app.service)
        .await
        .expect_status(StatusCode::NO_CONTENT);
    TestRequest::get("/entries")
        .token(&target.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::FORBIDDEN);
    TestRequest::delete(&path)
        .token(&admin.token)
        .json(panel)
        .send(&app.service)
        .await
        .expect_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn user_permission_management_is_guarded_and_validated() {
    let app = TestApp::new();
    let ungated = app.user("ungated", &[permission::ADMIN_USERS]).await;
    let admin = app
        .user("useradmin", &[permission::ADMIN_PANEL, permission::ADMIN_USERS])
        .await;
    let root = app.user("root", &[permission::ROOT_ADMINISTRATION]).await;
    let target = app.user("target", &[]).await;
    let path = format!("/users/{}/permissions", target.id);

    for token in [None, Some(&ungated.token)] {
        let mut request =
            TestRequest::post(&path).json(json!({ "perm_name": permission::ADMIN_PANEL }));
        if let Some(token) = token {
            request = request.token(token);
        }
        request
            .send(&app.service)
            .await
            .expect_status(StatusCode::FORBIDDEN);
    }

    let rejected = TestRequest::post(&path)
        .token(&admin.token)
        .json(json!({ "perm_name": "editor" }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert!(rejected.json()["errors"]["perm_name"].is_string());

    TestRequest::post("/users/999/permissions")
        .token(&admin.token)
        .json(json!({ "perm_name": permission::ADMIN_PANEL }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::NOT_FOUND);
    TestRequest::post("/users/self/permissions")
        .token(&admin.token)
        .json(json!({ "perm_name": permission::ADMIN_PANEL }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::BAD_REQUEST);

    let root_grant = json!({ "perm_name": permission::ROOT_ADMINISTRATION });
    TestRequest::post(&path)
        .token(&admin.token)
        .json(root_grant.clone())
        .send(&app.service)
        .await
        .expect_status(StatusCode::FORBIDDEN);
    TestRequest::post(&path)
        .token(&root.token)
        .json(root_grant)
        .send(&app.service)
        .await
        .expect_status(StatusCode::CREATED);
}

#[test_log::test(tokio::test)]
async fn group_membership_through_the_api_carries_group_grants() {
    let app = TestApp::new();
    let admin = app
        .user("groupadmin", &[permission::ADMIN_PANEL, permission::ADMIN_GROUPS])
        .await;
    let member = app.user("member", &[]).await;
    let group_id = app.seed(|s| s.add_group("editors").id).await;
    let members = format!("/groups/{group_id}/users");

    for perm_name in [permission::ADMIN_PANEL, permission::ADMIN_ENTRIES] {
        TestRequest::post(&format!("/groups/{group_id}/permissions"))
            .token(&admin.token)
            .json(json!({ "perm_name": perm_name }))
            .send(&app.service)
            .await
            .expect_status(StatusCode::CREATED);
    }
    TestRequest::get("/entries")
        .token(&member.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::FORBIDDEN);

    let added = TestRequest::post(&members)
        .token(&admin.token)
        .json(json!({ "user_name": "member" }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::CREATED);
    assert_eq!(
        added.json(),
        json!({ "group_id": group_id, "user_id": member.id })
    );
    TestRequest::post(&members)
        .token(&admin.token)
        .json(json!({ "user_name": "member" }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::OK);
    TestRequest::get("/entries")
        .token(&member.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::OK);

    TestRequest::delete(&members)
        .token(&admin.token)
        .json(json!({ "user_name": "member" }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::NO_CONTENT);
    TestRequest::get("/entries")
        .token(&member.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::FORBIDDEN);

    let unknown = TestRequest::post(&members)
        .token(&admin.token)
        .json(json!({ "user_name": "nobody" }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(unknown.json()["errors"]["user_name"], "user not found");
}

#[test_log::test(tokio::test)]
async fn group_routes_need_admin_groups() {
    let app = TestApp::new();
    let user_admin = app
        .user("useradmin", &[permission::ADMIN_PANEL, permission::ADMIN_USERS])
        .await;
    let group_id = app.seed(|s| s.add_group("editors").id).await;

    TestRequest::post(&format!("/groups/{group_id}/users"))
        .token(&user_admin.token)
        .json(json!({ "user_name": "useradmin" }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::FORBIDDEN);
}
