#![allow(clippy::unwrap_used)]
//! Entry creation, reordering, reparenting and deletion over HTTP.

use salvo::http::StatusCode;
use serde_json::json;

use arbor_core::constants::permission;
use arbor_test::{SeededUser, TestApp, TestRequest};

async fn admin(app: &TestApp) -> SeededUser {
    app.user("admin", &[permission::ADMIN_PANEL, permission::ADMIN_ENTRIES])
        .await
}

fn names(positions: &[(String, i32)]) -> Vec<(&str, i32)> {
    positions.iter().map(|(n, o)| (n.as_str(), *o)).collect()
}

#[test_log::test(tokio::test)]
async fn create_at_requested_position_shifts_later_siblings() {
    let app = TestApp::new();
    let admin = admin(&app).await;
    let parent = app.entry("parent", None, Some(admin.id)).await;
    for name in ["a", "b", "c", "d"] {
        app.entry(name, Some(parent.resource_id), Some(admin.id)).await;
    }

    let created = TestRequest::post("/entries")
        .token(&admin.token)
        .json(json!({
            "resource_name": "new",
            "parent_id": parent.resource_id,
            "ordering": 2
        }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    assert_eq!(created["ordering"], 2);
    assert_eq!(created["owner_user_id"], admin.id);

    assert_eq!(
        names(&app.positions(Some(parent.resource_id)).await),
        vec![("a", 1), ("new", 2), ("b", 3), ("c", 4), ("d", 5)]
    );
}

#[test_log::test(tokio::test)]
async fn create_without_ordering_appends() {
    let app = TestApp::new();
    let admin = admin(&app).await;
    app.entry("first", None, Some(admin.id)).await;

    let created = TestRequest::post("/entries")
        .token(&admin.token)
        .json(json!({ "resource_name": "second", "note": "hello" }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    assert_eq!(created["ordering"], 2);
    assert!(created["parent_id"].is_null());
    assert_eq!(created["note"], "hello");
}

#[test_log::test(tokio::test)]
async fn create_reports_every_invalid_field() {
    let app = TestApp::new();
    let admin = admin(&app).await;

    let body = TestRequest::post("/entries")
        .token(&admin.token)
        .json(json!({ "resource_name": "", "parent_id": 999, "ordering": 3 }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .json();
    assert_eq!(body["errors"]["parent_id"], "parent not found");
    assert!(body["errors"]["resource_name"].is_string());

    let body = TestRequest::post("/entries")
        .token(&admin.token)
        .json(json!({ "resource_name": "x", "ordering": 3 }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .json();
    assert_eq!(
        body,
        json!({ "errors": { "ordering": "position must be between 1 and 1" } })
    );
    assert!(app.positions(None).await.is_empty());
}

#[test_log::test(tokio::test)]
async fn malformed_body_is_a_bad_request() {
    let app = TestApp::new();
    let admin = admin(&app).await;

    TestRequest::post("/entries")
        .token(&admin.token)
        .json(json!({ "parent_id": "root" }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::BAD_REQUEST);
}

#[test_log::test(tokio::test)]
async fn reorder_within_the_same_parent_is_bounded_by_sibling_count() {
    let app = TestApp::new();
    let admin = admin(&app).await;
    let parent = app.entry("parent", None, Some(admin.id)).await;
    let mut children = Vec::new();
    for name in ["a", "b", "c", "d"] {
        children.push(app.entry(name, Some(parent.resource_id), Some(admin.id)).await);
    }
    let b = &children[1];

    let body = TestRequest::patch(&format!("/entries/{}", b.resource_id))
        .token(&admin.token)
        .json(json!({ "ordering": 5 }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .json();
    assert_eq!(body["errors"]["ordering"], "position must be between 1 and 4");

    let body = TestRequest::patch(&format!("/entries/{}", b.resource_id))
        .token(&admin.token)
        .json(json!({ "ordering": 4, "resource_name": "b2" }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["ordering"], 4);
    assert_eq!(body["resource_name"], "b2");

    assert_eq!(
        names(&app.positions(Some(parent.resource_id)).await),
        vec![("a", 1), ("c", 2), ("d", 3), ("b2", 4)]
    );
}

#[test_log::test(tokio::test)]
async fn reparent_rejects_cycles_and_keeps_both_sets_contiguous() {
    let app = TestApp::new();
    let admin = admin(&app).await;
    let left = app.entry("left", None, Some(admin.id)).await;
    let right = app.entry("right", None, Some(admin.id)).await;
    let child = app.entry("child", Some(left.resource_id), Some(admin.id)).await;
    app.entry("sibling", Some(left.resource_id), Some(admin.id)).await;

    let body = TestRequest::patch(&format!("/entries/{}", left.resource_id))
        .token(&admin.token)
        .json(json!({ "parent_id": child.resource_id, "ordering": 1 }))
        .send(&app.service)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .json();
    assert_eq!(
        body,
        json!({ "errors": {
            "parent_id": "cannot nest a resource under itself or its own descendant"
        } })
    );

    TestRequest::patch(&format!("/entries/{}", child.resource_id))
        .token(&admin.token)
        .json(json!({ "parent_id": right.resource_id }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::OK);
    assert_eq!(
        names(&app.positions(Some(left.resource_id)).await),
        vec![("sibling", 1)]
    );
    assert_eq!(
        names(&app.positions(Some(right.resource_id)).await),
        vec![("child", 1)]
    );

    TestRequest::patch(&format!("/entries/{}", child.resource_id))
        .token(&admin.token)
        .json(json!({ "parent_id": null, "ordering": 1 }))
        .send(&app.service)
        .await
        .expect_status(StatusCode::OK);
    assert_eq!(
        names(&app.positions(None).await),
        vec![("child", 1), ("left", 2), ("right", 3)]
    );
    assert!(app.positions(Some(right.resource_id)).await.is_empty());
}

#[test_log::test(tokio::test)]
async fn delete_removes_subtree_and_closes_gap() {
    let app = TestApp::new();
    let admin = admin(&app).await;
    let mut roots = Vec::new();
    for name in ["a", "b", "c", "d"] {
        roots.push(app.entry(name, None, Some(admin.id)).await);
    }
    let b = &roots[1];
    let b1 = app.entry("b1", Some(b.resource_id), Some(admin.id)).await;
    app.entry("b1a", Some(b1.resource_id), Some(admin.id)).await;

    TestRequest::delete(&format!("/entries/{}", b.resource_id))
        .token(&admin.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::NO_CONTENT);

    assert_eq!(
        names(&app.positions(None).await),
        vec![("a", 1), ("c", 2), ("d", 3)]
    );
    assert!(app.seed(|s| s.resource(b1.resource_id).is_none()).await);

    TestRequest::get(&format!("/entries/{}", b1.resource_id))
        .token(&admin.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn children_walk_in_tree_order_with_depth_limit() {
    let app = TestApp::new();
    let admin = admin(&app).await;
    let root = app.entry("root", None, Some(admin.id)).await;
    let a = app.entry("a", Some(root.resource_id), Some(admin.id)).await;
    app.entry("a1", Some(a.resource_id), Some(admin.id)).await;
    app.entry("b", Some(root.resource_id), Some(admin.id)).await;

    let rows = TestRequest::get(&format!("/entries/{}/children", root.resource_id))
        .token(&admin.token)
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK)
        .json();
    let walked: Vec<(String, i64)> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| {
            (
                r["resource_name"].as_str().unwrap().to_string(),
                r["depth"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        walked,
        vec![
            ("a".to_string(), 1),
            ("a1".to_string(), 2),
            ("b".to_string(), 1)
        ]
    );

    let shallow = TestRequest::get(&format!("/entries/{}/children?depth=1", root.resource_id))
        .token(&admin.token)
        .send(&app.service)
        .await
        .json();
    assert_eq!(shallow.as_array().unwrap().len(), 2);

    TestRequest::get(&format!("/entries/{}/children?depth=0", root.resource_id))
        .token(&admin.token)
        .send(&app.service)
        .await
        .expect_status(StatusCode::BAD_REQUEST);
}

#[test_log::test(tokio::test)]
async fn listing_sets_pagination_headers() {
    let app = TestApp::new();
    let admin = admin(&app).await;
    for name in ["a", "b", "c"] {
        app.entry(name, None, Some(admin.id)).await;
    }

    let listed = TestRequest::get("/entries?page=1")
        .token(&admin.token)
        .send(&app.service)
        .await
        .assert_status(StatusCode::OK);
    assert_eq!(listed.header("x-total-count"), Some("3"));
    assert_eq!(listed.header("x-current-page"), Some("1"));
    assert_eq!(listed.header("x-items-per-page"), Some("50"));
    assert_eq!(listed.header("x-pages"), Some("1"));
    assert_eq!(listed.json().as_array().unwrap().len(), 3);
}

/// Overlapping requests through the full service. The in-memory store serializes
/// whole sessions behind its mutex, so this covers request interleaving only; the
/// `PostgreSQL` advisory lock is exercised by the ignored test in `arbor-db`'s `pg` module.
#[test_log::test(tokio::test)]
async fn concurrent_inserts_under_one_parent_stay_contiguous() {
    let app = TestApp::new();
    let admin = admin(&app).await;
    let parent = app.entry("parent", None, Some(admin.id)).await;

    let requests = (0..6).map(|i| {
        TestRequest::post("/entries")
            .token(&admin.token)
            .json(json!({
                "resource_name": format!("n{i}"),
                "parent_id": parent.resource_id,
                "ordering": 1
            }))
            .send(&app.service)
    });
    for response in futures::future::join_all(requests).await {
        response.expect_status(StatusCode::CREATED);
    }

    let orderings: Vec<i32> = app
        .positions(Some(parent.resource_id))
        .await
        .into_iter()
        .map(|(_, o)| o)
        .collect();
    assert_eq!(orderings, vec![1, 2, 3, 4, 5, 6]);
}
