mod common;

use common::{json_body, TestApp};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_register_and_login() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/register")
        .json(&json!({ "username": "alice", "password": "correct-horse" }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "user");
    assert!(body.get("password").is_none());

    let token = app.login("alice", "correct-horse").await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_register_rejects_taken_and_malformed_usernames() {
    let app = TestApp::spawn().await;
    app.user_token("bob").await;

    let response = app
        .post("/api/register")
        .json(&json!({ "username": "bob", "password": "another-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["fields"]["username"].is_array());

    let response = app
        .post("/api/register")
        .json(&json!({ "username": "a b", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["fields"]["username"].is_array());
    assert!(body["fields"]["password"].is_array());
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = TestApp::spawn().await;
    app.user_token("carol").await;

    let response = app
        .post("/api/login")
        .json(&json!({ "username": "carol", "password": "not-the-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post("/api/login")
        .json(&json!({ "username": "nobody", "password": "whatever-it-is" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/admin/products").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .get("/api/admin/products")
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let user = app.user_token("dave").await;
    let response = app
        .get("/api/admin/products")
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = app.admin_token().await;
    let response = app
        .get("/api/admin/products")
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
