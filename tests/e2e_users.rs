//! E2E tests for registration, login and profile endpoints

mod common;

use common::TestServer;
use serde_json::{Value, json};

#[tokio::test]
async fn test_register_returns_token_and_empty_sets() {
    let server = TestServer::new().await;

    let alice = server.register("Alice").await;
    assert!(!alice.token.is_empty());

    let profile = server.profile(&alice).await;
    assert_eq!(profile["id"], alice.id.as_str());
    assert_eq!(profile["email"], "alice@example.com");
    assert_eq!(profile["followers"], json!([]));
    assert_eq!(profile["following"], json!([]));
    assert_eq!(profile["followers_count"], 0);
    assert_eq!(profile["following_count"], 0);
    assert!(profile.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_missing_field_is_rejected() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/api/users"))
        .json(&json!({ "name": "Alice", "email": "alice@example.com" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "please add all fields");
}

#[tokio::test]
async fn test_register_duplicate_email_is_rejected() {
    let server = TestServer::new().await;
    server.register("Alice").await;

    let response = server
        .client
        .post(server.url("/api/users"))
        .json(&json!({
            "name": "Other Alice",
            "email": "ALICE@example.com",
            "password": "password123",
            "dob": "1991-02-03",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "account already exists");
}

#[tokio::test]
async fn test_login_issues_token() {
    let server = TestServer::new().await;
    let alice = server.register("Alice").await;

    let response = server
        .client
        .post(server.url("/api/users/login"))
        .json(&json!({ "email": alice.email, "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], alice.id.as_str());
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let rejected = server
        .client
        .post(server.url("/api/users/login"))
        .json(&json!({ "email": alice.email, "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), 400);
}

#[tokio::test]
async fn test_profile_requires_valid_token() {
    let server = TestServer::new().await;

    let missing = server
        .client
        .get(server.url("/api/users/profile"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 401);

    let garbage = server
        .client
        .get(server.url("/api/users/profile"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), 401);
}

#[tokio::test]
async fn test_token_cookie_is_accepted() {
    let server = TestServer::new().await;
    let alice = server.register("Alice").await;

    let response = server
        .client
        .get(server.url("/api/users/profile"))
        .header("Cookie", format!("token={}", alice.token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_update_profile_and_password() {
    let server = TestServer::new().await;
    let alice = server.register("Alice").await;

    let response = server
        .client
        .put(server.url("/api/users/profile"))
        .bearer_auth(&alice.token)
        .json(&json!({ "name": "Alicia", "dob": "1995-05-05" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let profile = server.profile(&alice).await;
    assert_eq!(profile["name"], "Alicia");
    assert_eq!(profile["dob"], "1995-05-05");

    let response = server
        .client
        .put(server.url("/api/users/password"))
        .bearer_auth(&alice.token)
        .json(&json!({ "password": "new-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let login = server
        .client
        .post(server.url("/api/users/login"))
        .json(&json!({ "email": alice.email, "password": "new-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), 200);
}

#[tokio::test]
async fn test_malformed_body_returns_json_error() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/api/users"))
        .json(&json!({
            "name": "Alice",
            "email": "alice@example.com",
            "password": "password123",
            "dob": "not-a-date",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().is_some_and(|msg| msg.contains("dob")));
}
