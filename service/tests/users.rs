//! Registration and login integration tests.

mod common;

use axum::http::StatusCode;
use common::{bearer, token_from, TestHarness};
use serde_json::json;

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn register_returns_user_and_sets_auth_cookie() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/api/user/register")
        .json(&json!({ "login": "Shopper", "password": "secret" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["login"], "shopper");
    assert!(body["id"].as_i64().unwrap() > 0);
    assert!(!token_from(&response).is_empty());
}

#[tokio::test]
async fn register_rejects_occupied_login() {
    let harness = TestHarness::new();
    harness.register("shopper", "secret").await;

    let response = harness
        .server
        .post("/api/user/register")
        .json(&json!({ "login": "SHOPPER", "password": "other" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_rejects_blank_credentials() {
    let harness = TestHarness::new();

    for body in [
        json!({ "login": "", "password": "secret" }),
        json!({ "login": "shopper", "password": "" }),
        json!({ "login": "shopper", "password": "   " }),
    ] {
        let response = harness.server.post("/api/user/register").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn login_succeeds_with_valid_credentials() {
    let harness = TestHarness::new();
    harness.register("shopper", "secret").await;

    let response = harness
        .server
        .post("/api/user/login")
        .json(&json!({ "login": "shopper", "password": "secret" }))
        .await;

    response.assert_status_ok();
    let token = token_from(&response);

    // The issued token opens authenticated routes.
    let balance = harness
        .server
        .get("/api/user/balance")
        .add_header("authorization", bearer(&token))
        .await;
    balance.assert_status_ok();
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let harness = TestHarness::new();
    harness.register("shopper", "secret").await;

    let wrong_password = harness
        .server
        .post("/api/user/login")
        .json(&json!({ "login": "shopper", "password": "wrong" }))
        .await;
    wrong_password.assert_status_unauthorized();

    let unknown_user = harness
        .server
        .post("/api/user/login")
        .json(&json!({ "login": "nobody", "password": "secret" }))
        .await;
    unknown_user.assert_status_unauthorized();
}

#[tokio::test]
async fn login_rejects_blank_credentials() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/api/user/login")
        .json(&json!({ "login": "", "password": "" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
