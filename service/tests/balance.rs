//! Balance and withdrawal integration tests.

mod common;

use axum::http::StatusCode;
use common::{bearer, TestHarness};
use rust_decimal_macros::dec;
use serde_json::json;

// ============================================================================
// Balance
// ============================================================================

#[tokio::test]
async fn balance_starts_at_zero() {
    let harness = TestHarness::new();
    let token = harness.register("shopper", "secret").await;

    let response = harness
        .server
        .get("/api/user/balance")
        .add_header("authorization", bearer(&token))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["current"], 0.0);
    assert_eq!(body["withdrawn"], 0.0);
}

#[tokio::test]
async fn balance_requires_authentication() {
    let harness = TestHarness::new();

    let response = harness.server.get("/api/user/balance").await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn balance_reflects_credits_and_debits() {
    let harness = TestHarness::new();
    let token = harness.register("shopper", "secret").await;
    harness.credit("shopper", dec!(100.5));

    harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", bearer(&token))
        .json(&json!({ "order": "2377225624", "sum": 30.0 }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/api/user/balance")
        .add_header("authorization", bearer(&token))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["current"], 70.5);
    assert_eq!(body["withdrawn"], 30.0);
}

// ============================================================================
// Withdrawal
// ============================================================================

#[tokio::test]
async fn withdrawal_returns_the_receipt() {
    let harness = TestHarness::new();
    let token = harness.register("shopper", "secret").await;
    harness.credit("shopper", dec!(10));

    let response = harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", bearer(&token))
        .json(&json!({ "order": "2377225624", "sum": 3.5 }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["order"], "2377225624");
    assert_eq!(body["sum"], 3.5);
}

#[tokio::test]
async fn withdrawal_rejects_insufficient_balance() {
    let harness = TestHarness::new();
    let token = harness.register("shopper", "secret").await;
    harness.credit("shopper", dec!(1));

    let response = harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", bearer(&token))
        .json(&json!({ "order": "2377225624", "sum": 3.5 }))
        .await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn withdrawal_rejects_malformed_input() {
    let harness = TestHarness::new();
    let token = harness.register("shopper", "secret").await;
    harness.credit("shopper", dec!(10));

    // Bad order number.
    harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", bearer(&token))
        .json(&json!({ "order": "12345678", "sum": 1.0 }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    // Non-positive sums.
    for sum in [0.0, -5.0] {
        harness
            .server
            .post("/api/user/balance/withdraw")
            .add_header("authorization", bearer(&token))
            .json(&json!({ "order": "2377225624", "sum": sum }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}

#[tokio::test]
async fn withdrawal_number_cannot_be_reused() {
    let harness = TestHarness::new();
    let token = harness.register("shopper", "secret").await;
    harness.credit("shopper", dec!(10));

    harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", bearer(&token))
        .json(&json!({ "order": "2377225624", "sum": 1.0 }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/api/user/balance/withdraw")
        .add_header("authorization", bearer(&token))
        .json(&json!({ "order": "2377225624", "sum": 1.0 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    // The failed attempt did not touch the balance.
    let balance = harness
        .server
        .get("/api/user/balance")
        .add_header("authorization", bearer(&token))
        .await;
    let body: serde_json::Value = balance.json();
    assert_eq!(body["current"], 9.0);
    assert_eq!(body["withdrawn"], 1.0);
}

// ============================================================================
// Withdrawal listing
// ============================================================================

#[tokio::test]
async fn withdrawals_list_is_empty_until_first_withdrawal() {
    let harness = TestHarness::new();
    let token = harness.register("shopper", "secret").await;

    let response = harness
        .server
        .get("/api/user/balance/withdrawals")
        .add_header("authorization", bearer(&token))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn withdrawals_list_returns_records_oldest_first() {
    let harness = TestHarness::new();
    let token = harness.register("shopper", "secret").await;
    harness.credit("shopper", dec!(10));

    for order in ["2377225624", "1234567812345670"] {
        harness
            .server
            .post("/api/user/balance/withdraw")
            .add_header("authorization", bearer(&token))
            .json(&json!({ "order": order, "sum": 2.0 }))
            .await
            .assert_status_ok();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let response = harness
        .server
        .get("/api/user/balance/withdrawals")
        .add_header("authorization", bearer(&token))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["order"], "2377225624");
    assert_eq!(items[1]["order"], "1234567812345670");
    assert_eq!(items[0]["sum"], 2.0);
}
