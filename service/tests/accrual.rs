//! Accrual client outcome-mapping tests against the scripted stub.

mod common;

use common::{AccrualStub, StubReply};
use rust_decimal_macros::dec;

use pointmart_core::OrderNumber;
use pointmart_service::accrual::{AccrualError, AccrualStatus};

fn number() -> OrderNumber {
    OrderNumber::parse("79927398713").unwrap()
}

#[tokio::test]
async fn ok_response_is_parsed() {
    let stub = AccrualStub::start(vec![StubReply::Status("PROCESSED", 100.5)]).await;

    let reply = stub.client().check_order(&number()).await.unwrap();
    assert_eq!(reply.number, "79927398713");
    assert_eq!(reply.status, AccrualStatus::Processed);
    assert_eq!(reply.accrual, dec!(100.5));
}

#[tokio::test]
async fn undocumented_status_is_preserved_as_unknown() {
    let stub = AccrualStub::start(vec![StubReply::Status("QUEUED", 0.0)]).await;

    let reply = stub.client().check_order(&number()).await.unwrap();
    assert_eq!(reply.status, AccrualStatus::Unknown);
}

#[tokio::test]
async fn no_content_means_not_registered() {
    let stub = AccrualStub::start(vec![StubReply::NotRegistered]).await;

    let err = stub.client().check_order(&number()).await.unwrap_err();
    assert!(matches!(err, AccrualError::OrderNotRegistered));
}

#[tokio::test]
async fn rate_limit_carries_the_wait_hint() {
    let stub = AccrualStub::start(vec![StubReply::Busy(Some("7"))]).await;

    let err = stub.client().check_order(&number()).await.unwrap_err();
    assert!(matches!(
        err,
        AccrualError::TooManyRequests { retry_after: 7 }
    ));
}

#[tokio::test]
async fn rate_limit_without_usable_header_is_rejected() {
    for header in [None, Some("soon"), Some("-1")] {
        let stub = AccrualStub::start(vec![StubReply::Busy(header)]).await;

        let err = stub.client().check_order(&number()).await.unwrap_err();
        assert!(
            matches!(err, AccrualError::InvalidWaitTime),
            "header {header:?}"
        );
    }
}

#[tokio::test]
async fn malformed_body_is_invalid_data() {
    let stub = AccrualStub::start(vec![StubReply::MalformedBody]).await;

    let err = stub.client().check_order(&number()).await.unwrap_err();
    assert!(matches!(err, AccrualError::InvalidData));
}

#[tokio::test]
async fn negative_accrual_is_invalid_data() {
    let stub = AccrualStub::start(vec![StubReply::Status("PROCESSED", -5.0)]).await;

    let err = stub.client().check_order(&number()).await.unwrap_err();
    assert!(matches!(err, AccrualError::InvalidData));
}

#[tokio::test]
async fn unexpected_status_is_surfaced() {
    let stub = AccrualStub::start(vec![StubReply::ServerError]).await;

    let err = stub.client().check_order(&number()).await.unwrap_err();
    assert!(matches!(err, AccrualError::UnexpectedStatus(500)));
}
