//! Common test utilities for pointmart integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_test::{TestResponse, TestServer};
use rust_decimal::Decimal;
use serde_json::json;
use tempfile::TempDir;

use pointmart_service::{
    create_router, AccrualClient, AppState, DispatchQueue, PasswordHasher, ServiceConfig,
};
use pointmart_store::{Ledger, LedgerTx, RocksLedger};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct handle to the store behind the server.
    pub store: Arc<RocksLedger>,
    /// The dispatch queue behind the server.
    pub queue: Arc<DispatchQueue>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _data_dir: TempDir,
}

impl TestHarness {
    /// Create a harness with the default queue capacity.
    pub fn new() -> Self {
        Self::with_queue_capacity(32)
    }

    /// Create a harness with a specific queue capacity.
    pub fn with_queue_capacity(capacity: usize) -> Self {
        let data_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksLedger::open(data_dir.path()).expect("Failed to open store"));
        let queue = Arc::new(DispatchQueue::new(capacity).expect("Failed to create queue"));
        // The accrual system is never contacted by the HTTP surface.
        let accrual =
            Arc::new(AccrualClient::new("http://localhost:8081").expect("Failed to build client"));

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: data_dir.path().to_string_lossy().to_string(),
            accrual_address: "http://localhost:8081".into(),
            queue_capacity: capacity,
            secret_key: "test-secret".into(),
            ..ServiceConfig::default()
        };

        let state = AppState::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            accrual,
            PasswordHasher::new(4),
            config,
        );
        let server = TestServer::new(create_router(state)).expect("Failed to create test server");

        Self {
            server,
            store,
            queue,
            _data_dir: data_dir,
        }
    }

    /// Register a user and return a bearer token for them.
    pub async fn register(&self, login: &str, password: &str) -> String {
        let response = self
            .server
            .post("/api/user/register")
            .json(&json!({ "login": login, "password": password }))
            .await;
        response.assert_status_ok();
        token_from(&response)
    }

    /// Credit points straight through the store, bypassing processing.
    pub fn credit(&self, login: &str, points: Decimal) {
        let mut tx = self.store.begin().unwrap();
        let user = tx.get_user_by_login(login).unwrap();
        tx.accrue_points(user.id, points).unwrap();
        tx.commit().unwrap();
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the auth token from a registration/login response.
pub fn token_from(response: &TestResponse) -> String {
    let cookie = response.header("set-cookie");
    let cookie = cookie.to_str().expect("set-cookie must be ASCII");
    cookie
        .strip_prefix("auth=")
        .expect("auth cookie must be first")
        .split(';')
        .next()
        .expect("cookie must have a value")
        .to_string()
}

/// Authorization header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// One scripted reply from the accrual stub.
#[derive(Debug, Clone)]
pub enum StubReply {
    /// 200 with the given status string and accrual.
    Status(&'static str, f64),
    /// 204: the order is unknown to the accrual system.
    NotRegistered,
    /// 429 with an optional `Retry-After` header value.
    Busy(Option<&'static str>),
    /// 200 with a body that is not valid JSON.
    MalformedBody,
    /// 500.
    ServerError,
}

#[derive(Clone, Default)]
struct StubState {
    script: Arc<Mutex<VecDeque<StubReply>>>,
    hits: Arc<Mutex<usize>>,
}

/// A scripted stand-in for the accrual system, served over real HTTP.
///
/// Replies are consumed front to back; the last reply repeats once the
/// script is exhausted.
pub struct AccrualStub {
    /// Base URL to point an `AccrualClient` at.
    pub base_url: String,
    state: StubState,
    _server: tokio::task::JoinHandle<()>,
}

impl AccrualStub {
    /// Start the stub with the given reply script.
    pub async fn start(script: Vec<StubReply>) -> Self {
        let state = StubState {
            script: Arc::new(Mutex::new(script.into())),
            hits: Arc::new(Mutex::new(0)),
        };
        let app = Router::new()
            .route("/api/orders/{number}", get(serve_order))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub listener");
        let addr = listener.local_addr().expect("stub listener has an address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            _server: server,
        }
    }

    /// An accrual client pointed at this stub.
    pub fn client(&self) -> AccrualClient {
        AccrualClient::new(&self.base_url).expect("stub base URL is valid")
    }

    /// How many requests the stub has served.
    pub fn hits(&self) -> usize {
        *self.state.hits.lock().unwrap()
    }
}

async fn serve_order(State(state): State<StubState>, Path(number): Path<String>) -> Response {
    *state.hits.lock().unwrap() += 1;

    let reply = {
        let mut script = state.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    };

    match reply {
        Some(StubReply::Status(status, accrual)) => Json(json!({
            "order": number,
            "status": status,
            "accrual": accrual,
        }))
        .into_response(),
        Some(StubReply::Busy(retry_after)) => match retry_after {
            Some(value) => (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", value)],
                "no more than N requests per minute allowed",
            )
                .into_response(),
            None => StatusCode::TOO_MANY_REQUESTS.into_response(),
        },
        Some(StubReply::MalformedBody) => (
            StatusCode::OK,
            [("Content-Type", "application/json")],
            "not json at all",
        )
            .into_response(),
        Some(StubReply::ServerError) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        Some(StubReply::NotRegistered) | None => StatusCode::NO_CONTENT.into_response(),
    }
}
