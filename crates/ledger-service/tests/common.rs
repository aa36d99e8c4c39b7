//! Common test utilities for ledger service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use serde_json::{json, Value};

use ledger_service::{create_router, AppState, ServiceConfig};
use ledger_store::MemoryStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
}

impl TestHarness {
    /// Create a new test harness over an empty in-memory ledger.
    pub fn new() -> Self {
        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            ..ServiceConfig::default()
        };

        let state = AppState::new(Arc::new(MemoryStore::new()), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self { server }
    }

    /// Open an account and return its id.
    pub async fn create_account(&self, owner_id: &str, balance: f64) -> String {
        let response = self
            .server
            .post("/accounts")
            .json(&json!({ "owner_id": owner_id, "balance": balance }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let body: Value = response.json();
        body["id"].as_str().expect("account id").to_string()
    }

    /// Current balance of an account.
    pub async fn balance(&self, account_id: &str) -> f64 {
        let response = self
            .server
            .get(&format!("/accounts/{account_id}/balance"))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        body["balance"].as_f64().expect("numeric balance")
    }

    /// Deposit into an account, asserting success.
    pub async fn deposit(&self, account_id: &str, amount: &str) {
        self.server
            .post(&format!("/accounts/{account_id}/deposit?amount={amount}"))
            .await
            .assert_status_ok();
    }

    /// Transfer from `from` to the given recipients, returning the response body.
    pub async fn transfer(&self, from: &str, amount: f64, recipients: &[(&str, f64)]) -> Value {
        let recipients: Vec<Value> = recipients
            .iter()
            .map(|(id, amount)| json!({ "accountId": id, "amount": amount }))
            .collect();

        let response = self
            .server
            .post(&format!("/accounts/{from}/transfer_money"))
            .json(&json!({
                "from": from,
                "amount": amount,
                "subject": "test transfer",
                "recipients": recipients
            }))
            .await;
        response.assert_status_ok();
        response.json()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// The `error.code` of an error response body.
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
