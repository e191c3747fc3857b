//! Shared harness: the full router over in-memory backends, driven with `oneshot`.

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use realstack::app::ManualClock;
use realstack::infra::config::RateLimitConfig;
use realstack::infra::solana::InMemoryLedger;
use realstack::storage::MemoryStore;
use realstack::transport::http::auth::ApiKeyRegistry;
use realstack::transport::http::{create_router, AppState};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN: &str = "admin-key-0001";
pub const MANAGER: &str = "manager-key-01";
pub const OTHER_MANAGER: &str = "manager-key-02";
pub const VERIFIER: &str = "verifier-key-1";
pub const INVESTOR: &str = "investor-key-1";
pub const INVESTOR_2: &str = "investor-key-2";

pub const API_KEYS: &str = "admin-key-0001:admin:root,\
    manager-key-01:asset_manager:mgr-1,\
    manager-key-02:asset_manager:mgr-2,\
    verifier-key-1:verifier:ver-1,\
    investor-key-1:investor:inv-1,\
    investor-key-2:investor:inv-2";

pub struct TestApp {
    pub router: Router,
    pub ledger: Arc<InMemoryLedger>,
    pub clock: Arc<ManualClock>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_rate_limit(RateLimitConfig::default())
    }

    pub fn with_rate_limit(rate_limit: RateLimitConfig) -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            ledger.clone(),
            clock.clone(),
            ApiKeyRegistry::parse(API_KEYS).unwrap(),
            &rate_limit,
        )
        .unwrap();
        Self {
            router: create_router(state),
            ledger,
            clock,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        key: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        self.send(build_request(method, uri, key, body, None)).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.call(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, key: &str, body: Value) -> TestResponse {
        self.call(Method::POST, uri, Some(key), Some(body)).await
    }

    pub async fn put(&self, uri: &str, key: &str, body: Value) -> TestResponse {
        self.call(Method::PUT, uri, Some(key), Some(body)).await
    }

    /// Lists an asset as `key` and returns its id.
    pub async fn create_asset(&self, key: &str, name: &str, valuation: u64) -> String {
        let res = self
            .post(
                "/api/assets",
                key,
                serde_json::json!({
                    "name": name,
                    "description": "Three-storey office block",
                    "category": "real_estate",
                    "location": "Lisbon",
                    "valuation": valuation,
                    "metadata": { "floors": 3 }
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.data()["id"].as_str().unwrap().to_string()
    }

    /// Runs start_review + approve as the verifier.
    pub async fn verify_asset(&self, id: &str) {
        for action in ["start_review", "approve"] {
            let res = self
                .post(
                    &format!("/api/assets/{}/verify", id),
                    VERIFIER,
                    serde_json::json!({ "action": action }),
                )
                .await;
            assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        }
    }
}

pub fn build_request(
    method: Method,
    uri: &str,
    key: Option<&str>,
    body: Option<Value>,
    peer: Option<SocketAddr>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let mut request = builder.body(body).unwrap();
    if let Some(peer) = peer {
        request.extensions_mut().insert(ConnectInfo(peer));
    }
    request
}
