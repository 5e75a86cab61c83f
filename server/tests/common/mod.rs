#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use mailroute::{CloudflareGateway, Database};
use mailroute_server::{build_router, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const TOKEN: &str = "cf-token-abcd1234";

/// What the fake Cloudflare API has seen.
#[derive(Default)]
pub struct FakeCloudflare {
    pub next_rule: u32,
    pub created: Vec<Value>,
    pub deleted: Vec<(String, String)>,
    pub refuse_delete: bool,
}

pub type Recorder = Arc<Mutex<FakeCloudflare>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TOKEN))
}

fn denied() -> (StatusCode, Json<Value>) {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"success": false, "errors": [{"code": 10000, "message": "Authentication error"}]})),
    )
}

/// Serves a fake Cloudflare API with zones `Z` (example.com) and `Y` (example.org).
pub async fn spawn_cloudflare(recorder: Recorder) -> String {
    let app = Router::new()
        .route(
            "/zones",
            get(|headers: HeaderMap| async move {
                if !authorized(&headers) {
                    return denied();
                }
                (
                    StatusCode::OK,
                    Json(json!({"success": true, "result": [
                        {"id": "Z", "name": "example.com", "status": "active"},
                        {"id": "Y", "name": "example.org", "status": "active"}
                    ]})),
                )
            }),
        )
        .route(
            "/zones/{zone_id}",
            get(|headers: HeaderMap, Path(zone_id): Path<String>| async move {
                if !authorized(&headers) {
                    return denied();
                }
                let name = match zone_id.as_str() {
                    "Z" => "example.com",
                    "Y" => "example.org",
                    _ => {
                        return (
                            StatusCode::NOT_FOUND,
                            Json(json!({"success": false, "errors": [{"code": 1001, "message": "Invalid zone identifier"}]})),
                        )
                    }
                };
                (
                    StatusCode::OK,
                    Json(json!({"success": true, "result": {"id": zone_id, "name": name}})),
                )
            }),
        )
        .route(
            "/zones/{zone_id}/email/routing/rules",
            post(
                |State(rec): State<Recorder>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    if !authorized(&headers) {
                        return denied();
                    }
                    let mut rec = rec.lock().unwrap();
                    rec.next_rule += 1;
                    rec.created.push(body);
                    (
                        StatusCode::OK,
                        Json(json!({"success": true, "result": {"id": format!("rule-{}", rec.next_rule)}})),
                    )
                },
            ),
        )
        .route(
            "/zones/{zone_id}/email/routing/rules/{rule_id}",
            delete(
                |State(rec): State<Recorder>,
                 headers: HeaderMap,
                 Path((zone_id, rule_id)): Path<(String, String)>| async move {
                    if !authorized(&headers) {
                        return denied();
                    }
                    let mut rec = rec.lock().unwrap();
                    if rec.refuse_delete {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({"success": false, "errors": [], "message": "Rule is locked"})),
                        );
                    }
                    rec.deleted.push((zone_id, rule_id.clone()));
                    (
                        StatusCode::OK,
                        Json(json!({"success": true, "result": {"id": rule_id}})),
                    )
                },
            ),
        )
        .with_state(recorder);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{}", addr)
}

/// A running service plus the fake Cloudflare it talks to.
pub struct TestApp {
    pub base: String,
    pub client: reqwest::Client,
    pub cloudflare: Recorder,
    _dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(false).await
    }

    pub async fn spawn_with(reveal_secrets: bool) -> Self {
        let cloudflare = Recorder::default();
        let api_base = spawn_cloudflare(cloudflare.clone()).await;

        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("mailroute.db")).unwrap();
        let state = AppState::new(db, CloudflareGateway::new(api_base), None, reveal_secrets);
        let app = build_router(state, "/api");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        Self {
            base: format!("http://{}/api", addr),
            client: reqwest::Client::new(),
            cloudflare,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    pub async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self.client.put(self.url(path)).json(&body).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    pub async fn delete(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .delete(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    /// Saves a working credential set.
    pub async fn configure(&self) {
        let (status, _) = self.post("/cloudflare/config", config_body(TOKEN, &[])).await;
        assert_eq!(status, 200);
    }
}

pub fn config_body(token: &str, emails: &[&str]) -> Value {
    json!({
        "apiToken": token,
        "accountId": "account-5678",
        "d1Database": "d1-db-9012",
        "workerApi": "https://worker.example.dev",
        "kvStorage": "kv-namespace-3456",
        "destinationEmails": emails,
    })
}
