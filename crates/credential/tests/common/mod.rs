//! 上游接口的进程内模拟服务

#![allow(dead_code)]

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::routing::get;
use credential::CredentialService;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use wxkeeper_common::MemoryStorage;
use wxkeeper_common::config::{CredentialConfig, UpstreamConfig};

#[derive(Default)]
pub struct MockState {
    pub token_calls: AtomicUsize,
    pub ticket_calls: AtomicUsize,
    /// 非零时 token 接口返回该 errcode
    pub token_errcode: AtomicI64,
    /// 非零时 ticket 接口返回该 errcode
    pub ticket_errcode: AtomicI64,
    /// token 接口响应前等待的毫秒数
    pub token_delay_ms: AtomicU64,
    /// token 接口收到的 appid / corpid
    pub token_ids: Mutex<Vec<String>>,
    /// ticket 接口收到的 type
    pub ticket_types: Mutex<Vec<String>>,
}

impl MockState {
    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn ticket_calls(&self) -> usize {
        self.ticket_calls.load(Ordering::SeqCst)
    }

    pub fn fail_tokens_with(&self, errcode: i64) {
        self.token_errcode.store(errcode, Ordering::SeqCst);
    }

    pub fn fail_tickets_with(&self, errcode: i64) {
        self.ticket_errcode.store(errcode, Ordering::SeqCst);
    }

    pub fn delay_tokens(&self, ms: u64) {
        self.token_delay_ms.store(ms, Ordering::SeqCst);
    }

    pub fn token_ids(&self) -> Vec<String> {
        self.token_ids.lock().unwrap().clone()
    }

    pub fn ticket_types(&self) -> Vec<String> {
        self.ticket_types.lock().unwrap().clone()
    }
}

pub struct MockUpstream {
    pub base_url: String,
    pub state: Arc<MockState>,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl MockUpstream {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/cgi-bin/token", get(mp_token))
            .route("/cgi-bin/ticket/getticket", get(ticket))
            .route("/work/cgi-bin/gettoken", get(work_token))
            .route("/work/cgi-bin/ticket/get", get(ticket))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to read bound addr");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock upstream exited unexpectedly");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    pub fn credential_config(&self) -> CredentialConfig {
        CredentialConfig {
            upstream: UpstreamConfig {
                mp_base_url: format!("{}/cgi-bin", self.base_url),
                work_base_url: format!("{}/work/cgi-bin", self.base_url),
                timeout_seconds: 5,
            },
            ..Default::default()
        }
    }

    /// 基于内存存储的服务
    pub fn service(&self) -> (Arc<MemoryStorage>, CredentialService) {
        let storage = Arc::new(MemoryStorage::new());
        let service = CredentialService::new(storage.clone(), self.credential_config())
            .expect("Failed to create credential service");
        (storage, service)
    }
}

async fn issue_token(state: &MockState, id: Option<&String>) -> Json<Value> {
    let n = state.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let id = id.cloned().unwrap_or_default();
    state.token_ids.lock().unwrap().push(id.clone());

    let delay = state.token_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let errcode = state.token_errcode.load(Ordering::SeqCst);
    if errcode != 0 {
        return Json(json!({ "errcode": errcode, "errmsg": "mock failure" }));
    }
    Json(json!({ "access_token": format!("AT-{id}-{n}"), "expires_in": 7200 }))
}

async fn mp_token(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    assert_eq!(
        query.get("grant_type").map(String::as_str),
        Some("client_credential")
    );
    issue_token(&state, query.get("appid")).await
}

async fn work_token(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    issue_token(&state, query.get("corpid")).await
}

async fn ticket(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let n = state.ticket_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let ticket_type = query.get("type").cloned().unwrap_or_default();
    state.ticket_types.lock().unwrap().push(ticket_type.clone());

    let errcode = state.ticket_errcode.load(Ordering::SeqCst);
    if errcode != 0 || query.get("access_token").is_none_or(|t| t.is_empty()) {
        return Json(json!({ "errcode": errcode.max(41001), "errmsg": "mock failure" }));
    }
    Json(json!({
        "errcode": 0,
        "errmsg": "ok",
        "ticket": format!("{ticket_type}-{n}"),
        "expires_in": 7200
    }))
}
