//! HTTP 管理与推送回调接口
//!
//! - `/tenants`: 租户注册、列表、移除
//! - `/tenants/{id}/token`: 当前凭证和票据
//! - `/tenants/{id}/refresh`: 按上游 errcode 请求强制刷新
//! - `/tenants/{id}/webhook`: 回调地址校验与推送消息解密

use crate::error::ApiError;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use credential::{CredentialService, TenantContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};
use wxkeeper_common::{TenantConfig, TicketType};

/// HTTP 接口共享状态
#[derive(Clone)]
pub struct AppState {
    pub service: CredentialService,
}

impl AppState {
    pub fn new(service: CredentialService) -> Self {
        Self { service }
    }
}

/// 租户凭证视图
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenView {
    pub appid: String,
    pub access_token: String,
    pub tickets: BTreeMap<TicketType, String>,
    pub expire_time: DateTime<Utc>,
    pub retry: i64,
}

impl TokenView {
    async fn of(context: &TenantContext) -> Self {
        context.current_token().await;
        let config = context.snapshot().await;
        Self {
            appid: config.appid,
            access_token: config.access_token,
            tickets: config.tickets,
            expire_time: config.expire_time,
            retry: config.retry,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub errcode: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub refreshed: bool,
}

#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    pub msg_signature: String,
    pub timestamp: String,
    pub nonce: String,
    pub echostr: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/tenants", post(register_handler).get(list_handler))
        .route("/tenants/{id}", delete(remove_handler))
        .route("/tenants/{id}/token", get(token_handler))
        .route("/tenants/{id}/refresh", post(refresh_handler))
        .route(
            "/tenants/{id}/webhook",
            get(verify_url_handler).post(webhook_handler),
        )
        .with_state(state)
}

async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    debug!("Health check requested");
    let tenants = state.service.list_ids().await?.len();

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": "wxkeeper",
        "tenants": tenants,
        "timestamp": Utc::now().timestamp(),
    })))
}

async fn register_handler(
    State(state): State<AppState>,
    Json(config): Json<TenantConfig>,
) -> Result<(StatusCode, Json<TokenView>), ApiError> {
    info!("Registering tenant {} ({})", config.appid, config.category);
    let context = state.service.register(config).await?;
    Ok((StatusCode::CREATED, Json(TokenView::of(&context).await)))
}

async fn list_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let tenants = state.service.list_ids().await?;
    Ok(Json(serde_json::json!({ "tenants": tenants })))
}

async fn remove_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.remove(&id).await?;
    info!("Tenant {} removed", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn token_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TokenView>, ApiError> {
    let context = state.service.load(&id).await?;
    Ok(Json(TokenView::of(&context).await))
}

async fn refresh_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let context = state.service.load(&id).await?;
    let refreshed = context.try_force_refresh(request.errcode).await;
    Ok(Json(RefreshResponse { refreshed }))
}

async fn verify_url_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<WebhookQuery>,
) -> Result<String, ApiError> {
    let echostr = query
        .echostr
        .ok_or_else(|| ApiError::BadRequest("echostr is required".to_string()))?;

    let crypto = state.service.load(&id).await?.message_crypto().await?;
    let plain = crypto.verify_url(&query.msg_signature, &query.timestamp, &query.nonce, &echostr)?;
    debug!("Tenant {} webhook url verified", id);
    Ok(String::from_utf8_lossy(&plain).into_owned())
}

async fn webhook_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<WebhookQuery>,
    body: String,
) -> Result<String, ApiError> {
    let crypto = state.service.load(&id).await?.message_crypto().await?;
    let plain = crypto.decrypt_xml(&query.msg_signature, &query.timestamp, &query.nonce, &body)?;
    debug!("Tenant {} webhook message decrypted ({} bytes)", id, plain.len());
    Ok(String::from_utf8_lossy(&plain).into_owned())
}
