use credential::CredentialService;
use msgcrypt::MessageCrypto;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use wxkeeper::{AppState, create_router};
use wxkeeper_common::MemoryStorage;
use wxkeeper_common::config::{CredentialConfig, UpstreamConfig};

const AES_KEY: &str = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn start_test_server() -> TestServer {
    // 上游地址不可达，获取立即失败
    let config = CredentialConfig {
        upstream: UpstreamConfig {
            mp_base_url: "http://127.0.0.1:1/cgi-bin".to_string(),
            work_base_url: "http://127.0.0.1:1/work/cgi-bin".to_string(),
            timeout_seconds: 2,
        },
        ..Default::default()
    };
    let service = CredentialService::new(Arc::new(MemoryStorage::new()), config)
        .expect("Failed to create credential service");
    let app = create_router(AppState::new(service));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to read bound addr");
    let base_url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("wxkeeper test server exited unexpectedly");
    });

    TestServer { base_url, handle }
}

async fn register(client: &reqwest::Client, base_url: &str, body: Value) -> reqwest::Response {
    client
        .post(format!("{base_url}/tenants"))
        .json(&body)
        .send()
        .await
        .expect("register request failed")
}

#[tokio::test]
async fn test_http_tenant_lifecycle() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let health = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .expect("health request failed");
    assert_eq!(health.status(), StatusCode::OK);
    let health_json: Value = health.json().await.expect("health body should be json");
    assert_eq!(health_json["status"], "healthy");
    assert_eq!(health_json["tenants"], 0);

    let resp = register(
        &client,
        &server.base_url,
        json!({ "app_type": 9, "appid": "store1", "app_secret": "s" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let view: Value = resp.json().await.expect("register body should be json");
    assert_eq!(view["appid"], "store1");
    assert_eq!(view["access_token"], "");
    assert_eq!(view["retry"], 1);

    let list: Value = client
        .get(format!("{}/tenants", server.base_url))
        .send()
        .await
        .expect("list request failed")
        .json()
        .await
        .expect("list body should be json");
    assert_eq!(list["tenants"], json!(["store1"]));

    let token = client
        .get(format!("{}/tenants/store1/token", server.base_url))
        .send()
        .await
        .expect("token request failed");
    assert_eq!(token.status(), StatusCode::OK);

    for _ in 0..2 {
        let removed = client
            .delete(format!("{}/tenants/store1", server.base_url))
            .send()
            .await
            .expect("delete request failed");
        assert_eq!(removed.status(), StatusCode::NO_CONTENT);
    }

    let missing = client
        .get(format!("{}/tenants/store1/token", server.base_url))
        .send()
        .await
        .expect("token request failed");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body: Value = missing.json().await.expect("error body should be json");
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn test_http_register_validation_error() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = register(
        &client,
        &server.base_url,
        json!({ "app_type": 10, "appid": "mch1", "app_secret": "key" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("error body should be json");
    assert_eq!(
        body["error"],
        "Required fields missing: token, encoding_aes_key, notify_uri"
    );
}

#[tokio::test]
async fn test_http_failed_acquisition_and_refresh_gate() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = register(
        &client,
        &server.base_url,
        json!({ "app_type": 4, "appid": "wx_app", "app_secret": "s" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let view: Value = resp.json().await.expect("register body should be json");
    assert_eq!(view["access_token"], "");
    assert_eq!(view["retry"], 1);

    let refresh = |errcode: i64| {
        client
            .post(format!("{}/tenants/wx_app/refresh", server.base_url))
            .json(&json!({ "errcode": errcode }))
            .send()
    };

    let body: Value = refresh(40013).await.unwrap().json().await.unwrap();
    assert_eq!(body["refreshed"], false);

    let body: Value = refresh(42001).await.unwrap().json().await.unwrap();
    assert_eq!(body["refreshed"], true);

    let body: Value = refresh(42001).await.unwrap().json().await.unwrap();
    assert_eq!(body["refreshed"], false);
}

#[tokio::test]
async fn test_http_webhook_verification_and_decrypt() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = register(
        &client,
        &server.base_url,
        json!({
            "app_type": 1,
            "appid": "wx_serve",
            "app_secret": "s",
            "token": "pamtest",
            "encoding_aes_key": AES_KEY
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let crypto = MessageCrypto::new("pamtest", AES_KEY, "wx_serve").unwrap();
    let echo = crypto.encrypt(b"echo-1234", "1409304348", "nonce1").unwrap();

    let verified = client
        .get(format!("{}/tenants/wx_serve/webhook", server.base_url))
        .query(&[
            ("msg_signature", echo.signature.as_str()),
            ("timestamp", echo.timestamp.as_str()),
            ("nonce", echo.nonce.as_str()),
            ("echostr", echo.encrypt.as_str()),
        ])
        .send()
        .await
        .expect("verify request failed");
    assert_eq!(verified.status(), StatusCode::OK);
    assert_eq!(verified.text().await.unwrap(), "echo-1234");

    let message = "<xml><Content><![CDATA[hello]]></Content></xml>";
    let envelope = crypto
        .encrypt(message.as_bytes(), "1409304349", "nonce2")
        .unwrap();
    let body = format!(
        "<xml><ToUserName><![CDATA[wx_serve]]></ToUserName><Encrypt><![CDATA[{}]]></Encrypt></xml>",
        envelope.encrypt
    );

    let decrypted = client
        .post(format!("{}/tenants/wx_serve/webhook", server.base_url))
        .query(&[
            ("msg_signature", envelope.signature.as_str()),
            ("timestamp", envelope.timestamp.as_str()),
            ("nonce", envelope.nonce.as_str()),
        ])
        .body(body.clone())
        .send()
        .await
        .expect("webhook request failed");
    assert_eq!(decrypted.status(), StatusCode::OK);
    assert_eq!(decrypted.text().await.unwrap(), message);

    let tampered = client
        .post(format!("{}/tenants/wx_serve/webhook", server.base_url))
        .query(&[
            ("msg_signature", envelope.signature.as_str()),
            ("timestamp", "1409304350"),
            ("nonce", envelope.nonce.as_str()),
        ])
        .body(body)
        .send()
        .await
        .expect("webhook request failed");
    assert_eq!(tampered.status(), StatusCode::UNAUTHORIZED);
}
