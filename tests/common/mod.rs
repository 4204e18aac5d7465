#![allow(dead_code)]

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use booking_desk::config::Config;
use booking_desk::{BookingState, booking_router};
use serde_json::{Value, json};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

pub const TEST_SECRET: &str = "test-secret-key-0123456789-abcdefghijklmnopqrstuvwxyz";

pub fn temp_path(tag: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "booking-desk-{tag}-{}-{nanos}.{ext}",
        std::process::id()
    ));
    path
}

/// Config isolated from the repo's `config.toml` and the environment.
pub fn test_config(tag: &str) -> Config {
    let mut cfg = Config::default();
    cfg.basic.database_url = format!("sqlite:{}", temp_path(tag, "sqlite").display());
    cfg.basic.secret_key = TEST_SECRET.to_string();
    cfg.basic.trust_proxy_headers = true;
    cfg.admin.lockout_file = temp_path(tag, "json");
    cfg
}

pub async fn build_state(cfg: Config) -> BookingState {
    BookingState::new(Arc::new(cfg))
        .await
        .expect("failed to build state")
}

pub async fn build_app(cfg: Config) -> (Router, BookingState) {
    let state = build_state(cfg).await;
    (booking_router(state.clone()), state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub text: String,
}

impl TestResponse {
    /// `name=value` of the session cookie set by this response, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("admin_session="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }

    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    ip: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", ip);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let req = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("failed to build request");

    let resp = app.clone().oneshot(req).await.expect("request failed");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let text = String::from_utf8_lossy(&bytes).into_owned();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    TestResponse {
        status,
        headers,
        body,
        text,
    }
}

#[derive(Debug, Clone)]
pub struct VendorRequest {
    pub vendor: &'static str,
    pub authorization: Option<String>,
    pub body: String,
}

impl VendorRequest {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }

    pub fn form(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.body.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VendorMode {
    Accept,
    Reject,
}

#[derive(Clone)]
struct FakeState {
    mode: VendorMode,
    log: Arc<Mutex<Vec<VendorRequest>>>,
}

impl FakeState {
    fn record(&self, vendor: &'static str, headers: &HeaderMap, body: String) {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.log.lock().unwrap().push(VendorRequest {
            vendor,
            authorization,
            body,
        });
    }
}

/// Local stand-in for the Telnyx and SMSAPI endpoints.
pub struct FakeVendors {
    pub telnyx_url: Url,
    pub smsapi_url: Url,
    log: Arc<Mutex<Vec<VendorRequest>>>,
}

impl FakeVendors {
    pub async fn start(mode: VendorMode) -> Self {
        let log = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            mode,
            log: log.clone(),
        };
        let app = Router::new()
            .route("/telnyx/messages", post(fake_telnyx))
            .route("/smsapi/sms.do", post(fake_smsapi))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            telnyx_url: Url::parse(&format!("http://{addr}/telnyx")).unwrap(),
            smsapi_url: Url::parse(&format!("http://{addr}/smsapi")).unwrap(),
            log,
        }
    }

    pub fn point(&self, cfg: &mut Config) {
        cfg.sms.telnyx_base_url = self.telnyx_url.clone();
        cfg.sms.smsapi_base_url = self.smsapi_url.clone();
    }

    pub fn requests(&self) -> Vec<VendorRequest> {
        self.log.lock().unwrap().clone()
    }
}

async fn fake_telnyx(State(s): State<FakeState>, headers: HeaderMap, body: String) -> Response {
    s.record("telnyx", &headers, body);
    match s.mode {
        VendorMode::Accept => Json(json!({ "data": { "id": "tx-msg-1" } })).into_response(),
        VendorMode::Reject => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "errors": [{
                    "code": "40305",
                    "title": "Invalid 'from' address",
                    "detail": "The 'from' number is not associated with this account"
                }]
            })),
        )
            .into_response(),
    }
}

async fn fake_smsapi(State(s): State<FakeState>, headers: HeaderMap, body: String) -> Response {
    s.record("smsapi", &headers, body);
    match s.mode {
        VendorMode::Accept => {
            Json(json!({ "count": 1, "list": [{ "id": "sa-msg-1", "status": "QUEUE" }] }))
                .into_response()
        }
        VendorMode::Reject => {
            Json(json!({ "error": 101, "message": "Authorization failed" })).into_response()
        }
    }
}
