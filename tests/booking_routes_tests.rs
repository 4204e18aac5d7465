mod common;

use axum::http::{StatusCode, header};
use booking_desk::db::SettingKey;
use common::{FakeVendors, VendorMode, build_app, call, test_config};
use serde_json::json;

const IP: &str = "203.0.113.20";

#[tokio::test]
async fn booking_without_phone_is_stored_and_skips_sms() {
    let (app, state) = build_app(test_config("book-plain")).await;

    let resp = call(
        &app,
        "POST",
        "/book",
        IP,
        None,
        Some(json!({ "name": "  Andy ", "time": "10:00" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    assert_eq!(resp.body["message"], "Booking confirmed for Andy at 10:00!");
    assert_eq!(resp.body["sms"], "skipped");

    let stored = state.storage.list_bookings(10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, resp.body["id"].as_i64().unwrap());
    assert_eq!(stored[0].name, "Andy");
    assert!(stored[0].phone.is_none());
}

#[tokio::test]
async fn booking_requires_name_and_time() {
    let (app, state) = build_app(test_config("book-invalid")).await;

    let resp = call(&app, "POST", "/book", IP, None, Some(json!({ "name": "Andy" }))).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error(), "Both name and time are required.");

    let resp = call(
        &app,
        "POST",
        "/book",
        IP,
        None,
        Some(json!({ "name": "Andy", "time": "10:00", "phone": "12ab" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    assert_eq!(state.storage.count_bookings().await.unwrap(), 0);
}

#[tokio::test]
async fn booking_with_phone_sends_confirmation() {
    let vendors = FakeVendors::start(VendorMode::Accept).await;
    let mut cfg = test_config("book-sms");
    vendors.point(&mut cfg);
    cfg.sms.telnyx_api_key = "KEY-test".into();
    cfg.sms.telnyx_from_number = "+447700900001".into();
    let (app, state) = build_app(cfg).await;

    let resp = call(
        &app,
        "POST",
        "/book",
        IP,
        None,
        Some(json!({ "name": "Andy", "time": "10:00", "phone": "07123 456789" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    assert_eq!(resp.body["sms"], "sent");

    let requests = vendors.requests();
    assert_eq!(requests.len(), 1);
    let body = requests[0].json();
    assert_eq!(body["to"], "+447123456789");
    assert!(body["text"].as_str().unwrap().contains("Andy"));

    let stored = state.storage.list_bookings(1).await.unwrap();
    assert_eq!(stored[0].phone.as_deref(), Some("+447123456789"));
}

#[tokio::test]
async fn vendor_failure_does_not_lose_the_booking() {
    let vendors = FakeVendors::start(VendorMode::Reject).await;
    let mut cfg = test_config("book-sms-fail");
    vendors.point(&mut cfg);
    cfg.sms.smsapi_token = "bad-token".into();
    let (app, state) = build_app(cfg).await;

    let resp = call(
        &app,
        "POST",
        "/book",
        IP,
        None,
        Some(json!({ "name": "Andy", "time": "10:00", "phone": "+447123456789" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["sms"], "failed");
    assert_eq!(state.storage.count_bookings().await.unwrap(), 1);
}

#[tokio::test]
async fn booking_page_inlines_firebase_config() {
    let mut cfg = test_config("book-page");
    cfg.firebase.api_key = "AIza-test".into();
    cfg.firebase.auth_domain = "demo.firebaseapp.com".into();
    cfg.firebase.project_id = "demo</script>".into();
    let (app, _state) = build_app(cfg).await;

    let resp = call(&app, "GET", "/", IP, None, None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let content_type = resp.headers.get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/html"));
    assert!(resp.text.contains("\"apiKey\":\"AIza-test\""));
    assert!(resp.text.contains("demo\\u003c/script>"));
    assert!(!resp.text.contains("__FIREBASE_CONFIG__"));
    assert!(resp.headers.contains_key("content-security-policy"));
}

#[tokio::test]
async fn firebase_config_endpoint_reflects_configuration() {
    let (app, _state) = build_app(test_config("fb-missing")).await;
    let resp = call(&app, "GET", "/firebase-config.json", IP, None, None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let page = call(&app, "GET", "/", IP, None, None).await;
    assert!(page.text.contains("window.FIREBASE_CONFIG = null;"));

    let mut cfg = test_config("fb-present");
    cfg.firebase.api_key = "AIza-test".into();
    cfg.firebase.auth_domain = "demo.firebaseapp.com".into();
    cfg.firebase.project_id = "demo".into();
    let (app, _state) = build_app(cfg).await;
    let resp = call(&app, "GET", "/firebase-config.json", IP, None, None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["authDomain"], "demo.firebaseapp.com");
    assert_eq!(resp.body["projectId"], "demo");
}

#[tokio::test]
async fn verification_code_round_trip() {
    let vendors = FakeVendors::start(VendorMode::Accept).await;
    let mut cfg = test_config("verify-flow");
    vendors.point(&mut cfg);
    cfg.sms.smsapi_token = "token".into();
    let (app, state) = build_app(cfg).await;

    let resp = call(
        &app,
        "POST",
        "/verify/send",
        IP,
        None,
        Some(json!({ "phone": "07123456789" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);

    let pending = state
        .storage
        .get_verification("+447123456789")
        .await
        .unwrap()
        .expect("code stored");
    let sms = vendors.requests();
    assert!(sms[0].form("message").unwrap().contains(&pending.code));

    let wrong = if pending.code == "000000" { "111111" } else { "000000" };
    let resp = call(
        &app,
        "POST",
        "/verify/check",
        IP,
        None,
        Some(json!({ "phone": "+447123456789", "code": wrong })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error(), "Incorrect verification code.");

    let resp = call(
        &app,
        "POST",
        "/verify/check",
        IP,
        None,
        Some(json!({ "phone": "+447123456789", "code": pending.code })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["verified"], true);
    assert_eq!(resp.body["phone"], "+447123456789");

    let reused = call(
        &app,
        "POST",
        "/verify/check",
        IP,
        None,
        Some(json!({ "phone": "+447123456789", "code": pending.code })),
    )
    .await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verification_sends_are_rate_limited_per_phone() {
    let vendors = FakeVendors::start(VendorMode::Accept).await;
    let mut cfg = test_config("verify-limit");
    vendors.point(&mut cfg);
    cfg.sms.smsapi_token = "token".into();
    cfg.sms.verification_per_hour = 1;
    let (app, _state) = build_app(cfg).await;

    let send = |phone: &'static str| {
        let app = app.clone();
        async move {
            call(
                &app,
                "POST",
                "/verify/send",
                IP,
                None,
                Some(json!({ "phone": phone })),
            )
            .await
        }
    };

    assert_eq!(send("+447123456789").await.status, StatusCode::OK);
    assert_eq!(
        send("+447123456789").await.status,
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(send("+447123456780").await.status, StatusCode::OK);
}

#[tokio::test]
async fn verification_without_provider_is_unavailable_and_keeps_quota() {
    let vendors = FakeVendors::start(VendorMode::Accept).await;
    let mut cfg = test_config("verify-nosms");
    vendors.point(&mut cfg);
    cfg.sms.verification_per_hour = 1;
    let (app, state) = build_app(cfg).await;

    let send = || call(
        &app,
        "POST",
        "/verify/send",
        IP,
        None,
        Some(json!({ "phone": "+447123456789" })),
    );

    for _ in 0..3 {
        let resp = send().await;
        assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
    }
    assert!(
        state
            .storage
            .get_verification("+447123456789")
            .await
            .unwrap()
            .is_none()
    );

    state
        .storage
        .put_setting(SettingKey::SmsapiToken, "panel-token")
        .await
        .unwrap();
    assert_eq!(send().await.status, StatusCode::OK);
    assert_eq!(vendors.requests().len(), 1);
    assert_eq!(send().await.status, StatusCode::TOO_MANY_REQUESTS);
}
