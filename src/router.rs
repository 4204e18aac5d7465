use axum::Router;
use axum::extract::FromRef;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post, put};
use axum_extra::extract::cookie::Key;
use chrono::Duration;
use rand::Rng;
use sha2::{Digest, Sha512};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::admin::{CookieSettings, IpAllowList};
use crate::config::Config;
use crate::db::BookingStorage;
use crate::error::BookingError;
use crate::handlers::{admin, booking, firebase, verify};
use crate::middleware::admin_gate;
use crate::middleware::security_headers::security_headers;
use crate::service::login_guard::{self, LoginGuardHandle, LoginPolicy};
use crate::service::sms_dispatcher::SmsDispatcher;
use crate::service::verification::VerificationService;

const BODY_LIMIT: usize = 64 * 1024;

#[derive(Clone)]
pub struct BookingState {
    pub config: Arc<Config>,
    pub storage: BookingStorage,
    pub sms: SmsDispatcher,
    pub verification: VerificationService,
    pub guard: LoginGuardHandle,
    pub allow_list: Arc<IpAllowList>,
    pub cookies: CookieSettings,
    key: Key,
}

impl BookingState {
    /// Open storage, spawn the login guard and build the SMS stack from `config`.
    pub async fn new(config: Arc<Config>) -> Result<Self, BookingError> {
        let storage = BookingStorage::connect(&config.basic.database_url).await?;
        let allow_list = IpAllowList::parse(&config.admin.allowed_ips)?;

        let guard = login_guard::spawn(
            LoginPolicy {
                max_attempts: config.admin.max_login_attempts,
                lockout: Duration::minutes(config.admin.lockout_minutes),
            },
            config.admin.lockout_file.clone(),
        )
        .await?;

        let sms = SmsDispatcher::new(config.sms.clone(), storage.clone())?;
        let verification = VerificationService::new(
            storage.clone(),
            sms.clone(),
            config.sms.verification_per_hour,
            config.sms.verification_ttl_minutes,
        );

        let cookies = CookieSettings {
            secure: !config.basic.insecure_cookie,
            timeout_minutes: config.admin.session_timeout_minutes,
        };
        let key = cookie_key(&config.basic.secret_key);

        Ok(Self {
            config,
            storage,
            sms,
            verification,
            guard,
            allow_list: Arc::new(allow_list),
            cookies,
            key,
        })
    }
}

impl FromRef<BookingState> for Key {
    fn from_ref(state: &BookingState) -> Self {
        state.key.clone()
    }
}

/// Private-cookie key: SHA-512 of the configured secret, or random bytes
/// when none is set (sessions then end with the process).
fn cookie_key(secret: &str) -> Key {
    if secret.is_empty() {
        warn!("SECRET_KEY not set; using a random cookie key, admin sessions will not survive a restart");
        let mut bytes = [0u8; 64];
        rand::thread_rng().fill(&mut bytes);
        return Key::from(&bytes);
    }
    if secret.len() < 32 {
        warn!("SECRET_KEY is shorter than 32 bytes; use a longer random value");
    }
    Key::from(&Sha512::digest(secret.as_bytes()))
}

pub fn booking_router(state: BookingState) -> Router {
    let gated = Router::new()
        .route("/status", get(admin::status))
        .route("/bookings", get(admin::list_bookings))
        .route("/bookings/{id}", delete(admin::delete_booking))
        .route(
            "/settings/sms",
            get(admin::get_sms_settings).put(admin::put_sms_settings),
        )
        .route("/password", put(admin::change_password))
        .route("/sms/test", post(admin::send_test_sms))
        .route_layer(from_fn_with_state(state.clone(), admin_gate));

    let admin_routes = Router::new()
        .route("/login", post(admin::login))
        .route("/setup", post(admin::setup))
        .route("/logout", post(admin::logout))
        .merge(gated);

    Router::new()
        .route("/", get(booking::booking_page))
        .route("/book", post(booking::create_booking))
        .route("/verify/send", post(verify::send_code))
        .route("/verify/check", post(verify::check_code))
        .route("/firebase-config.json", get(firebase::firebase_config))
        .nest("/admin", admin_routes)
        .layer(from_fn(security_headers))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
