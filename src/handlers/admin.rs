use axum::{
    Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use std::net::IpAddr;
use tracing::{info, warn};

use crate::admin::AdminSession;
use crate::admin::password::{hash_password, verify_password};
use crate::db::SettingKey;
use crate::middleware::{ClientIp, ensure_ip_permitted};
use crate::service::sms_dispatcher::{ResolvedField, SmsOutcome};
use crate::types::dto::{
    AdminStatus, BookingList, ChangePasswordRequest, ListQuery, MessageResponse, PasswordRequest,
    SmsFieldView, SmsSettingsUpdate, SmsSettingsView, TestSmsRequest,
};
use crate::types::phone::normalize_e164;
use crate::{BookingError, router::BookingState};

const MIN_PASSWORD_LEN: usize = 8;
const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 1000;

/// Hash in effect and where it came from. The configured hash (env or
/// config file) shadows the one saved through the panel.
async fn effective_password_hash(
    state: &BookingState,
) -> Result<Option<(String, &'static str)>, BookingError> {
    let configured = state.config.admin.password_hash.trim();
    if !configured.is_empty() {
        return Ok(Some((configured.to_string(), "env")));
    }
    let stored = state
        .storage
        .get_setting(SettingKey::AdminPasswordHash)
        .await?
        .filter(|h| !h.trim().is_empty());
    Ok(stored.map(|h| (h, "panel")))
}

fn validate_new_password(password: &str) -> Result<(), BookingError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(BookingError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    Ok(())
}

/// Record a wrong password for `ip`; the failure that trips the lock
/// answers with the lockout rather than a plain 401.
async fn reject_password(state: &BookingState, ip: IpAddr) -> BookingError {
    match state.guard.record_failure(ip).await {
        Ok(true) => BookingError::LockedOut(state.guard.policy().lockout.num_minutes()),
        Ok(false) => BookingError::InvalidPassword,
        Err(e) => e,
    }
}

/// POST /admin/login
pub async fn login(
    State(state): State<BookingState>,
    ClientIp(ip): ClientIp,
    jar: PrivateCookieJar,
    Json(req): Json<PasswordRequest>,
) -> Result<(PrivateCookieJar, Json<MessageResponse>), BookingError> {
    ensure_ip_permitted(&state, ip).await?;

    let Some((hash, _)) = effective_password_hash(&state).await? else {
        return Err(BookingError::AdminNotConfigured);
    };

    if !verify_password(&req.password, &hash) {
        return Err(reject_password(&state, ip).await);
    }

    state.guard.clear(ip).await;
    let jar = state.cookies.store(jar, &AdminSession::start(Utc::now()))?;
    info!(ip = %ip, "admin logged in");
    Ok((jar, Json(MessageResponse::new("Logged in"))))
}

/// POST /admin/setup -> first-time password, only while none exists.
pub async fn setup(
    State(state): State<BookingState>,
    ClientIp(ip): ClientIp,
    Json(req): Json<PasswordRequest>,
) -> Result<Json<MessageResponse>, BookingError> {
    ensure_ip_permitted(&state, ip).await?;

    if effective_password_hash(&state).await?.is_some() {
        return Err(BookingError::Conflict(
            "Admin password is already set.".to_string(),
        ));
    }
    validate_new_password(&req.password)?;

    state
        .storage
        .put_setting(SettingKey::AdminPasswordHash, &hash_password(&req.password))
        .await?;
    info!(ip = %ip, "admin password initialised");
    Ok(Json(MessageResponse::new("Admin password set. Please login.")))
}

/// POST /admin/logout
pub async fn logout(
    State(state): State<BookingState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Json<MessageResponse>) {
    (
        state.cookies.clear(jar),
        Json(MessageResponse::new("Logged out")),
    )
}

/// GET /admin/status
pub async fn status(State(state): State<BookingState>) -> Result<Json<AdminStatus>, BookingError> {
    let creds = state.sms.credentials().await?;
    let password_source = effective_password_hash(&state)
        .await?
        .map(|(_, source)| source)
        .unwrap_or("unset");

    Ok(Json(AdminStatus {
        bookings: state.storage.count_bookings().await?,
        active_sms_provider: creds.active_provider().map(|p| p.as_str()),
        locked_ips: state.guard.locked_count().await?,
        password_source,
        session_timeout_minutes: state.config.admin.session_timeout_minutes,
    }))
}

/// GET /admin/bookings?limit=N -> newest first.
pub async fn list_bookings(
    State(state): State<BookingState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<BookingList>, BookingError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    Ok(Json(BookingList {
        total: state.storage.count_bookings().await?,
        bookings: state.storage.list_bookings(limit).await?,
    }))
}

/// DELETE /admin/bookings/{id}
pub async fn delete_booking(
    State(state): State<BookingState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, BookingError> {
    if !state.storage.delete_booking(id).await? {
        return Err(BookingError::NotFound);
    }
    info!(booking_id = id, "booking deleted by admin");
    Ok(Json(MessageResponse::new(format!("Booking {id} deleted"))))
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

fn field_view(field: &ResolvedField, secret: bool) -> SmsFieldView {
    SmsFieldView {
        value: field
            .get()
            .map(|v| if secret { mask_secret(v) } else { v.to_string() }),
        source: field.source.as_str(),
    }
}

async fn sms_settings_view(state: &BookingState) -> Result<SmsSettingsView, BookingError> {
    let creds = state.sms.credentials().await?;
    Ok(SmsSettingsView {
        telnyx_api_key: field_view(&creds.telnyx_api_key, true),
        telnyx_from_number: field_view(&creds.telnyx_from_number, false),
        smsapi_token: field_view(&creds.smsapi_token, true),
        smsapi_sender: field_view(&creds.smsapi_sender, false),
        active_provider: creds.active_provider().map(|p| p.as_str()),
    })
}

/// GET /admin/settings/sms
pub async fn get_sms_settings(
    State(state): State<BookingState>,
) -> Result<Json<SmsSettingsView>, BookingError> {
    Ok(Json(sms_settings_view(&state).await?))
}

/// PUT /admin/settings/sms -> save panel credentials; environment values still win.
pub async fn put_sms_settings(
    State(state): State<BookingState>,
    Json(update): Json<SmsSettingsUpdate>,
) -> Result<Json<SmsSettingsView>, BookingError> {
    let from_number = match update.telnyx_from_number.as_deref().map(str::trim) {
        Some("") => Some(String::new()),
        Some(raw) => Some(normalize_e164(raw, &state.config.sms.default_country_code)?),
        None => None,
    };

    let changes = [
        (SettingKey::TelnyxApiKey, update.telnyx_api_key),
        (SettingKey::TelnyxFromNumber, from_number),
        (SettingKey::SmsapiToken, update.smsapi_token),
        (SettingKey::SmsapiSender, update.smsapi_sender),
    ];
    for (key, value) in changes {
        match value.as_deref().map(str::trim) {
            None => {}
            Some("") => state.storage.delete_setting(key).await?,
            Some(v) => state.storage.put_setting(key, v).await?,
        }
    }

    let view = sms_settings_view(&state).await?;
    let shadowed = [
        &view.telnyx_api_key,
        &view.telnyx_from_number,
        &view.smsapi_token,
        &view.smsapi_sender,
    ]
    .iter()
    .filter(|f| f.source == "env")
    .count();
    if shadowed > 0 {
        warn!(shadowed, "some SMS settings are overridden by environment variables");
    }
    info!(active_provider = ?view.active_provider, "SMS settings updated");
    Ok(Json(view))
}

/// PUT /admin/password -> change the panel-stored password.
pub async fn change_password(
    State(state): State<BookingState>,
    ClientIp(ip): ClientIp,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, BookingError> {
    let Some((hash, source)) = effective_password_hash(&state).await? else {
        return Err(BookingError::AdminNotConfigured);
    };
    if source == "env" {
        return Err(BookingError::Conflict(
            "Admin password is managed by ADMIN_PASSWORD_HASH.".to_string(),
        ));
    }
    if !verify_password(&req.current, &hash) {
        return Err(reject_password(&state, ip).await);
    }
    validate_new_password(&req.new)?;

    state
        .storage
        .put_setting(SettingKey::AdminPasswordHash, &hash_password(&req.new))
        .await?;
    info!(ip = %ip, "admin password changed");
    Ok(Json(MessageResponse::new("Password changed")))
}

/// POST /admin/sms/test -> send a test message through the active provider.
pub async fn send_test_sms(
    State(state): State<BookingState>,
    Json(req): Json<TestSmsRequest>,
) -> Result<Json<MessageResponse>, BookingError> {
    let phone = normalize_e164(&req.phone, &state.config.sms.default_country_code)?;
    match state
        .sms
        .send(&phone, "Test message from the booking admin panel.")
        .await?
    {
        SmsOutcome::Sent(sent) => Ok(Json(MessageResponse::new(format!(
            "Test SMS sent via {}",
            sent.provider
        )))),
        SmsOutcome::Skipped => Err(BookingError::SmsNotConfigured),
    }
}
