//! JSON request and response bodies of the HTTP surface.

use crate::config::FirebaseConfig;
use crate::db::Booking;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub message: String,
    pub id: i64,
    /// `sent`, `skipped` or `failed`; the booking is stored regardless.
    pub sms: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct VerifySendRequest {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCheckRequest {
    pub phone: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyCheckResponse {
    pub verified: bool,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current: String,
    pub new: String,
}

#[derive(Debug, Deserialize)]
pub struct TestSmsRequest {
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingList {
    pub total: i64,
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// Partial update of the panel-stored credentials. `None` leaves a field
/// alone, an empty string clears it.
#[derive(Debug, Default, Deserialize)]
pub struct SmsSettingsUpdate {
    pub telnyx_api_key: Option<String>,
    pub telnyx_from_number: Option<String>,
    pub smsapi_token: Option<String>,
    pub smsapi_sender: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SmsFieldView {
    pub value: Option<String>,
    pub source: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SmsSettingsView {
    pub telnyx_api_key: SmsFieldView,
    pub telnyx_from_number: SmsFieldView,
    pub smsapi_token: SmsFieldView,
    pub smsapi_sender: SmsFieldView,
    pub active_provider: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct AdminStatus {
    pub bookings: i64,
    pub active_sms_provider: Option<&'static str>,
    pub locked_ips: usize,
    pub password_source: &'static str,
    pub session_timeout_minutes: i64,
}

/// The four public identifiers the Firebase web SDK needs for the Google popup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseWebConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub app_id: String,
}

impl From<&FirebaseConfig> for FirebaseWebConfig {
    fn from(cfg: &FirebaseConfig) -> Self {
        Self {
            api_key: cfg.api_key.clone(),
            auth_domain: cfg.auth_domain.clone(),
            project_id: cfg.project_id.clone(),
            app_id: cfg.app_id.clone(),
        }
    }
}
