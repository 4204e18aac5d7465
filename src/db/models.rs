use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Booking {
    pub id: i64,
    pub name: String,
    pub time: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub name: String,
    pub time: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct VerificationCode {
    pub phone: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: i64,
}

/// Keys of the admin-panel settings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    AdminPasswordHash,
    TelnyxApiKey,
    TelnyxFromNumber,
    SmsapiToken,
    SmsapiSender,
}

impl SettingKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::AdminPasswordHash => "admin_password_hash",
            SettingKey::TelnyxApiKey => "telnyx_api_key",
            SettingKey::TelnyxFromNumber => "telnyx_from_number",
            SettingKey::SmsapiToken => "smsapi_token",
            SettingKey::SmsapiSender => "smsapi_sender",
        }
    }
}

/// SMS provider credentials as saved through the admin panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelSmsSettings {
    pub telnyx_api_key: Option<String>,
    pub telnyx_from_number: Option<String>,
    pub smsapi_token: Option<String>,
    pub smsapi_sender: Option<String>,
}
