use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use url::Url;

/// String-typed settings. Their `BOOKING_*` values are re-merged verbatim so
/// an E.164 number or an all-digit secret is not parsed into an integer.
const STRING_KEYS: &[&str] = &[
    "basic.database_url",
    "basic.loglevel",
    "basic.secret_key",
    "admin.password_hash",
    "admin.lockout_file",
    "sms.telnyx_api_key",
    "sms.telnyx_from_number",
    "sms.smsapi_token",
    "sms.smsapi_sender",
    "sms.default_country_code",
    "firebase.api_key",
    "firebase.auth_domain",
    "firebase.project_id",
    "firebase.app_id",
];

/// Unprefixed environment variables honoured for compatibility with the
/// deployment docs. Later entries win, so `FLASK_SECRET_KEY` beats `SECRET_KEY`.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DATABASE_URL", "basic.database_url"),
    ("SECRET_KEY", "basic.secret_key"),
    ("FLASK_SECRET_KEY", "basic.secret_key"),
    ("ADMIN_PASSWORD_HASH", "admin.password_hash"),
    ("TELNYX_API_KEY", "sms.telnyx_api_key"),
    ("TELNYX_FROM_NUMBER", "sms.telnyx_from_number"),
    ("SMSAPI_TOKEN", "sms.smsapi_token"),
    ("SMSAPI_SENDER", "sms.smsapi_sender"),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub admin: AdminConfig,
    pub sms: SmsConfig,
    pub firebase: FirebaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: SocketAddr,
    pub database_url: String,
    pub loglevel: String,
    /// Cookie encryption secret. Empty means a random key per process.
    pub secret_key: String,
    /// Drop the `Secure` flag on cookies (plain-HTTP local development only).
    pub insecure_cookie: bool,
    /// Read the client address from the last `X-Forwarded-For` hop (or
    /// `X-Real-IP`). Only enable behind a proxy that appends to the header.
    pub trust_proxy_headers: bool,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            database_url: "sqlite:data/booking.sqlite".to_string(),
            loglevel: "info".to_string(),
            secret_key: String::new(),
            insecure_cookie: false,
            trust_proxy_headers: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// SHA-256 hex of the admin password. Takes precedence over the panel-stored hash.
    pub password_hash: String,
    pub max_login_attempts: u32,
    pub lockout_minutes: i64,
    pub session_timeout_minutes: i64,
    /// IPs or CIDR ranges; empty allows every address.
    pub allowed_ips: Vec<String>,
    pub lockout_file: PathBuf,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            password_hash: String::new(),
            max_login_attempts: 5,
            lockout_minutes: 30,
            session_timeout_minutes: 60,
            allowed_ips: Vec::new(),
            lockout_file: PathBuf::from("data/login_attempts.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    pub telnyx_api_key: String,
    pub telnyx_from_number: String,
    pub smsapi_token: String,
    pub smsapi_sender: String,
    pub telnyx_base_url: Url,
    pub smsapi_base_url: Url,
    /// Country code assumed for national numbers with a leading `0`.
    pub default_country_code: String,
    pub verification_ttl_minutes: i64,
    pub verification_per_hour: u32,
    pub request_timeout_secs: u64,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            telnyx_api_key: String::new(),
            telnyx_from_number: String::new(),
            smsapi_token: String::new(),
            smsapi_sender: String::new(),
            telnyx_base_url: Url::parse("https://api.telnyx.com/v2")
                .expect("static telnyx url is valid"),
            smsapi_base_url: Url::parse("https://api.smsapi.com")
                .expect("static smsapi url is valid"),
            default_country_code: "44".to_string(),
            verification_ttl_minutes: 10,
            verification_per_hour: 3,
            request_timeout_secs: 15,
        }
    }
}

/// Public Firebase web-app identifiers used by the Google sign-in popup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub app_id: String,
}

impl FirebaseConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.auth_domain.is_empty() && !self.project_id.is_empty()
    }
}

impl Config {
    /// Defaults, then `config.toml` (or `$BOOKING_CONFIG`), then `BOOKING_*`
    /// variables (`__` separates sections), then the well-known unprefixed ones.
    pub fn load() -> Result<Self, figment::Error> {
        let path = std::env::var("BOOKING_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

        let mut figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("BOOKING_").split("__"));

        let prefixed = STRING_KEYS.iter().map(|&key| (prefixed_var(key), key));
        let unprefixed = ENV_OVERRIDES
            .iter()
            .map(|&(var, key)| (var.to_string(), key));
        for (var, key) in prefixed.chain(unprefixed) {
            if let Ok(value) = std::env::var(&var) {
                figment = figment.merge(Serialized::global(key, value));
            }
        }
        figment.extract()
    }
}

/// `sms.telnyx_api_key` -> `BOOKING_SMS__TELNYX_API_KEY`
fn prefixed_var(key: &str) -> String {
    format!("BOOKING_{}", key.replace('.', "__").to_ascii_uppercase())
}
