use crate::api::{SentMessage, SmsProvider, SmsapiProvider, TelnyxProvider};
use crate::config::SmsConfig;
use crate::db::{BookingStorage, PanelSmsSettings};
use crate::error::BookingError;
use crate::types::phone::mask_phone;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Where an effective credential value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Env,
    Panel,
    Unset,
}

impl CredentialSource {
    pub fn as_str(self) -> &'static str {
        match self {
            CredentialSource::Env => "env",
            CredentialSource::Panel => "panel",
            CredentialSource::Unset => "unset",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub value: Option<String>,
    pub source: CredentialSource,
}

impl ResolvedField {
    fn resolve(env: &str, panel: Option<&str>) -> Self {
        let env = env.trim();
        if !env.is_empty() {
            return Self {
                value: Some(env.to_string()),
                source: CredentialSource::Env,
            };
        }
        match panel.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => Self {
                value: Some(v.to_string()),
                source: CredentialSource::Panel,
            },
            None => Self {
                value: None,
                source: CredentialSource::Unset,
            },
        }
    }

    pub fn get(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Effective provider credentials: environment values win per field,
/// admin-panel values fill the gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct SmsCredentials {
    pub telnyx_api_key: ResolvedField,
    pub telnyx_from_number: ResolvedField,
    pub smsapi_token: ResolvedField,
    pub smsapi_sender: ResolvedField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Telnyx,
    Smsapi,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Telnyx => "telnyx",
            ProviderKind::Smsapi => "smsapi",
        }
    }
}

impl SmsCredentials {
    pub fn resolve(env: &SmsConfig, panel: &PanelSmsSettings) -> Self {
        Self {
            telnyx_api_key: ResolvedField::resolve(
                &env.telnyx_api_key,
                panel.telnyx_api_key.as_deref(),
            ),
            telnyx_from_number: ResolvedField::resolve(
                &env.telnyx_from_number,
                panel.telnyx_from_number.as_deref(),
            ),
            smsapi_token: ResolvedField::resolve(&env.smsapi_token, panel.smsapi_token.as_deref()),
            smsapi_sender: ResolvedField::resolve(
                &env.smsapi_sender,
                panel.smsapi_sender.as_deref(),
            ),
        }
    }

    /// Telnyx needs both key and from-number; SMSAPI only the token.
    pub fn active_provider(&self) -> Option<ProviderKind> {
        if self.telnyx_api_key.get().is_some() && self.telnyx_from_number.get().is_some() {
            Some(ProviderKind::Telnyx)
        } else if self.smsapi_token.get().is_some() {
            Some(ProviderKind::Smsapi)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SmsOutcome {
    Sent(SentMessage),
    /// No provider configured; nothing was sent.
    Skipped,
}

/// Picks the provider at send time and delivers one message.
#[derive(Clone)]
pub struct SmsDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    client: reqwest::Client,
    config: SmsConfig,
    storage: BookingStorage,
}

impl SmsDispatcher {
    pub fn new(config: SmsConfig, storage: BookingStorage) -> Result<Self, BookingError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .user_agent(concat!("booking-desk/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(DispatcherInner {
                client,
                config,
                storage,
            }),
        })
    }

    pub fn config(&self) -> &SmsConfig {
        &self.inner.config
    }

    /// Resolve the credentials currently in effect.
    pub async fn credentials(&self) -> Result<SmsCredentials, BookingError> {
        let panel = self.inner.storage.load_sms_settings().await?;
        Ok(SmsCredentials::resolve(&self.inner.config, &panel))
    }

    /// Telnyx first, then SMSAPI, else skip. A vendor failure is returned
    /// as-is rather than falling through to the next provider.
    pub async fn send(&self, to: &str, body: &str) -> Result<SmsOutcome, BookingError> {
        let creds = self.credentials().await?;
        let Some(kind) = creds.active_provider() else {
            warn!(to = %mask_phone(to), "no SMS provider configured; skipping message");
            return Ok(SmsOutcome::Skipped);
        };

        let sent = match kind {
            ProviderKind::Telnyx => {
                let provider = TelnyxProvider::new(
                    self.inner.client.clone(),
                    self.inner.config.telnyx_base_url.clone(),
                    creds.telnyx_api_key.get().unwrap_or_default(),
                    creds.telnyx_from_number.get().unwrap_or_default(),
                );
                provider.send(to, body).await?
            }
            ProviderKind::Smsapi => {
                let provider = SmsapiProvider::new(
                    self.inner.client.clone(),
                    self.inner.config.smsapi_base_url.clone(),
                    creds.smsapi_token.get().unwrap_or_default(),
                    creds.smsapi_sender.value.clone(),
                );
                provider.send(to, body).await?
            }
        };

        info!(
            provider = sent.provider,
            to = %mask_phone(to),
            "SMS sent"
        );
        Ok(SmsOutcome::Sent(sent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(telnyx_key: &str, telnyx_from: &str, token: &str) -> SmsConfig {
        SmsConfig {
            telnyx_api_key: telnyx_key.to_string(),
            telnyx_from_number: telnyx_from.to_string(),
            smsapi_token: token.to_string(),
            ..SmsConfig::default()
        }
    }

    #[test]
    fn env_value_wins_over_panel_per_field() {
        let panel = PanelSmsSettings {
            telnyx_api_key: Some("panel-key".into()),
            telnyx_from_number: Some("+447000000001".into()),
            ..Default::default()
        };
        let creds = SmsCredentials::resolve(&env("env-key", "", ""), &panel);

        assert_eq!(creds.telnyx_api_key.get(), Some("env-key"));
        assert_eq!(creds.telnyx_api_key.source, CredentialSource::Env);
        assert_eq!(creds.telnyx_from_number.get(), Some("+447000000001"));
        assert_eq!(creds.telnyx_from_number.source, CredentialSource::Panel);
        assert_eq!(creds.smsapi_token.source, CredentialSource::Unset);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let panel = PanelSmsSettings {
            smsapi_token: Some("   ".into()),
            ..Default::default()
        };
        let creds = SmsCredentials::resolve(&env(" ", "", ""), &panel);
        assert_eq!(creds.telnyx_api_key.source, CredentialSource::Unset);
        assert_eq!(creds.smsapi_token.source, CredentialSource::Unset);
        assert_eq!(creds.active_provider(), None);
    }

    #[test]
    fn telnyx_preferred_when_complete() {
        let panel = PanelSmsSettings {
            smsapi_token: Some("token".into()),
            ..Default::default()
        };
        let creds = SmsCredentials::resolve(&env("key", "+447000000001", ""), &panel);
        assert_eq!(creds.active_provider(), Some(ProviderKind::Telnyx));
    }

    #[test]
    fn telnyx_without_number_falls_back_to_smsapi() {
        let creds =
            SmsCredentials::resolve(&env("key", "", "token"), &PanelSmsSettings::default());
        assert_eq!(creds.active_provider(), Some(ProviderKind::Smsapi));
    }
}
