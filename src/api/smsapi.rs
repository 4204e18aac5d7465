use super::{SentMessage, SmsProvider, connect_retry_policy, endpoint};
use crate::error::BookingError;
use backon::Retryable;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

const PROVIDER: &str = "SMSAPI";

/// SMSAPI.com (`POST /sms.do`, OAuth bearer token).
pub struct SmsapiProvider {
    client: reqwest::Client,
    base_url: Url,
    token: String,
    sender: Option<String>,
}

/// SMSAPI answers 200 for some failures, so both shapes share one body.
#[derive(Deserialize)]
struct SmsapiResponse {
    #[serde(default)]
    list: Vec<SmsapiMessage>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct SmsapiMessage {
    id: Option<String>,
}

impl SmsapiProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: Url,
        token: impl Into<String>,
        sender: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url,
            token: token.into(),
            sender: sender.filter(|s| !s.is_empty()),
        }
    }
}

impl SmsProvider for SmsapiProvider {
    fn name(&self) -> &'static str {
        "smsapi"
    }

    async fn send(&self, to: &str, body: &str) -> Result<SentMessage, BookingError> {
        let url = endpoint(&self.base_url, "sms.do");
        let recipient = to.trim_start_matches('+');
        let mut form: Vec<(&str, &str)> = vec![
            ("to", recipient),
            ("message", body),
            ("format", "json"),
            ("encoding", "utf-8"),
        ];
        if let Some(sender) = self.sender.as_deref() {
            form.push(("from", sender));
        }

        let resp = (|| async {
            self.client
                .post(url.as_str())
                .bearer_auth(&self.token)
                .form(&form)
                .send()
                .await
        })
        .retry(connect_retry_policy())
        .when(|e: &reqwest::Error| e.is_connect())
        .notify(|err, dur: Duration| {
            warn!("SMSAPI connect failed ({}), retrying in {:?}", err, dur);
        })
        .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        let parsed = serde_json::from_slice::<SmsapiResponse>(&bytes).ok();

        let vendor_error = parsed
            .as_ref()
            .filter(|p| p.error.is_some())
            .map(|p| p.message.clone().unwrap_or_else(|| "unknown error".to_string()));
        if let Some(message) = vendor_error {
            return Err(BookingError::Provider {
                provider: PROVIDER,
                message,
            });
        }
        if !status.is_success() {
            return Err(BookingError::Provider {
                provider: PROVIDER,
                message: format!("HTTP {status}"),
            });
        }

        let message_id = parsed
            .and_then(|p| p.list.into_iter().next())
            .and_then(|m| m.id);
        info!(message_id = ?message_id, "SMSAPI accepted message");
        Ok(SentMessage {
            provider: self.name(),
            message_id,
        })
    }
}
