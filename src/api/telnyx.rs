use super::{SentMessage, SmsProvider, connect_retry_policy, endpoint};
use crate::error::BookingError;
use backon::Retryable;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

const PROVIDER: &str = "Telnyx";

/// Telnyx Messaging API v2 (`POST /messages`).
pub struct TelnyxProvider {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    from_number: String,
}

#[derive(Serialize)]
struct TelnyxMessageRequest<'a> {
    from: &'a str,
    to: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct TelnyxMessageResponse {
    data: TelnyxMessageData,
}

#[derive(Deserialize)]
struct TelnyxMessageData {
    id: Option<String>,
}

#[derive(Deserialize)]
struct TelnyxErrorResponse {
    #[serde(default)]
    errors: Vec<TelnyxErrorEntry>,
}

#[derive(Deserialize)]
struct TelnyxErrorEntry {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl TelnyxProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: Url,
        api_key: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key: api_key.into(),
            from_number: from_number.into(),
        }
    }
}

impl SmsProvider for TelnyxProvider {
    fn name(&self) -> &'static str {
        "telnyx"
    }

    async fn send(&self, to: &str, body: &str) -> Result<SentMessage, BookingError> {
        let url = endpoint(&self.base_url, "messages");
        let payload = TelnyxMessageRequest {
            from: &self.from_number,
            to,
            text: body,
        };

        let resp = (|| async {
            self.client
                .post(url.as_str())
                .bearer_auth(&self.api_key)
                .json(&payload)
                .send()
                .await
        })
        .retry(connect_retry_policy())
        .when(|e: &reqwest::Error| e.is_connect())
        .notify(|err, dur: Duration| {
            warn!("Telnyx connect failed ({}), retrying in {:?}", err, dur);
        })
        .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<TelnyxErrorResponse>(&bytes)
                .ok()
                .and_then(|e| e.errors.into_iter().next())
                .and_then(|e| e.detail.or(e.title))
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(BookingError::Provider {
                provider: PROVIDER,
                message,
            });
        }

        let parsed: TelnyxMessageResponse = serde_json::from_slice(&bytes)?;
        info!(message_id = ?parsed.data.id, "Telnyx accepted message");
        Ok(SentMessage {
            provider: self.name(),
            message_id: parsed.data.id,
        })
    }
}
