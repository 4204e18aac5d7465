//! Stateless clients for the SMS vendor REST APIs.

pub mod smsapi;
pub mod telnyx;

use crate::error::BookingError;
use backon::ExponentialBuilder;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

pub use smsapi::SmsapiProvider;
pub use telnyx::TelnyxProvider;

/// Result of a message accepted by a vendor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentMessage {
    pub provider: &'static str,
    pub message_id: Option<String>,
}

pub trait SmsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Send `body` to an E.164 number.
    fn send(
        &self,
        to: &str,
        body: &str,
    ) -> impl Future<Output = Result<SentMessage, BookingError>> + Send;
}

/// Only connection failures are retried: the vendor never saw the request,
/// so a resend cannot deliver a duplicate text.
fn connect_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(200))
        .with_max_delay(Duration::from_secs(2))
        .with_max_times(3)
        .with_jitter()
}

fn endpoint(base: &url::Url, path: &str) -> String {
    format!("{}/{}", base.as_str().trim_end_matches('/'), path)
}
