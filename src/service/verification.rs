use crate::db::BookingStorage;
use crate::error::BookingError;
use crate::service::sms_dispatcher::{SmsDispatcher, SmsOutcome};
use crate::types::phone::mask_phone;

use chrono::{Duration, Utc};
use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};
use rand::Rng;
use std::num::NonZeroU32;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

/// Wrong guesses allowed against one issued code.
pub const MAX_CODE_ATTEMPTS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Verified,
    WrongCode,
    /// Unknown, expired or exhausted; a new code must be requested.
    NoActiveCode,
}

/// Hourly send quota per phone number. Numbers whose quota has fully
/// refilled are pruned on every check, so only active numbers are held.
pub struct PhoneQuota<C: Clock = DefaultClock> {
    limiter: RateLimiter<String, DashMapStateStore<String>, C, NoOpMiddleware<C::Instant>>,
}

impl PhoneQuota {
    pub fn per_hour(per_hour: u32) -> Self {
        Self::with_clock(per_hour, DefaultClock::default())
    }
}

impl<C: Clock> PhoneQuota<C> {
    pub fn with_clock(per_hour: u32, clock: C) -> Self {
        let per_hour = NonZeroU32::new(per_hour).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::dashmap_with_clock(Quota::per_hour(per_hour), clock),
        }
    }

    /// Take one send from `phone`'s quota; false when it is used up.
    pub fn try_acquire(&self, phone: &str) -> bool {
        self.limiter.retain_recent();
        self.limiter.check_key(&phone.to_string()).is_ok()
    }

    /// Numbers currently holding quota state.
    pub fn tracked(&self) -> usize {
        self.limiter.len()
    }
}

/// Issues and checks SMS verification codes.
#[derive(Clone)]
pub struct VerificationService {
    storage: BookingStorage,
    sms: SmsDispatcher,
    quota: Arc<PhoneQuota>,
    ttl: Duration,
}

impl VerificationService {
    pub fn new(
        storage: BookingStorage,
        sms: SmsDispatcher,
        per_hour: u32,
        ttl_minutes: i64,
    ) -> Self {
        Self {
            storage,
            sms,
            quota: Arc::new(PhoneQuota::per_hour(per_hour)),
            ttl: Duration::minutes(ttl_minutes.max(1)),
        }
    }

    /// Store a fresh code for `phone` (E.164) and text it. Without a
    /// configured provider nothing is stored and no quota is spent.
    pub async fn send_code(&self, phone: &str) -> Result<(), BookingError> {
        if self.sms.credentials().await?.active_provider().is_none() {
            return Err(BookingError::SmsNotConfigured);
        }
        if !self.quota.try_acquire(phone) {
            warn!(phone = %mask_phone(phone), "verification code rate limit hit");
            return Err(BookingError::RateLimited);
        }

        let code = generate_code();
        let expires_at = Utc::now() + self.ttl;
        self.storage.put_verification(phone, &code, expires_at).await?;

        let body = format!(
            "Your verification code is {code}. It expires in {} minutes.",
            self.ttl.num_minutes()
        );
        match self.sms.send(phone, &body).await {
            Ok(SmsOutcome::Sent(_)) => {
                info!(phone = %mask_phone(phone), "verification code sent");
                Ok(())
            }
            Ok(SmsOutcome::Skipped) => {
                self.storage.delete_verification(phone).await?;
                Err(BookingError::SmsNotConfigured)
            }
            Err(e) => {
                self.storage.delete_verification(phone).await?;
                Err(e)
            }
        }
    }

    pub async fn check_code(&self, phone: &str, code: &str) -> Result<CheckOutcome, BookingError> {
        let Some(pending) = self.storage.get_verification(phone).await? else {
            return Ok(CheckOutcome::NoActiveCode);
        };

        if pending.expires_at <= Utc::now() || pending.attempts >= MAX_CODE_ATTEMPTS {
            self.storage.delete_verification(phone).await?;
            return Ok(CheckOutcome::NoActiveCode);
        }

        if bool::from(code.trim().as_bytes().ct_eq(pending.code.as_bytes())) {
            self.storage.delete_verification(phone).await?;
            info!(phone = %mask_phone(phone), "phone number verified");
            Ok(CheckOutcome::Verified)
        } else {
            self.storage.bump_verification_attempts(phone).await?;
            Ok(CheckOutcome::WrongCode)
        }
    }
}

fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
}
