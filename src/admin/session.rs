use crate::error::BookingError;
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const SESSION_COOKIE: &str = "admin_session";
const SESSION_PATH: &str = "/admin";

/// Contents of the encrypted admin session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdminSession {
    pub authenticated_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl AdminSession {
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            authenticated_at: now,
            last_activity: now,
        }
    }

    /// Idle timeout: measured from the last authenticated request.
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.last_activity > timeout
    }

    pub fn touched(self, now: DateTime<Utc>) -> Self {
        Self {
            last_activity: now,
            ..self
        }
    }

    /// A missing or undecodable cookie reads as no session.
    pub fn from_jar(jar: &PrivateCookieJar) -> Option<Self> {
        let cookie = jar.get(SESSION_COOKIE)?;
        serde_json::from_str(cookie.value()).ok()
    }
}

/// Flags applied to the session cookie.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub secure: bool,
    pub timeout_minutes: i64,
}

impl CookieSettings {
    pub fn timeout(&self) -> Duration {
        Duration::minutes(self.timeout_minutes)
    }

    pub fn store(
        &self,
        jar: PrivateCookieJar,
        session: &AdminSession,
    ) -> Result<PrivateCookieJar, BookingError> {
        let value = serde_json::to_string(session)?;
        let cookie = Cookie::build(Cookie::new(SESSION_COOKIE, value))
            .path(SESSION_PATH)
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::minutes(self.timeout_minutes))
            .build();
        Ok(jar.add(cookie))
    }

    pub fn clear(&self, jar: PrivateCookieJar) -> PrivateCookieJar {
        jar.remove(
            Cookie::build(Cookie::new(SESSION_COOKIE, ""))
                .path(SESSION_PATH)
                .http_only(true)
                .secure(self.secure)
                .same_site(SameSite::Lax)
                .build(),
        )
    }
}
