use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use std::net::IpAddr;
use tracing::{debug, warn};

use crate::admin::AdminSession;
use crate::error::BookingError;
use crate::middleware::ClientIp;
use crate::router::BookingState;
use crate::service::login_guard::remaining_minutes;

/// Reject IPs outside the allow-list (403) and IPs under lockout (429).
pub async fn ensure_ip_permitted(state: &BookingState, ip: IpAddr) -> Result<(), BookingError> {
    if !state.allow_list.is_allowed(ip) {
        warn!(ip = %ip, "admin request from IP outside allow list");
        return Err(BookingError::ForbiddenIp);
    }
    if let Some(remaining) = state.guard.locked_remaining(ip).await? {
        return Err(BookingError::LockedOut(remaining_minutes(remaining)));
    }
    Ok(())
}

/// Guards every authenticated admin route:
/// allow-list, lockout, session presence, idle timeout. A valid session
/// has its `last_activity` refreshed on the way through.
pub async fn admin_gate(
    State(state): State<BookingState>,
    ClientIp(ip): ClientIp,
    jar: PrivateCookieJar,
    req: Request,
    next: Next,
) -> Response {
    match authorize(&state, ip, jar).await {
        Ok(jar) => (jar, next.run(req).await).into_response(),
        Err((jar, err)) => (jar, err).into_response(),
    }
}

async fn authorize(
    state: &BookingState,
    ip: IpAddr,
    jar: PrivateCookieJar,
) -> Result<PrivateCookieJar, (PrivateCookieJar, BookingError)> {
    if let Err(err) = ensure_ip_permitted(state, ip).await {
        return Err((jar, err));
    }

    let Some(session) = AdminSession::from_jar(&jar) else {
        return Err((jar, BookingError::Unauthorized));
    };

    let now = Utc::now();
    if session.is_expired(now, state.cookies.timeout()) {
        debug!(ip = %ip, "admin session expired");
        return Err((state.cookies.clear(jar), BookingError::SessionExpired));
    }

    match state.cookies.store(jar.clone(), &session.touched(now)) {
        Ok(jar) => Ok(jar),
        Err(err) => Err((jar, err)),
    }
}
