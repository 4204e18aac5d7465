use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{HeaderMap, request::Parts};
use std::net::{IpAddr, SocketAddr};

use crate::error::BookingError;
use crate::router::BookingState;

/// Address of the calling client, as used for lockout and allow-listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Resolve the client address.
/// With `trust_proxy` set, checks in order:
/// - `X-Forwarded-For` (last hop, the one our proxy appended)
/// - `X-Real-IP`
///
/// and falls back to the socket peer address. Earlier `X-Forwarded-For`
/// entries come from the client and are never used.
pub fn resolve_client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy: bool,
) -> Option<IpAddr> {
    if trust_proxy {
        if let Some(ip) = headers
            .get_all("x-forwarded-for")
            .iter()
            .next_back()
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit(',').next())
            .and_then(|v| v.trim().parse().ok())
        {
            return Some(ip);
        }

        if let Some(ip) = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
        {
            return Some(ip);
        }
    }

    peer.map(|addr| addr.ip())
}

impl FromRequestParts<BookingState> for ClientIp {
    type Rejection = BookingError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &BookingState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        resolve_client_ip(&parts.headers, peer, state.config.basic.trust_proxy_headers)
            .map(ClientIp)
            .ok_or(BookingError::ForbiddenIp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("127.0.0.1:40000".parse().unwrap())
    }

    #[test]
    fn forwarded_for_last_hop_wins_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.1, 192.0.2.4, 203.0.113.9"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(
            resolve_client_ip(&headers, peer(), true),
            Some("203.0.113.9".parse().unwrap())
        );
    }

    #[test]
    fn last_forwarded_for_line_is_used() {
        let mut headers = HeaderMap::new();
        headers.append("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));
        headers.append("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));
        assert_eq!(
            resolve_client_ip(&headers, None, true),
            Some("203.0.113.9".parse().unwrap())
        );
    }

    #[test]
    fn headers_ignored_when_untrusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));
        assert_eq!(
            resolve_client_ip(&headers, peer(), false),
            Some("127.0.0.1".parse().unwrap())
        );
        assert_eq!(resolve_client_ip(&headers, None, false), None);
    }

    #[test]
    fn real_ip_used_when_forwarded_for_is_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("unknown"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(
            resolve_client_ip(&headers, None, true),
            Some("198.51.100.2".parse().unwrap())
        );
    }
}
