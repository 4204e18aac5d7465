//! Admin panel security: password hashing, IP allow-list, session cookie.

pub mod ip_allow;
pub mod password;
pub mod session;

pub use ip_allow::IpAllowList;
pub use session::{AdminSession, CookieSettings};
