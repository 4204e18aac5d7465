pub mod admin_gate;
pub mod client_ip;
pub mod security_headers;

pub use admin_gate::{admin_gate, ensure_ip_permitted};
pub use client_ip::ClientIp;
