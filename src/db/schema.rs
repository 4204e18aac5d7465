//! SQL DDL for the booking store.

/// SQLite schema:
/// - `bookings`: one row per submitted booking, `phone` kept in E.164 when given
/// - `settings`: admin-panel key/value store (provider credentials, password hash)
/// - `verification_codes`: at most one pending code per phone number
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS bookings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    time TEXT NOT NULL,
    phone TEXT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS verification_codes (
    phone TEXT PRIMARY KEY,
    code TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_bookings_created_at ON bookings(created_at);
"#;
