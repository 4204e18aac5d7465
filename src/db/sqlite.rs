use crate::db::models::{Booking, NewBooking, PanelSmsSettings, SettingKey, VerificationCode};
use crate::db::schema::SQLITE_INIT;
use crate::error::BookingError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::info;

pub type SqlitePool = Pool<Sqlite>;

#[derive(Clone)]
pub struct BookingStorage {
    pool: SqlitePool,
}

impl BookingStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, BookingError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        if let Some(parent) = connect_opts.get_filename().parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        info!(database_url = %database_url, "booking storage ready");
        Ok(storage)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), BookingError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn insert_booking(&self, booking: NewBooking) -> Result<Booking, BookingError> {
        let created_at = Utc::now();
        let rec: (i64,) = sqlx::query_as(
            "INSERT INTO bookings (name, time, phone, created_at) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&booking.name)
        .bind(&booking.time)
        .bind(&booking.phone)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(Booking {
            id: rec.0,
            name: booking.name,
            time: booking.time,
            phone: booking.phone,
            created_at,
        })
    }

    /// Newest first.
    pub async fn list_bookings(&self, limit: i64) -> Result<Vec<Booking>, BookingError> {
        let rows = sqlx::query_as::<_, Booking>(
            "SELECT id, name, time, phone, created_at FROM bookings ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_bookings(&self) -> Result<i64, BookingError> {
        let rec: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0)
    }

    /// Returns false when no booking had that id.
    pub async fn delete_booking(&self, id: i64) -> Result<bool, BookingError> {
        let res = sqlx::query("DELETE FROM bookings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn get_setting(&self, key: SettingKey) -> Result<Option<String>, BookingError> {
        let rec: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(rec.map(|r| r.0))
    }

    pub async fn put_setting(&self, key: SettingKey, value: &str) -> Result<(), BookingError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value=excluded.value,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_setting(&self, key: SettingKey) -> Result<(), BookingError> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All panel-stored SMS credentials in one read.
    pub async fn load_sms_settings(&self) -> Result<PanelSmsSettings, BookingError> {
        Ok(PanelSmsSettings {
            telnyx_api_key: self.get_setting(SettingKey::TelnyxApiKey).await?,
            telnyx_from_number: self.get_setting(SettingKey::TelnyxFromNumber).await?,
            smsapi_token: self.get_setting(SettingKey::SmsapiToken).await?,
            smsapi_sender: self.get_setting(SettingKey::SmsapiSender).await?,
        })
    }

    /// Replace any pending code for `phone` and reset its attempt counter.
    pub async fn put_verification(
        &self,
        phone: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        sqlx::query(
            r#"
            INSERT INTO verification_codes (phone, code, expires_at, attempts) VALUES (?, ?, ?, 0)
            ON CONFLICT(phone) DO UPDATE SET
                code=excluded.code,
                expires_at=excluded.expires_at,
                attempts=0
            "#,
        )
        .bind(phone)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_verification(
        &self,
        phone: &str,
    ) -> Result<Option<VerificationCode>, BookingError> {
        let row = sqlx::query_as::<_, VerificationCode>(
            "SELECT phone, code, expires_at, attempts FROM verification_codes WHERE phone = ?",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn bump_verification_attempts(&self, phone: &str) -> Result<(), BookingError> {
        sqlx::query("UPDATE verification_codes SET attempts = attempts + 1 WHERE phone = ?")
            .bind(phone)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_verification(&self, phone: &str) -> Result<(), BookingError> {
        sqlx::query("DELETE FROM verification_codes WHERE phone = ?")
            .bind(phone)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
