//! Verified-number cache
//!
//! Remembers which numbers the platform has definitively confirmed or
//! rejected, so later campaigns skip driving the UI for numbers already
//! known to be absent.

use sqlx::SqlitePool;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifiedStatus {
    Verified,
    NotOnChannel,
}

impl VerifiedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifiedStatus::Verified => "verified",
            VerifiedStatus::NotOnChannel => "not_on_channel",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "verified" => Some(VerifiedStatus::Verified),
            "not_on_channel" => Some(VerifiedStatus::NotOnChannel),
            _ => None,
        }
    }
}

/// Cheap-to-clone handle over the cache table
#[derive(Clone)]
pub struct VerifiedNumbers {
    pool: SqlitePool,
}

impl VerifiedNumbers {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn lookup(&self, phone: &str) -> Result<Option<VerifiedStatus>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT status FROM verified_numbers WHERE phone = ?")
                .bind(phone)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(s,)| VerifiedStatus::parse(&s)))
    }

    pub async fn record(&self, phone: &str, status: VerifiedStatus) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO verified_numbers (phone, status, last_checked)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(phone) DO UPDATE
            SET status = excluded.status, last_checked = CURRENT_TIMESTAMP
            "#,
        )
        .bind(phone)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
