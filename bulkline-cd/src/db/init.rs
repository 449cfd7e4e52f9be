//! Database initialization
//!
//! Creates required tables when missing. Idempotent; runs at every
//! startup before the server begins accepting campaigns.

use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::error::Result;

/// Create required tables when missing
pub async fn init_schema(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Checking database schema");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS campaigns (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            message TEXT NOT NULL,
            contact_list_ref TEXT NOT NULL,
            attachment_ref TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            total_contacts INTEGER NOT NULL DEFAULT 0,
            sent_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            campaign_id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            message TEXT NOT NULL,
            artifact_ref TEXT NOT NULL,
            generated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verified_numbers (
            phone TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            last_checked TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
