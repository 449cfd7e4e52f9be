//! Database access layer
//!
//! SQLite persistence for campaign records, report records, and the
//! verified-number cache. The record store is a thin boundary; nothing
//! here owns dispatch behavior.

pub mod campaigns;
pub mod init;
pub mod reports;
pub mod verified;

use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::error::Result;

/// Open (creating when missing) the service database
pub async fn connect(path: &Path) -> Result<SqlitePool> {
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let pool = SqlitePoolOptions::new().connect(&url).await?;
    Ok(pool)
}
