//! Campaign record queries

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// Campaign lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Pending => "pending",
            CampaignStatus::Processing => "processing",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Failed => "failed",
        }
    }
}

/// One campaign row
#[derive(Debug, Clone, serde::Serialize)]
pub struct CampaignRecord {
    pub id: String,
    pub owner_id: String,
    pub message: String,
    pub contact_list_ref: String,
    pub attachment_ref: Option<String>,
    pub status: String,
    pub total_contacts: i64,
    pub sent_count: i64,
    pub created_at: String,
}

/// Insert a new pending campaign, returning its id
pub async fn create_campaign(
    pool: &SqlitePool,
    owner_id: &str,
    message: &str,
    contact_list_ref: &str,
    attachment_ref: Option<&str>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO campaigns (id, owner_id, message, contact_list_ref, attachment_ref, status)
        VALUES (?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(id.to_string())
    .bind(owner_id)
    .bind(message)
    .bind(contact_list_ref)
    .bind(attachment_ref)
    .execute(pool)
    .await?;
    Ok(id)
}

/// Update status and counters. The dispatch loop is the only writer once
/// processing starts; message and refs stay immutable.
pub async fn update_campaign_status(
    pool: &SqlitePool,
    id: Uuid,
    status: CampaignStatus,
    total_contacts: usize,
    sent_count: usize,
) -> Result<()> {
    sqlx::query(
        "UPDATE campaigns SET status = ?, total_contacts = ?, sent_count = ? WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(total_contacts as i64)
    .bind(sent_count as i64)
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_campaign(pool: &SqlitePool, id: Uuid) -> Result<Option<CampaignRecord>> {
    let row = sqlx::query_as::<
        _,
        (
            String,
            String,
            String,
            String,
            Option<String>,
            String,
            i64,
            i64,
            String,
        ),
    >(
        r#"
        SELECT id, owner_id, message, contact_list_ref, attachment_ref,
               status, total_contacts, sent_count, created_at
        FROM campaigns WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| CampaignRecord {
        id: r.0,
        owner_id: r.1,
        message: r.2,
        contact_list_ref: r.3,
        attachment_ref: r.4,
        status: r.5,
        total_contacts: r.6,
        sent_count: r.7,
        created_at: r.8,
    }))
}

/// Campaigns for one owner, newest first
pub async fn list_campaigns_for_owner(
    pool: &SqlitePool,
    owner_id: &str,
) -> Result<Vec<CampaignRecord>> {
    let rows = sqlx::query_as::<
        _,
        (
            String,
            String,
            String,
            String,
            Option<String>,
            String,
            i64,
            i64,
            String,
        ),
    >(
        r#"
        SELECT id, owner_id, message, contact_list_ref, attachment_ref,
               status, total_contacts, sent_count, created_at
        FROM campaigns WHERE owner_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| CampaignRecord {
            id: r.0,
            owner_id: r.1,
            message: r.2,
            contact_list_ref: r.3,
            attachment_ref: r.4,
            status: r.5,
            total_contacts: r.6,
            sent_count: r.7,
            created_at: r.8,
        })
        .collect())
}
