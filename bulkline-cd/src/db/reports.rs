//! Report record queries

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ReportRecord {
    pub id: String,
    pub campaign_id: String,
    pub owner_id: String,
    pub message: String,
    pub artifact_ref: String,
    pub generated_at: String,
}

/// Insert the report record for a finished run
pub async fn create_report(
    pool: &SqlitePool,
    campaign_id: Uuid,
    owner_id: &str,
    message: &str,
    artifact_ref: &str,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO reports (id, campaign_id, owner_id, message, artifact_ref)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(campaign_id.to_string())
    .bind(owner_id)
    .bind(message)
    .bind(artifact_ref)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn get_report_for_campaign(
    pool: &SqlitePool,
    campaign_id: Uuid,
) -> Result<Option<ReportRecord>> {
    let row = sqlx::query_as::<_, (String, String, String, String, String, String)>(
        r#"
        SELECT id, campaign_id, owner_id, message, artifact_ref, generated_at
        FROM reports WHERE campaign_id = ?
        "#,
    )
    .bind(campaign_id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| ReportRecord {
        id: r.0,
        campaign_id: r.1,
        owner_id: r.2,
        message: r.3,
        artifact_ref: r.4,
        generated_at: r.5,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn report_round_trips() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();

        let campaign_id = Uuid::new_v4();
        create_report(&pool, campaign_id, "owner-1", "hello", "artifacts/r.html")
            .await
            .unwrap();

        let report = get_report_for_campaign(&pool, campaign_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.artifact_ref, "artifacts/r.html");
        assert_eq!(report.owner_id, "owner-1");
    }
}
