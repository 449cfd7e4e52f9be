//! HTTP request handlers

use std::path::PathBuf;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::api::AppContext;
use crate::db::{campaigns, reports};
use crate::error::Error;

/// Attachment extensions accepted alongside a campaign message
const ATTACHMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "png", "jpg", "jpeg"];

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    active_campaign: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    status: String,
    campaign_id: Uuid,
    total: usize,
    sent: usize,
    invalid: usize,
    failed: usize,
    not_on_channel: usize,
    file_error: usize,
    cancelled: bool,
    report_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CampaignDetailResponse {
    campaign: campaigns::CampaignRecord,
    report_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CampaignListResponse {
    campaigns: Vec<campaigns::CampaignRecord>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    owner_id: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    number: String,
    otp: String,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct OtpResponse {
    status: String,
    sent: bool,
}

type ApiError = (StatusCode, Json<StatusResponse>);

fn api_error(code: StatusCode, message: impl Into<String>) -> ApiError {
    (
        code,
        Json(StatusResponse {
            status: "error".to_string(),
            message: message.into(),
        }),
    )
}

fn map_error(err: Error) -> ApiError {
    let code = match &err {
        Error::Parse(_) | Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::Busy(_) => StatusCode::CONFLICT,
        Error::SessionUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if code == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Request failed: {}", err);
    }
    api_error(code, err.to_string())
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "campaign_dispatcher".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_campaign: ctx.state.active_campaign().await,
    })
}

// ============================================================================
// Campaign Endpoints
// ============================================================================

/// POST /api/v1/campaigns - Submit and run a campaign
///
/// Multipart form: `message` (text), `owner_id` (text), `contacts`
/// (CSV file), `attachment` (optional file). Responds with the full
/// disposition counts; only failure to start returns an error status.
pub async fn submit_campaign(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Json<CampaignResponse>, ApiError> {
    let mut message = String::new();
    let mut owner_id: Option<String> = None;
    let mut contacts_path: Option<PathBuf> = None;
    let mut attachment_path: Option<PathBuf> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("malformed form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "message" => {
                message = field
                    .text()
                    .await
                    .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?
                    .trim()
                    .to_string();
            }
            "owner_id" => {
                owner_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?
                        .trim()
                        .to_string(),
                );
            }
            "contacts" => {
                contacts_path = Some(save_upload(&ctx, field, "contacts", &["csv"]).await?);
            }
            "attachment" => {
                attachment_path =
                    Some(save_upload(&ctx, field, "attachment", ATTACHMENT_EXTENSIONS).await?);
            }
            other => {
                return Err(api_error(
                    StatusCode::BAD_REQUEST,
                    format!("unexpected field: {}", other),
                ));
            }
        }
    }

    let owner_id = owner_id
        .filter(|o| !o.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "owner_id is required"))?;
    let contacts_path = contacts_path
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "contacts file is required"))?;
    if message.is_empty() && attachment_path.is_none() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "message is required unless an attachment is present",
        ));
    }

    info!("Campaign submission from {}", owner_id);
    let result = ctx
        .runner
        .run_campaign(
            &owner_id,
            &message,
            &contacts_path,
            attachment_path.as_deref(),
        )
        .await
        .map_err(map_error)?;

    let policy = ctx.config.dispatch.count_file_error_as_sent;
    Ok(Json(CampaignResponse {
        status: "success".to_string(),
        campaign_id: result.campaign_id,
        total: result.summary.total,
        sent: result.summary.sent_count(policy),
        invalid: result.summary.invalid,
        failed: result.summary.error,
        not_on_channel: result.summary.not_on_channel,
        file_error: result.summary.file_error,
        cancelled: result.summary.cancelled,
        report_url: result.report_url,
    }))
}

/// GET /api/v1/campaigns/:id - Fetch one campaign with its report ref
pub async fn get_campaign(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<CampaignDetailResponse>, ApiError> {
    let campaign = campaigns::get_campaign(&ctx.db, id)
        .await
        .map_err(map_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "campaign not found"))?;

    let report_url = reports::get_report_for_campaign(&ctx.db, id)
        .await
        .map_err(map_error)?
        .map(|r| r.artifact_ref);

    Ok(Json(CampaignDetailResponse {
        campaign,
        report_url,
    }))
}

/// GET /api/v1/campaigns?owner_id= - List an owner's campaigns
pub async fn list_campaigns(
    State(ctx): State<AppContext>,
    Query(params): Query<ListParams>,
) -> Result<Json<CampaignListResponse>, ApiError> {
    let records = campaigns::list_campaigns_for_owner(&ctx.db, &params.owner_id)
        .await
        .map_err(map_error)?;
    Ok(Json(CampaignListResponse { campaigns: records }))
}

/// POST /api/v1/campaigns/:id/cancel - Request cooperative cancellation
///
/// The loop stops at the next contact boundary; completed contacts keep
/// their outcomes and still produce a report.
pub async fn cancel_campaign(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    if ctx.state.request_cancel(id).await {
        Ok(Json(StatusResponse {
            status: "success".to_string(),
            message: "cancellation requested".to_string(),
        }))
    } else {
        Err(api_error(
            StatusCode::NOT_FOUND,
            "campaign is not currently dispatching",
        ))
    }
}

// ============================================================================
// OTP Endpoint
// ============================================================================

/// POST /api/v1/otp - Single-number templated send
///
/// `{otp}` in the message is substituted; otherwise the code is appended.
pub async fn send_otp(
    State(ctx): State<AppContext>,
    Json(request): Json<OtpRequest>,
) -> Result<Json<OtpResponse>, ApiError> {
    if request.number.trim().is_empty() || request.otp.is_empty() || request.message.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "number, otp & message are required",
        ));
    }

    let final_message = if request.message.contains("{otp}") {
        request.message.replace("{otp}", &request.otp)
    } else {
        format!("{} {}", request.message, request.otp)
    };

    let sent = ctx
        .runner
        .send_single(request.number.trim(), &final_message)
        .await
        .map_err(map_error)?;

    Ok(Json(OtpResponse {
        status: "success".to_string(),
        sent,
    }))
}

// ============================================================================
// Upload handling
// ============================================================================

/// Persist one multipart file field into the upload directory.
///
/// Validates the extension allowlist and the per-file size cap, and
/// names the file multer-style: `<millis>-<field><ext>`.
async fn save_upload(
    ctx: &AppContext,
    field: axum::extract::multipart::Field<'_>,
    label: &str,
    allowed_extensions: &[&str],
) -> Result<PathBuf, ApiError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let extension = std::path::Path::new(&file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if !allowed_extensions.contains(&extension.as_str()) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!(
                "invalid {} file type .{} (allowed: {})",
                label,
                extension,
                allowed_extensions.join(", ")
            ),
        ));
    }

    let bytes = field
        .bytes()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("upload read: {}", e)))?;
    if bytes.len() > ctx.config.max_upload_bytes {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("{} file exceeds {} bytes", label, ctx.config.max_upload_bytes),
        ));
    }

    tokio::fs::create_dir_all(&ctx.config.upload_dir)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let path = ctx.config.upload_dir.join(format!(
        "{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        label,
        extension
    ));
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(path)
}
