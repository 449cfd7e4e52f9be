//! REST API for the Campaign Dispatcher
//!
//! Campaign submission (multipart), campaign reads, single-number OTP
//! sends, cancellation, and SSE progress events.

pub mod handlers;
pub mod sse;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::dispatch::run::CampaignRunner;
use crate::session::SessionManager;
use crate::state::SharedState;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppContext {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub state: Arc<SharedState>,
    pub session: Arc<SessionManager>,
    pub runner: Arc<CampaignRunner>,
}

/// Create the API router
pub fn create_router(ctx: AppContext) -> Router {
    // Body limit covers both files plus form overhead
    let body_limit = ctx.config.max_upload_bytes * 2 + 64 * 1024;

    Router::new()
        // Health check (no prefix)
        .route("/health", get(handlers::health))
        // API v1 routes
        .nest(
            "/api/v1",
            Router::new()
                .route(
                    "/campaigns",
                    post(handlers::submit_campaign).get(handlers::list_campaigns),
                )
                .route("/campaigns/:id", get(handlers::get_campaign))
                .route("/campaigns/:id/cancel", post(handlers::cancel_campaign))
                .route("/otp", post(handlers::send_otp))
                .route("/events", get(sse::event_stream)),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
