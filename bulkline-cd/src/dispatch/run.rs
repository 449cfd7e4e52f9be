//! Campaign orchestration
//!
//! Ties the collaborators together for one submission: artifact upload,
//! record creation, contact parsing, session acquisition under the run
//! lock, the dispatch loop itself, and report finalization. Pre-loop
//! failures abort the campaign; everything after the loop starts is
//! per-contact and never aborts the run.

use std::path::Path;
use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{error, info, warn};
use uuid::Uuid;

use bulkline_common::events::CampaignEvent;

use crate::config::Config;
use crate::contacts;
use crate::db::campaigns::{self, CampaignStatus};
use crate::db::verified::VerifiedNumbers;
use crate::dispatch::engine::CampaignEngine;
use crate::dispatch::outcome::DispatchSummary;
use crate::error::{Error, Result};
use crate::report::{self, OutcomeJournal};
use crate::session::SessionManager;
use crate::state::SharedState;
use crate::storage::ArtifactStore;

/// Result handed back to the HTTP layer
#[derive(Debug)]
pub struct CampaignRunResult {
    pub campaign_id: Uuid,
    pub summary: DispatchSummary,
    /// Present when report rendering and persistence succeeded
    pub report_url: Option<String>,
}

/// Owns the collaborators needed to execute campaigns
pub struct CampaignRunner {
    db: SqlitePool,
    config: Arc<Config>,
    session: Arc<SessionManager>,
    state: Arc<SharedState>,
    store: Arc<dyn ArtifactStore>,
}

impl CampaignRunner {
    pub fn new(
        db: SqlitePool,
        config: Arc<Config>,
        session: Arc<SessionManager>,
        state: Arc<SharedState>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            db,
            config,
            session,
            state,
            store,
        }
    }

    /// Execute one campaign end to end.
    ///
    /// `contacts_path`/`attachment_path` point at the already-saved
    /// uploads; refs for the campaign record come from the artifact
    /// store.
    pub async fn run_campaign(
        &self,
        owner_id: &str,
        message: &str,
        contacts_path: &Path,
        attachment_path: Option<&Path>,
    ) -> Result<CampaignRunResult> {
        let contact_ref = self
            .store
            .upload(contacts_path, "contact-lists", "raw")
            .await?;
        let attachment_ref = match attachment_path {
            Some(path) => Some(self.store.upload(path, "attachments", "auto").await?),
            None => None,
        };

        let campaign_id = campaigns::create_campaign(
            &self.db,
            owner_id,
            message,
            &contact_ref,
            attachment_ref.as_deref(),
        )
        .await?;
        info!("Campaign {} created for owner {}", campaign_id, owner_id);

        // Pre-loop failure: bad contact list aborts the whole campaign
        let raw_contacts =
            match contacts::parse_contact_list(contacts_path, self.config.dispatch.min_digits) {
                Ok(numbers) if !numbers.is_empty() => numbers,
                Ok(_) => {
                    self.abort_campaign(campaign_id, "no numbers found in contact list")
                        .await;
                    return Err(Error::Parse(
                        "no numbers found in contact list".to_string(),
                    ));
                }
                Err(e) => {
                    self.abort_campaign(campaign_id, &e.to_string()).await;
                    return Err(e);
                }
            };

        // Serialize campaigns against the single automation surface
        let _run_guard = match self.session.begin_run().await {
            Ok(guard) => guard,
            Err(e) => {
                self.abort_campaign(campaign_id, &e.to_string()).await;
                return Err(e);
            }
        };

        // Pre-loop failure: no session aborts the whole campaign
        let driver = match self.session.acquire().await {
            Ok(driver) => driver,
            Err(e) => {
                self.abort_campaign(campaign_id, &e.to_string()).await;
                return Err(e);
            }
        };

        campaigns::update_campaign_status(
            &self.db,
            campaign_id,
            CampaignStatus::Processing,
            raw_contacts.len(),
            0,
        )
        .await?;

        let cancel = self.state.begin_run(campaign_id).await;
        self.state.emit(CampaignEvent::CampaignStarted {
            campaign_id,
            total_contacts: raw_contacts.len(),
            timestamp: chrono::Utc::now(),
        });

        // Journal failure must not block dispatch; rows are best-effort
        let journal = match OutcomeJournal::create(&self.config.artifact_dir, campaign_id) {
            Ok(journal) => Some(journal),
            Err(e) => {
                warn!("Outcome journal unavailable: {}", e);
                None
            }
        };

        let engine = CampaignEngine::new(
            &*driver,
            self.config.dispatch.clone(),
            self.config.session.messaging_url.clone(),
            self.config.session.navigate_wait(),
        )
        .with_events(self.state.events.clone())
        .with_cache(VerifiedNumbers::new(self.db.clone()))
        .with_cancellation(cancel);

        let output = engine
            .run(
                campaign_id,
                message,
                &raw_contacts,
                attachment_path,
                journal.as_ref(),
            )
            .await;
        self.state.finish_run().await;

        let summary = DispatchSummary::tally(&output.outcomes, output.cancelled);
        let sent_count = summary.sent_count(self.config.dispatch.count_file_error_as_sent);

        // Report generation is best-effort; the numeric summary is the
        // authoritative result either way
        let report_url = report::persist_report(
            self.store.as_ref(),
            &self.db,
            &self.config.artifact_dir,
            campaign_id,
            owner_id,
            message,
            &summary,
            &output.outcomes,
        )
        .await;

        // total_contacts stays the full parsed list even when a
        // cancellation stopped the loop early
        campaigns::update_campaign_status(
            &self.db,
            campaign_id,
            CampaignStatus::Completed,
            raw_contacts.len(),
            sent_count,
        )
        .await?;

        self.state.emit(CampaignEvent::CampaignCompleted {
            campaign_id,
            total: summary.total,
            sent: summary.sent,
            invalid: summary.invalid,
            not_on_channel: summary.not_on_channel,
            file_error: summary.file_error,
            error: summary.error,
            cancelled: summary.cancelled,
            timestamp: chrono::Utc::now(),
        });
        info!(
            "Campaign {} finished: {}/{} sent ({} invalid, {} not on channel, {} file errors, {} errors){}",
            campaign_id,
            sent_count,
            summary.total,
            summary.invalid,
            summary.not_on_channel,
            summary.file_error,
            summary.error,
            if summary.cancelled { " [cancelled]" } else { "" },
        );

        Ok(CampaignRunResult {
            campaign_id,
            summary,
            report_url,
        })
    }

    /// Single-number templated send (no campaign record, no pacing)
    pub async fn send_single(&self, number: &str, message: &str) -> Result<bool> {
        let _run_guard = self.session.begin_run().await?;
        let driver = self.session.acquire().await?;

        let engine = CampaignEngine::new(
            &*driver,
            self.config.dispatch.clone(),
            self.config.session.messaging_url.clone(),
            self.config.session.navigate_wait(),
        )
        .with_cache(VerifiedNumbers::new(self.db.clone()));

        let output = engine
            .run(
                Uuid::new_v4(),
                message,
                &[number.to_string()],
                None,
                None,
            )
            .await;

        Ok(output
            .outcomes
            .first()
            .map(|o| o.status == crate::dispatch::outcome::OutcomeStatus::Sent)
            .unwrap_or(false))
    }

    /// Mark a campaign failed before its dispatch loop produced outcomes
    async fn abort_campaign(&self, campaign_id: Uuid, reason: &str) {
        warn!("Campaign {} aborted: {}", campaign_id, reason);
        if let Err(e) = campaigns::update_campaign_status(
            &self.db,
            campaign_id,
            CampaignStatus::Failed,
            0,
            0,
        )
        .await
        {
            error!("Failed to mark campaign {} failed: {}", campaign_id, e);
        }
        self.state.emit(CampaignEvent::CampaignFailed {
            campaign_id,
            reason: reason.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }
}
