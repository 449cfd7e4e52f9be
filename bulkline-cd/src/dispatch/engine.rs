//! Per-contact dispatch state machine
//!
//! Each contact moves through `Validating → Navigating → Composing →
//! Sending(attempt 1..N) → Confirmed | Failed`, with early exits for
//! invalid numbers and numbers the platform reports as absent. The loop
//! is strictly sequential in input order: the session exposes one
//! interactive surface, so there is never more than one contact in
//! flight.

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use bulkline_common::events::{CampaignEvent, EventBus};

use crate::config::DispatchConfig;
use crate::db::verified::{VerifiedNumbers, VerifiedStatus};
use crate::dispatch::attachment;
use crate::dispatch::outcome::{DispatchOutcome, OutcomeStatus};
use crate::dispatch::retry::{self, RetryExhausted};
use crate::dispatch::selectors;
use crate::dispatch::strategies::{self, SendStrategy};
use crate::dispatch::surface::Surface;
use crate::msisdn::{format_number, NumberCheck};
use crate::report::OutcomeJournal;

/// One whole-protocol attempt's failure modes
#[derive(Debug)]
enum AttemptError {
    /// The platform explicitly signaled the number is not registered
    NotOnChannel,
    /// Composition control never appeared: a structural UI change
    /// needing operator attention, not a transient fault — no retry
    ComposeMissing(String),
    /// Transient failure of navigation, send trigger, or confirmation
    Failed(String),
}

impl AttemptError {
    fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Failed(_))
    }
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::NotOnChannel => write!(f, "number not on channel"),
            AttemptError::ComposeMissing(msg) => write!(f, "{}", msg),
            AttemptError::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

/// Result of one campaign run
#[derive(Debug)]
pub struct EngineOutput {
    /// Exactly one outcome per input contact that was reached
    pub outcomes: Vec<DispatchOutcome>,
    /// True when a cancellation request stopped the loop early
    pub cancelled: bool,
}

/// The sequential dispatch engine, generic over the automation surface
pub struct CampaignEngine<S: Surface> {
    surface: S,
    cfg: DispatchConfig,
    messaging_url: String,
    navigate_wait: Duration,
    send_chain: Vec<SendStrategy>,
    bus: Option<EventBus>,
    cache: Option<VerifiedNumbers>,
    cancel: Option<watch::Receiver<bool>>,
}

impl<S: Surface> CampaignEngine<S> {
    pub fn new(
        surface: S,
        cfg: DispatchConfig,
        messaging_url: impl Into<String>,
        navigate_wait: Duration,
    ) -> Self {
        let send_chain = strategies::message_send_chain(&cfg);
        Self {
            surface,
            cfg,
            messaging_url: messaging_url.into(),
            navigate_wait,
            send_chain,
            bus: None,
            cache: None,
            cancel: None,
        }
    }

    /// Emit per-contact progress events on this bus
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Consult and maintain the verified-number cache
    pub fn with_cache(mut self, cache: VerifiedNumbers) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Cooperative cancellation, checked between contacts (never
    /// mid-protocol-step)
    pub fn with_cancellation(mut self, token: watch::Receiver<bool>) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run the dispatch loop over `raw_contacts` in input order.
    ///
    /// Per-contact failures never abort the loop; every reached contact
    /// yields exactly one outcome.
    pub async fn run(
        &self,
        campaign_id: Uuid,
        message: &str,
        raw_contacts: &[String],
        attachment: Option<&Path>,
        journal: Option<&OutcomeJournal>,
    ) -> EngineOutput {
        let mut outcomes = Vec::with_capacity(raw_contacts.len());
        let mut cancelled = false;

        for (index, raw) in raw_contacts.iter().enumerate() {
            if self.cancel_requested() {
                info!(
                    "Cancellation requested; stopping after {} of {} contacts",
                    index,
                    raw_contacts.len()
                );
                cancelled = true;
                break;
            }

            let (outcome, drove_ui) = self.dispatch_contact(raw, message, attachment).await;
            info!(
                "Contact {}/{} {} -> {} ({} attempts)",
                index + 1,
                raw_contacts.len(),
                outcome.number,
                outcome.status.as_str(),
                outcome.attempts
            );

            if let Some(journal) = journal {
                if let Err(e) = journal.append(&outcome) {
                    warn!("Outcome journal append failed: {}", e);
                }
            }
            if let Some(bus) = &self.bus {
                bus.emit(CampaignEvent::ContactDispatched {
                    campaign_id,
                    index,
                    number: outcome.number.clone(),
                    status: outcome.status.as_str().to_string(),
                    timestamp: chrono::Utc::now(),
                });
            }
            outcomes.push(outcome);

            // Human-mimicking pacing between contacts that actually drove
            // the surface. Required rate-limit behavior, not an
            // optimization target.
            if drove_ui && index + 1 < raw_contacts.len() {
                self.pace().await;
            }
        }

        EngineOutput { outcomes, cancelled }
    }

    /// Resolve one contact to its terminal outcome. The bool reports
    /// whether the automation surface was driven (pacing applies).
    async fn dispatch_contact(
        &self,
        raw: &str,
        message: &str,
        attachment: Option<&Path>,
    ) -> (DispatchOutcome, bool) {
        // Validating
        let number = match format_number(raw, &self.cfg) {
            NumberCheck::Valid(number) => number,
            NumberCheck::Invalid(raw) => {
                debug!("Skipping invalid number: {}", raw);
                return (DispatchOutcome::new(raw, OutcomeStatus::Invalid), false);
            }
        };

        // Cached definite negative: classify without driving the UI
        if let Some(cache) = &self.cache {
            match cache.lookup(&number).await {
                Ok(Some(VerifiedStatus::NotOnChannel)) => {
                    debug!("Cache hit: {} not on channel", number);
                    return (
                        DispatchOutcome::new(number, OutcomeStatus::NotOnChannel)
                            .with_error("cached: not registered on channel"),
                        false,
                    );
                }
                Ok(_) => {}
                Err(e) => warn!("Verified-number cache lookup failed: {}", e),
            }
        }

        let deep_link = self.deep_link(&number, message);
        // Attachment-only campaigns open the conversation but have no
        // text to send or confirm
        let send_text = !message.is_empty();

        let result = retry::bounded(
            self.cfg.max_attempts,
            self.cfg.attempt_pause(),
            |attempt| self.attempt_send(&number, &deep_link, send_text, attempt),
            AttemptError::is_retryable,
        )
        .await;

        let outcome = match result {
            Ok((tier, attempts)) => {
                debug!("Send to {} confirmed via {}", number, tier);
                self.record_verified(&number, VerifiedStatus::Verified).await;

                match attachment {
                    Some(path) => {
                        match attachment::send_attachment(&self.surface, &self.cfg, path).await {
                            Ok(()) => DispatchOutcome::new(number, OutcomeStatus::Sent)
                                .with_attempts(attempts),
                            Err(e) => {
                                warn!("Attachment failed for {}: {}", number, e);
                                DispatchOutcome::new(number, OutcomeStatus::FileError)
                                    .with_attempts(attempts)
                                    .with_error(format!("attachment: {}", e))
                            }
                        }
                    }
                    None => DispatchOutcome::new(number, OutcomeStatus::Sent)
                        .with_attempts(attempts),
                }
            }
            Err(RetryExhausted {
                error: AttemptError::NotOnChannel,
                attempts,
            }) => {
                self.record_verified(&number, VerifiedStatus::NotOnChannel).await;
                DispatchOutcome::new(number, OutcomeStatus::NotOnChannel).with_attempts(attempts)
            }
            Err(RetryExhausted { error, attempts }) => {
                DispatchOutcome::new(number, OutcomeStatus::Error)
                    .with_attempts(attempts)
                    .with_error(error.to_string())
            }
        };

        (outcome, true)
    }

    /// One whole attempt: navigate → compose → send → confirm
    async fn attempt_send(
        &self,
        number: &str,
        deep_link: &str,
        send_text: bool,
        attempt: u32,
    ) -> Result<&'static str, AttemptError> {
        // Navigating
        debug!("Attempt {} for {}: navigating", attempt, number);
        self.surface
            .navigate(deep_link, self.navigate_wait)
            .await
            .map_err(|e| AttemptError::Failed(format!("navigation: {}", e)))?;

        // Composing: the compose control appearing means the conversation
        // is open; the invalid-number modal means a definite negative
        let deadline = tokio::time::Instant::now() + self.cfg.compose_wait();
        loop {
            if self
                .surface
                .exists(selectors::INVALID_NUMBER_POPUP)
                .await
                .map_err(|e| AttemptError::Failed(format!("probe: {}", e)))?
            {
                return Err(AttemptError::NotOnChannel);
            }
            if self
                .surface
                .exists(selectors::COMPOSE_BOX)
                .await
                .map_err(|e| AttemptError::Failed(format!("probe: {}", e)))?
            {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AttemptError::ComposeMissing(
                    "composition control not found; surface may have changed".to_string(),
                ));
            }
            tokio::time::sleep(self.cfg.poll_interval()).await;
        }

        if !send_text {
            return Ok("attachment-only");
        }

        // Focus the composition control so the synthetic-key tier lands
        self.surface
            .click(selectors::COMPOSE_BOX)
            .await
            .map_err(|e| AttemptError::Failed(format!("focus: {}", e)))?;

        // Sending
        let tier = strategies::trigger_send(&self.surface, &self.send_chain)
            .await
            .map_err(|e| AttemptError::Failed(format!("send trigger: {}", e)))?;

        // Confirming
        let confirmed = self
            .surface
            .wait_for(selectors::OUTGOING_MESSAGE, self.cfg.confirm_wait())
            .await
            .map_err(|e| AttemptError::Failed(format!("confirm probe: {}", e)))?;
        if !confirmed {
            return Err(AttemptError::Failed(
                "no outgoing-message marker within confirmation wait".to_string(),
            ));
        }

        Ok(tier)
    }

    /// Deep link opening the target conversation with the message
    /// pre-filled
    fn deep_link(&self, number: &str, message: &str) -> String {
        let base = format!("{}/send", self.messaging_url.trim_end_matches('/'));
        match Url::parse_with_params(&base, &[("phone", number), ("text", message)]) {
            Ok(url) => url.to_string(),
            // messaging_url is validated config; fall back to a plain
            // join rather than aborting the contact
            Err(_) => format!("{}?phone={}", base, number),
        }
    }

    async fn record_verified(&self, number: &str, status: VerifiedStatus) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.record(number, status).await {
                warn!("Verified-number cache update failed: {}", e);
            }
        }
    }

    fn cancel_requested(&self) -> bool {
        self.cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    async fn pace(&self) {
        let (min, max) = (self.cfg.pacing_min_ms, self.cfg.pacing_max_ms);
        let wait_ms = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        debug!("Pacing {} ms before next contact", wait_ms);
        tokio::time::sleep(Duration::from_millis(wait_ms)).await;
    }
}
