//! Dispatch engine behavior tests
//!
//! Drive the whole per-contact protocol against a scripted fake surface:
//! retry exhaustion, structural compose failures, not-on-channel
//! detection, fallback send tiers, attachment downgrades, pacing-free
//! cancellation, and outcome/journal invariants.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::watch;
use uuid::Uuid;

use bulkline_cd::config::DispatchConfig;
use bulkline_cd::contacts;
use bulkline_cd::db::init::init_schema;
use bulkline_cd::db::verified::{VerifiedNumbers, VerifiedStatus};
use bulkline_cd::dispatch::engine::CampaignEngine;
use bulkline_cd::dispatch::outcome::{DispatchSummary, OutcomeStatus};
use bulkline_cd::dispatch::selectors;
use bulkline_cd::dispatch::surface::Surface;
use bulkline_cd::error::Result;
use bulkline_cd::report::OutcomeJournal;

use bulkline_common::events::{CampaignEvent, EventBus};

/// Which page affordances the fake surface presents
#[derive(Default, Clone)]
struct Behavior {
    compose: bool,
    invalid_popup: bool,
    primary_send: bool,
    labeled_send: bool,
    confirm: bool,
    attach: bool,
    file_input: bool,
    attachment_send: bool,
}

impl Behavior {
    /// Everything present: sends succeed via the primary tier
    fn happy() -> Self {
        Self {
            compose: true,
            primary_send: true,
            confirm: true,
            attach: true,
            file_input: true,
            attachment_send: true,
            ..Self::default()
        }
    }
}

/// Scripted automation surface recording every interaction
struct FakeSurface {
    behavior: Behavior,
    log: Mutex<Vec<String>>,
    navigations: AtomicU32,
    /// Trip the watch sender after N navigations (cancellation tests)
    cancel_after: Option<(u32, watch::Sender<bool>)>,
}

impl FakeSurface {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            log: Mutex::new(Vec::new()),
            navigations: AtomicU32::new(0),
            cancel_after: None,
        }
    }

    fn navigations(&self) -> u32 {
        self.navigations.load(Ordering::SeqCst)
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn present(&self, selector: &str) -> bool {
        if selector == selectors::COMPOSE_BOX {
            self.behavior.compose
        } else if selector == selectors::INVALID_NUMBER_POPUP {
            self.behavior.invalid_popup
        } else if selector == selectors::SEND_BUTTON_PRIMARY {
            self.behavior.primary_send
        } else if selector == selectors::SEND_BUTTON_LABELED {
            self.behavior.labeled_send
        } else if selector == selectors::OUTGOING_MESSAGE {
            self.behavior.confirm
        } else if selector == selectors::ATTACH_CONTROL {
            self.behavior.attach
        } else if selector == selectors::FILE_INPUT {
            self.behavior.file_input
        } else if selector == selectors::ATTACHMENT_SEND {
            self.behavior.attachment_send
        } else {
            false
        }
    }
}

impl Surface for FakeSurface {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        let count = self.navigations.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.lock().unwrap().push(format!("navigate:{}", url));
        if let Some((after, tx)) = &self.cancel_after {
            if count >= *after {
                let _ = tx.send(true);
            }
        }
        Ok(())
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        Ok(self.present(selector))
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.present(selector))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.log.lock().unwrap().push(format!("click:{}", selector));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.log.lock().unwrap().push(format!("key:{}", key));
        Ok(())
    }

    async fn set_file_input(&self, selector: &str, path: &Path) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("file:{}:{}", selector, path.display()));
        Ok(())
    }
}

/// Tight waits so absent affordances resolve instantly
fn test_cfg() -> DispatchConfig {
    let mut cfg = DispatchConfig::default();
    cfg.compose_wait_ms = 50;
    cfg.send_control_wait_ms = 10;
    cfg.fallback_control_wait_ms = 10;
    cfg.confirm_wait_ms = 10;
    cfg.attach_wait_ms = 10;
    cfg.file_input_wait_ms = 10;
    cfg.preview_settle_ms = 0;
    cfg.attempt_pause_ms = 0;
    cfg.pacing_min_ms = 0;
    cfg.pacing_max_ms = 0;
    cfg.poll_interval_ms = 5;
    cfg
}

fn engine(surface: &FakeSurface) -> CampaignEngine<&FakeSurface> {
    CampaignEngine::new(
        surface,
        test_cfg(),
        "https://web.whatsapp.com",
        Duration::from_millis(50),
    )
}

async fn verified_cache() -> VerifiedNumbers {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    VerifiedNumbers::new(pool)
}

fn contacts_of(numbers: &[&str]) -> Vec<String> {
    numbers.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn every_contact_yields_exactly_one_outcome_in_order() {
    let fake = FakeSurface::new(Behavior::happy());
    let raw = contacts_of(&["919876543210", "919123456780", "919988776655"]);

    let output = engine(&fake)
        .run(Uuid::new_v4(), "hello", &raw, None, None)
        .await;

    assert_eq!(output.outcomes.len(), raw.len());
    assert!(!output.cancelled);
    let numbers: Vec<_> = output.outcomes.iter().map(|o| o.number.clone()).collect();
    assert_eq!(numbers, raw);
    for outcome in &output.outcomes {
        assert_eq!(outcome.status, OutcomeStatus::Sent);
        assert_eq!(outcome.attempts, 1);
    }
}

#[tokio::test]
async fn confirmation_timeout_retries_three_times_then_errors() {
    let mut behavior = Behavior::happy();
    behavior.confirm = false;
    let fake = FakeSurface::new(behavior);
    let raw = contacts_of(&["919876543210"]);

    let output = engine(&fake)
        .run(Uuid::new_v4(), "hello", &raw, None, None)
        .await;

    let outcome = &output.outcomes[0];
    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert_eq!(outcome.attempts, 3);
    // The whole protocol (starting with navigation) re-ran each attempt
    assert_eq!(fake.navigations(), 3);
    assert!(outcome.last_error.as_deref().unwrap().contains("confirmation"));
}

#[tokio::test]
async fn missing_compose_control_fails_without_retry() {
    let mut behavior = Behavior::happy();
    behavior.compose = false;
    let fake = FakeSurface::new(behavior);
    let raw = contacts_of(&["919876543210", "919123456780"]);

    let output = engine(&fake)
        .run(Uuid::new_v4(), "hello", &raw, None, None)
        .await;

    // Structural failure: one attempt each, loop continues to next contact
    assert_eq!(output.outcomes.len(), 2);
    for outcome in &output.outcomes {
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert_eq!(outcome.attempts, 1);
    }
    assert_eq!(fake.navigations(), 2);
}

#[tokio::test]
async fn invalid_numbers_never_drive_the_surface() {
    let fake = FakeSurface::new(Behavior::happy());
    let raw = contacts_of(&["12345", "919876543210"]);

    let output = engine(&fake)
        .run(Uuid::new_v4(), "hello", &raw, None, None)
        .await;

    assert_eq!(output.outcomes[0].status, OutcomeStatus::Invalid);
    assert_eq!(output.outcomes[0].number, "12345");
    assert_eq!(output.outcomes[0].attempts, 0);
    assert_eq!(output.outcomes[1].status, OutcomeStatus::Sent);
    // Only the valid contact navigated
    assert_eq!(fake.navigations(), 1);
}

#[tokio::test]
async fn invalid_number_popup_classifies_not_on_channel() {
    let mut behavior = Behavior::happy();
    behavior.compose = false;
    behavior.invalid_popup = true;
    let fake = FakeSurface::new(behavior);
    let raw = contacts_of(&["919876543210"]);

    let output = engine(&fake)
        .run(Uuid::new_v4(), "hello", &raw, None, None)
        .await;

    let outcome = &output.outcomes[0];
    assert_eq!(outcome.status, OutcomeStatus::NotOnChannel);
    // Explicit negative signal: no retries burned
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn not_on_channel_result_is_cached_and_skips_the_ui_next_time() {
    let cache = verified_cache().await;
    let raw = contacts_of(&["919876543210"]);

    let mut behavior = Behavior::happy();
    behavior.compose = false;
    behavior.invalid_popup = true;
    let first = FakeSurface::new(behavior);
    engine(&first)
        .with_cache(cache.clone())
        .run(Uuid::new_v4(), "hello", &raw, None, None)
        .await;
    assert_eq!(
        cache.lookup("919876543210").await.unwrap(),
        Some(VerifiedStatus::NotOnChannel)
    );

    // Second campaign: cache answers, the surface is never driven
    let second = FakeSurface::new(Behavior::happy());
    let output = engine(&second)
        .with_cache(cache.clone())
        .run(Uuid::new_v4(), "hello", &raw, None, None)
        .await;
    assert_eq!(output.outcomes[0].status, OutcomeStatus::NotOnChannel);
    assert_eq!(second.navigations(), 0);
}

#[tokio::test]
async fn send_falls_back_through_tiers_in_order() {
    // Primary missing, labeled present
    let mut behavior = Behavior::happy();
    behavior.primary_send = false;
    behavior.labeled_send = true;
    let fake = FakeSurface::new(behavior);
    let raw = contacts_of(&["919876543210"]);

    let output = engine(&fake)
        .run(Uuid::new_v4(), "hello", &raw, None, None)
        .await;
    assert_eq!(output.outcomes[0].status, OutcomeStatus::Sent);
    let log = fake.log();
    assert!(log.iter().any(|l| l == &format!("click:{}", selectors::SEND_BUTTON_LABELED)));
    assert!(!log.iter().any(|l| l == &format!("click:{}", selectors::SEND_BUTTON_PRIMARY)));

    // Both buttons missing: the synthetic key fires as last resort
    let mut behavior = Behavior::happy();
    behavior.primary_send = false;
    let fake = FakeSurface::new(behavior);
    let output = engine(&fake)
        .run(Uuid::new_v4(), "hello", &raw, None, None)
        .await;
    assert_eq!(output.outcomes[0].status, OutcomeStatus::Sent);
    assert!(fake.log().iter().any(|l| l == "key:Enter"));
}

#[tokio::test]
async fn attachment_failure_downgrades_to_file_error_only() {
    let mut behavior = Behavior::happy();
    behavior.attach = false; // attach affordance never appears
    let fake = FakeSurface::new(behavior);
    let raw = contacts_of(&["919876543210", "919123456780"]);

    let dir = tempfile::tempdir().unwrap();
    let attachment = dir.path().join("design.pdf");
    std::fs::write(&attachment, b"pdf").unwrap();

    let output = engine(&fake)
        .run(Uuid::new_v4(), "hello", &raw, Some(&attachment), None)
        .await;

    for outcome in &output.outcomes {
        assert_eq!(outcome.status, OutcomeStatus::FileError);
        assert!(outcome.last_error.as_deref().unwrap().contains("attachment"));
    }

    // Policy: the text portion landed, so sent_count may include them
    let summary = DispatchSummary::tally(&output.outcomes, false);
    assert_eq!(summary.sent_count(true), 2);
    assert_eq!(summary.sent_count(false), 0);
}

#[tokio::test]
async fn successful_attachment_keeps_sent_status() {
    let fake = FakeSurface::new(Behavior::happy());
    let raw = contacts_of(&["919876543210"]);

    let dir = tempfile::tempdir().unwrap();
    let attachment = dir.path().join("design.png");
    std::fs::write(&attachment, b"png").unwrap();

    let output = engine(&fake)
        .run(Uuid::new_v4(), "hello", &raw, Some(&attachment), None)
        .await;

    assert_eq!(output.outcomes[0].status, OutcomeStatus::Sent);
    let log = fake.log();
    assert!(log.iter().any(|l| l.starts_with("file:")));
}

#[tokio::test]
async fn cancellation_stops_between_contacts_and_keeps_partial_outcomes() {
    let (tx, rx) = watch::channel(false);
    let mut fake = FakeSurface::new(Behavior::happy());
    fake.cancel_after = Some((1, tx));
    let raw = contacts_of(&["919876543210", "919123456780", "919988776655"]);

    let output = engine(&fake)
        .with_cancellation(rx)
        .run(Uuid::new_v4(), "hello", &raw, None, None)
        .await;

    // The in-flight contact completed; the loop stopped at the boundary
    assert!(output.cancelled);
    assert_eq!(output.outcomes.len(), 1);
    assert_eq!(output.outcomes[0].status, OutcomeStatus::Sent);
    assert_eq!(fake.navigations(), 1);
}

#[tokio::test]
async fn journal_receives_one_row_per_resolved_contact() {
    let fake = FakeSurface::new(Behavior::happy());
    let raw = contacts_of(&["919876543210", "12345"]);
    let dir = tempfile::tempdir().unwrap();
    let campaign_id = Uuid::new_v4();
    let journal = OutcomeJournal::create(dir.path(), campaign_id).unwrap();

    engine(&fake)
        .run(campaign_id, "hello", &raw, None, Some(&journal))
        .await;

    let content = std::fs::read_to_string(journal.path()).unwrap();
    assert_eq!(
        content,
        "phone,status\n919876543210,sent\n12345,invalid\n"
    );
}

#[tokio::test]
async fn progress_events_fire_per_contact() {
    let fake = FakeSurface::new(Behavior::happy());
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();
    let raw = contacts_of(&["919876543210", "919123456780"]);
    let campaign_id = Uuid::new_v4();

    engine(&fake)
        .with_events(bus)
        .run(campaign_id, "hello", &raw, None, None)
        .await;

    for expected_index in 0..raw.len() {
        match rx.try_recv().unwrap() {
            CampaignEvent::ContactDispatched { index, status, .. } => {
                assert_eq!(index, expected_index);
                assert_eq!(status, "sent");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}

#[tokio::test]
async fn parser_filters_feed_clean_contacts_to_the_engine() {
    // 5 data rows, 2 fail the digit-length check upstream
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "phone\n9876543210\n123\n9123456780\n45\n9988776655\n"
    )
    .unwrap();

    let raw = contacts::parse_contact_list(file.path(), 10).unwrap();
    assert_eq!(raw.len(), 3);

    let fake = FakeSurface::new(Behavior::happy());
    let output = engine(&fake)
        .run(Uuid::new_v4(), "hello", &raw, None, None)
        .await;

    let summary = DispatchSummary::tally(&output.outcomes, output.cancelled);
    // The short rows were filtered before dispatch, so they are not
    // counted as invalid here
    assert_eq!(summary.invalid, 0);
    assert_eq!(
        summary.sent + summary.error + summary.not_on_channel,
        3
    );
}
