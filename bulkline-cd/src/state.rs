//! Shared service state
//!
//! Thread-safe state shared between the HTTP handlers and the dispatch
//! loop: the campaign event bus, the currently active run, and the
//! cooperative cancellation token for that run.

use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use bulkline_common::events::{CampaignEvent, EventBus};

/// Shared state accessible by all components
pub struct SharedState {
    /// Event broadcaster for SSE progress events
    pub events: EventBus,

    /// Campaign currently holding the dispatch loop (None when idle)
    active_campaign: RwLock<Option<Uuid>>,

    /// Cancellation token for the active run; reset at run start
    cancel_tx: watch::Sender<bool>,
}

impl SharedState {
    pub fn new() -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            events: EventBus::default(),
            active_campaign: RwLock::new(None),
            cancel_tx,
        }
    }

    /// Broadcast a campaign event to all SSE listeners
    pub fn emit(&self, event: CampaignEvent) {
        self.events.emit(event);
    }

    /// Mark a run as active and hand back a fresh cancellation token
    pub async fn begin_run(&self, campaign_id: Uuid) -> watch::Receiver<bool> {
        *self.active_campaign.write().await = Some(campaign_id);
        // Reset any cancellation left over from a previous run
        let _ = self.cancel_tx.send(false);
        self.cancel_tx.subscribe()
    }

    /// Clear the active run marker
    pub async fn finish_run(&self) {
        *self.active_campaign.write().await = None;
    }

    pub async fn active_campaign(&self) -> Option<Uuid> {
        *self.active_campaign.read().await
    }

    /// Request cooperative cancellation of the active run. Returns false
    /// when `campaign_id` is not the active run.
    pub async fn request_cancel(&self, campaign_id: Uuid) -> bool {
        if *self.active_campaign.read().await == Some(campaign_id) {
            let _ = self.cancel_tx.send(true);
            true
        } else {
            false
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn begin_run_resets_cancellation() {
        let state = SharedState::new();
        let id = Uuid::new_v4();

        let rx = state.begin_run(id).await;
        assert!(!*rx.borrow());
        assert!(state.request_cancel(id).await);
        assert!(*rx.borrow());

        // A new run starts clean
        let rx2 = state.begin_run(Uuid::new_v4()).await;
        assert!(!*rx2.borrow());
    }

    #[tokio::test]
    async fn cancel_of_inactive_campaign_is_rejected() {
        let state = SharedState::new();
        state.begin_run(Uuid::new_v4()).await;
        assert!(!state.request_cancel(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn finish_run_clears_active() {
        let state = SharedState::new();
        let id = Uuid::new_v4();
        state.begin_run(id).await;
        assert_eq!(state.active_campaign().await, Some(id));
        state.finish_run().await;
        assert_eq!(state.active_campaign().await, None);
    }
}
