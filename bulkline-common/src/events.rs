//! Event types for the Bulkline event system
//!
//! Campaign progress is broadcast over a tokio broadcast channel and
//! streamed to clients via SSE by the dispatcher service.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Campaign lifecycle and progress events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CampaignEvent {
    /// Dispatch loop started for a campaign
    CampaignStarted {
        campaign_id: Uuid,
        total_contacts: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One contact fully resolved (sent/failed/skipped)
    ContactDispatched {
        campaign_id: Uuid,
        /// Position in the contact list (0-based, input order)
        index: usize,
        number: String,
        status: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Dispatch loop finished; terminal counts follow
    CampaignCompleted {
        campaign_id: Uuid,
        total: usize,
        sent: usize,
        invalid: usize,
        not_on_channel: usize,
        file_error: usize,
        error: usize,
        cancelled: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Campaign aborted before the dispatch loop produced outcomes
    CampaignFailed {
        campaign_id: Uuid,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl CampaignEvent {
    /// Event type string used as the SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            CampaignEvent::CampaignStarted { .. } => "CampaignStarted",
            CampaignEvent::ContactDispatched { .. } => "ContactDispatched",
            CampaignEvent::CampaignCompleted { .. } => "CampaignCompleted",
            CampaignEvent::CampaignFailed { .. } => "CampaignFailed",
        }
    }
}

/// Broadcast bus for campaign events
///
/// Cheap to clone; subscribers that lag simply miss events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CampaignEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast an event; no receivers is not an error
    pub fn emit(&self, event: CampaignEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CampaignEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_reaches_subscriber() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(CampaignEvent::CampaignStarted {
            campaign_id: Uuid::new_v4(),
            total_contacts: 3,
            timestamp: chrono::Utc::now(),
        });

        match rx.recv().await.unwrap() {
            CampaignEvent::CampaignStarted { total_contacts, .. } => {
                assert_eq!(total_contacts, 3)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn emit_without_subscribers_is_ok() {
        let bus = EventBus::default();
        bus.emit(CampaignEvent::CampaignFailed {
            campaign_id: Uuid::new_v4(),
            reason: "no session".into(),
            timestamp: chrono::Utc::now(),
        });
    }
}
