//! Campaign dispatch engine
//!
//! The per-campaign sequential loop that drives the automation surface
//! through navigation, composition, send, and confirmation for each
//! contact, with bounded retries, a multi-tier send protocol, and
//! human-like pacing between contacts.

pub mod attachment;
pub mod engine;
pub mod outcome;
pub mod retry;
pub mod run;
pub mod selectors;
pub mod strategies;
pub mod surface;

pub use engine::CampaignEngine;
pub use outcome::{DispatchOutcome, DispatchSummary, OutcomeStatus};
pub use surface::Surface;
