//! Send-affordance fallback chains
//!
//! The external client has shipped several generations of send controls;
//! which one is present depends on the client revision. The chain is
//! data: an ordered list of named strategies, each with its own bounded
//! locate wait, tried in sequence. A tier is triggered at most once —
//! only *locating* a tier can fail over to the next one.

use std::time::Duration;

use tracing::debug;

use crate::config::DispatchConfig;
use crate::dispatch::selectors;
use crate::dispatch::surface::Surface;
use crate::error::{Error, Result};

/// How a located strategy fires the send
#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    /// Wait for the selector, then click it
    Click { selector: &'static str },
    /// Synthetic key press on the focused composition control; always
    /// "locatable", so it only makes sense as the final tier
    Key { key: &'static str },
}

/// One named tier in a fallback chain
#[derive(Debug, Clone, Copy)]
pub struct SendStrategy {
    pub name: &'static str,
    /// Bounded wait for locating this tier's element (ignored for Key)
    pub wait: Duration,
    pub trigger: Trigger,
}

/// Chain for sending the composed text message
pub fn message_send_chain(cfg: &DispatchConfig) -> Vec<SendStrategy> {
    vec![
        SendStrategy {
            name: "send-icon",
            wait: cfg.send_control_wait(),
            trigger: Trigger::Click {
                selector: selectors::SEND_BUTTON_PRIMARY,
            },
        },
        SendStrategy {
            name: "send-labeled",
            wait: cfg.fallback_control_wait(),
            trigger: Trigger::Click {
                selector: selectors::SEND_BUTTON_LABELED,
            },
        },
        SendStrategy {
            name: "enter-key",
            wait: Duration::ZERO,
            trigger: Trigger::Key { key: "Enter" },
        },
    ]
}

/// Chain for sending an attachment from its preview
pub fn attachment_send_chain(cfg: &DispatchConfig) -> Vec<SendStrategy> {
    vec![
        SendStrategy {
            name: "attachment-send-icon",
            wait: cfg.send_control_wait(),
            trigger: Trigger::Click {
                selector: selectors::ATTACHMENT_SEND,
            },
        },
        SendStrategy {
            name: "attachment-enter-key",
            wait: Duration::ZERO,
            trigger: Trigger::Key { key: "Enter" },
        },
    ]
}

/// Try each tier in order; returns the name of the tier that fired.
///
/// A tier whose element cannot be located within its wait is skipped; a
/// located tier's trigger failure is a real error, not a fallthrough.
pub async fn trigger_send<S: Surface>(surface: &S, chain: &[SendStrategy]) -> Result<&'static str> {
    for strategy in chain {
        match strategy.trigger {
            Trigger::Click { selector } => {
                if surface.wait_for(selector, strategy.wait).await? {
                    surface.click(selector).await?;
                    debug!("Send triggered via {}", strategy.name);
                    return Ok(strategy.name);
                }
                debug!("Strategy {} not located, falling through", strategy.name);
            }
            Trigger::Key { key } => {
                surface.press_key(key).await?;
                debug!("Send triggered via {}", strategy.name);
                return Ok(strategy.name);
            }
        }
    }
    Err(Error::ElementNotFound(
        "no send affordance located by any strategy".to_string(),
    ))
}
