//! Attachment sub-protocol
//!
//! Runs after a confirmed text send, inside the same conversation:
//! attach affordance → native file input → preview settle → send chain.
//! Failure at any stage is contact-scoped; the caller downgrades the
//! outcome to `file_error` without reverting the confirmed text send.

use std::path::Path;

use tracing::debug;

use crate::config::DispatchConfig;
use crate::dispatch::selectors;
use crate::dispatch::strategies;
use crate::dispatch::surface::Surface;
use crate::error::{Error, Result};

/// Attach `path` to the open conversation and send it
pub async fn send_attachment<S: Surface>(
    surface: &S,
    cfg: &DispatchConfig,
    path: &Path,
) -> Result<()> {
    if !surface
        .wait_for(selectors::ATTACH_CONTROL, cfg.attach_wait())
        .await?
    {
        return Err(Error::ElementNotFound("attach control".to_string()));
    }
    surface.click(selectors::ATTACH_CONTROL).await?;
    debug!("Attach control clicked");

    if !surface
        .wait_for(selectors::FILE_INPUT, cfg.file_input_wait())
        .await?
    {
        return Err(Error::ElementNotFound("file input".to_string()));
    }
    surface.set_file_input(selectors::FILE_INPUT, path).await?;

    // Let the preview render before the send control is live
    tokio::time::sleep(cfg.preview_settle()).await;

    let chain = strategies::attachment_send_chain(cfg);
    let tier = strategies::trigger_send(surface, &chain).await?;
    debug!("Attachment sent via {}", tier);
    Ok(())
}
