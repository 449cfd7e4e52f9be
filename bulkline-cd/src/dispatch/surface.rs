//! Automation surface abstraction
//!
//! The dispatch engine is generic over this trait so the whole send
//! protocol can be exercised against a scripted fake in tests. The
//! production implementation is `browser::PageDriver`.

use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// One interactive browsing surface pointed at the messaging web app.
///
/// Every wait is bounded by an explicit timeout; an unbounded wait is a
/// defect. `wait_for` reports absence as `Ok(false)` rather than an error
/// because "not there yet" drives the fallback chains, while transport
/// failures surface as `Err`.
#[allow(async_fn_in_trait)]
pub trait Surface: Send + Sync {
    /// Navigate to a URL and wait (bounded) for the document to load
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Poll for a selector until found or the bound elapses
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Single existence probe, no waiting
    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Click the first element matching the selector
    async fn click(&self, selector: &str) -> Result<()>;

    /// Dispatch a synthetic key press to the focused element
    async fn press_key(&self, key: &str) -> Result<()>;

    /// Submit a local file path to a native file-picker input
    async fn set_file_input(&self, selector: &str, path: &Path) -> Result<()>;
}

impl<S: Surface> Surface for &S {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        (**self).navigate(url, timeout).await
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool> {
        (**self).wait_for(selector, timeout).await
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        (**self).exists(selector).await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        (**self).click(selector).await
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        (**self).press_key(key).await
    }

    async fn set_file_input(&self, selector: &str, path: &Path) -> Result<()> {
        (**self).set_file_input(selector, path).await
    }
}
