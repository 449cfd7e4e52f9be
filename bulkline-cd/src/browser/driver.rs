//! High-level page driver
//!
//! Ergonomic operations over a `CdpClient`: navigation with a bounded
//! load wait, selector polling via `Runtime.evaluate`, clicks, key
//! dispatch, and native file-input submission. Implements the dispatch
//! engine's `Surface` trait.

use std::path::Path;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use crate::browser::cdp::CdpClient;
use crate::dispatch::surface::Surface;
use crate::error::{Error, Result};

pub struct PageDriver {
    cdp: CdpClient,
    poll_interval: Duration,
}

impl PageDriver {
    /// Connect to a page-level WebSocket endpoint and enable the Page
    /// domain (needed for load events)
    pub async fn connect(
        ws_url: &str,
        command_wait: Duration,
        poll_interval: Duration,
    ) -> Result<Self> {
        let cdp = CdpClient::connect(ws_url, command_wait).await?;
        cdp.call("Page.enable", json!({})).await?;
        Ok(Self { cdp, poll_interval })
    }

    pub fn is_alive(&self) -> bool {
        self.cdp.is_alive()
    }

    /// Cheap liveness probe: a no-op evaluate round-trip
    pub async fn ping(&self) -> bool {
        self.eval("1").await.is_ok()
    }

    /// Evaluate an expression in page context, returning its value
    pub async fn eval(&self, expression: &str) -> Result<Value> {
        let result = self
            .cdp
            .call(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or("evaluation failed");
            return Err(Error::Cdp(text.to_string()));
        }

        Ok(result
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn eval_bool(&self, expression: &str) -> Result<bool> {
        Ok(self.eval(expression).await?.as_bool().unwrap_or(false))
    }

    fn selector_literal(selector: &str) -> String {
        // JSON string escaping is valid JS string escaping
        serde_json::to_string(selector).expect("selector serializes")
    }
}

impl Surface for PageDriver {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        // Subscribe before navigating so the load event cannot be missed
        let mut events = self.cdp.events();

        let result = self.cdp.call("Page.navigate", json!({ "url": url })).await?;
        if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
            if !error_text.is_empty() {
                return Err(Error::Cdp(format!("navigate {}: {}", url, error_text)));
            }
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline
                .checked_duration_since(tokio::time::Instant::now())
                .ok_or_else(|| Error::Timeout(format!("navigation to {}", url)))?;

            match tokio::time::timeout(remaining, events.recv()).await {
                Ok(Ok(event)) if event.method == "Page.domContentEventFired" => {
                    debug!("Navigated to {}", url);
                    return Ok(());
                }
                Ok(Ok(_)) => continue,
                // Lagged subscribers may drop frames; keep waiting until
                // the deadline rather than failing the navigation
                Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(_)) => return Err(Error::Cdp("connection closed".to_string())),
                Err(_) => return Err(Error::Timeout(format!("navigation to {}", url))),
            }
        }
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.exists(selector).await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        let expr = format!(
            "document.querySelector({}) !== null",
            Self::selector_literal(selector)
        );
        self.eval_bool(&expr).await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let expr = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
            Self::selector_literal(selector)
        );
        if self.eval_bool(&expr).await? {
            Ok(())
        } else {
            Err(Error::ElementNotFound(selector.to_string()))
        }
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        // Enter carries a carriage return so contenteditable targets
        // treat it as a real keystroke
        let text = if key == "Enter" { "\r" } else { "" };
        self.cdp
            .call(
                "Input.dispatchKeyEvent",
                json!({
                    "type": "keyDown",
                    "key": key,
                    "code": key,
                    "text": text,
                    "unmodifiedText": text,
                }),
            )
            .await?;
        self.cdp
            .call(
                "Input.dispatchKeyEvent",
                json!({ "type": "keyUp", "key": key, "code": key }),
            )
            .await?;
        Ok(())
    }

    async fn set_file_input(&self, selector: &str, path: &Path) -> Result<()> {
        let document = self.cdp.call("DOM.getDocument", json!({})).await?;
        let root_id = document
            .pointer("/root/nodeId")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::Cdp("DOM.getDocument returned no root".to_string()))?;

        let node = self
            .cdp
            .call(
                "DOM.querySelector",
                json!({ "nodeId": root_id, "selector": selector }),
            )
            .await?;
        let node_id = node.get("nodeId").and_then(Value::as_u64).unwrap_or(0);
        if node_id == 0 {
            return Err(Error::ElementNotFound(selector.to_string()));
        }

        self.cdp
            .call(
                "DOM.setFileInputFiles",
                json!({ "nodeId": node_id, "files": [path.to_string_lossy()] }),
            )
            .await?;
        Ok(())
    }
}
