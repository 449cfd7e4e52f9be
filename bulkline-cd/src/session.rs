//! Automation session lifecycle
//!
//! Owns the single live browser session for the whole process: created
//! on first demand, liveness-checked on every request, torn down and
//! replaced when connectivity is lost. The persistent profile directory
//! keeps the messaging client's QR pairing across restarts, so the
//! handshake is needed only once.
//!
//! The manager also hands out the global run guard that serializes
//! campaigns against the one interactive surface.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::browser::PageDriver;
use crate::config::SessionConfig;
use crate::error::{Error, Result};

/// Browser binaries probed when no explicit path is configured
const BROWSER_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// DevTools target description returned by the `/json` HTTP endpoints
#[derive(Debug, Deserialize)]
struct TargetInfo {
    #[serde(rename = "type")]
    kind: String,
    url: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    ws_url: Option<String>,
}

struct LiveSession {
    /// Child handle when this process launched the browser; None when an
    /// already-running browser was attached
    child: Option<Child>,
    driver: Arc<PageDriver>,
    last_used: Instant,
}

/// Exclusive permission to run one campaign against the session
pub type RunGuard = OwnedMutexGuard<()>;

pub struct SessionManager {
    cfg: SessionConfig,
    poll_interval: Duration,
    inner: Mutex<Option<LiveSession>>,
    run_lock: Arc<Mutex<()>>,
    http: reqwest::Client,
}

impl SessionManager {
    pub fn new(cfg: SessionConfig, poll_interval: Duration) -> Self {
        Self {
            cfg,
            poll_interval,
            inner: Mutex::new(None),
            run_lock: Arc::new(Mutex::new(())),
            http: reqwest::Client::new(),
        }
    }

    /// Acquire the global run lock, waiting a bounded interval.
    ///
    /// Campaigns must hold this guard across acquire → dispatch →
    /// release; a second campaign arriving while it is held gets
    /// `Error::Busy` once the wait elapses.
    pub async fn begin_run(&self) -> Result<RunGuard> {
        tokio::time::timeout(self.cfg.run_lock_wait(), self.run_lock.clone().lock_owned())
            .await
            .map_err(|_| Error::Busy("another campaign is currently dispatching".to_string()))
    }

    /// Return the live session's surface, creating or reviving the
    /// session as needed.
    ///
    /// Failure is surfaced as `SessionUnavailable` and never retried
    /// here; the caller decides whether to abort the campaign.
    pub async fn acquire(&self) -> Result<Arc<PageDriver>> {
        let mut slot = self.inner.lock().await;

        if let Some(live) = slot.as_mut() {
            if live.driver.is_alive() && live.driver.ping().await {
                live.last_used = Instant::now();
                debug!("Reusing live automation session");
                return Ok(Arc::clone(&live.driver));
            }
        }

        if let Some(stale) = slot.take() {
            warn!(
                "Automation session is stale (idle {:?}), recreating",
                stale.last_used.elapsed()
            );
            if let Some(mut child) = stale.child {
                let _ = child.start_kill();
            }
        }

        let live = self.create_session().await?;
        let driver = Arc::clone(&live.driver);
        *slot = Some(live);
        Ok(driver)
    }

    /// Tear down the session (used at process shutdown)
    pub async fn shutdown(&self) {
        let mut slot = self.inner.lock().await;
        if let Some(live) = slot.take() {
            if let Some(mut child) = live.child {
                let _ = child.start_kill();
            }
            info!("Automation session torn down");
        }
    }

    async fn create_session(&self) -> Result<LiveSession> {
        let endpoint = format!("http://127.0.0.1:{}", self.cfg.debug_port);

        // Reuse an already-running DevTools endpoint (existing logins
        // preserved); otherwise launch our own browser
        let child = if self.devtools_reachable(&endpoint).await {
            info!("Attaching to running browser at {}", endpoint);
            None
        } else {
            let child = self.launch_browser()?;
            self.await_devtools(&endpoint).await?;
            Some(child)
        };

        let (ws_url, fresh_page) = self.locate_messaging_page(&endpoint).await?;

        let driver = PageDriver::connect(&ws_url, self.cfg.command_wait(), self.poll_interval)
            .await
            .map_err(|e| Error::SessionUnavailable(format!("page connect: {}", e)))?;

        if fresh_page {
            // Let the messaging surface finish loading and syncing; first
            // run on a fresh profile needs the QR pairing scanned here
            info!(
                "Waiting {:?} for the messaging surface to settle (scan QR if first run)",
                self.cfg.session_settle()
            );
            tokio::time::sleep(self.cfg.session_settle()).await;
        }

        info!("Automation session ready");
        Ok(LiveSession {
            child,
            driver: Arc::new(driver),
            last_used: Instant::now(),
        })
    }

    fn launch_browser(&self) -> Result<Child> {
        let profile_dir: PathBuf = self
            .cfg
            .profile_dir
            .clone()
            .ok_or_else(|| Error::SessionUnavailable("no profile directory".to_string()))?;

        let mut args = vec![
            format!("--remote-debugging-port={}", self.cfg.debug_port),
            format!("--user-data-dir={}", profile_dir.display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
        ];
        if self.cfg.headless {
            args.push("--headless=new".to_string());
        } else {
            args.push("--start-maximized".to_string());
        }

        let binaries: Vec<String> = match &self.cfg.browser_binary {
            Some(path) => vec![path.display().to_string()],
            None => BROWSER_CANDIDATES.iter().map(|s| s.to_string()).collect(),
        };

        for binary in &binaries {
            match Command::new(binary).args(&args).kill_on_drop(true).spawn() {
                Ok(child) => {
                    info!("Launched browser: {}", binary);
                    return Ok(child);
                }
                Err(e) => debug!("Browser candidate {} failed: {}", binary, e),
            }
        }

        Err(Error::SessionUnavailable(format!(
            "no browser binary could be launched (tried {})",
            binaries.join(", ")
        )))
    }

    async fn devtools_reachable(&self, endpoint: &str) -> bool {
        self.http
            .get(format!("{}/json/version", endpoint))
            .timeout(Duration::from_secs(1))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn await_devtools(&self, endpoint: &str) -> Result<()> {
        let deadline = Instant::now() + self.cfg.launch_wait();
        while Instant::now() < deadline {
            if self.devtools_reachable(endpoint).await {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        Err(Error::SessionUnavailable(format!(
            "DevTools endpoint {} did not come up within {:?}",
            endpoint,
            self.cfg.launch_wait()
        )))
    }

    /// Find an open page on the messaging web app, or open a new one.
    /// Returns the page WebSocket URL and whether the page is fresh
    /// (fresh pages get the settle wait).
    async fn locate_messaging_page(&self, endpoint: &str) -> Result<(String, bool)> {
        let targets: Vec<TargetInfo> = self
            .http
            .get(format!("{}/json/list", endpoint))
            .send()
            .await
            .map_err(|e| Error::SessionUnavailable(format!("target list: {}", e)))?
            .json()
            .await
            .map_err(|e| Error::SessionUnavailable(format!("target list: {}", e)))?;

        let messaging_host = url::Url::parse(&self.cfg.messaging_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        for target in &targets {
            if target.kind == "page"
                && !messaging_host.is_empty()
                && target.url.contains(&messaging_host)
            {
                if let Some(ws_url) = &target.ws_url {
                    debug!("Reusing open messaging page: {}", target.url);
                    return Ok((ws_url.clone(), false));
                }
            }
        }

        // Chrome 111+ requires PUT for /json/new
        let created: TargetInfo = self
            .http
            .put(format!("{}/json/new?{}", endpoint, self.cfg.messaging_url))
            .send()
            .await
            .map_err(|e| Error::SessionUnavailable(format!("open page: {}", e)))?
            .json()
            .await
            .map_err(|e| Error::SessionUnavailable(format!("open page: {}", e)))?;

        let ws_url = created
            .ws_url
            .ok_or_else(|| Error::SessionUnavailable("new page has no ws endpoint".to_string()))?;
        debug!("Opened new messaging page");
        Ok((ws_url, true))
    }
}
