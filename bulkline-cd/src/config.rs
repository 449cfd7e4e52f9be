//! bulkline-cd configuration
//!
//! Runtime configuration assembled from the root folder plus an optional
//! `bulkline.toml` in that folder. Dispatch tuning values are deliberate
//! behavior (pacing, retry bounds, settle waits), not optimizations, and
//! every one of them is declared here rather than hardcoded at use sites.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Campaign Dispatcher configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub root_folder: PathBuf,
    pub db_path: PathBuf,
    /// Directory receiving uploaded contact lists and attachments
    pub upload_dir: PathBuf,
    /// Directory receiving run artifacts (outcome journals, reports)
    pub artifact_dir: PathBuf,
    /// Per-file upload cap in bytes
    pub max_upload_bytes: usize,
    pub session: SessionConfig,
    pub dispatch: DispatchConfig,
}

/// Automation session tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Browser binary; when unset, common install locations are tried
    pub browser_binary: Option<PathBuf>,
    /// DevTools remote debugging port
    pub debug_port: u16,
    /// Persistent profile directory; keeps the QR pairing across restarts
    pub profile_dir: Option<PathBuf>,
    pub headless: bool,
    /// Messaging web application entry point
    pub messaging_url: String,
    /// Settle wait after opening the messaging surface (load + sync)
    pub session_settle_ms: u64,
    /// Bound on browser launch + DevTools endpoint discovery
    pub launch_wait_ms: u64,
    /// Bound on page navigation
    pub navigate_wait_ms: u64,
    /// Bound on a single CDP command round-trip
    pub command_wait_ms: u64,
    /// How long a second campaign waits for the run lock before 409
    pub run_lock_wait_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            browser_binary: None,
            debug_port: 9222,
            profile_dir: None,
            headless: false,
            messaging_url: "https://web.whatsapp.com".to_string(),
            session_settle_ms: 20_000,
            launch_wait_ms: 15_000,
            navigate_wait_ms: 30_000,
            command_wait_ms: 10_000,
            run_lock_wait_ms: 5_000,
        }
    }
}

impl SessionConfig {
    pub fn session_settle(&self) -> Duration {
        Duration::from_millis(self.session_settle_ms)
    }
    pub fn launch_wait(&self) -> Duration {
        Duration::from_millis(self.launch_wait_ms)
    }
    pub fn navigate_wait(&self) -> Duration {
        Duration::from_millis(self.navigate_wait_ms)
    }
    pub fn command_wait(&self) -> Duration {
        Duration::from_millis(self.command_wait_ms)
    }
    pub fn run_lock_wait(&self) -> Duration {
        Duration::from_millis(self.run_lock_wait_ms)
    }
}

/// Dispatch loop tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Replaces a leading zero during normalization. Domain policy for the
    /// deployments this service targets, not a universal phone rule.
    pub default_country_prefix: String,
    /// Parser drops rows whose digit count is below this
    pub min_digits: usize,
    /// Validation length window (inclusive)
    pub min_length: usize,
    pub max_length: usize,
    /// Whole-attempt retries per contact (steps navigate..confirm)
    pub max_attempts: u32,
    pub attempt_pause_ms: u64,
    /// Bound on locating the message composition control
    pub compose_wait_ms: u64,
    /// Bound on the primary send affordance
    pub send_control_wait_ms: u64,
    /// Bound on each fallback send affordance
    pub fallback_control_wait_ms: u64,
    /// Bound on the outgoing-message confirmation marker
    pub confirm_wait_ms: u64,
    pub attach_wait_ms: u64,
    pub file_input_wait_ms: u64,
    /// Settle wait for the attachment preview to render
    pub preview_settle_ms: u64,
    /// Randomized inter-contact pacing window. Required behavior: reduces
    /// the chance of automated-abuse detection by the external service.
    pub pacing_min_ms: u64,
    pub pacing_max_ms: u64,
    /// Whether a confirmed text send with a failed attachment still counts
    /// toward the campaign's sent total
    pub count_file_error_as_sent: bool,
    /// Selector poll interval inside bounded waits
    pub poll_interval_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_country_prefix: "91".to_string(),
            min_digits: 10,
            min_length: 10,
            max_length: 15,
            max_attempts: 3,
            attempt_pause_ms: 2_000,
            compose_wait_ms: 30_000,
            send_control_wait_ms: 10_000,
            fallback_control_wait_ms: 5_000,
            confirm_wait_ms: 10_000,
            attach_wait_ms: 10_000,
            file_input_wait_ms: 10_000,
            preview_settle_ms: 3_000,
            pacing_min_ms: 12_000,
            pacing_max_ms: 25_000,
            count_file_error_as_sent: true,
            poll_interval_ms: 250,
        }
    }
}

impl DispatchConfig {
    pub fn attempt_pause(&self) -> Duration {
        Duration::from_millis(self.attempt_pause_ms)
    }
    pub fn compose_wait(&self) -> Duration {
        Duration::from_millis(self.compose_wait_ms)
    }
    pub fn send_control_wait(&self) -> Duration {
        Duration::from_millis(self.send_control_wait_ms)
    }
    pub fn fallback_control_wait(&self) -> Duration {
        Duration::from_millis(self.fallback_control_wait_ms)
    }
    pub fn confirm_wait(&self) -> Duration {
        Duration::from_millis(self.confirm_wait_ms)
    }
    pub fn attach_wait(&self) -> Duration {
        Duration::from_millis(self.attach_wait_ms)
    }
    pub fn file_input_wait(&self) -> Duration {
        Duration::from_millis(self.file_input_wait_ms)
    }
    pub fn preview_settle(&self) -> Duration {
        Duration::from_millis(self.preview_settle_ms)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Optional `bulkline.toml` layout inside the root folder
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    session: SessionConfig,
    #[serde(default)]
    dispatch: DispatchConfig,
    max_upload_bytes: Option<usize>,
}

impl Config {
    /// Assemble configuration for a root folder, merging `bulkline.toml`
    /// when present
    pub fn load(root_folder: PathBuf) -> Result<Self> {
        let file = Self::read_config_file(&root_folder)?;

        let mut session = file.session;
        if session.profile_dir.is_none() {
            // Persistent identity context lives under the root folder
            session.profile_dir = Some(root_folder.join("browser-profile"));
        }

        Ok(Self {
            db_path: root_folder.join("bulkline.db"),
            upload_dir: root_folder.join("uploads"),
            artifact_dir: root_folder.join("artifacts"),
            max_upload_bytes: file.max_upload_bytes.unwrap_or(10 * 1024 * 1024),
            session,
            dispatch: file.dispatch,
            root_folder,
        })
    }

    fn read_config_file(root: &Path) -> Result<ConfigFile> {
        let path = root.join("bulkline.toml");
        if !path.exists() {
            return Ok(ConfigFile::default());
        }
        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let d = DispatchConfig::default();
        assert_eq!(d.max_attempts, 3);
        assert!(d.pacing_min_ms < d.pacing_max_ms);
        assert_eq!(d.default_country_prefix, "91");
        assert!(d.min_length <= d.max_length);
    }

    #[test]
    fn load_without_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(dir.path().to_path_buf()).unwrap();
        assert_eq!(cfg.db_path, dir.path().join("bulkline.db"));
        assert_eq!(cfg.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(
            cfg.session.profile_dir.as_deref(),
            Some(dir.path().join("browser-profile").as_path())
        );
    }

    #[test]
    fn load_merges_toml_tables() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("bulkline.toml"),
            r#"
max_upload_bytes = 1024

[dispatch]
pacing_min_ms = 100
pacing_max_ms = 200
default_country_prefix = "44"

[session]
debug_port = 9333
headless = true
"#,
        )
        .unwrap();

        let cfg = Config::load(dir.path().to_path_buf()).unwrap();
        assert_eq!(cfg.max_upload_bytes, 1024);
        assert_eq!(cfg.dispatch.pacing_min_ms, 100);
        assert_eq!(cfg.dispatch.default_country_prefix, "44");
        assert_eq!(cfg.session.debug_port, 9333);
        assert!(cfg.session.headless);
        // Untouched values keep their defaults
        assert_eq!(cfg.dispatch.max_attempts, 3);
    }
}
