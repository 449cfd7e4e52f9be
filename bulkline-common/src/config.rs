//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(root_folder));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_root_folder())
}

/// Locate the platform configuration file, if any
fn locate_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/bulkline/config.toml first, then /etc/bulkline/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("bulkline").join("config.toml"));
        let system_config = PathBuf::from("/etc/bulkline/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let candidate = dirs::config_dir()
        .map(|d| d.join("bulkline").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if candidate.exists() {
        Ok(candidate)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", candidate)))
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("bulkline"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/bulkline"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("bulkline"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/bulkline"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("bulkline"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\bulkline"))
    } else {
        PathBuf::from("./bulkline_data")
    }
}

/// Ensure the root folder exists, creating it when missing
pub fn ensure_root_folder(root: &Path) -> Result<()> {
    if !root.exists() {
        std::fs::create_dir_all(root)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_arg_wins_over_everything() {
        let root = resolve_root_folder(Some("/tmp/bulkline-test"), "BULKLINE_TEST_UNSET").unwrap();
        assert_eq!(root, PathBuf::from("/tmp/bulkline-test"));
    }

    #[test]
    fn falls_back_to_default_without_cli_or_env() {
        let root = resolve_root_folder(None, "BULKLINE_TEST_DEFINITELY_UNSET").unwrap();
        // Default path is platform dependent; it just has to be non-empty.
        assert!(!root.as_os_str().is_empty());
    }

    #[test]
    fn ensure_creates_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("root");
        ensure_root_folder(&target).unwrap();
        assert!(target.is_dir());
    }
}
