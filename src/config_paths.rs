//! Where textmacro keeps its files.
//!
//! ```text
//! <config dir>/
//! ├── config.yaml   engine settings (EngineConfig)
//! ├── macros.yaml   default macro catalog
//! └── logs/         textmacro.log.YYYY-MM-DD
//! ```
//!
//! The config dir is `$TEXTMACRO_CONFIG_DIR` when set. Otherwise it is
//! `$XDG_CONFIG_HOME/textmacro` or `~/.config/textmacro` on Unix and macOS,
//! and `%APPDATA%\textmacro` on Windows.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "textmacro";

/// Environment variable that overrides the config dir
pub const CONFIG_DIR_ENV: &str = "TEXTMACRO_CONFIG_DIR";

/// Prefix of the daily-rotated log files
pub const LOG_FILE_PREFIX: &str = "textmacro.log";

pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    platform_base().map(|base| base.join(APP_DIR))
}

#[cfg(target_os = "windows")]
fn platform_base() -> Option<PathBuf> {
    env::var_os("APPDATA").map(PathBuf::from)
}

#[cfg(not(target_os = "windows"))]
fn platform_base() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
}

pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.yaml"))
}

pub fn macros_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("macros.yaml"))
}

pub fn logs_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("logs"))
}

/// Create `path` and its parents
fn create(path: PathBuf) -> Result<PathBuf, String> {
    fs::create_dir_all(&path)
        .map_err(|e| format!("Failed to create directory {}: {}", path.display(), e))?;
    Ok(path)
}

pub fn ensure_config_dir() -> Result<PathBuf, String> {
    create(config_dir().ok_or_else(|| "No config directory available".to_string())?)
}

pub fn ensure_logs_dir() -> Result<PathBuf, String> {
    create(ensure_config_dir()?.join("logs"))
}

/// Newest rotated log file in `dir`, if any
pub fn latest_log_in(dir: &Path) -> Option<PathBuf> {
    fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX))
        })
        // Date suffixes sort lexically
        .max()
}
