//! Engine configuration persistence
//!
//! Stores user preferences in `~/.config/textmacro/config.yaml`

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::keys::KeyCode;

/// Key that commits a match in commit-key mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitKey {
    Space,
    Enter,
    Tab,
}

impl CommitKey {
    pub fn matches(self, key: KeyCode) -> bool {
        matches!(
            (self, key),
            (CommitKey::Space, KeyCode::Space)
                | (CommitKey::Enter, KeyCode::Enter)
                | (CommitKey::Tab, KeyCode::Tab)
        )
    }
}

/// Engine configuration that persists across sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Characters that start detection
    #[serde(default = "default_trigger_prefixes")]
    pub trigger_prefixes: Vec<char>,

    /// Require an explicit commit key instead of committing on exact match
    #[serde(default)]
    pub commit_key_mode: bool,

    #[serde(default = "default_commit_keys")]
    pub commit_keys: Vec<CommitKey>,

    /// Sites where detection is off; a domain also covers its subdomains
    #[serde(default)]
    pub disabled_sites: Vec<String>,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Grace period for an exact match that is also a prefix
    #[serde(default = "default_confirm_delay_ms")]
    pub confirm_delay_ms: u64,

    /// Grace period before focus loss cancels detection
    #[serde(default = "default_blur_cancel_delay_ms")]
    pub blur_cancel_delay_ms: u64,
}

fn default_trigger_prefixes() -> Vec<char> {
    vec!['/']
}

fn default_commit_keys() -> Vec<CommitKey> {
    vec![CommitKey::Space, CommitKey::Enter]
}

fn default_history_capacity() -> usize {
    crate::history::DEFAULT_CAPACITY
}

fn default_confirm_delay_ms() -> u64 {
    400
}

fn default_blur_cancel_delay_ms() -> u64 {
    150
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trigger_prefixes: default_trigger_prefixes(),
            commit_key_mode: false,
            commit_keys: default_commit_keys(),
            disabled_sites: Vec::new(),
            history_capacity: default_history_capacity(),
            confirm_delay_ms: default_confirm_delay_ms(),
            blur_cancel_delay_ms: default_blur_cancel_delay_ms(),
        }
    }
}

impl EngineConfig {
    /// Load config from the default location, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load config from `path`, falling back to defaults on any failure
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), String> {
        let path = crate::config_paths::config_file()
            .ok_or_else(|| "No config directory available".to_string())?;
        self.save_to(&path)
    }

    /// Save config to `path`, creating its directory if needed
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn is_prefix(&self, c: char) -> bool {
        self.trigger_prefixes.contains(&c)
    }

    pub fn is_commit_key(&self, key: KeyCode) -> bool {
        self.commit_keys.iter().any(|k| k.matches(key))
    }

    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_delay_ms)
    }

    pub fn blur_cancel_delay(&self) -> Duration {
        Duration::from_millis(self.blur_cancel_delay_ms)
    }

    /// Whether detection is disabled for `site`.
    ///
    /// Matches case-insensitively, either exactly or as a parent domain
    /// (`example.com` covers `docs.example.com`).
    pub fn is_site_disabled(&self, site: &str) -> bool {
        let site = site.trim().to_ascii_lowercase();
        if site.is_empty() {
            return false;
        }
        self.disabled_sites.iter().any(|entry| {
            let entry = entry.trim().to_ascii_lowercase();
            !entry.is_empty()
                && (site == entry
                    || site
                        .strip_suffix(entry.as_str())
                        .is_some_and(|rest| rest.ends_with('.')))
        })
    }
}
