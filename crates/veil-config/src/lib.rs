use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for veil
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub issues: IssuesConfig,

    #[serde(default)]
    pub intercept: InterceptConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Enabled categories, in evaluation order
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuesConfig {
    #[serde(default = "default_dismiss_hours")]
    pub dismiss_hours: u32,

    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptConfig {
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,

    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_retrigger_guard_ms")]
    pub retrigger_guard_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file; the project data directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
        }
    }
}

impl Default for IssuesConfig {
    fn default() -> Self {
        Self {
            dismiss_hours: default_dismiss_hours(),
            context_chars: default_context_chars(),
        }
    }
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            scan_timeout_ms: default_scan_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            retrigger_guard_ms: default_retrigger_guard_ms(),
        }
    }
}

impl InterceptConfig {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn retrigger_guard(&self) -> Duration {
        Duration::from_millis(self.retrigger_guard_ms)
    }
}

fn default_categories() -> Vec<String> {
    // URL is supported but opt-in
    vec![
        "EMAIL_ADDRESS".to_string(),
        "PHONE_NUMBER".to_string(),
        "IP_ADDRESS".to_string(),
    ]
}

fn default_dismiss_hours() -> u32 {
    24
}

fn default_context_chars() -> usize {
    100
}

fn default_scan_timeout_ms() -> u64 {
    5000
}

fn default_settle_delay_ms() -> u64 {
    100
}

fn default_retrigger_guard_ms() -> u64 {
    50
}

impl Config {
    /// Load config from default location or create default if not found
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, writing the defaults there if it is missing
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(path, content)?;
            Ok(config)
        }
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "veil", "veil") {
            dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("~/.veil/config.toml")
        }
    }
}
