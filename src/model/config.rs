use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration from config.toml. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub breakdown: BreakdownConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory (default: $XDG_DATA_HOME/tasktree)
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Logical key the forest is stored under; the file is `<dir>/<key>.json`
    #[serde(default = "default_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            dir: None,
            key: default_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for BreakdownConfig {
    fn default() -> Self {
        BreakdownConfig {
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Ring the terminal bell when a timer finishes
    #[serde(default = "default_true")]
    pub bell: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        NotifyConfig { bell: true }
    }
}

fn default_key() -> String {
    "nested-tasks".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_true() -> bool {
    true
}
