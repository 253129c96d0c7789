use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::pricing::PriceTable;

pub const DEFAULT_MODELS: [&str; 2] = ["gemini-1.5-flash", "gemini-pro"];
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_DATASET_ROWS: usize = 50;

/// Everything the desk remembers between runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub prices: PriceTable,
    #[serde(default)]
    pub ai: AiSettings,
    #[serde(default)]
    pub drive: DriveSettings,
    #[serde(default)]
    pub network: NetworkSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiSettings {
    pub api_key: Option<String>,
    /// Tried in order until one answers.
    pub models: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            timeout_secs: DEFAULT_AI_TIMEOUT_SECS,
        }
    }
}

impl AiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriveSettings {
    /// OAuth bearer token for a private drive.
    pub access_token: Option<String>,
    /// Service-account JSON key; searched for by file name when unset.
    #[serde(default)]
    pub service_account_key: Option<PathBuf>,
    /// API key for files shared by link.
    pub api_key: Option<String>,
    /// Substring the spreadsheet name must contain; empty matches any.
    pub name_pattern: String,
    pub row_limit: usize,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            access_token: None,
            service_account_key: None,
            api_key: None,
            name_pattern: String::new(),
            row_limit: DEFAULT_DATASET_ROWS,
        }
    }
}

impl DriveSettings {
    pub fn has_credentials(&self) -> bool {
        self.access_token.is_some() || self.service_account_key.is_some() || self.api_key.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Local HTTP proxy port, e.g. a VPN client's listener.
    pub proxy_port: Option<u16>,
}

impl NetworkSettings {
    pub fn proxy_url(&self) -> Option<String> {
        self.proxy_port.map(|port| format!("http://127.0.0.1:{port}"))
    }
}

/// Per-run values that take precedence over the stored settings.
#[derive(Clone, Debug, Default)]
pub struct SettingsOverrides {
    pub gemini_key: Option<String>,
    pub drive_token: Option<String>,
    pub drive_key: Option<String>,
    pub drive_key_file: Option<PathBuf>,
    pub proxy_port: Option<u16>,
}

impl Settings {
    pub fn apply_overrides(&mut self, overrides: SettingsOverrides) {
        if let Some(key) = overrides.gemini_key.filter(|k| !k.is_empty()) {
            self.ai.api_key = Some(key);
        }
        if let Some(token) = overrides.drive_token.filter(|t| !t.is_empty()) {
            self.drive.access_token = Some(token);
        }
        if let Some(key) = overrides.drive_key.filter(|k| !k.is_empty()) {
            self.drive.api_key = Some(key);
        }
        if let Some(path) = overrides.drive_key_file.filter(|p| !p.as_os_str().is_empty()) {
            self.drive.service_account_key = Some(path);
        }
        if overrides.proxy_port.is_some() {
            self.network.proxy_port = overrides.proxy_port;
        }
    }
}
