// src/config/dashboard.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::fetch::FetchSettings;

// --- defaults ---
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_TABLE: &str = "jobs_clean";
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_RECORD_CAP: usize = 5000;
pub const DEFAULT_CUTOFF_DATE: &str = "2025-03-01";
pub const DEFAULT_SKILLS_SOURCE: &str = "cryptojobs.com";
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RELAY_BASE: &str = "http://localhost:5001";
pub const DEFAULT_RELAY_CHAT_PATH: &str = "/api/chat";
pub const DEFAULT_RELAY_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONFIG_PATH: &str = "config/dashboard.toml";

// --- env names ---
pub const ENV_CONFIG_PATH: &str = "DASHBOARD_CONFIG_PATH";
pub const ENV_BIND: &str = "DASHBOARD_BIND";
pub const ENV_STORE_URL: [&str; 2] = ["SUPABASE_URL", "REACT_APP_SUPABASE_URL"];
pub const ENV_STORE_KEY: [&str; 2] = ["SUPABASE_KEY", "REACT_APP_SUPABASE_KEY"];
pub const ENV_RELAY_BASE: &str = "CHAT_API_BASE";
pub const ENV_PAGE_SIZE: &str = "DASHBOARD_PAGE_SIZE";
pub const ENV_RECORD_CAP: &str = "DASHBOARD_RECORD_CAP";
pub const ENV_CUTOFF_DATE: &str = "DASHBOARD_CUTOFF_DATE";
pub const ENV_RELAY_TIMEOUT: &str = "DASHBOARD_RELAY_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("DASHBOARD_CONFIG_PATH points to non-existent path {}", .0.display())]
    MissingFile(PathBuf),
    #[error("{var} is not valid: {reason}")]
    Env { var: &'static str, reason: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration for the dashboard binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind: String,
    pub store: StoreSettings,
    pub relay: RelaySettings,
}

/// Hosted record store (PostgREST endpoint) and paging limits.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub url: String,
    #[serde(skip_serializing)]
    pub key: String,
    pub table: String,
    pub page_size: usize,
    pub record_cap: usize,
    pub cutoff_date: NaiveDate,
    pub skills_source: String,
    pub timeout_secs: u64,
}

/// External analytics backend behind the chat panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    pub base_url: String,
    pub chat_path: String,
    pub timeout_secs: u64,
}

/// [`DEFAULT_CUTOFF_DATE`] as a date.
pub fn default_cutoff() -> NaiveDate {
    NaiveDate::parse_from_str(DEFAULT_CUTOFF_DATE, "%Y-%m-%d").unwrap_or_default()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            store: StoreSettings::default(),
            relay: RelaySettings::default(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: String::new(),
            table: DEFAULT_TABLE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            record_cap: DEFAULT_RECORD_CAP,
            cutoff_date: default_cutoff(),
            skills_source: DEFAULT_SKILLS_SOURCE.to_string(),
            timeout_secs: DEFAULT_STORE_TIMEOUT_SECS,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RELAY_BASE.to_string(),
            chat_path: DEFAULT_RELAY_CHAT_PATH.to_string(),
            timeout_secs: DEFAULT_RELAY_TIMEOUT_SECS,
        }
    }
}

// Never print the store key.
impl fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSettings")
            .field("url", &self.url)
            .field("key_len", &self.key.len())
            .field("table", &self.table)
            .field("page_size", &self.page_size)
            .field("record_cap", &self.record_cap)
            .field("cutoff_date", &self.cutoff_date)
            .field("skills_source", &self.skills_source)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl StoreSettings {
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            page_size: self.page_size,
            record_cap: self.record_cap,
            posted_since: self.cutoff_date,
            skills_source: self.skills_source.clone(),
        }
    }
}

impl DashboardConfig {
    /// Resolve configuration: defaults → TOML file → environment.
    ///
    /// File lookup:
    /// 1) $DASHBOARD_CONFIG_PATH (must exist)
    /// 2) config/dashboard.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = Self::from_default_file()?;
        cfg.apply_env(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_default_file() -> Result<Self, ConfigError> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(ConfigError::MissingFile(pb));
            }
            return Self::load_from_file(&pb);
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from_file(&fallback);
        }
        Ok(Self::default())
    }

    /// Overlay environment values. `get` is the variable lookup (injectable for tests).
    pub fn apply_env<F>(&mut self, get: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| names.iter().find_map(|n| get(n)).map(|v| v.trim().to_string());

        if let Some(v) = get(ENV_BIND) {
            self.bind = v.trim().to_string();
        }
        if let Some(v) = first(&ENV_STORE_URL[..]) {
            self.store.url = v;
        }
        if let Some(v) = first(&ENV_STORE_KEY[..]) {
            self.store.key = v;
        }
        if let Some(v) = get(ENV_RELAY_BASE) {
            self.relay.base_url = v.trim().to_string();
        }
        if let Some(v) = get(ENV_PAGE_SIZE) {
            self.store.page_size = parse_env(ENV_PAGE_SIZE, &v)?;
        }
        if let Some(v) = get(ENV_RECORD_CAP) {
            self.store.record_cap = parse_env(ENV_RECORD_CAP, &v)?;
        }
        if let Some(v) = get(ENV_CUTOFF_DATE) {
            self.store.cutoff_date = NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
                .map_err(|e| ConfigError::Env {
                    var: ENV_CUTOFF_DATE,
                    reason: e.to_string(),
                })?;
        }
        if let Some(v) = get(ENV_RELAY_TIMEOUT) {
            self.relay.timeout_secs = parse_env(ENV_RELAY_TIMEOUT, &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.page_size == 0 {
            return Err(ConfigError::Invalid("store.page_size must be at least 1".into()));
        }
        if self.store.record_cap == 0 {
            return Err(ConfigError::Invalid("store.record_cap must be at least 1".into()));
        }
        if self.relay.timeout_secs == 0 {
            return Err(ConfigError::Invalid("relay.timeout_secs must be at least 1".into()));
        }
        if self.relay.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("relay.base_url is empty".into()));
        }
        Ok(())
    }
}

fn parse_env<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Env {
        var,
        reason: e.to_string(),
    })
}
