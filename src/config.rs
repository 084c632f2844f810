use crate::model::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Looked up in the working directory when no config path is given.
pub const DEFAULT_CONFIG: &str = "config.json";

/// Element locators for the directory site. Bump `version` whenever the site markup changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorMap {
    pub version: String,
    pub search_input: String,
    pub card: String,
    pub title: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub phone: String,
    pub email: String,
}

impl Default for SelectorMap {
    fn default() -> Self {
        Self {
            version: "2024-selfstoragetracker".to_string(),
            search_input: "#ctl00_txtsearch".to_string(),
            card: ".fleamarketrow.shadow.border".to_string(),
            title: ".row.mb-3".to_string(),
            street: "span[id*='ADDRESS1']".to_string(),
            city: "span[id*='CITY']".to_string(),
            state: "span[id*='STATE']".to_string(),
            zipcode: "span[id*='Label3']".to_string(),
            phone: "span[id*='MERCHANDISE']".to_string(),
            email: "span[id*='Label1']".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub start_maximized: bool,
    pub window_size: Option<(u32, u32)>,
    pub idle_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            start_maximized: true,
            window_size: None,
            idle_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub element_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    pub settle_ms: u64,
    pub scroll_interval_ms: u64,
    pub max_scroll_rounds: u32,
    pub scroll_budget_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            element_timeout_ms: 10_000,
            navigation_timeout_ms: 30_000,
            settle_ms: 3_000,
            scroll_interval_ms: 2_000,
            max_scroll_rounds: 50,
            scroll_budget_ms: 120_000,
        }
    }
}

impl TimingConfig {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn scroll_interval(&self) -> Duration {
        Duration::from_millis(self.scroll_interval_ms)
    }

    pub fn scroll_budget(&self) -> Duration {
        Duration::from_millis(self.scroll_budget_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub resume: bool,
    pub start_offset: usize,
    pub dedupe_records: bool,
    pub site_url: String,
    pub browser: BrowserConfig,
    pub timing: TimingConfig,
    pub selectors: SelectorMap,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("dataset/state_cities.csv"),
            output_path: PathBuf::from("new_data.csv"),
            resume: true,
            start_offset: 0,
            dedupe_records: true,
            site_url: "https://www.selfstoragetracker.com/".to_string(),
            browser: BrowserConfig::default(),
            timing: TimingConfig::default(),
            selectors: SelectorMap::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// An explicit path must load. Without one, `default` is used if it exists, else built-in defaults.
pub fn resolve_config(explicit: Option<PathBuf>, default: &Path) -> Result<AppConfig, ConfigError> {
    let config = match explicit {
        Some(path) => load_config(&path)?,
        None if default.exists() => load_config(default)?,
        None => {
            info!("No {} found, using built-in defaults", default.display());
            AppConfig::default()
        }
    };
    info!(
        "Config: input {}, output {}, selectors {}",
        config.input_path.display(),
        config.output_path.display(),
        config.selectors.version
    );
    Ok(config)
}
