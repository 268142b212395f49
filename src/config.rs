use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub progress: bool,
    pub browser: BrowserConfig,
    pub scroll: ScrollConfig,
    pub site: SiteConfig,
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub sandbox: bool,
    pub navigation_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Timings and bounds for the lazy-load scrolling phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Pause after each scroll step.
    pub settle_ms: u64,
    /// Pause before re-reading the height once the bottom is reached.
    pub confirm_ms: u64,
    /// Confirmed bottom readings needed before the page counts as stable.
    pub stable_streak: u32,
    /// Hard bound on scroll probe cycles.
    pub max_attempts: u32,
    pub image_wait_secs: u64,
    pub image_settle_secs: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub expected_host: String,
    pub listing_selector: String,
    pub listing_wait_secs: u64,
    pub issue_link_pattern: String,
    pub image_container: String,
    pub placeholder_suffixes: Vec<String>,
    pub real_image_markers: Vec<String>,
    pub forced_query: Vec<(String, String)>,
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub chunk_size: usize,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads the file when it exists, otherwise falls back to the built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            debug!("Config file {:?} not found, using defaults", path);
            Ok(Self::default())
        }
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl ScrollConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn confirm(&self) -> Duration {
        Duration::from_millis(self.confirm_ms)
    }

    pub fn image_wait(&self) -> Duration {
        Duration::from_secs(self.image_wait_secs)
    }

    pub fn image_settle(&self) -> Duration {
        Duration::from_secs(self.image_settle_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl SiteConfig {
    pub fn listing_wait(&self) -> Duration {
        Duration::from_secs(self.listing_wait_secs)
    }

    /// Selectors matching image elements that already point at real page assets.
    pub fn real_image_selectors(&self) -> Vec<String> {
        self.real_image_markers
            .iter()
            .map(|marker| format!("{} img[src*='{}']", self.image_container, marker))
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_dir: PathBuf::from("Comics"),
            concurrency: 1,
            progress: true,
            browser: BrowserConfig::default(),
            scroll: ScrollConfig::default(),
            site: SiteConfig::default(),
            download: DownloadConfig::default(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1920,
            window_height: 1080,
            sandbox: false,
            navigation_timeout_secs: 60,
            idle_timeout_secs: 600,
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            settle_ms: 1000,
            confirm_ms: 2000,
            stable_streak: 3,
            max_attempts: 150,
            image_wait_secs: 30,
            image_settle_secs: 5,
            poll_interval_ms: 250,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            expected_host: "readcomiconline".to_string(),
            listing_selector: "table.listing".to_string(),
            listing_wait_secs: 10,
            issue_link_pattern: r"/Issue[-_]|id=".to_string(),
            image_container: "div#divImage".to_string(),
            placeholder_suffixes: vec!["blank.gif".to_string(), "loading.gif".to_string()],
            real_image_markers: vec!["blogspot".to_string(), "googleusercontent".to_string()],
            forced_query: vec![
                ("quality".to_string(), "hq".to_string()),
                ("readType".to_string(), "1".to_string()),
            ],
            headers: HashMap::new(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            connect_timeout_secs: 10,
            chunk_size: 8192,
        }
    }
}
