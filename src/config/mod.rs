use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::captions::{CaptionFormat, DEFAULT_MAX_GAP, DEFAULT_MIN_DURATION};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Metadata layers (bridge, page data) settings
    pub extraction: ExtractionConfig,

    /// Result cache settings
    pub cache: CacheConfig,

    /// Segment merge thresholds
    pub merge: MergeConfig,

    /// Rendered-panel scraping settings
    pub panel: PanelConfig,

    /// HTTP client settings
    pub http: HttpConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// How long to wait for the page-context bridge
    pub bridge_timeout_ms: u64,

    /// How often to check for the bridge's answer
    pub bridge_poll_interval_ms: u64,

    /// Caption languages to look for, in order
    pub preferred_languages: Vec<String>,

    /// Language to translate to when no preferred track exists
    pub translate_to: Option<String>,

    /// Payload format to request; `auto` leaves the track URL untouched
    pub caption_format: CaptionFormatSetting,
}

/// Configured caption payload format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionFormatSetting {
    EventList,
    Markup,
    /// Keep whatever format the track URL asks for and sniff the payload
    Auto,
}

impl CaptionFormatSetting {
    /// The format to request, or `None` for `auto`
    pub fn requested(self) -> Option<CaptionFormat> {
        match self {
            CaptionFormatSetting::EventList => Some(CaptionFormat::EventList),
            CaptionFormatSetting::Markup => Some(CaptionFormat::Markup),
            CaptionFormatSetting::Auto => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live of a cached result
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Largest silent gap closed by the gap-closing merge
    pub max_gap_secs: f64,

    /// Span reached before an auto-caption buffer is emitted
    pub min_duration_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// How long to wait for the panel after activating its control
    pub open_timeout_ms: u64,

    /// How long to wait for the segment list to mount
    pub mount_timeout_ms: u64,

    /// How long the list height must stay put to count as settled
    pub scroll_settle_ms: u64,

    /// Re-check interval when the document offers no mutation feed
    pub poll_interval_ms: u64,

    /// Maximum scrolls before giving up on materializing the list
    pub max_scroll_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,

    pub accept_language: String,

    /// Per-request timeout
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default output format
    pub default_output_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig {
                bridge_timeout_ms: 3000,
                bridge_poll_interval_ms: 100,
                preferred_languages: vec!["en".to_string(), "en-US".to_string(), "en-GB".to_string()],
                translate_to: Some("en".to_string()),
                caption_format: CaptionFormatSetting::EventList,
            },
            cache: CacheConfig { ttl_secs: 30 * 60 },
            merge: MergeConfig {
                max_gap_secs: DEFAULT_MAX_GAP,
                min_duration_secs: DEFAULT_MIN_DURATION,
            },
            panel: PanelConfig {
                open_timeout_ms: 5000,
                mount_timeout_ms: 5000,
                scroll_settle_ms: 500,
                poll_interval_ms: 100,
                max_scroll_attempts: 50,
            },
            http: HttpConfig {
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                accept_language: "en-US,en;q=0.9".to_string(),
                request_timeout_secs: 30,
            },
            app: AppConfig {
                default_output_format: "text".to_string(),
            },
        }
    }
}

impl ExtractionConfig {
    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge_timeout_ms)
    }

    pub fn bridge_poll_interval(&self) -> Duration {
        Duration::from_millis(self.bridge_poll_interval_ms)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Load and validate the configuration at `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("transcript-extractor").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.extraction.bridge_timeout_ms == 0 || self.extraction.bridge_poll_interval_ms == 0 {
            anyhow::bail!("Bridge timeout and poll interval must be greater than zero");
        }

        if self.extraction.preferred_languages.iter().all(|l| l.trim().is_empty()) {
            anyhow::bail!("At least one preferred caption language must be configured");
        }

        if self.cache.ttl_secs == 0 {
            anyhow::bail!("Cache TTL must be greater than zero");
        }

        if self.merge.max_gap_secs < 0.0 || self.merge.min_duration_secs <= 0.0 {
            anyhow::bail!("Merge thresholds must be positive");
        }

        let panel = &self.panel;
        if panel.open_timeout_ms == 0 || panel.mount_timeout_ms == 0 || panel.scroll_settle_ms == 0 || panel.poll_interval_ms == 0 {
            anyhow::bail!("Panel timeouts must be greater than zero");
        }

        if self.http.request_timeout_secs == 0 {
            anyhow::bail!("HTTP request timeout must be greater than zero");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Languages: {}", self.extraction.preferred_languages.join(", "));
        if let Some(target) = &self.extraction.translate_to {
            println!("  Translate To: {}", target);
        }
        match self.extraction.caption_format.requested() {
            Some(format) => println!("  Caption Format: {}", format.query_value()),
            None => println!("  Caption Format: as published"),
        }
        println!("  Bridge Timeout: {} ms", self.extraction.bridge_timeout_ms);
        println!("  Cache TTL: {}s", self.cache.ttl_secs);
        println!("  Merge Gap: {}s", self.merge.max_gap_secs);
        println!("  Panel Scroll Budget: {}", self.panel.max_scroll_attempts);
        println!("  Default Format: {}", self.app.default_output_format);
    }
}
