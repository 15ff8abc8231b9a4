use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::{EngineOptions, DEFAULT_POOL_SIZE};
use crate::http::HttpOptions;
use crate::resolver::{
    PagePatterns, DEFAULT_CHECKSUM_INDEX, DEFAULT_CHECKSUM_PATTERN, DEFAULT_PAGE_URL,
    DEFAULT_URL_PATTERN,
};
use crate::retry::RetryPolicy;
use crate::segmenter::DEFAULT_CHUNK_SIZE;

/// Retry policy parameters (`[retry]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per chunk (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> Result<RetryPolicy> {
        if self.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        let base_delay = Duration::try_from_secs_f64(self.base_delay_secs)
            .with_context(|| format!("invalid retry.base_delay_secs {}", self.base_delay_secs))?;
        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay,
            max_delay: Duration::from_secs(self.max_delay_secs),
        })
    }
}

/// curl handle settings (`[http]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Abort a transfer slower than this many bytes/s for `low_speed_time_secs`.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
    /// Hard limit for one request, body included.
    pub request_timeout_secs: u64,
    /// Upper bound on bytes per body read.
    pub buffer_size: usize,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let o = HttpOptions::default();
        Self {
            connect_timeout_secs: o.connect_timeout.as_secs(),
            low_speed_limit: o.low_speed_limit,
            low_speed_time_secs: o.low_speed_time.as_secs(),
            request_timeout_secs: o.request_timeout.as_secs(),
            buffer_size: o.buffer_size,
            user_agent: o.user_agent,
        }
    }
}

impl HttpConfig {
    pub fn options(&self) -> HttpOptions {
        HttpOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            low_speed_limit: self.low_speed_limit,
            low_speed_time: Duration::from_secs(self.low_speed_time_secs),
            buffer_size: self.buffer_size,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Global configuration loaded from `~/.config/jdbfetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Landing page that links the current definitions file.
    pub page_url: String,
    /// Regex for the download URL embedded in the page.
    pub url_pattern: String,
    /// Regex for checksum tokens on the page.
    pub checksum_pattern: String,
    /// Zero-based index of the checksum token that belongs to the file.
    pub checksum_index: usize,
    /// Bytes per chunk.
    pub chunk_size: u64,
    /// Concurrent chunk transfers.
    pub pool_size: usize,
    /// Directory the file is written to.
    pub download_dir: PathBuf,
    pub retry: RetryConfig,
    pub http: HttpConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_url: DEFAULT_PAGE_URL.to_string(),
            url_pattern: DEFAULT_URL_PATTERN.to_string(),
            checksum_pattern: DEFAULT_CHECKSUM_PATTERN.to_string(),
            checksum_index: DEFAULT_CHECKSUM_INDEX,
            chunk_size: DEFAULT_CHUNK_SIZE.get(),
            pool_size: DEFAULT_POOL_SIZE,
            download_dir: PathBuf::from("."),
            retry: RetryConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl FetchConfig {
    pub fn engine_options(&self) -> Result<EngineOptions> {
        let chunk_size = NonZeroU64::new(self.chunk_size).context("chunk_size must be greater than 0")?;
        if self.pool_size == 0 {
            bail!("pool_size must be at least 1");
        }
        Ok(EngineOptions {
            chunk_size,
            pool_size: self.pool_size,
            retry: self.retry.policy()?,
            http: self.http.options(),
        })
    }

    pub fn page_patterns(&self) -> Result<PagePatterns> {
        PagePatterns::new(&self.url_pattern, &self.checksum_pattern, self.checksum_index)
            .context("invalid url_pattern or checksum_pattern")
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("jdbfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file. Missing keys take their defaults.
pub fn load_from_path(path: &Path) -> Result<FetchConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let cfg: FetchConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
