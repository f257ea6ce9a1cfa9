//! Configuration, read from a TOML file.
//!
//! Every field has a default, so an empty or missing file is a valid
//! configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable overriding [`StoreConfig::path`].
pub const STATE_PATH_ENV: &str = "FEEDSYNC_STATE_PATH";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Feeds subscribed on every batch run.
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,
}

/// Subscription store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

fn default_state_path() -> PathBuf {
    PathBuf::from("rss_state.bin")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Directory attachments are written to, and served from.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
        }
    }
}

/// Outbound HTTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Total timeout per request in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("feedsync/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// HTML server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write logs to this file when set.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// A feed to keep subscribed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

fn default_feeds() -> Vec<FeedConfig> {
    vec![FeedConfig {
        name: "Example Feed".to_string(),
        url: "https://example.com/rss-feed.xml".to_string(),
    }]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            media: MediaConfig::default(),
            http: HttpConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            feeds: default_feeds(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).map_err(|e| anyhow::anyhow!("config parse error: {e}"))
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(STATE_PATH_ENV) {
            if !path.is_empty() {
                self.store.path = PathBuf::from(path);
            }
        }
    }

    /// `host:port` the HTML server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
