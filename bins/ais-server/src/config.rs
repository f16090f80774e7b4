use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use ais_api::{BoundingBox, Region};
use ais_collector::{CollectorConfig, DEFAULT_KEY_PATH};
use ais_feed::{AISSTREAM_URL, Backoff};

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "ais-server", about = "AIS feed collector with a date-partitioned query API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect the live feed and serve the query API
    Serve(ServeArgs),
    /// List partition files for a date range
    Partitions(PartitionsArgs),
    /// Print a summary of one partition file
    Inspect(InspectArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Path to the TOML config file (defaults apply when omitted)
    #[arg(long, env = "CONFIG_PATH")]
    pub config: Option<String>,

    /// aisstream.io API key
    #[arg(long, env = "AIS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct PartitionsArgs {
    #[arg(long, env = "CONFIG_PATH")]
    pub config: Option<String>,

    /// First day, YYYY-MM-DD (default: today, UTC)
    #[arg(long)]
    pub from: Option<String>,

    /// Last day, YYYY-MM-DD (default: --from)
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct InspectArgs {
    /// Partition file to read
    pub file: PathBuf,

    /// Number of records to print
    #[arg(long, default_value_t = 5)]
    pub head: usize,
}

// ---- TOML Config ----

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Upper bound for the whole shutdown sequence.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// Default row count for `/latest`.
    #[serde(default = "default_latest_limit")]
    pub latest_limit: usize,
    #[serde(flatten)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

#[derive(Debug, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,
    #[serde(default)]
    pub region: Region,
    /// Explicit boxes; when non-empty they replace `region`.
    #[serde(default)]
    pub bounding_boxes: Vec<BoundingBox>,
    #[serde(default)]
    pub message_types: Vec<String>,
    #[serde(default = "default_key_path")]
    pub key_path: String,
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,
}

fn default_api_port() -> u16 {
    8080
}
fn default_shutdown_timeout_secs() -> u64 {
    30
}
fn default_latest_limit() -> usize {
    10
}
fn default_feed_url() -> String {
    AISSTREAM_URL.to_string()
}
fn default_key_path() -> String {
    DEFAULT_KEY_PATH.to_string()
}
fn default_reconnect_initial_ms() -> u64 {
    2000
}
fn default_reconnect_max_ms() -> u64 {
    60_000
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            region: Region::default(),
            bounding_boxes: Vec::new(),
            message_types: Vec::new(),
            key_path: default_key_path(),
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
        }
    }
}

impl FeedConfig {
    pub fn boxes(&self) -> Vec<BoundingBox> {
        if self.bounding_boxes.is_empty() {
            self.region.boxes()
        } else {
            self.bounding_boxes.clone()
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.reconnect_initial_ms),
            Duration::from_millis(self.reconnect_max_ms),
        )
    }
}

impl ServerConfig {
    /// Load `path`, or defaults for every field when no path is given.
    pub fn load(path: Option<&str>) -> Result<Self, ServerError> {
        let content = match path {
            Some(path) => std::fs::read_to_string(path)
                .map_err(|e| ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?,
            None => String::new(),
        };
        let config = Self::parse(&content)
            .map_err(|e| ServerError::Config { context: "parse", detail: format!("'{}': {e}", path.unwrap_or("<defaults>")) })?;
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn validate(&self) -> Result<(), ServerError> {
        self.collector
            .validate()
            .map_err(|detail| ServerError::Config { context: "collector", detail })?;
        if let Some(b) = self.feed.bounding_boxes.iter().find(|b| !b.is_valid()) {
            return Err(ServerError::Config {
                context: "feed",
                detail: format!("invalid bounding box {b:?}"),
            });
        }
        if self.feed.key_path.trim().is_empty() {
            return Err(ServerError::Config {
                context: "feed",
                detail: "key_path must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
