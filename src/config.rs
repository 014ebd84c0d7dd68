//! Configuration and compile-time tuning constants

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;

/// Base URL of the Hacker News Firebase API
pub const HN_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

/// Hard cap on how many ids a feed list may contribute
pub const MAX_STORIES_PER_FEED: usize = 120;

/// Page size used when the client does not ask for one
pub const DEFAULT_STORIES_LIMIT: usize = 30;

/// Width of the item-fetch fan-out for both list and thread hydration
pub const MAX_CONCURRENT_FETCH: usize = 8;

/// Per-request deadline for Firebase calls
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Decode cap for upstream JSON bodies
pub const UPSTREAM_MAX_JSON_BYTES: usize = 4_000_000;

/// TTL for cached feed id lists
pub const LIST_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL for cached items, including negative entries
pub const ITEM_CACHE_TTL: Duration = Duration::from_secs(3 * 60);

/// Upper bound on live cache entries
pub const CACHE_MAX_ENTRIES: usize = 1200;

/// How often the janitor sweeps expired entries
pub const CACHE_JANITOR_INTERVAL: Duration = Duration::from_secs(30);

/// Per-request deadline for reader fetches
pub const READER_TIMEOUT: Duration = Duration::from_secs(10);

/// Streaming cap for reader HTML bodies
pub const READER_MAX_HTML_BYTES: usize = 2_000_000;

/// User-Agent sent on every outbound request
pub const USER_AGENT: &str = concat!("hn-aggregator/", env!("CARGO_PKG_VERSION"));

/// Runtime configuration assembled from the CLI and environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on (`PORT` environment variable)
    pub port: u16,
    /// Base URL of the upstream news API
    pub upstream_base_url: String,
    /// Directory the static client is served from
    pub public_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            upstream_base_url: HN_BASE_URL.to_string(),
            public_dir: PathBuf::from("public"),
        }
    }
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        Self {
            host: cli.host.clone(),
            port: cli.port,
            upstream_base_url: HN_BASE_URL.to_string(),
            public_dir: cli.public_dir.clone(),
        }
    }
}
