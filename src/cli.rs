//! Command-line interface definitions for `hn-aggregator`.
//!
//! Defines the top-level [`Cli`] struct parsed by `clap`. There are no
//! subcommands: the binary only serves.

use std::path::PathBuf;

use clap::Parser;

/// Caching edge aggregator for Hacker News
///
/// Sits between a web client and the public news API, coalescing item
/// lookups behind a bounded in-process cache, and serves the story list,
/// single items, full comment threads, and a sanitized reader view.
#[derive(Parser, Debug)]
#[command(name = "hn-aggregator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Port the aggregator listens on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "HN_AGGREGATOR_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Directory the static client is served from
    #[arg(long, env = "HN_AGGREGATOR_PUBLIC_DIR", default_value = "public")]
    pub public_dir: PathBuf,

    /// Minimum log level: trace, debug, info, warn, or error
    #[arg(long, default_value = "info", env = "HN_AGGREGATOR_LOG_LEVEL")]
    pub log_level: String,

    /// Log output format: "text" for human-readable, "json" for structured
    #[arg(long, env = "HN_AGGREGATOR_LOG_FORMAT")]
    pub log_format: Option<String>,
}
