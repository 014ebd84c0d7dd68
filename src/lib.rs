//! HN Aggregator Library
//!
//! Caching edge aggregator between a web client and the public Hacker
//! News API.
//!
//! # Features
//!
//! - **Bounded TTL+LRU cache** shared across all handlers, with negative
//!   caching for ids upstream does not know
//! - **Concurrent hydration**: bounded fan-out for story lists and a
//!   shared-semaphore recursive walk for comment forests
//! - **Reader view**: SSRF-guarded, size-capped article fetch with
//!   allow-list HTML sanitization
//! - **Small HTTP surface**: JSON endpoints with cache-control headers,
//!   gzip, CORS, and a preloaded index page

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod cli;
pub mod comments;
pub mod config;
pub mod error;
pub mod gateway;
pub mod items;
pub mod models;
pub mod reader;
pub mod security;
pub mod stories;
pub mod upstream;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
