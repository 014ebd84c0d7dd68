//! Aggregator server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use super::router::{AppState, create_router};
use crate::cache::TtlLruCache;
use crate::config::{CACHE_JANITOR_INTERVAL, CACHE_MAX_ENTRIES, Config, DEFAULT_STORIES_LIMIT};
use crate::items::ItemFetcher;
use crate::security::SystemResolver;
use crate::stories::{Feed, stories_page};
use crate::upstream::Upstream;
use crate::{Error, Result};

/// How long the startup prewarm may spend per feed
const PREWARM_TIMEOUT: Duration = Duration::from_secs(20);

/// Aggregator server
pub struct Server {
    config: Config,
    state: Arc<AppState>,
}

impl Server {
    /// Assemble the shared state: cache (janitor running), upstream
    /// client, item fetcher, and the index template when one exists.
    pub async fn new(config: Config) -> Result<Self> {
        let cache = Arc::new(TtlLruCache::new(CACHE_MAX_ENTRIES));
        cache.start_janitor(CACHE_JANITOR_INTERVAL);

        let client = Upstream::build_client()?;
        let upstream = Upstream::new(client.clone(), config.upstream_base_url.clone());
        let fetcher = Arc::new(ItemFetcher::new(Arc::clone(&cache), upstream));

        let index_path = config.public_dir.join("index.html");
        let index_html = match tokio::fs::read_to_string(&index_path).await {
            Ok(html) => Some(html),
            Err(err) => {
                warn!(path = %index_path.display(), error = %err, "index template load failed");
                None
            }
        };

        let state = Arc::new(AppState {
            config: config.clone(),
            fetcher,
            http: client,
            resolver: Arc::new(SystemResolver),
            index_html,
        });

        Ok(Self { config, state })
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        prewarm(Arc::clone(&self.state.fetcher));

        let addr = SocketAddr::new(
            self.config
                .host
                .parse()
                .map_err(|err| Error::Internal(format!("invalid host: {err}")))?,
            self.config.port,
        );
        let listener = TcpListener::bind(addr).await?;

        let app = create_router(self.state);
        info!(host = %self.config.host, port = self.config.port, "aggregator listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|err| Error::Internal(err.to_string()))?;

        info!("shutdown complete");
        Ok(())
    }
}

/// Warm the front page of every feed so the first visitors hit a hot
/// cache. Failures are logged and otherwise ignored.
fn prewarm(fetcher: Arc<ItemFetcher>) {
    for feed in [Feed::Best, Feed::Top, Feed::New] {
        let fetcher = Arc::clone(&fetcher);
        tokio::spawn(async move {
            let warmed = tokio::time::timeout(
                PREWARM_TIMEOUT,
                stories_page(&fetcher, feed, 0, DEFAULT_STORIES_LIMIT),
            )
            .await;
            match warmed {
                Ok(Ok(stories)) => {
                    info!(feed = feed.as_str(), count = stories.len(), "cache prewarm complete");
                }
                Ok(Err(err)) => {
                    warn!(feed = feed.as_str(), error = %err, "cache prewarm failed");
                }
                Err(_) => {
                    warn!(feed = feed.as_str(), "cache prewarm timed out");
                }
            }
        });
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
