//! HTTP router and handlers

use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::comments::comment_forest;
use crate::config::{Config, DEFAULT_STORIES_LIMIT, MAX_STORIES_PER_FEED};
use crate::items::ItemFetcher;
use crate::models::{ItemDetail, Story, Thread};
use crate::reader::reader_article;
use crate::security::HostResolver;
use crate::stories::{Feed, stories_page};
use crate::{Error, Result};

/// Cache-Control served with story list responses
const STORIES_CACHE_CONTROL: &str = "public, max-age=60, stale-while-revalidate=30";
/// Cache-Control served with item and thread responses
const ITEM_CACHE_CONTROL: &str = "public, max-age=120, stale-while-revalidate=60";

/// Shared application state
pub struct AppState {
    /// Runtime configuration
    pub config: Config,
    /// Item fetcher feeding the list, item, and thread paths
    pub fetcher: Arc<ItemFetcher>,
    /// Shared outbound HTTP client (same pool as the fetcher's)
    pub http: reqwest::Client,
    /// Hostname resolver for the reader's SSRF guard
    pub resolver: Arc<dyn HostResolver>,
    /// Index template loaded at startup, when present
    pub index_html: Option<String>,
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let public_dir = state.config.public_dir.clone();

    Router::new()
        .route("/api/stories", get(stories_handler))
        .route("/api/item", get(item_handler))
        .route("/api/thread", get(thread_handler))
        .route("/api/reader", get(reader_handler))
        .route("/", get(index_handler))
        .fallback_service(ServeDir::new(public_dir))
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn(static_cache_tiers))
        .layer(CatchPanicLayer::new())
        .layer(CompressionLayer::new())
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS contract: any origin, GET plus preflight, Content-Type only.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// GET /api/stories
async fn stories_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StoriesQuery>,
) -> Result<Response> {
    let feed = parse_feed(query.feed.as_deref())?;
    let offset = parse_offset(query.offset.as_deref())?;
    let limit = parse_limit(query.limit.as_deref())?;

    let stories = stories_page(&state.fetcher, feed, offset, limit).await?;
    Ok(json_cached(&stories, STORIES_CACHE_CONTROL))
}

/// GET /api/item
async fn item_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdQuery>,
) -> Result<Response> {
    let id = parse_id(query.id.as_deref())?;
    let item = state.fetcher.fetch_item(id).await?.ok_or(Error::NotFound)?;
    Ok(json_cached(&ItemDetail::from(item.as_ref()), ITEM_CACHE_CONTROL))
}

/// GET /api/thread
async fn thread_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdQuery>,
) -> Result<Response> {
    let id = parse_id(query.id.as_deref())?;
    let story = state.fetcher.fetch_item(id).await?.ok_or(Error::NotFound)?;
    if story.kind != "story" {
        return Err(Error::InvalidParam(
            "id must reference a story item".to_string(),
        ));
    }

    let comments = comment_forest(&state.fetcher, &story.kids).await?;
    let thread = Thread {
        story: Story::from(story.as_ref()),
        comments,
    };
    Ok(json_cached(&thread, ITEM_CACHE_CONTROL))
}

/// GET /api/reader
async fn reader_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReaderQuery>,
) -> Result<Response> {
    let article = reader_article(
        &state.http,
        state.resolver.as_ref(),
        query.url.as_deref().unwrap_or(""),
    )
    .await?;
    Ok(Json(article).into_response())
}

/// GET / — the index template with the best-feed front page injected as a
/// preload payload, so the client renders without a first API round-trip.
async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(template) = state.index_html.as_deref() else {
        return Error::NotFound.into_response();
    };

    let stories = match stories_page(&state.fetcher, Feed::Best, 0, DEFAULT_STORIES_LIMIT).await {
        Ok(stories) => stories,
        Err(err) => {
            warn!(error = %err, "index preload failed");
            Vec::new()
        }
    };

    let payload = json!({
        "feed": "best",
        "offset": 0,
        "limit": DEFAULT_STORIES_LIMIT,
        "stories": stories,
    });
    let injection =
        format!(r#"<script id="hn-preload" type="application/json">{payload}</script>"#);
    let rendered = inject_before_body_close(template, &injection);

    (
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))],
        Html(rendered),
    )
        .into_response()
}

/// Non-GET methods on declared routes: 405 with the JSON envelope.
async fn method_not_allowed() -> Response {
    let mut response = (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "method not allowed" })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET"));
    response
}

/// Fill in Cache-Control for static assets that did not set their own:
/// HTML and the service worker stay fresh, the app shell revalidates every
/// few minutes, and everything else (fingerprinted assets) is immutable.
async fn static_cache_tiers(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if path.starts_with("/api/")
        || !response.status().is_success()
        || response.headers().contains_key(header::CACHE_CONTROL)
    {
        return response;
    }

    let policy = if path.ends_with(".html") || path == "/" || path == "/sw.js" {
        "no-cache"
    } else if path == "/app.js" || path == "/styles.css" {
        "public, max-age=300, must-revalidate"
    } else {
        "public, max-age=31536000, immutable"
    };
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(policy));
    response
}

#[derive(Debug, Deserialize)]
struct StoriesQuery {
    feed: Option<String>,
    offset: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdQuery {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReaderQuery {
    url: Option<String>,
}

/// Serialize a payload with the given Cache-Control.
fn json_cached<T: serde::Serialize>(payload: &T, cache_control: &'static str) -> Response {
    let mut response = Json(payload).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    response
}

fn parse_feed(raw: Option<&str>) -> Result<Feed> {
    let raw = raw.unwrap_or("").trim().to_ascii_lowercase();
    if raw.is_empty() {
        return Err(Error::InvalidParam("missing feed parameter".to_string()));
    }
    raw.parse()
}

fn parse_offset(raw: Option<&str>) -> Result<usize> {
    match raw.map(str::trim) {
        None | Some("") => Ok(0),
        Some(value) => value
            .parse()
            .map_err(|_| Error::InvalidParam("offset must be a non-negative integer".to_string())),
    }
}

fn parse_limit(raw: Option<&str>) -> Result<usize> {
    match raw.map(str::trim) {
        None | Some("") => Ok(DEFAULT_STORIES_LIMIT),
        Some(value) => {
            let limit: usize = value.parse().map_err(|_| {
                Error::InvalidParam("limit must be a positive integer".to_string())
            })?;
            if limit == 0 {
                return Err(Error::InvalidParam(
                    "limit must be a positive integer".to_string(),
                ));
            }
            Ok(limit.min(MAX_STORIES_PER_FEED))
        }
    }
}

fn parse_id(raw: Option<&str>) -> Result<u64> {
    let raw = raw.unwrap_or("").trim();
    match raw.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(Error::InvalidParam("invalid id parameter".to_string())),
    }
}

/// Insert `injection` immediately before the last `</body>`, or append it
/// when the template has none. The tag search is case-insensitive.
fn inject_before_body_close(document: &str, injection: &str) -> String {
    let lowered = document.to_ascii_lowercase();
    match lowered.rfind("</body>") {
        Some(idx) => format!("{}{}{}", &document[..idx], injection, &document[idx..]),
        None => format!("{document}{injection}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_param_is_required_and_normalized() {
        assert!(parse_feed(None).is_err());
        assert!(parse_feed(Some("  ")).is_err());
        assert_eq!(parse_feed(Some("BEST")).unwrap(), Feed::Best);
        assert_eq!(parse_feed(Some("  new ")).unwrap(), Feed::New);
        assert!(parse_feed(Some("hot")).is_err());
    }

    #[test]
    fn offset_defaults_and_rejects_negatives() {
        assert_eq!(parse_offset(None).unwrap(), 0);
        assert_eq!(parse_offset(Some("")).unwrap(), 0);
        assert_eq!(parse_offset(Some("17")).unwrap(), 17);
        assert!(parse_offset(Some("-1")).is_err());
        assert!(parse_offset(Some("abc")).is_err());
    }

    #[test]
    fn limit_defaults_clamps_and_rejects_zero() {
        assert_eq!(parse_limit(None).unwrap(), DEFAULT_STORIES_LIMIT);
        assert_eq!(parse_limit(Some("10")).unwrap(), 10);
        assert_eq!(parse_limit(Some("500")).unwrap(), MAX_STORIES_PER_FEED);
        assert!(parse_limit(Some("0")).is_err());
        assert!(parse_limit(Some("-5")).is_err());
    }

    #[test]
    fn id_must_be_a_positive_integer() {
        assert_eq!(parse_id(Some("42")).unwrap(), 42);
        assert_eq!(parse_id(Some(" 7 ")).unwrap(), 7);
        assert!(parse_id(None).is_err());
        assert!(parse_id(Some("0")).is_err());
        assert!(parse_id(Some("-3")).is_err());
        assert!(parse_id(Some("12.5")).is_err());
    }

    #[test]
    fn preload_lands_before_body_close() {
        let out = inject_before_body_close("<html><BODY>x</BODY></html>", "<script>p</script>");
        assert_eq!(out, "<html><BODY>x<script>p</script></BODY></html>");
    }

    #[test]
    fn preload_appends_without_body_close() {
        let out = inject_before_body_close("<p>bare", "<script>p</script>");
        assert_eq!(out, "<p>bare<script>p</script>");
    }
}
