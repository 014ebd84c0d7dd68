//! Reader-view extraction pipeline.
//!
//! Validates the requested URL, runs the SSRF guard before any I/O (and
//! again after redirects), streams the article through a hard byte cap,
//! hands the HTML to the readability extractor, and sanitizes whatever
//! comes back. Nothing upstream-controlled reaches the client unsanitized.

use std::io::Cursor;

use reqwest::{Client, header};
use url::Url;

use crate::config::{READER_MAX_HTML_BYTES, READER_TIMEOUT};
use crate::models::Article;
use crate::security::{HostResolver, ensure_public_url, sanitize_article_html};
use crate::upstream::read_bounded;
use crate::{Error, Result};

/// Fetch a page and produce its sanitized reader view.
///
/// The returned article's `content` is restricted to the reader
/// allow-list; `final_url` reflects redirects, which are themselves
/// re-validated against the host policy.
pub async fn reader_article(
    client: &Client,
    resolver: &dyn HostResolver,
    raw_url: &str,
) -> Result<Article> {
    let requested = parse_reader_url(raw_url)?;
    ensure_public_url(&requested, resolver).await?;

    let response = client
        .get(requested.clone())
        .timeout(READER_TIMEOUT)
        .header(header::ACCEPT, "text/html,application/xhtml+xml")
        .send()
        .await
        .map_err(Error::from_reqwest)?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::UpstreamStatus(status.as_u16()));
    }

    // Redirects may have moved the request anywhere; the final URL gets
    // the same scrutiny as the original.
    let final_url = response.url().clone();
    ensure_public_url(&final_url, resolver).await?;

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !content_type.contains("text/html") && !content_type.contains("application/xhtml+xml") {
        return Err(Error::UnsupportedMedia);
    }

    let body = read_bounded(response, READER_MAX_HTML_BYTES).await?;

    // Parsing and sanitizing are CPU-bound; keep them off the reactor.
    let requested_str = requested.to_string();
    let article = tokio::task::spawn_blocking(move || extract_article(&body, requested_str, &final_url))
        .await
        .map_err(|err| Error::Internal(format!("extraction task failed: {err}")))??;

    Ok(article)
}

/// Validate the raw `url` query parameter: absolute, http(s), with a host.
fn parse_reader_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidParam("missing url parameter".to_string()));
    }
    let parsed =
        Url::parse(trimmed).map_err(|_| Error::InvalidParam("invalid url parameter".to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::InvalidParam(
            "url must use http or https".to_string(),
        ));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidParam("invalid url parameter".to_string()));
    }
    Ok(parsed)
}

/// Run readability over the fetched bytes and assemble the article.
fn extract_article(body: &[u8], requested: String, final_url: &Url) -> Result<Article> {
    let mut cursor = Cursor::new(body);
    let product =
        readability::extractor::extract(&mut cursor, final_url).map_err(|_| Error::Extract)?;

    if product.content.trim().is_empty() && product.text.trim().is_empty() {
        return Err(Error::EmptyArticle);
    }

    // Readability does not surface page metadata; recover it from the
    // original document's meta tags.
    let meta = harvest_metadata(&String::from_utf8_lossy(body));

    let content = sanitize_article_html(&product.content, final_url);
    let length = product.text.chars().count();

    Ok(Article {
        url: requested,
        final_url: final_url.to_string(),
        title: product.title,
        byline: meta.byline,
        site_name: meta.site_name,
        excerpt: meta.excerpt,
        content,
        text_content: product.text,
        length,
    })
}

#[derive(Debug, Default, Clone)]
struct PageMeta {
    byline: String,
    site_name: String,
    excerpt: String,
}

/// Scan `<meta>` tags for author, site name, and description. First
/// occurrence wins for each field.
fn harvest_metadata(html: &str) -> PageMeta {
    use std::cell::RefCell;
    use std::rc::Rc;

    use lol_html::{RewriteStrSettings, element, rewrite_str};

    let state = Rc::new(RefCell::new(PageMeta::default()));

    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("meta", {
                let state = Rc::clone(&state);
                move |el| {
                    let key = el
                        .get_attribute("property")
                        .or_else(|| el.get_attribute("name"))
                        .unwrap_or_default()
                        .to_ascii_lowercase();
                    let Some(content) = el.get_attribute("content") else {
                        return Ok(());
                    };
                    let content = content.trim();
                    if content.is_empty() {
                        return Ok(());
                    }

                    let mut meta = state.borrow_mut();
                    match key.as_str() {
                        "author" | "article:author" if meta.byline.is_empty() => {
                            meta.byline = content.to_string();
                        }
                        "og:site_name" if meta.site_name.is_empty() => {
                            meta.site_name = content.to_string();
                        }
                        "description" | "og:description" if meta.excerpt.is_empty() => {
                            meta.excerpt = content.to_string();
                        }
                        _ => {}
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    );

    if result.is_err() {
        return PageMeta::default();
    }
    let meta = state.borrow().clone();
    meta
}
