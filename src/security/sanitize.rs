//! HTML sanitization for reader articles and user-posted comments.
//!
//! Two tree walks, never regex: an allow-list pass (`ammonia`) that
//! unwraps disallowed tags, drops every attribute outside the per-tag
//! allow-list, resolves and scheme-checks URLs, and forces the link and
//! image hygiene attributes — then a rewriting pass (`lol_html`) that
//! removes image elements whose source did not survive the first walk.
//! Both sanitizers are pure: the same input and base yield byte-identical
//! output.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use ammonia::{Builder, UrlRelative};
use lol_html::{RewriteStrSettings, element, rewrite_str};
use url::Url;

/// Tags an extracted article may keep
const ARTICLE_TAGS: &[&str] = &[
    "a", "article", "blockquote", "br", "code", "em", "figcaption", "figure", "h1", "h2", "h3",
    "h4", "h5", "h6", "hr", "img", "li", "ol", "p", "pre", "section", "small", "strong", "sub",
    "sup", "table", "tbody", "td", "th", "thead", "tr", "ul",
];

/// Tags user-posted comment HTML may keep
const COMMENT_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "em", "i", "li", "ol", "p", "pre", "span", "strong",
    "ul",
];

/// Sanitize extracted article HTML against the reader allow-list.
///
/// `base` is the final (post-redirect) article URL; relative `href`/`src`
/// values are resolved against it and anything that does not end up
/// http(s) is dropped. Links open in a new tab with
/// `rel="noopener noreferrer"`; images are forced lazy, async-decoded, and
/// referrer-free, and an image whose source was dropped is removed
/// entirely.
#[must_use]
pub fn sanitize_article_html(html: &str, base: &Url) -> String {
    let mut tag_attributes: HashMap<&str, HashSet<&str>> = HashMap::new();
    tag_attributes.insert("a", HashSet::from(["href"]));
    tag_attributes.insert("img", HashSet::from(["src", "alt", "title"]));
    tag_attributes.insert("td", HashSet::from(["colspan", "rowspan"]));
    tag_attributes.insert("th", HashSet::from(["colspan", "rowspan"]));

    let mut builder = Builder::default();
    builder
        .tags(ARTICLE_TAGS.iter().copied().collect())
        .generic_attributes(HashSet::new())
        .tag_attributes(tag_attributes)
        .url_schemes(HashSet::from(["http", "https"]))
        .url_relative(UrlRelative::RewriteWithBase(base.clone()))
        .link_rel(Some("noopener noreferrer"))
        .set_tag_attribute_value("a", "target", "_blank")
        .set_tag_attribute_value("img", "loading", "lazy")
        .set_tag_attribute_value("img", "decoding", "async")
        .set_tag_attribute_value("img", "referrerpolicy", "no-referrer");

    let cleaned = builder.clean(html).to_string();
    strip_sourceless_images(&cleaned)
}

static COMMENT_SANITIZER: LazyLock<Builder<'static>> = LazyLock::new(|| {
    let mut builder = Builder::default();
    builder
        .tags(COMMENT_TAGS.iter().copied().collect())
        .generic_attributes(HashSet::new())
        .tag_attributes(HashMap::from([("a", HashSet::from(["href"]))]))
        .url_schemes(HashSet::from(["http", "https"]))
        .link_rel(Some("noopener noreferrer"))
        .set_tag_attribute_value("a", "target", "_blank");
    builder
});

/// Sanitize user-posted comment HTML against the narrow comment
/// allow-list. Only `a[href]` survives attribute-wise; links are http(s)
/// only and open in a new tab.
#[must_use]
pub fn sanitize_comment_html(html: &str) -> String {
    COMMENT_SANITIZER.clean(html).to_string()
}

/// Second walk: an `<img>` without a `src` carries no information — its
/// source was either absent or dropped as unsafe — so the element goes
/// away entirely.
fn strip_sourceless_images(html: &str) -> String {
    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img", |el| {
                if el.get_attribute("src").is_none() {
                    el.remove();
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    );
    rewritten.unwrap_or_else(|_| html.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://news.example.com/articles/42").unwrap()
    }

    // ── article sanitizer ─────────────────────────────────────────────

    #[test]
    fn article_unwraps_disallowed_tags() {
        let out = sanitize_article_html("<div><p>kept</p></div>", &base());
        assert!(!out.contains("<div"));
        assert!(out.contains("<p>kept</p>"));
    }

    #[test]
    fn article_removes_script_content() {
        let out = sanitize_article_html("<p>a</p><script>alert(1)</script>", &base());
        assert!(!out.contains("script"));
        assert!(!out.contains("alert"));
    }

    #[test]
    fn article_drops_event_handler_attributes() {
        let out = sanitize_article_html(
            r#"<p onclick="x()" onmouseover="y()">text</p><a href="https://a.example/" onfocus="z()">l</a>"#,
            &base(),
        );
        assert!(!out.contains("onclick"));
        assert!(!out.contains("onmouseover"));
        assert!(!out.contains("onfocus"));
    }

    #[test]
    fn article_links_get_target_and_rel() {
        let out = sanitize_article_html(r#"<a href="https://a.example/x">go</a>"#, &base());
        assert!(out.contains(r#"rel="noopener noreferrer""#));
        assert!(out.contains(r#"target="_blank""#));
        assert!(out.contains(r#"href="https://a.example/x""#));
    }

    #[test]
    fn article_resolves_relative_links_against_base() {
        let out = sanitize_article_html(r#"<a href="/other">go</a>"#, &base());
        assert!(out.contains(r#"href="https://news.example.com/other""#));
    }

    #[test]
    fn article_drops_javascript_hrefs_but_keeps_the_link() {
        let out = sanitize_article_html(r#"<a href="javascript:alert(1)">go</a>"#, &base());
        assert!(!out.contains("javascript:"));
        assert!(out.contains(">go</a>"));
    }

    #[test]
    fn article_images_get_hygiene_attributes() {
        let out =
            sanitize_article_html(r#"<img src="https://a.example/x.png" alt="pic">"#, &base());
        assert!(out.contains(r#"loading="lazy""#));
        assert!(out.contains(r#"decoding="async""#));
        assert!(out.contains(r#"referrerpolicy="no-referrer""#));
        assert!(out.contains(r#"alt="pic""#));
    }

    #[test]
    fn article_removes_images_with_unsafe_src() {
        let out = sanitize_article_html(r#"<p>a</p><img src="javascript:alert(1)">"#, &base());
        assert!(!out.contains("<img"));
        assert!(out.contains("<p>a</p>"));
    }

    #[test]
    fn article_removes_images_with_data_src() {
        let out = sanitize_article_html(r#"<img src="data:image/png;base64,AAAA">"#, &base());
        assert!(!out.contains("<img"));
    }

    #[test]
    fn article_resolves_relative_image_sources() {
        let out = sanitize_article_html(r#"<img src="cat.png">"#, &base());
        assert!(out.contains(r#"src="https://news.example.com/articles/cat.png""#));
    }

    #[test]
    fn article_keeps_table_span_attributes_only() {
        let out = sanitize_article_html(
            r#"<table><tbody><tr><td colspan="2" style="color:red" width="9">x</td></tr></tbody></table>"#,
            &base(),
        );
        assert!(out.contains(r#"colspan="2""#));
        assert!(!out.contains("style="));
        assert!(!out.contains("width="));
    }

    #[test]
    fn article_sanitizer_is_deterministic() {
        let input = r#"<div><a href="/a" onclick="x">l</a><img src="b.png"><custom>c</custom></div>"#;
        let first = sanitize_article_html(input, &base());
        let second = sanitize_article_html(input, &base());
        assert_eq!(first, second);
    }

    // ── comment sanitizer ─────────────────────────────────────────────

    #[test]
    fn comment_keeps_the_narrow_tag_set() {
        let out = sanitize_comment_html("<p>hi <i>there</i> <code>x</code></p>");
        assert!(out.contains("<i>there</i>"));
        assert!(out.contains("<code>x</code>"));
    }

    #[test]
    fn comment_unwraps_article_only_tags() {
        let out = sanitize_comment_html("<h1>big</h1><img src=\"https://a.example/x.png\">");
        assert!(!out.contains("<h1"));
        assert!(!out.contains("<img"));
        assert!(out.contains("big"));
    }

    #[test]
    fn comment_links_open_in_new_tab() {
        let out = sanitize_comment_html(r#"<a href="https://a.example/">x</a>"#);
        assert!(out.contains(r#"rel="noopener noreferrer""#));
        assert!(out.contains(r#"target="_blank""#));
    }

    #[test]
    fn comment_drops_non_http_schemes() {
        let out = sanitize_comment_html(r#"<a href="ftp://a.example/f">x</a>"#);
        assert!(!out.contains("ftp:"));
    }

    #[test]
    fn comment_strips_scripts_and_handlers() {
        let out = sanitize_comment_html(r#"<script>bad()</script><b onclick="bad()">ok</b>"#);
        assert!(!out.contains("bad()"));
        assert!(out.contains("<b>ok</b>"));
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize_comment_html(""), "");
        assert_eq!(sanitize_article_html("", &base()), "");
    }
}
