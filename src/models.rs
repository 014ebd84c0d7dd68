//! Upstream item shape and the JSON response projections.
//!
//! The upstream `type` tag stays a raw string: the set of item kinds is
//! owned by the news API, and responses pass it through verbatim. Closed
//! sets this crate owns (feeds) live as enums next to their components.

use serde::{Deserialize, Serialize};
use url::Url;

/// An item as the news API serves it. Every field is optional upstream,
/// so everything defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Item {
    /// Unique item id
    pub id: u64,
    /// True when the item was deleted by its author or moderators
    pub deleted: bool,
    /// Item kind: "story", "comment", "job", "poll", ...
    #[serde(rename = "type")]
    pub kind: String,
    /// Author handle
    pub by: String,
    /// Creation time, unix seconds
    pub time: i64,
    /// Body HTML (comments, Ask HN posts)
    pub text: String,
    /// True when the item was killed by moderators or flags
    pub dead: bool,
    /// Parent item id, for comments
    pub parent: Option<u64>,
    /// Child item ids, in display order
    pub kids: Vec<u64>,
    /// External link, for link stories
    pub url: String,
    /// Points
    pub score: i64,
    /// Story title
    pub title: String,
    /// Total comment count, for stories
    pub descendants: u64,
}

/// A story as emitted by the list endpoint
#[derive(Debug, Clone, Serialize)]
pub struct Story {
    /// Item id
    pub id: u64,
    /// Story title
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// External link
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Lowercased link hostname minus a leading `www.`; always present,
    /// possibly empty
    pub domain: String,
    /// Points
    pub score: i64,
    /// Author handle
    #[serde(skip_serializing_if = "String::is_empty")]
    pub by: String,
    /// Creation time, unix seconds
    pub time: i64,
    /// Total comment count
    pub descendants: u64,
    /// Child ids; always an array
    pub kids: Vec<u64>,
    /// Body HTML
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Item kind
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<&Item> for Story {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            url: item.url.clone(),
            domain: extract_domain(&item.url),
            score: item.score,
            by: item.by.clone(),
            time: item.time,
            descendants: item.descendants,
            kids: item.kids.clone(),
            text: item.text.clone(),
            kind: item.kind.clone(),
        }
    }
}

/// A single item as emitted by the item endpoint: the story fields plus
/// moderation flags and the optional parent pointer.
#[derive(Debug, Clone, Serialize)]
pub struct ItemDetail {
    /// The story-shaped fields
    #[serde(flatten)]
    pub story: Story,
    /// True when the item was deleted
    pub deleted: bool,
    /// True when the item was killed
    pub dead: bool,
    /// Parent item id, for comments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
}

impl From<&Item> for ItemDetail {
    fn from(item: &Item) -> Self {
        Self {
            story: Story::from(item),
            deleted: item.deleted,
            dead: item.dead,
            parent: item.parent,
        }
    }
}

/// One node of a hydrated comment tree
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    /// Item id
    pub id: u64,
    /// Author handle
    #[serde(skip_serializing_if = "String::is_empty")]
    pub by: String,
    /// Creation time, unix seconds
    pub time: i64,
    /// Sanitized comment HTML
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Child comments in upstream order; never null
    pub kids: Vec<CommentNode>,
    /// Item kind (always "comment" in shipped trees)
    #[serde(rename = "type")]
    pub kind: String,
    /// True when the comment was deleted
    pub deleted: bool,
    /// True when the comment was killed
    pub dead: bool,
}

/// A story plus its fully hydrated comment forest
#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    /// The story-shaped fields, inlined
    #[serde(flatten)]
    pub story: Story,
    /// Top-level comments in upstream order
    pub comments: Vec<CommentNode>,
}

/// A reader-view extraction result
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    /// URL as requested
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    /// Article title
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Author attribution, when the page declares one
    #[serde(skip_serializing_if = "String::is_empty")]
    pub byline: String,
    /// Site name, when the page declares one
    #[serde(skip_serializing_if = "String::is_empty")]
    pub site_name: String,
    /// Short description
    #[serde(skip_serializing_if = "String::is_empty")]
    pub excerpt: String,
    /// Sanitized article HTML
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Plain-text rendition of the article
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text_content: String,
    /// Character count of the plain text
    pub length: usize,
}

/// Lowercased hostname of `raw` with a single leading `www.` removed.
/// Unparseable or host-less URLs yield the empty string.
#[must_use]
pub fn extract_domain(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let Ok(parsed) = Url::parse(raw) else {
        return String::new();
    };
    match parsed.host_str() {
        Some(host) if !host.is_empty() => {
            let host = host.to_ascii_lowercase();
            host.strip_prefix("www.").unwrap_or(&host).to_string()
        }
        _ => String::new(),
    }
}
