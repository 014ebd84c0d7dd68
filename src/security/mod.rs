//! Outbound-request security: SSRF host policy and HTML sanitization.

pub mod sanitize;
pub mod ssrf;

pub use sanitize::{sanitize_article_html, sanitize_comment_html};
pub use ssrf::{HostResolver, SystemResolver, ensure_public_url, ip_is_blocked};
