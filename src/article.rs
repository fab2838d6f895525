use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_LINK: &str = "#";

/// A single entry from any feed, normalised to one shape.
///
/// Articles are only built by the parser and are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    title: String,
    link: String,
    author: String,
    published: Option<DateTime<Utc>>,
    description: String,
    source: String,
}

impl Article {
    /// Build an article, trimming every field and applying the defaults for
    /// empty title and link.
    pub(crate) fn new(
        title: &str,
        link: &str,
        author: &str,
        published: Option<DateTime<Utc>>,
        description: &str,
        source: &str,
    ) -> Self {
        Self {
            title: or_default(title, DEFAULT_TITLE),
            link: or_default(link, DEFAULT_LINK),
            author: author.trim().to_string(),
            published,
            description: description.trim().to_string(),
            source: source.trim().to_string(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Publication time, `None` when the feed gave none or it was unparseable.
    /// `None` orders before every real timestamp.
    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.published
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Feed title the article came from, or the feed URL when the feed has none.
    pub fn source(&self) -> &str {
        &self.source
    }
}

fn or_default(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a feed date string into UTC.
///
/// Accepts RFC 3339, RFC 2822 and the naive `YYYY-MM-DD HH:MM:SS` form that
/// JSON proxies emit (read as UTC). Anything else yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
