use feed_rs::model::{Entry, Link, Person};
use feed_rs::parser;
use serde_json::Value;
use tracing::{debug, warn};

use crate::article::{parse_timestamp, Article};

const JSON_DATE_FIELDS: &[&str] = &["pubDate", "pubdate", "date", "published", "updated"];
const JSON_DESCRIPTION_FIELDS: &[&str] = &["description", "summary", "content"];

/// Parse a feed body of unknown shape.
///
/// Bodies that look like a JSON object are treated as proxy-normalised JSON,
/// everything else as RSS/Atom XML. Never fails: unusable input yields an
/// empty list.
pub fn parse(raw: &str, source_url: &str) -> Vec<Article> {
    if raw.trim_start().starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            return parse_json(&value, source_url);
        }
    }
    parse_xml(raw, source_url)
}

/// Parse RSS 2.0 / Atom XML. A document that fails to parse yields no articles.
pub fn parse_xml(raw: &str, source_url: &str) -> Vec<Article> {
    let feed = match parser::parse(raw.as_bytes()) {
        Ok(feed) => feed,
        Err(e) => {
            warn!("Failed to parse feed XML from {}: {}", source_url, e);
            return Vec::new();
        }
    };

    let source = feed
        .title
        .as_ref()
        .map(|t| t.content.trim())
        .filter(|t| !t.is_empty())
        .unwrap_or(source_url)
        .to_string();

    let articles: Vec<Article> = feed
        .entries
        .iter()
        .map(|entry| entry_to_article(entry, &source))
        .collect();

    debug!("Parsed {} entries from {}", articles.len(), source_url);
    articles
}

fn entry_to_article(entry: &Entry, source: &str) -> Article {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.as_str())
        .unwrap_or_default();

    let link = primary_link(&entry.links).unwrap_or_default();

    let author = entry
        .authors
        .first()
        .map(person_text)
        .unwrap_or_default();

    let description = entry
        .summary
        .as_ref()
        .map(|t| t.content.as_str())
        .filter(|s| !s.trim().is_empty())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.as_deref()))
        .unwrap_or_default();

    Article::new(
        title,
        link,
        author,
        entry.published.or(entry.updated),
        description,
        source,
    )
}

/// RSS 2.0 `<author>` arrives as a person named after the element, with the
/// element text stored as the email.
fn person_text(person: &Person) -> &str {
    match person.email.as_deref() {
        Some(email) if person.name == "author" => email,
        _ => person.name.as_str(),
    }
}

/// The article's own page: an `alternate` (or unlabelled) link, else the first one.
fn primary_link(links: &[Link]) -> Option<&str> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.as_str())
}

/// Map a proxy's pre-parsed JSON (`{"feed": {...}, "items": [...]}`) to articles.
///
/// Missing or non-string fields fall back to the same defaults as XML.
pub fn parse_json(value: &Value, source_url: &str) -> Vec<Article> {
    let Some(items) = value.get("items").and_then(Value::as_array) else {
        debug!("JSON from {} has no items array", source_url);
        return Vec::new();
    };

    let source = value
        .get("feed")
        .and_then(|feed| str_field(feed, "title"))
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(source_url);

    items
        .iter()
        .map(|item| {
            Article::new(
                str_field(item, "title").unwrap_or_default(),
                str_field(item, "link").unwrap_or_default(),
                str_field(item, "author").unwrap_or_default(),
                first_str_field(item, JSON_DATE_FIELDS).and_then(parse_timestamp),
                first_str_field(item, JSON_DESCRIPTION_FIELDS).unwrap_or_default(),
                source,
            )
        })
        .collect()
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn first_str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| str_field(value, key))
        .find(|s| !s.trim().is_empty())
}
