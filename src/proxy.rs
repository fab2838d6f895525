use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;

/// Characters left as-is when a feed URL is embedded as a URI component.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// What a proxy sends back when it succeeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Pre-parsed JSON with an `items` array.
    Json,
    /// The raw feed body, relayed as-is.
    #[default]
    Text,
}

/// One third-party service that fetches a feed on our behalf.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProxyService {
    pub name: String,
    /// Endpoint template. `{url}` is replaced by the percent-encoded feed URL,
    /// `{raw_url}` by the feed URL verbatim.
    pub endpoint: String,
    #[serde(default)]
    pub format: ResponseFormat,
}

impl ProxyService {
    pub fn new(name: &str, endpoint: &str, format: ResponseFormat) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            format,
        }
    }

    pub fn endpoint_for(&self, feed_url: &str) -> String {
        let encoded = utf8_percent_encode(feed_url, COMPONENT).to_string();
        self.endpoint
            .replace("{raw_url}", feed_url)
            .replace("{url}", &encoded)
    }

    /// Whether a response should be decoded as JSON, judged by its content type
    /// first and the declared format second.
    pub fn expects_json(&self, content_type: Option<&str>) -> bool {
        content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
            || self.format == ResponseFormat::Json
    }
}

/// The public proxies tried when the configuration names none.
pub fn default_proxies() -> Vec<ProxyService> {
    vec![
        ProxyService::new(
            "rss2json",
            "https://api.rss2json.com/v1/api.json?rss_url={url}",
            ResponseFormat::Json,
        ),
        ProxyService::new(
            "allorigins",
            "https://api.allorigins.win/raw?url={url}",
            ResponseFormat::Text,
        ),
        ProxyService::new("corsproxy", "https://corsproxy.io/?{url}", ResponseFormat::Text),
        ProxyService::new(
            "thingproxy",
            "https://thingproxy.freeboard.io/fetch/{url}",
            ResponseFormat::Text,
        ),
        ProxyService::new(
            "cors-anywhere",
            "https://cors-anywhere.herokuapp.com/{raw_url}",
            ResponseFormat::Text,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_url() {
        let proxy = ProxyService::new("p", "https://proxy.example/raw?url={url}", ResponseFormat::Text);
        assert_eq!(
            proxy.endpoint_for("https://feed.example.com/rss?lang=en"),
            "https://proxy.example/raw?url=https%3A%2F%2Ffeed.example.com%2Frss%3Flang%3Den"
        );
    }

    #[test]
    fn test_endpoint_encodes_space_as_percent_in_path() {
        let proxy = ProxyService::new("p", "https://proxy.example/fetch/{url}", ResponseFormat::Text);
        assert_eq!(
            proxy.endpoint_for("https://feed.example.com/a b?q=x+y"),
            "https://proxy.example/fetch/https%3A%2F%2Ffeed.example.com%2Fa%20b%3Fq%3Dx%2By"
        );
    }

    #[test]
    fn test_endpoint_keeps_unreserved_marks() {
        let proxy = ProxyService::new("p", "https://proxy.example/?{url}", ResponseFormat::Text);
        assert_eq!(
            proxy.endpoint_for("https://x.example.com/~me/(feed)!*'_-.rss"),
            "https://proxy.example/?https%3A%2F%2Fx.example.com%2F~me%2F(feed)!*'_-.rss"
        );
    }

    #[test]
    fn test_endpoint_raw_url_is_verbatim() {
        let proxy = ProxyService::new("p", "https://proxy.example/{raw_url}", ResponseFormat::Text);
        assert_eq!(
            proxy.endpoint_for("https://feed.example.com/rss"),
            "https://proxy.example/https://feed.example.com/rss"
        );
    }

    #[test]
    fn test_expects_json_from_content_type() {
        let proxy = ProxyService::new("p", "{url}", ResponseFormat::Text);
        assert!(proxy.expects_json(Some("application/json; charset=utf-8")));
        assert!(!proxy.expects_json(Some("application/rss+xml")));
        assert!(!proxy.expects_json(None));
    }

    #[test]
    fn test_expects_json_from_declared_format() {
        let proxy = ProxyService::new("p", "{url}", ResponseFormat::Json);
        assert!(proxy.expects_json(Some("text/plain")));
        assert!(proxy.expects_json(None));
    }

    #[test]
    fn test_default_chain_order() {
        let names: Vec<String> = default_proxies().into_iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec!["rss2json", "allorigins", "corsproxy", "thingproxy", "cors-anywhere"]
        );
    }

    #[test]
    fn test_format_deserializes_lowercase() {
        let proxy: ProxyService =
            toml::from_str("name = \"x\"\nendpoint = \"{url}\"\nformat = \"json\"").unwrap();
        assert_eq!(proxy.format, ResponseFormat::Json);

        let proxy: ProxyService = toml::from_str("name = \"x\"\nendpoint = \"{url}\"").unwrap();
        assert_eq!(proxy.format, ResponseFormat::Text);
    }
}
