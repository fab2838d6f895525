use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::article::Article;
use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::AttemptError;
use crate::parser;
use crate::proxy::ProxyService;

pub const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_secs(10);

/// One way of getting a feed's articles.
#[derive(Debug, Clone)]
pub enum Strategy {
    Cache(CacheStore),
    Proxy(ProxyService),
}

impl Strategy {
    pub fn name(&self) -> &str {
        match self {
            Strategy::Cache(_) => "cache",
            Strategy::Proxy(proxy) => &proxy.name,
        }
    }
}

/// Outcome of trying one strategy for one feed.
#[derive(Debug)]
pub enum Attempt {
    Items(Vec<Article>),
    Empty,
    Failed(AttemptError),
}

impl Attempt {
    /// Only a non-empty result ends the search; empty and failed attempts
    /// hand over to the next strategy.
    pub fn should_continue(&self) -> bool {
        !matches!(self, Attempt::Items(_))
    }

    fn from_articles(articles: Vec<Article>) -> Self {
        if articles.is_empty() {
            Attempt::Empty
        } else {
            Attempt::Items(articles)
        }
    }
}

impl From<Result<Vec<Article>, AttemptError>> for Attempt {
    fn from(result: Result<Vec<Article>, AttemptError>) -> Self {
        match result {
            Ok(articles) => Attempt::from_articles(articles),
            Err(e) => Attempt::Failed(e),
        }
    }
}

/// Resolves a single feed URL by walking an ordered list of strategies.
pub struct Resolver {
    client: Client,
    strategies: Vec<Strategy>,
    proxy_timeout: Duration,
}

impl Resolver {
    pub fn new(strategies: Vec<Strategy>, proxy_timeout: Duration) -> anyhow::Result<Self> {
        // No client-wide timeout: only proxy requests are bounded.
        let client = Client::builder()
            .user_agent("NewsMerge/1.0 (RSS Aggregator)")
            .build()?;

        Ok(Self {
            client,
            strategies,
            proxy_timeout,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            config.strategies(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch and parse `url`, returning the first non-empty result of any
    /// strategy. Never fails; total failure is an empty list.
    pub async fn resolve(&self, url: &str) -> Vec<Article> {
        for strategy in &self.strategies {
            match self.attempt(strategy, url).await {
                Attempt::Items(articles) => {
                    info!(
                        "Fetched {} articles for {} via {}",
                        articles.len(),
                        url,
                        strategy.name()
                    );
                    return articles;
                }
                Attempt::Empty => debug!("{} returned no articles for {}", strategy.name(), url),
                Attempt::Failed(e) => warn!("{} failed for {}: {}", strategy.name(), url, e),
            }
        }

        error!("All strategies failed for {}", url);
        Vec::new()
    }

    pub async fn attempt(&self, strategy: &Strategy, url: &str) -> Attempt {
        match strategy {
            Strategy::Cache(store) => match store.read_snapshot(&self.client, url).await {
                Ok(Some(body)) => Attempt::from_articles(parser::parse(&body, url)),
                Ok(None) => Attempt::Empty,
                Err(e) => Attempt::Failed(e.into()),
            },
            Strategy::Proxy(proxy) => self.fetch_via_proxy(proxy, url).await.into(),
        }
    }

    async fn fetch_via_proxy(
        &self,
        proxy: &ProxyService,
        url: &str,
    ) -> Result<Vec<Article>, AttemptError> {
        let endpoint = proxy.endpoint_for(url);
        debug!("Requesting {} via {}", url, proxy.name);

        let response = self
            .client
            .get(&endpoint)
            .timeout(self.proxy_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(AttemptError::EmptyBody);
        }

        if proxy.expects_json(content_type.as_deref()) {
            let value: serde_json::Value = serde_json::from_str(&body)?;
            Ok(parser::parse_json(&value, url))
        } else {
            Ok(parser::parse(&body, url))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> Article {
        Article::new("t", "l", "", None, "", "s")
    }

    #[test]
    fn test_items_stop_the_search() {
        assert!(!Attempt::Items(vec![article()]).should_continue());
    }

    #[test]
    fn test_empty_and_failed_continue() {
        assert!(Attempt::Empty.should_continue());
        assert!(Attempt::Failed(AttemptError::EmptyBody).should_continue());
        assert!(Attempt::Failed(AttemptError::Status(503)).should_continue());
    }

    #[test]
    fn test_empty_result_becomes_empty_attempt() {
        let attempt: Attempt = Ok(Vec::new()).into();
        assert!(matches!(attempt, Attempt::Empty));

        let attempt: Attempt = Ok(vec![article()]).into();
        assert!(matches!(attempt, Attempt::Items(ref a) if a.len() == 1));
    }

    #[test]
    fn test_strategy_names() {
        let cache = Strategy::Cache(CacheStore::Remote("https://cache.example".to_string()));
        let proxy = Strategy::Proxy(ProxyService::new(
            "allorigins",
            "{url}",
            crate::proxy::ResponseFormat::Text,
        ));
        assert_eq!(cache.name(), "cache");
        assert_eq!(proxy.name(), "allorigins");
    }

    #[tokio::test]
    async fn test_no_strategies_resolves_empty() {
        let resolver = Resolver::new(Vec::new(), DEFAULT_PROXY_TIMEOUT).unwrap();
        assert!(resolver.resolve("https://feed.example.com/rss").await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_proxy_resolves_empty() {
        let proxy = ProxyService::new(
            "nowhere",
            "http://127.0.0.1:1/?url={url}",
            crate::proxy::ResponseFormat::Text,
        );
        let resolver = Resolver::new(
            vec![Strategy::Proxy(proxy)],
            Duration::from_millis(500),
        )
        .unwrap();

        assert!(resolver.resolve("https://feed.example.com/rss").await.is_empty());
    }
}
