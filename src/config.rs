use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::CacheStore;
use crate::feeds::FeedList;
use crate::proxy::{default_proxies, ProxyService};
use crate::resolver::Strategy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Refresh interval in minutes, 0 to refresh only at startup
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    /// Per-request timeout for proxy calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    #[serde(default = "default_proxies")]
    pub proxies: Vec<ProxyService>,
    #[serde(default)]
    pub feeds: Vec<String>,
}

fn default_refresh_interval() -> u64 {
    15
}

fn default_request_timeout() -> u64 {
    10
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

/// Snapshot location; a local directory wins over a base URL when both are set.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    pub dir: Option<PathBuf>,
    pub base_url: Option<String>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.feed_list()?;
        Ok(config)
    }

    pub fn feed_list(&self) -> anyhow::Result<FeedList> {
        Ok(FeedList::from_urls(&self.feeds)?)
    }

    pub fn cache_store(&self) -> Option<CacheStore> {
        let cache = self.cache.as_ref()?;
        match (&cache.dir, &cache.base_url) {
            (Some(dir), _) => Some(CacheStore::Directory(dir.clone())),
            (None, Some(base_url)) => Some(CacheStore::Remote(base_url.clone())),
            (None, None) => None,
        }
    }

    /// Acquisition order: the cache (when configured), then each proxy.
    pub fn strategies(&self) -> Vec<Strategy> {
        self.cache_store()
            .map(Strategy::Cache)
            .into_iter()
            .chain(self.proxies.iter().cloned().map(Strategy::Proxy))
            .collect()
    }
}
