use crate::error::FeedListError;

/// The configured feed URLs, in insertion order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedList {
    urls: Vec<String>,
}

impl FeedList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from configuration, rejecting the first invalid or
    /// duplicated URL.
    pub fn from_urls<I, S>(urls: I) -> Result<Self, FeedListError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for url in urls {
            list.add(url.as_ref())?;
        }
        Ok(list)
    }

    pub fn add(&mut self, url: &str) -> Result<(), FeedListError> {
        let url = url.trim();
        if !is_feed_url(url) {
            return Err(FeedListError::InvalidUrl(url.to_string()));
        }
        if self.contains(url) {
            return Err(FeedListError::Duplicate(url.to_string()));
        }
        self.urls.push(url.to_string());
        Ok(())
    }

    /// Remove `url`, returning whether it was present.
    pub fn remove(&mut self, url: &str) -> bool {
        let url = url.trim();
        let before = self.urls.len();
        self.urls.retain(|u| u != url);
        self.urls.len() != before
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.iter().any(|u| u == url)
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

fn is_feed_url(url: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        url.strip_prefix(scheme)
            .is_some_and(|rest| !rest.is_empty())
    })
}
