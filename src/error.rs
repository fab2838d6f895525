use thiserror::Error;

/// Why a single acquisition attempt produced nothing usable.
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("empty response body")]
    EmptyBody,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FeedListError {
    #[error("not an http(s) URL: {0}")]
    InvalidUrl(String),

    #[error("feed already subscribed: {0}")]
    Duplicate(String),
}
