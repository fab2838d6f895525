use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::article::Article;
use crate::feeds::FeedList;
use crate::resolver::Resolver;

/// Recency window applied on top of the merged list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum TimeFilter {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "week")]
    LastWeek,
    #[serde(rename = "month")]
    LastMonth,
}

impl TimeFilter {
    pub fn window(self) -> Option<chrono::Duration> {
        match self {
            TimeFilter::All => None,
            TimeFilter::Last24Hours => Some(chrono::Duration::hours(24)),
            TimeFilter::LastWeek => Some(chrono::Duration::days(7)),
            TimeFilter::LastMonth => Some(chrono::Duration::days(30)),
        }
    }

    /// Whether an article published at `published` is shown at time `now`.
    /// Undated articles only pass the `All` filter.
    pub fn includes(self, published: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match self.window() {
            None => true,
            Some(window) => published.is_some_and(|t| t <= now && now - t <= window),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeFilter::All => "all",
            TimeFilter::Last24Hours => "24h",
            TimeFilter::LastWeek => "week",
            TimeFilter::LastMonth => "month",
        }
    }
}

impl FromStr for TimeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TimeFilter::All),
            "24h" | "day" => Ok(TimeFilter::Last24Hours),
            "week" | "7d" => Ok(TimeFilter::LastWeek),
            "month" | "30d" => Ok(TimeFilter::LastMonth),
            other => Err(format!("unknown time filter: {}", other)),
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every article from the last completed refresh, newest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregationResult {
    pub articles: Vec<Article>,
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Number of feeds the refresh covered
    pub sources: usize,
    /// Feeds that produced nothing
    pub failed_sources: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountSummary {
    pub filter: TimeFilter,
    pub total: usize,
    pub filtered: usize,
}

impl fmt::Display for CountSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filter == TimeFilter::All {
            write!(f, "{} articles", self.filtered)
        } else {
            write!(f, "filtered: {} / total: {}", self.filtered, self.total)
        }
    }
}

/// The subset of the last result that the current filter lets through.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredView {
    pub filter: TimeFilter,
    pub total: usize,
    pub filtered: usize,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub articles: Vec<Article>,
}

impl FilteredView {
    pub fn summary(&self) -> CountSummary {
        CountSummary {
            filter: self.filter,
            total: self.total,
            filtered: self.filtered,
        }
    }
}

#[derive(Debug)]
pub enum RefreshOutcome {
    Completed(Arc<AggregationResult>),
    /// Another refresh was in flight; nothing was fetched.
    AlreadyRunning,
}

/// Concatenate per-feed batches and sort newest first. Undated articles sink
/// to the end; ties keep their relative order.
pub fn merge(batches: Vec<Vec<Article>>) -> Vec<Article> {
    let mut articles: Vec<Article> = batches.into_iter().flatten().collect();
    articles.sort_by(|a, b| b.published().cmp(&a.published()));
    articles
}

pub fn filter_articles(articles: &[Article], filter: TimeFilter, now: DateTime<Utc>) -> Vec<Article> {
    articles
        .iter()
        .filter(|a| filter.includes(a.published(), now))
        .cloned()
        .collect()
}

pub struct Aggregator {
    resolver: Arc<Resolver>,
    state: RwLock<Arc<AggregationResult>>,
    refreshing: AtomicBool,
}

impl Aggregator {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
            state: RwLock::new(Arc::new(AggregationResult::default())),
            refreshing: AtomicBool::new(false),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    pub async fn snapshot(&self) -> Arc<AggregationResult> {
        self.state.read().await.clone()
    }

    /// Resolve every feed concurrently and replace the stored result.
    ///
    /// Individual feeds cannot fail the refresh: a feed that errors, comes
    /// back empty, or whose task panics simply contributes no articles.
    pub async fn refresh(&self, sources: &[String]) -> RefreshOutcome {
        let Some(_guard) = RefreshGuard::acquire(&self.refreshing) else {
            info!("Refresh already in progress, skipping");
            return RefreshOutcome::AlreadyRunning;
        };

        info!("Refreshing {} feeds", sources.len());

        let mut tasks = JoinSet::new();
        for url in sources {
            let resolver = self.resolver.clone();
            let url = url.clone();
            tasks.spawn(async move { resolver.resolve(&url).await });
        }

        let mut batches = Vec::with_capacity(sources.len());
        let mut failed_sources = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(articles) if articles.is_empty() => failed_sources += 1,
                Ok(articles) => batches.push(articles),
                Err(e) => {
                    error!("Feed task did not complete: {}", e);
                    failed_sources += 1;
                }
            }
        }

        let result = Arc::new(AggregationResult {
            articles: merge(batches),
            refreshed_at: Some(Utc::now()),
            sources: sources.len(),
            failed_sources,
        });
        *self.state.write().await = result.clone();

        info!(
            "Feed refresh complete: {} articles from {} feeds ({} without articles)",
            result.articles.len(),
            result.sources,
            result.failed_sources
        );
        RefreshOutcome::Completed(result)
    }

    pub async fn view(&self, filter: TimeFilter) -> FilteredView {
        self.view_at(filter, Utc::now()).await
    }

    /// Filter the full stored result as of `now`.
    pub async fn view_at(&self, filter: TimeFilter, now: DateTime<Utc>) -> FilteredView {
        let snapshot = self.snapshot().await;
        let articles = filter_articles(&snapshot.articles, filter, now);
        FilteredView {
            filter,
            total: snapshot.articles.len(),
            filtered: articles.len(),
            refreshed_at: snapshot.refreshed_at,
            articles,
        }
    }
}

/// Holds the in-flight flag for the lifetime of one refresh.
struct RefreshGuard<'a>(&'a AtomicBool);

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub async fn start_background_refresh(
    aggregator: Arc<Aggregator>,
    feeds: Arc<RwLock<FeedList>>,
    interval_minutes: u64,
) {
    // Do initial fetch
    info!("Starting initial feed fetch");
    let urls = feeds.read().await.urls().to_vec();
    aggregator.refresh(&urls).await;

    if interval_minutes == 0 {
        return;
    }

    let interval = Duration::from_secs(interval_minutes * 60);
    loop {
        tokio::time::sleep(interval).await;
        info!("Starting scheduled feed refresh");
        let urls = feeds.read().await.urls().to_vec();
        aggregator.refresh(&urls).await;
    }
}
