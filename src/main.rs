use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsmerge::aggregator::{start_background_refresh, Aggregator};
use newsmerge::config::Config;
use newsmerge::resolver::Resolver;
use newsmerge::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsmerge=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("NEWSMERGE_CONFIG").unwrap_or_else(|_| "feeds.toml".to_string());
    let config = Config::load(&config_path)?;
    let feeds = config.feed_list()?;
    info!(
        "Loaded {} feeds and {} proxies from {}",
        feeds.len(),
        config.proxies.len(),
        config_path
    );

    let aggregator = Arc::new(Aggregator::new(Resolver::from_config(&config)?));
    let feeds = Arc::new(RwLock::new(feeds));

    // Start background refresh task
    let bg_aggregator = aggregator.clone();
    let bg_feeds = feeds.clone();
    let refresh_interval = config.refresh_interval;
    tokio::spawn(async move {
        start_background_refresh(bg_aggregator, bg_feeds, refresh_interval).await;
    });

    let state = Arc::new(AppState {
        aggregator,
        feeds,
        cache: config.cache_store(),
    });
    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Server starting on http://{}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
