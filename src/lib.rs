//! News Merge - an RSS/Atom feed aggregator
//!
//! Fetches many feeds through a chain of fallbacks (a static snapshot cache,
//! then third-party proxy services), merges every article into one list
//! sorted newest first, and serves recency-filtered views of it as JSON.

pub mod aggregator;
pub mod article;
pub mod cache;
pub mod config;
pub mod error;
pub mod feeds;
pub mod parser;
pub mod proxy;
pub mod resolver;
pub mod routes;
