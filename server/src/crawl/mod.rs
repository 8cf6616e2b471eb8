//! Upstream news fetchers
//!
//! `NewsFetcher` is the collector's only view of the upstream: fetch up
//! to `max_pages` of a ticker's news index and return shaped articles.
//! Noise filtering and dedup happen in the collector, not here.

mod naver;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use naver::NaverNewsFetcher;

use crate::domain::news::Article;

/// Error type for upstream fetches
#[derive(Error, Debug)]
pub enum CrawlError {
    /// HTTP transport error
    #[error("request error: {0}")]
    Request(String),

    /// Extraction setup error (selector compilation)
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for CrawlError {
    fn from(err: reqwest::Error) -> Self {
        CrawlError::Request(err.to_string())
    }
}

/// Per-ticker news index fetcher
#[async_trait]
pub trait NewsFetcher: Send + Sync {
    /// Fetch up to `max_pages` for one ticker, sleeping `request_delay`
    /// between pages. A failed page stops that ticker's paging; articles
    /// extracted so far are still returned.
    async fn crawl(
        &self,
        stock_code: &str,
        stock_name: &str,
        max_pages: u32,
        request_delay: Duration,
    ) -> Result<Vec<Article>, CrawlError>;
}
