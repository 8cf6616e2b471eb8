//! Phase 1: per-ticker fan-out fetch and publish
//!
//! For each ticker: crawl the upstream index, drop noise headlines,
//! gate on the dedup window, then emit the survivors to the bus in one
//! pipelined batch. Errors are isolated per ticker: a failed fetch or
//! a failed batch publish costs only that ticker's articles for this
//! cycle; still-novel articles re-enter on the next crawl.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::PipelineConfig;
use crate::core::constants::NEWS_STREAM;
use crate::crawl::NewsFetcher;
use crate::data::bus::EntryFields;
use crate::data::{Deduplicator, NewsBus};

use super::Article;

/// News collector
pub struct NewsCollector {
    bus: Arc<NewsBus>,
    dedup: Arc<Deduplicator>,
    fetcher: Arc<dyn NewsFetcher>,
    noise_keywords: Vec<String>,
    max_pages: u32,
    request_delay: Duration,
}

impl NewsCollector {
    pub fn new(
        bus: Arc<NewsBus>,
        dedup: Arc<Deduplicator>,
        fetcher: Arc<dyn NewsFetcher>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            bus,
            dedup,
            fetcher,
            noise_keywords: config.noise_keywords.clone(),
            max_pages: config.max_pages,
            request_delay: Duration::from_millis(config.request_delay_ms),
        }
    }

    /// Run one collection pass over the universe
    ///
    /// Returns the number of articles published to the bus.
    pub async fn run_once(&self, universe: &BTreeMap<String, String>) -> usize {
        let mut total = 0;

        for (i, (code, name)) in universe.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.request_delay).await;
            }

            let articles = match self
                .fetcher
                .crawl(code, name, self.max_pages, self.request_delay)
                .await
            {
                Ok(articles) => articles,
                Err(e) => {
                    tracing::warn!(stock_code = %code, error = %e, "Crawl failed");
                    continue;
                }
            };

            match self.publish_batch(articles).await {
                Ok(published) => total += published,
                Err(e) => {
                    // This ticker's batch is lost for the cycle; the
                    // next crawl re-collects whatever is still novel.
                    tracing::warn!(stock_code = %code, error = %e, "Batch publish failed");
                }
            }
        }

        tracing::info!(published = total, "News collector finished");
        total
    }

    fn is_noise(&self, headline: &str) -> bool {
        self.noise_keywords.iter().any(|kw| headline.contains(kw))
    }

    /// Filter, dedup, and publish one ticker's articles in one round trip
    async fn publish_batch(
        &self,
        articles: Vec<Article>,
    ) -> Result<usize, crate::data::bus::BusError> {
        let mut batch: Vec<EntryFields> = Vec::new();

        for article in articles {
            if self.is_noise(&article.headline) {
                continue;
            }
            // Fingerprinted on the normalized headline; probe + mark is
            // one logical operation
            if !self.dedup.is_new(&article.headline).await {
                continue;
            }
            batch.push(article.to_fields());
        }

        if batch.is_empty() {
            return Ok(0);
        }

        self.bus.publish_batch(NEWS_STREAM, &batch).await?;
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;

    use crate::core::constants::{ANALYZER_GROUP, NEWS_STREAM};
    use crate::crawl::CrawlError;

    /// Canned fetcher: one article list per ticker code
    struct FakeFetcher {
        pages: Mutex<BTreeMap<String, Vec<Article>>>,
        fail_codes: Vec<String>,
    }

    impl FakeFetcher {
        fn new() -> Self {
            Self {
                pages: Mutex::new(BTreeMap::new()),
                fail_codes: Vec::new(),
            }
        }

        fn with_articles(self, code: &str, headlines: &[(&str, &str)]) -> Self {
            let articles = headlines
                .iter()
                .map(|(headline, url)| article(code, headline, url))
                .collect();
            self.pages.lock().insert(code.to_string(), articles);
            self
        }

        fn failing(mut self, code: &str) -> Self {
            self.fail_codes.push(code.to_string());
            self
        }
    }

    #[async_trait]
    impl NewsFetcher for FakeFetcher {
        async fn crawl(
            &self,
            stock_code: &str,
            _stock_name: &str,
            _max_pages: u32,
            _request_delay: Duration,
        ) -> Result<Vec<Article>, CrawlError> {
            if self.fail_codes.iter().any(|c| c == stock_code) {
                return Err(CrawlError::Request("connection refused".into()));
            }
            Ok(self
                .pages
                .lock()
                .get(stock_code)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn article(code: &str, headline: &str, url: &str) -> Article {
        Article {
            stock_code: code.to_string(),
            stock_name: "삼성전자".to_string(),
            headline: headline.to_string(),
            press: "한경".to_string(),
            summary: String::new(),
            article_url: url.to_string(),
            published_at: Utc::now(),
            source: "NAVER".to_string(),
        }
    }

    fn universe(codes: &[&str]) -> BTreeMap<String, String> {
        codes
            .iter()
            .map(|c| (c.to_string(), "종목".to_string()))
            .collect()
    }

    fn collector(fetcher: FakeFetcher) -> (NewsCollector, Arc<NewsBus>) {
        let bus = Arc::new(NewsBus::memory());
        let config = PipelineConfig {
            request_delay_ms: 0,
            ..PipelineConfig::default()
        };
        let collector = NewsCollector::new(
            Arc::clone(&bus),
            Arc::new(Deduplicator::memory()),
            Arc::new(fetcher),
            &config,
        );
        (collector, bus)
    }

    async fn read_all(bus: &NewsBus) -> Vec<crate::data::bus::StreamEntry> {
        bus.ensure_group(NEWS_STREAM, ANALYZER_GROUP).await.unwrap();
        bus.read_new(NEWS_STREAM, ANALYZER_GROUP, "test", 100, 0)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_universe_collects_nothing() {
        let (collector, bus) = collector(FakeFetcher::new());
        let collected = collector.run_once(&BTreeMap::new()).await;

        assert_eq!(collected, 0);
        assert!(read_all(&bus).await.is_empty());
    }

    #[tokio::test]
    async fn test_single_novel_article_published() {
        let fetcher = FakeFetcher::new().with_articles("005930", &[("호실적", "/a")]);
        let (collector, bus) = collector(fetcher);

        let collected = collector.run_once(&universe(&["005930"])).await;
        assert_eq!(collected, 1);

        let entries = read_all(&bus).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].field_text("headline"), "호실적");
        assert_eq!(entries[0].field_text("stock_code"), "005930");
    }

    #[tokio::test]
    async fn test_noise_headlines_dropped() {
        let fetcher = FakeFetcher::new()
            .with_articles("005930", &[("특징주 상승", "/noise"), ("호실적", "/a")]);
        let (collector, bus) = collector(fetcher);

        let collected = collector.run_once(&universe(&["005930"])).await;
        assert_eq!(collected, 1);

        let entries = read_all(&bus).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].field_text("article_url"), "/a");
    }

    #[tokio::test]
    async fn test_second_run_publishes_nothing_new() {
        let fetcher = FakeFetcher::new().with_articles("005930", &[("호실적", "/a")]);
        let (collector, _bus) = collector(fetcher);
        let u = universe(&["005930"]);

        assert_eq!(collector.run_once(&u).await, 1);
        // Same upstream page again: dedup suppresses everything
        assert_eq!(collector.run_once(&u).await, 0);
    }

    #[tokio::test]
    async fn test_failed_ticker_does_not_stop_cycle() {
        let fetcher = FakeFetcher::new()
            .failing("000001")
            .with_articles("005930", &[("호실적", "/a")]);
        let (collector, _bus) = collector(fetcher);

        let collected = collector.run_once(&universe(&["000001", "005930"])).await;
        assert_eq!(collected, 1);
    }

    #[tokio::test]
    async fn test_same_headline_different_urls_published_once() {
        let fetcher = FakeFetcher::new()
            .with_articles("005930", &[("호실적!", "/a"), ("호실적", "/b")]);
        let (collector, bus) = collector(fetcher);

        let collected = collector.run_once(&universe(&["005930"])).await;
        assert_eq!(collected, 1);

        let entries = read_all(&bus).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].field_text("article_url"), "/a");
    }
}
