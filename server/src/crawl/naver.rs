//! Naver Finance per-ticker news crawler
//!
//! Fetches `finance.naver.com/item/news_news.naver` pages (EUC-KR) and
//! extracts `(headline, press, date, href)` rows from `table.type5`.
//! The Referer header is required; the table has no tbody.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use scraper::{Html, Selector};

use super::{CrawlError, NewsFetcher};
use crate::core::constants::CRAWL_TIMEOUT_SECS;
use crate::domain::news::Article;

const BASE_URL: &str = "https://finance.naver.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Upstream date format, local exchange time taken as UTC
const DATE_FORMAT: &str = "%Y.%m.%d %H:%M";

struct Selectors {
    table: Selector,
    row: Selector,
    title_link: Selector,
    press: Selector,
    date: Selector,
}

impl Selectors {
    fn new() -> Result<Self, CrawlError> {
        let parse = |css: &str| {
            Selector::parse(css).map_err(|e| CrawlError::Parse(format!("selector {css}: {e}")))
        };
        Ok(Self {
            table: parse("table.type5")?,
            row: parse("tr")?,
            title_link: parse("td.title a")?,
            press: parse("td.info")?,
            date: parse("td.date")?,
        })
    }
}

/// Naver Finance news fetcher
pub struct NaverNewsFetcher {
    client: reqwest::Client,
    selectors: Selectors,
}

impl NaverNewsFetcher {
    pub fn new() -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(CRAWL_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            selectors: Selectors::new()?,
        })
    }

    async fn fetch_page(&self, stock_code: &str, page: u32) -> Result<String, CrawlError> {
        let url = format!("{BASE_URL}/item/news_news.naver?code={stock_code}&page={page}");
        let referer = format!("{BASE_URL}/item/news.naver?code={stock_code}");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::REFERER, referer)
            .send()
            .await?
            .error_for_status()?;

        // The page declares no charset; Naver Finance serves EUC-KR
        Ok(response.text_with_charset("euc-kr").await?)
    }

    /// Extract article rows from one index page
    fn parse_page(&self, html: &str, stock_code: &str, stock_name: &str) -> Vec<Article> {
        let document = Html::parse_document(html);

        let Some(table) = document.select(&self.selectors.table).next() else {
            return Vec::new();
        };

        let mut articles = Vec::new();
        for row in table.select(&self.selectors.row) {
            let Some(link) = row.select(&self.selectors.title_link).next() else {
                continue;
            };

            let headline = element_text(&link);
            if headline.is_empty() {
                continue;
            }

            let href = link.value().attr("href").unwrap_or_default();
            if href.is_empty() {
                continue;
            }
            let article_url = if href.starts_with('/') {
                format!("{BASE_URL}{href}")
            } else {
                href.to_string()
            };

            let press = row
                .select(&self.selectors.press)
                .next()
                .map(|td| element_text(&td))
                .unwrap_or_default();

            let published_at = row
                .select(&self.selectors.date)
                .next()
                .map(|td| element_text(&td))
                .and_then(|text| NaiveDateTime::parse_from_str(&text, DATE_FORMAT).ok())
                .map(|naive| naive.and_utc())
                .unwrap_or_else(Utc::now);

            articles.push(Article {
                stock_code: stock_code.to_string(),
                stock_name: stock_name.to_string(),
                headline,
                press,
                summary: String::new(),
                article_url,
                published_at,
                source: "NAVER".to_string(),
            });
        }

        articles
    }
}

fn element_text(element: &scraper::ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[async_trait]
impl NewsFetcher for NaverNewsFetcher {
    async fn crawl(
        &self,
        stock_code: &str,
        stock_name: &str,
        max_pages: u32,
        request_delay: Duration,
    ) -> Result<Vec<Article>, CrawlError> {
        let mut articles = Vec::new();

        for page in 1..=max_pages {
            let html = match self.fetch_page(stock_code, page).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!(
                        stock_code,
                        page,
                        error = %e,
                        "News page fetch failed, stopping pagination"
                    );
                    break;
                }
            };

            let page_articles = self.parse_page(&html, stock_code, stock_name);
            if page_articles.is_empty() {
                break;
            }
            tracing::debug!(stock_code, page, count = page_articles.len(), "Page crawled");
            articles.extend(page_articles);

            if page < max_pages {
                tokio::time::sleep(request_delay).await;
            }
        }

        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table class="type5" summary="뉴스">
        <tr>
            <td class="title"><a href="/item/news_read.naver?article_id=1">삼성전자 호실적</a></td>
            <td class="info">한국경제</td>
            <td class="date">2025.03.01 09:30</td>
        </tr>
        <tr><td class="on">pager row without title</td></tr>
        <tr>
            <td class="title"><a href="https://other.example.com/2">외부 기사</a></td>
            <td class="info">매경</td>
            <td class="date">broken date</td>
        </tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_page_extracts_rows() {
        let fetcher = NaverNewsFetcher::new().unwrap();
        let articles = fetcher.parse_page(PAGE, "005930", "삼성전자");

        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.headline, "삼성전자 호실적");
        assert_eq!(first.press, "한국경제");
        assert_eq!(
            first.article_url,
            "https://finance.naver.com/item/news_read.naver?article_id=1"
        );
        assert_eq!(first.source, "NAVER");
        assert_eq!(
            first.published_at.to_rfc3339(),
            "2025-03-01T09:30:00+00:00"
        );

        // Absolute hrefs pass through; a broken date falls back to now
        assert_eq!(articles[1].article_url, "https://other.example.com/2");
    }

    #[test]
    fn test_parse_page_without_table() {
        let fetcher = NaverNewsFetcher::new().unwrap();
        let articles = fetcher.parse_page("<html><body>점검 중</body></html>", "005930", "삼성전자");
        assert!(articles.is_empty());
    }
}
