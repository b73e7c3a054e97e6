use crate::config::NewsConfig;
use crate::errors::FitError;
use crate::http::ensure_success;
use crate::models::Article;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const SERVICE: &str = "NewsAPI";
pub const PAGE_SIZE: u32 = 20;
pub const PAGE_COUNT: u32 = 3;

#[derive(Debug, Deserialize)]
struct HeadlinesPage {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Clone)]
pub struct NewsClient {
    config: NewsConfig,
    http: Client,
}

impl NewsClient {
    pub fn new(config: NewsConfig, http: Client) -> Self {
        Self { config, http }
    }

    /// US health headlines, pages `1..=PAGE_COUNT` concatenated in order.
    pub async fn health_headlines(&self) -> Result<Vec<Article>, FitError> {
        let mut articles = Vec::new();
        for page in 1..=PAGE_COUNT {
            let batch = self.headlines_page(page).await?;
            debug!(page, count = batch.len(), "fetched headlines page");
            articles.extend(batch);
        }
        Ok(articles)
    }

    async fn headlines_page(&self, page: u32) -> Result<Vec<Article>, FitError> {
        let url = format!("{}/v2/top-headlines", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(url)
            .query(&[
                ("category", "health"),
                ("country", "us"),
                ("apiKey", self.config.api_key.as_str()),
            ])
            .query(&[("pageSize", PAGE_SIZE), ("page", page)])
            .send()
            .await?;
        let parsed: HeadlinesPage = ensure_success(SERVICE, response)?.json().await?;
        Ok(parsed.articles)
    }
}
