use serde::Deserialize;
use tokio::time::sleep;

use super::backoff::Attempt;
use super::url_content_getter::{RawResponse, URLContentGetter};
use crate::error::FetchError;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Addresses of the navigation page, listings and articles.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SiteUrls {
    pub root_url: String,
    /// Listing endpoint with a `{teos}` placeholder for the listing id.
    pub listing_url_template: String,
    /// Path segment of `root_url` replaced by an article href.
    pub article_placeholder: String,
}

impl SiteUrls {
    pub fn listing_url(&self, listing_id: &str) -> String {
        self.listing_url_template.replace("{teos}", listing_id)
    }

    pub fn article_url(&self, href: &str) -> String {
        self.root_url.replace(&self.article_placeholder, href)
    }
}

impl Default for SiteUrls {
    fn default() -> Self {
        SiteUrls {
            root_url: "https://www.terveyskirjasto.fi/terveyskirjasto/tk.koti".to_string(),
            listing_url_template: "https://www.terveyskirjasto.fi/terveyskirjasto/terveyskirjasto.kasp_api.selaus_json?p_teos={teos}&p_selaus=".to_string(),
            article_placeholder: "tk.koti".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PageFetcher<T = reqwest::Client> {
    client: T,
    urls: SiteUrls,
    max_retries: u8,
    initial_retry_delay_ms: u64,
}

impl<T: URLContentGetter> PageFetcher<T> {
    pub fn new(client: T, urls: SiteUrls) -> Self {
        PageFetcher {
            client,
            urls,
            max_retries: 0,
            initial_retry_delay_ms: 250,
        }
    }

    pub fn with_retries(mut self, max_retries: u8, initial_retry_delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.initial_retry_delay_ms = initial_retry_delay_ms;
        self
    }

    pub fn urls(&self) -> &SiteUrls {
        &self.urls
    }

    async fn get_with_retry(&self, url: &str) -> Result<RawResponse, FetchError> {
        let mut attempt = Attempt::first();
        loop {
            if let Some(dur) = attempt.get_delay() {
                sleep(dur).await;
            }
            let result = match self.client.get(url).await {
                Ok(resp) if resp.status == 200 => Ok(resp),
                Ok(resp) => Err(FetchError::Status(resp.status)),
                Err(err) => Err(err),
            };
            match result {
                Ok(resp) => return Ok(resp),
                Err(err) if attempt.retry < self.max_retries => {
                    tracing::warn!("Attempt {} failed: {}", attempt.retry + 1, err);
                    attempt = attempt.next(self.initial_retry_delay_ms);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Fetches a page body, requiring a 200 status.
    #[tracing::instrument(skip(self))]
    pub async fn get_page(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.get_with_retry(url).await?;
        Ok(resp.body)
    }

    pub async fn get_navigation(&self) -> Result<String, FetchError> {
        self.get_page(&self.urls.root_url).await
    }

    /// Fetches the listing document of one subcategory. The response must be JSON.
    #[tracing::instrument(skip(self))]
    pub async fn get_listing(&self, listing_id: &str) -> Result<String, FetchError> {
        let resp = self.get_with_retry(&self.urls.listing_url(listing_id)).await?;
        match resp.content_type.as_deref() {
            Some(JSON_CONTENT_TYPE) => Ok(resp.body),
            _ => Err(FetchError::ContentType(resp.content_type)),
        }
    }

    pub async fn get_article(&self, href: &str) -> Result<String, FetchError> {
        self.get_page(&self.urls.article_url(href)).await
    }
}
