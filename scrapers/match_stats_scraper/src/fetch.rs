use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ScrapingConfig;

const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(500);

/// The site refused the request outright; retrying will not help.
#[derive(Debug, Error)]
#[error("{url} answered 403 Forbidden; the site blocks automated requests. Configure SCRAPER_SERVICE_URL or save the rendered page and use process-file")]
pub struct BlockedError {
    pub url: String,
}

pub trait HtmlFetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ServiceResponse {
    success: bool,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Fetches pages over HTTP, either directly or through the rendering
/// service when one is configured.
pub struct WebHtmlFetcher {
    client: Client,
    service_url: Option<String>,
    max_retries: u32,
    retry_delay: Duration,
}

impl WebHtmlFetcher {
    pub fn new(config: &ScrapingConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            service_url: config.scraper_service_url.clone(),
            max_retries: config.max_retries.max(1),
            retry_delay: INITIAL_RETRY_DELAY,
        })
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn retry_with_backoff<F, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut delay = self.retry_delay;
        let mut attempt = 1;

        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if e.is::<BlockedError>() {
                        return Err(e);
                    }
                    if attempt >= self.max_retries {
                        return Err(e.context("Max retries exceeded"));
                    }
                    info!("Retry attempt {} after error: {}", attempt, e);
                    thread::sleep(delay);
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }

    fn fetch_direct(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send()?;

        if response.status() == StatusCode::FORBIDDEN {
            return Err(BlockedError { url: url.to_string() }.into());
        }
        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch HTML: HTTP {}", response.status());
        }

        Ok(response.text()?)
    }

    fn fetch_via_service(&self, service: &str, url: &str) -> Result<String> {
        let endpoint = format!("{}/scrape?url={}", service, urlencoding::encode(url));
        let response = self.client.get(&endpoint).send()?;

        if !response.status().is_success() {
            anyhow::bail!("Scraper service failed: HTTP {}", response.status());
        }

        let body: ServiceResponse = response.json().context("Invalid scraper service response")?;
        match body {
            ServiceResponse {
                success: true,
                html: Some(html),
                ..
            } => Ok(html),
            ServiceResponse { error, .. } => anyhow::bail!(
                "Scraper service could not render {}: {}",
                url,
                error.unwrap_or_else(|| "no HTML returned".to_string())
            ),
        }
    }
}

impl HtmlFetcher for WebHtmlFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let html = self.retry_with_backoff(|| match &self.service_url {
            Some(service) => self.fetch_via_service(service, url),
            None => self.fetch_direct(url),
        })?;
        if html.trim().is_empty() {
            warn!("Empty document from {}", url);
        }
        info!("Downloaded {} bytes from {}", html.len(), url);
        Ok(html)
    }
}
