use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapingConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    /// Optional rendering proxy answering `GET {url}/scrape?url=...` with
    /// `{"success": bool, "html": String}`.
    pub scraper_service_url: Option<String>,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            request_timeout_secs: 30,
            max_retries: 3,
            scraper_service_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpaThresholds {
    /// Bodies shorter than this with no event markup count as shells under
    /// the strict profile.
    pub max_body_len: usize,
    pub module_script_body_len: usize,
    pub framework_body_len: usize,
}

impl Default for SpaThresholds {
    fn default() -> Self {
        Self {
            max_body_len: 2000,
            module_script_body_len: 500,
            framework_body_len: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LiveWindows {
    pub status_radius: usize,
    pub odds_radius: usize,
}

impl Default for LiveWindows {
    fn default() -> Self {
        Self {
            status_radius: 5000,
            odds_radius: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScraperConfig {
    pub scraping: ScrapingConfig,
    pub spa: SpaThresholds,
    pub live: LiveWindows,
    pub output_dir: PathBuf,
}

impl ScraperConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(user_agent) = env::var("SCRAPER_USER_AGENT") {
            config.scraping.user_agent = user_agent;
        }
        if let Ok(Some(timeout)) = env::var("SCRAPER_TIMEOUT_SECS").map_or(Ok(None), |t| t.parse::<u64>().map(Some)) {
            config.scraping.request_timeout_secs = timeout;
        }
        if let Ok(Some(retries)) = env::var("SCRAPER_MAX_RETRIES").map_or(Ok(None), |r| r.parse::<u32>().map(Some)) {
            config.scraping.max_retries = retries.max(1);
        }
        if let Ok(url) = env::var("SCRAPER_SERVICE_URL") {
            let url = url.trim().trim_end_matches('/');
            if !url.is_empty() {
                config.scraping.scraper_service_url = Some(url.to_string());
            }
        }
        if let Ok(Some(len)) = env::var("SPA_MAX_BODY_LEN").map_or(Ok(None), |l| l.parse::<usize>().map(Some)) {
            config.spa.max_body_len = len;
        }
        if let Ok(dir) = env::var("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        config
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            scraping: ScrapingConfig::default(),
            spa: SpaThresholds::default(),
            live: LiveWindows::default(),
            output_dir: PathBuf::from("parsed_html_output"),
        }
    }
}
