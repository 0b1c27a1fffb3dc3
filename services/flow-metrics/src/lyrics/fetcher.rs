//!
//! src/lyrics/fetcher.rs
//!
//! Html page fetching for the lyrics sources. Every request waits on the
//! scraper's rate gate and goes out dressed as a desktop browser
//!

use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::debug;

use crate::config::{AppConfig, ScraperConfig};
use crate::errors::{FlowError, LyricsError};
use crate::http::{HttpRequest, ReqwestTransport, Transport};
use crate::rate_limit::RateGate;

pub const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.212 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
];

pub struct PageFetcher {
    transport: Arc<dyn Transport>,
    gate: RateGate
}

impl PageFetcher {
    pub fn new(transport: Arc<dyn Transport>, cfg: &ScraperConfig) -> Self {
        let gate = RateGate::new(cfg.min_interval)
            .with_jitter(cfg.jitter_min, cfg.jitter_max);
        Self { transport, gate }
    }

    pub fn from_config(app: &AppConfig) -> Result<Self, FlowError> {
        let transport = ReqwestTransport::pages(&app.http, app.scraper.timeout)?;
        Ok( Self::new(Arc::new(transport), &app.scraper) )
    }

    fn browser_request(request: HttpRequest) -> HttpRequest {
        let agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);

        request
            .header("User-Agent", agent)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.5")
            .header("Referer", "https://www.google.com/")
            .header("Connection", "keep-alive")
            .header("Upgrade-Insecure-Requests", "1")
            .header("Cache-Control", "max-age=0")
    }

    /// GET a page body, any non-2xx status is an error
    pub async fn get(&self, url: &str) -> Result<String, LyricsError> {
        self.gate.wait_if_needed().await;
        debug!(%url, "lyrics.fetch");

        let response = self.transport
            .execute(Self::browser_request(HttpRequest::get(url)))
            .await
            .map_err(|e| LyricsError::new(format!("Request failed: {e}")))?;
        if !response.is_success() {
            return Err(LyricsError::new(format!(
                "Request failed: HTTP {} for {url}", response.status
            )));
        }
        Ok(response.body)
    }

    /// HEAD a page, true only for a plain 200
    pub async fn exists(&self, url: &str) -> Result<bool, LyricsError> {
        self.gate.wait_if_needed().await;
        debug!(%url, "lyrics.head");

        let response = self.transport
            .execute(Self::browser_request(HttpRequest::head(url)))
            .await
            .map_err(|e| LyricsError::new(format!("Request failed: {e}")))?;
        Ok(response.status == 200)
    }
}
